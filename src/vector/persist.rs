//! Copying, persisting, restoring and embedding vector images.

use super::header::{VecHeader, HEADER_SIZE, MODE_CLOSED, MODE_HEAP};
use super::storage::{heap_from_bytes, Backing, Region};
use super::{Element, Vector};
use crate::error::{MmvecError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::mem::align_of;
use std::path::Path;
use std::sync::Arc;

impl<T: Element> Vector<T> {
    /// Header plus payload, exactly as large as the header describes
    pub(crate) fn image(&self) -> &[u8] {
        let size = self.header().byte_size() as usize;
        &self.backing.bytes()[..size]
    }

    /// New heap vector holding exactly `len()` elements
    pub fn copy(&self) -> Result<Vector<T>> {
        let mut out = Vector::new(self.len())?;
        out.as_mut_slice().copy_from_slice(self.as_slice());
        Ok(out)
    }

    /// Write the image (header and full capacity) to `out`, stamped closed
    ///
    /// Several images can be written back to back into one container and
    /// later opened with [`Vector::embedded`].
    pub fn write_image<W: Write>(&self, out: &mut W) -> Result<()> {
        let image = self.image();
        let mut header = VecHeader::unpack(image);
        header.mode = MODE_CLOSED;
        out.write_all(&header.pack())?;
        out.write_all(&image[HEADER_SIZE..])?;
        Ok(())
    }

    /// Write the image to a new file at `path`, replacing any existing one
    ///
    /// The handle itself is unchanged.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_image(&mut out)?;
        out.flush()?;
        log::debug!("persisted {} elements to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a persisted image into a new heap vector
    pub fn restore<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let esize = Self::element_size()?;
        let data = fs::read(path)?;
        let mut header = Self::validate_image(&data, path, esize, false)?;

        let mut block = heap_from_bytes(&data, Self::heap_align())?;
        header.mode = MODE_HEAP;
        header.store(block.bytes_mut());
        log::debug!("restored {} elements from {}", header.count, path.display());
        Ok(Self::from_backing(Backing::Heap(block)))
    }

    /// Read-only view of an image stored at `offset` inside `region`
    ///
    /// The view keeps the region alive but never frees or modifies it.
    pub fn embedded<R>(region: Arc<R>, offset: usize) -> Result<Self>
    where
        R: AsRef<[u8]> + Send + Sync + 'static,
    {
        let esize = Self::element_size()?;
        let (len, aligned) = {
            let data: &[u8] = (*region).as_ref();
            let tail = data.get(offset..).ok_or_else(|| {
                MmvecError::invalid_data(format!(
                    "offset {} outside a {}-byte region",
                    offset,
                    data.len()
                ))
            })?;
            let header = VecHeader::read_checked(tail, Path::new("embedded region"))?;
            if header.esize != esize {
                return Err(MmvecError::invalid_data(format!(
                    "embedded image holds {}-byte elements, expected {}",
                    header.esize, esize
                )));
            }
            let len = usize::try_from(header.byte_size())
                .ok()
                .filter(|&len| len <= tail.len())
                .ok_or_else(|| {
                    MmvecError::invalid_data(format!(
                        "image of {} bytes at offset {} overruns a {}-byte region",
                        header.byte_size(),
                        offset,
                        data.len()
                    ))
                })?;
            let payload = tail.as_ptr() as usize + HEADER_SIZE;
            (len, payload % align_of::<T>() == 0)
        };
        if !aligned {
            return Err(MmvecError::invalid_data(format!(
                "payload at offset {} is not aligned to {} bytes",
                offset + HEADER_SIZE,
                align_of::<T>()
            )));
        }

        let region: Region = region;
        Ok(Self::from_backing(Backing::Embedded { region, offset, len }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::MODE_EMBEDDED;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persist_and_restore() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("three.vec");

        let v = Vector::<u32>::new(0).unwrap().append_many(&[1, 2, 3]).unwrap();
        v.persist(&path).unwrap();
        assert_eq!(v.mode(), MODE_HEAP);

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len() as u64, v.byte_size());
        assert_eq!(VecHeader::unpack(&bytes).mode, MODE_CLOSED);

        let restored = Vector::<u32>::restore(&path).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.esize(), 4);
        assert_eq!(restored.as_slice(), &[1, 2, 3]);
        assert_eq!(restored.mode(), MODE_HEAP);
        assert_eq!(restored.capacity(), v.capacity());
    }

    #[test]
    fn test_restore_rejects_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.vec");
        let v = Vector::<u64>::new(4).unwrap();
        v.persist(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let err = Vector::<u64>::restore(&path).unwrap_err();
        assert!(matches!(err, MmvecError::Corrupted { what: "file length", .. }));
    }

    #[test]
    fn test_restore_rejects_wrong_element_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bytes.vec");
        Vector::<u8>::new(8).unwrap().persist(&path).unwrap();
        let err = Vector::<u32>::restore(&path).unwrap_err();
        assert_eq!(err.category(), "data");
    }

    #[test]
    fn test_copy_trims_slack() {
        let v = Vector::<u16>::new(0).unwrap().append_many(&[4, 5, 6]).unwrap();
        assert_eq!(v.capacity(), 4);
        let c = v.copy().unwrap();
        assert_eq!(c.as_slice(), &[4, 5, 6]);
        assert_eq!(c.capacity(), 3);
        assert_ne!(c.as_ptr(), v.as_ptr());
    }

    #[test]
    fn test_embedded_views_in_one_region() {
        let a = Vector::<u32>::new(0).unwrap().append_many(&[10, 20]).unwrap();
        let b = Vector::<u64>::new(0).unwrap().append_many(&[7, 8, 9]).unwrap();

        let mut packed = Vec::new();
        a.write_image(&mut packed).unwrap();
        let b_offset = packed.len();
        b.write_image(&mut packed).unwrap();
        assert_eq!(b_offset % 8, 0);

        let region = Arc::new(packed);
        let va = Vector::<u32>::embedded(region.clone(), 0).unwrap();
        let vb = Vector::<u64>::embedded(region.clone(), b_offset).unwrap();
        assert_eq!(va.as_slice(), &[10, 20]);
        assert_eq!(vb.as_slice(), &[7, 8, 9]);
        assert_eq!(va.mode(), MODE_EMBEDDED);
        assert!(!va.is_writable());

        drop(va);
        drop(vb);
        assert_eq!(Arc::strong_count(&region), 1);
    }

    #[test]
    fn test_embedded_bounds() {
        let v = Vector::<u32>::new(4).unwrap();
        let mut packed = Vec::new();
        v.write_image(&mut packed).unwrap();
        let full = packed.len();
        packed.truncate(full - 1);

        let region = Arc::new(packed);
        assert!(Vector::<u32>::embedded(region.clone(), 0).is_err());
        assert!(Vector::<u32>::embedded(region.clone(), 1000).is_err());
        assert!(Vector::<u32>::embedded(region, full - 4).is_err());
    }

    #[test]
    #[should_panic(expected = "cannot resize a vector with embedded storage")]
    fn test_embedded_resize_panics() {
        let v = Vector::<u32>::new(1).unwrap();
        let mut packed = Vec::new();
        v.write_image(&mut packed).unwrap();
        let view = Vector::<u32>::embedded(Arc::new(packed), 0).unwrap();
        let _ = view.resize(2);
    }
}
