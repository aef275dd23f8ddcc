//! Backing storage for vector images.
//!
//! Every backing exposes the whole image (header followed by the payload)
//! as one contiguous byte range whose start is at least 8-byte aligned.

use super::header::{VecHeader, HEADER_SIZE, MODE_CLOSED};
use crate::config::VectorConfig;
use crate::error::{MmvecError, Result};
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::alloc::{self, Layout};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::Arc;

/// Shared region an embedded vector points into
pub type Region = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// Heap allocation that grows with `realloc`
pub(crate) struct HeapBlock {
    ptr: NonNull<u8>,
    size: usize,
    align: usize,
}

// HeapBlock uniquely owns its allocation.
unsafe impl Send for HeapBlock {}
unsafe impl Sync for HeapBlock {}

impl HeapBlock {
    /// Allocate `size` zeroed bytes
    pub(crate) fn zeroed(size: usize, align: usize) -> Result<Self> {
        let layout = Self::layout(size, align)?;
        // SAFETY: size >= HEADER_SIZE, so the layout is non-zero.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Ok(Self { ptr, size, align })
    }

    fn layout(size: usize, align: usize) -> Result<Layout> {
        debug_assert!(size >= HEADER_SIZE);
        Layout::from_size_align(size, align)
            .map_err(|_| MmvecError::capacity_overflow(size as u64))
    }

    /// Grow to `new_size` bytes and zero everything from `zero_from` on
    pub(crate) fn grow(&mut self, new_size: usize, zero_from: usize) -> Result<()> {
        if new_size > self.size {
            let new_layout = Self::layout(new_size, self.align)?;
            // SAFETY: ptr was allocated with layout(size, align) and new_size
            // was validated against the same alignment.
            let raw = unsafe {
                let old_layout = Layout::from_size_align_unchecked(self.size, self.align);
                alloc::realloc(self.ptr.as_ptr(), old_layout, new_size)
            };
            self.ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(new_layout));
            self.size = new_size;
        }
        if zero_from < new_size {
            self.bytes_mut()[zero_from..new_size].fill(0);
        }
        Ok(())
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for size initialized bytes.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for size initialized bytes and uniquely owned.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    #[cfg(test)]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for HeapBlock {
    fn drop(&mut self) {
        // SAFETY: same layout the block was allocated or last reallocated with.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.size, self.align);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

/// Writable mapping of a file together with the handle that keeps it open
pub(crate) struct MappedFile {
    pub(crate) file: File,
    pub(crate) map: MmapMut,
    pub(crate) path: PathBuf,
    pub(crate) config: VectorConfig,
}

impl MappedFile {
    /// Extend the file to `new_size` bytes and map it again
    ///
    /// Bytes from `zero_from` to the old end of the mapping are cleared
    /// first; the newly added file range reads as zero.
    pub(crate) fn grow(&mut self, new_size: u64, zero_from: usize) -> Result<()> {
        let mapped = self.map.len();
        if zero_from < mapped {
            self.map[zero_from..].fill(0);
        }
        self.file.set_len(new_size)?;
        // The previous mapping is released on assignment.
        self.map = map_writable(&self.file, &self.config)?;
        log::debug!("remapped {} to {} bytes", self.path.display(), new_size);
        Ok(())
    }

    /// Stamp the closed sentinel, flush if configured, unmap and truncate
    /// the file to the size the header describes
    pub(crate) fn close(mut self) -> Result<()> {
        let mut header = VecHeader::unpack(&self.map);
        header.mode = MODE_CLOSED;
        header.store(&mut self.map);
        if self.config.flush_on_release {
            self.map.flush()?;
        }
        let mapped = self.map.len() as u64;
        let size = header.byte_size();
        drop(self.map);
        if mapped != size {
            self.file.set_len(size)?;
        }
        log::debug!("closed {} ({} elements, {} bytes)", self.path.display(), header.count, size);
        Ok(())
    }
}

pub(crate) fn map_writable(file: &File, config: &VectorConfig) -> Result<MmapMut> {
    let mut options = MmapOptions::new();
    if config.populate_pages {
        options.populate();
    }
    // SAFETY: the file stays open for the lifetime of the mapping; concurrent
    // modification by other processes is the caller's responsibility.
    let map = unsafe { options.map_mut(file)? };
    Ok(map)
}

pub(crate) fn map_read_only(file: &File, config: &VectorConfig) -> Result<Mmap> {
    let mut options = MmapOptions::new();
    if config.populate_pages {
        options.populate();
    }
    // SAFETY: see map_writable.
    let map = unsafe { options.map(file)? };
    Ok(map)
}

/// Mode tag stamped into a file while this process holds it open for writing
#[cfg(unix)]
pub(crate) fn writer_tag(file: &File) -> u16 {
    use std::os::unix::io::AsRawFd;
    file.as_raw_fd().clamp(3, 0xFFF) as u16
}

/// Mode tag stamped into a file while this process holds it open for writing
#[cfg(not(unix))]
pub(crate) fn writer_tag(_file: &File) -> u16 {
    0xFFF
}

/// Storage behind a vector handle
pub(crate) enum Backing {
    Heap(HeapBlock),
    MappedReadOnly { map: Mmap, path: PathBuf },
    MappedWritable(MappedFile),
    Embedded { region: Region, offset: usize, len: usize },
    Closed,
}

impl Backing {
    /// Whole image bytes (may extend past the size the header describes)
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Self::Heap(block) => block.bytes(),
            Self::MappedReadOnly { map, .. } => &map[..],
            Self::MappedWritable(file) => &file.map[..],
            Self::Embedded { region, offset, len } => {
                let data: &[u8] = (**region).as_ref();
                &data[*offset..*offset + *len]
            }
            Self::Closed => &[],
        }
    }

    /// Whole image bytes, `None` for storage this handle may not modify
    pub(crate) fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Heap(block) => Some(block.bytes_mut()),
            Self::MappedWritable(file) => Some(&mut file.map[..]),
            _ => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Heap(_) => "heap",
            Self::MappedReadOnly { .. } => "read-only mapped",
            Self::MappedWritable(_) => "writable mapped",
            Self::Embedded { .. } => "embedded",
            Self::Closed => "released",
        }
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        match self {
            Self::MappedReadOnly { path, .. } => Some(path),
            Self::MappedWritable(file) => Some(&file.path),
            _ => None,
        }
    }

    /// Give the storage back: free heap memory, unmap, or close the file
    /// after stamping the closed sentinel
    pub(crate) fn release(self) -> Result<()> {
        match self {
            Self::MappedWritable(file) => file.close(),
            Self::MappedReadOnly { map, path } => {
                drop(map);
                log::debug!("unmapped {}", path.display());
                Ok(())
            }
            Self::Heap(_) | Self::Embedded { .. } | Self::Closed => Ok(()),
        }
    }
}

/// Copy `bytes` into a fresh heap block aligned for `align`
pub(crate) fn heap_from_bytes(bytes: &[u8], align: usize) -> Result<HeapBlock> {
    let mut block = HeapBlock::zeroed(bytes.len(), align)?;
    // SAFETY: block has exactly bytes.len() bytes and cannot overlap `bytes`.
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), block.bytes_mut().as_mut_ptr(), bytes.len());
    }
    Ok(block)
}
