//! Header-prefixed growable vectors
//!
//! A [`Vector`] is a typed array whose 8-byte [`VecHeader`] lives in the same
//! allocation, immediately before element 0. The image is bit-identical
//! whether it sits on the heap, in a memory-mapped file or inside a larger
//! region, so a vector can be persisted by writing its bytes and reopened by
//! mapping them.
//!
//! # Backings
//!
//! - **Heap**: [`Vector::new`], [`Vector::restore`], [`Vector::copy`]
//! - **Writable file**: [`Vector::open`] with [`Access::Write`] or [`Access::Append`]
//! - **Read-only file**: [`Vector::open`] with [`Access::ReadOnly`]
//! - **Embedded view**: [`Vector::embedded`] into a shared region
//!
//! Operations that can move the storage ([`Vector::resize`],
//! [`Vector::append`], ...) consume the handle and return the one to use
//! afterwards. If they fail, the consumed vector is released.
//!
//! # Examples
//!
//! ```rust
//! use mmvec::Vector;
//!
//! # fn main() -> mmvec::Result<()> {
//! let mut v = Vector::<u32>::new(0)?;
//! for i in 0..5 {
//!     v = v.append(i)?;
//! }
//! assert_eq!(v.as_slice(), &[0, 1, 2, 3, 4]);
//! assert!(v.capacity() >= 5);
//! # Ok(())
//! # }
//! ```

mod element;
mod header;
mod persist;
mod search;
mod storage;

pub use element::{Element, IdTime, IdValue, Keyed};
pub use header::{limit_for, VecHeader, HEADER_SIZE, MAX_ESIZE, MODE_CLOSED, MODE_EMBEDDED, MODE_HEAP};
pub use storage::Region;

use crate::config::VectorConfig;
use crate::error::{MmvecError, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ops::{Deref, Index, IndexMut};
use std::path::Path;
use std::slice;
use std::str::FromStr;
use storage::{map_read_only, map_writable, writer_tag, Backing, HeapBlock, MappedFile};

/// How a file-backed vector is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Create the file if absent, otherwise open it for writing
    Write,
    /// Map the file read-only; the file handle is closed right away
    ReadOnly,
    /// Open an existing file for writing; fails if it does not exist
    Append,
}

impl Access {
    /// Single-letter form (`"w"`, `"r"`, `"a"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Write => "w",
            Self::ReadOnly => "r",
            Self::Append => "a",
        }
    }
}

impl FromStr for Access {
    type Err = MmvecError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "w" => Ok(Self::Write),
            "r" => Ok(Self::ReadOnly),
            "a" => Ok(Self::Append),
            other => Err(MmvecError::invalid_data(format!(
                "unknown access mode '{}', expected one of w, r, a",
                other
            ))),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Growable typed vector stored behind an inline header
///
/// # Concurrency
///
/// A handle is `Send + Sync`; mutation goes through `&mut self` or ownership.
/// Mapping the same file writable from two processes is unsupported: when one
/// side grows the file the other keeps a stale mapping.
pub struct Vector<T: Element> {
    backing: Backing,
    _marker: PhantomData<T>,
}

fn count_for(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| MmvecError::capacity_overflow(n as u64))
}

fn image_size(header: &VecHeader) -> Result<usize> {
    usize::try_from(header.byte_size()).map_err(|_| MmvecError::capacity_overflow(header.capacity()))
}

fn log_corruption(err: MmvecError) -> MmvecError {
    if let MmvecError::Corrupted { path, what, expected, actual } = &err {
        log::error!(
            "corrupted vector {}: {} expected {}, found {}",
            path.display(),
            what,
            expected,
            actual
        );
    }
    err
}

impl<T: Element> Vector<T> {
    fn from_backing(backing: Backing) -> Self {
        Self {
            backing,
            _marker: PhantomData,
        }
    }

    /// Bytes per element, validated against the header's 10-bit field
    fn element_size() -> Result<u16> {
        let size = size_of::<T>();
        if size == 0 || size > MAX_ESIZE {
            return Err(MmvecError::invalid_data(format!(
                "element size {} outside 1..={}",
                size, MAX_ESIZE
            )));
        }
        if align_of::<T>() > HEADER_SIZE {
            return Err(MmvecError::invalid_data(format!(
                "element alignment {} exceeds {}",
                align_of::<T>(),
                HEADER_SIZE
            )));
        }
        Ok(size as u16)
    }

    fn heap_align() -> usize {
        align_of::<T>().max(HEADER_SIZE)
    }

    /// Check a stored image against the element type and its own size
    fn validate_image(bytes: &[u8], path: &Path, esize: u16, require_closed: bool) -> Result<VecHeader> {
        let header = VecHeader::read_checked(bytes, path).map_err(log_corruption)?;
        if require_closed && header.mode != MODE_CLOSED {
            return Err(log_corruption(MmvecError::corrupted(
                path,
                "mode field",
                MODE_CLOSED as u64,
                header.mode as u64,
            )));
        }
        if bytes.len() as u64 != header.byte_size() {
            return Err(log_corruption(MmvecError::corrupted(
                path,
                "file length",
                header.byte_size(),
                bytes.len() as u64,
            )));
        }
        if header.esize != esize {
            return Err(MmvecError::invalid_data(format!(
                "{} holds {}-byte elements, expected {}",
                path.display(),
                header.esize,
                esize
            )));
        }
        Ok(header)
    }

    /// Create a heap vector of `n` zeroed elements with exact capacity
    pub fn new(n: usize) -> Result<Self> {
        let esize = Self::element_size()?;
        let header = VecHeader::new(count_for(n)?, esize, MODE_HEAP);
        let mut block = HeapBlock::zeroed(image_size(&header)?, Self::heap_align())?;
        header.store(block.bytes_mut());
        Ok(Self::from_backing(Backing::Heap(block)))
    }

    /// Open a file-backed vector with the default [`VectorConfig`]
    pub fn open<P: AsRef<Path>>(path: P, access: Access) -> Result<Self> {
        Self::open_with_config(path, access, &VectorConfig::default())
    }

    /// Open a file-backed vector
    ///
    /// An empty file becomes an empty vector. An existing image must have
    /// been closed cleanly (mode 1) and its length must match its header;
    /// otherwise [`MmvecError::Corrupted`] is returned and the file should be
    /// rebuilt.
    pub fn open_with_config<P: AsRef<Path>>(path: P, access: Access, config: &VectorConfig) -> Result<Self> {
        let path = path.as_ref();
        let esize = Self::element_size()?;

        let backing = match access {
            Access::ReadOnly => {
                let file = File::open(path)?;
                let map = map_read_only(&file, config)?;
                let header = Self::validate_image(&map, path, esize, true)?;
                log::debug!("opened {} read-only ({} elements)", path.display(), header.count);
                Backing::MappedReadOnly {
                    map,
                    path: path.to_path_buf(),
                }
            }
            Access::Write | Access::Append => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(access == Access::Write)
                    .truncate(false)
                    .open(path)?;
                let tag = writer_tag(&file);

                let map = if file.metadata()?.len() == 0 {
                    file.set_len(HEADER_SIZE as u64)?;
                    let mut map = map_writable(&file, config)?;
                    VecHeader::new(0, esize, tag).store(&mut map);
                    log::debug!("created {}", path.display());
                    map
                } else {
                    let mut map = map_writable(&file, config)?;
                    let mut header = Self::validate_image(&map, path, esize, true)?;
                    header.mode = tag;
                    header.store(&mut map);
                    log::debug!("opened {} for {} ({} elements)", path.display(), access, header.count);
                    map
                };

                Backing::MappedWritable(MappedFile {
                    file,
                    map,
                    path: path.to_path_buf(),
                    config: config.clone(),
                })
            }
        };

        Ok(Self::from_backing(backing))
    }

    /// Decoded header
    pub fn header(&self) -> VecHeader {
        VecHeader::unpack(self.backing.bytes())
    }

    fn store_header(&mut self, header: VecHeader) {
        let kind = self.backing.kind();
        match self.backing.bytes_mut() {
            Some(bytes) => header.store(bytes),
            None => panic!("cannot modify a vector with {} storage", kind),
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.header().count as usize
    }

    /// Check if the vector has no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements the current storage holds
    #[inline]
    pub fn capacity(&self) -> usize {
        self.header().capacity() as usize
    }

    /// Bytes per element
    #[inline]
    pub fn esize(&self) -> usize {
        self.header().esize as usize
    }

    /// Mode tag: [`MODE_HEAP`], [`MODE_CLOSED`] for read-only files,
    /// [`MODE_EMBEDDED`], or the live writer tag of a writable file
    pub fn mode(&self) -> u16 {
        match self.backing {
            Backing::Embedded { .. } => MODE_EMBEDDED,
            _ => self.header().mode,
        }
    }

    /// Size of header plus payload in bytes
    pub fn byte_size(&self) -> u64 {
        self.header().byte_size()
    }

    /// Whether this handle may mutate and grow its storage
    pub fn is_writable(&self) -> bool {
        matches!(self.backing, Backing::Heap(_) | Backing::MappedWritable(_))
    }

    /// Path of the backing file, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.backing.path()
    }

    /// Pointer to element 0
    pub fn as_ptr(&self) -> *const T {
        // SAFETY: every image is at least HEADER_SIZE bytes long.
        unsafe { self.backing.bytes().as_ptr().add(HEADER_SIZE).cast::<T>() }
    }

    /// Elements as a slice
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the image holds at least `len` elements after the header,
        // the payload is aligned for T, and any bit pattern is a valid T.
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    /// Elements as a mutable slice
    ///
    /// # Panics
    ///
    /// Panics for read-only and embedded vectors.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        let kind = self.backing.kind();
        match self.backing.bytes_mut() {
            // SAFETY: as in as_slice, and the storage is exclusively borrowed.
            Some(bytes) => unsafe {
                slice::from_raw_parts_mut(bytes.as_mut_ptr().add(HEADER_SIZE).cast::<T>(), len)
            },
            None => panic!("cannot modify a vector with {} storage", kind),
        }
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Iterate over the elements
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    fn assert_growable(&self, operation: &str) {
        if !self.is_writable() {
            panic!("cannot {} a vector with {} storage", operation, self.backing.kind());
        }
    }

    /// Set the element count to `n`, reallocating or remapping if it
    /// exceeds the capacity
    pub(crate) fn resize_in_place(&mut self, n: usize) -> Result<()> {
        self.assert_growable("resize");
        let count = count_for(n)?;
        let mut header = self.header();
        let old_extent = image_size(&header)?;

        if n as u64 <= header.capacity() {
            header.count = count;
            self.store_header(header);
            return Ok(());
        }

        header.count = count;
        header.limit = limit_for(count);
        let new_size = image_size(&header)?;
        match &mut self.backing {
            Backing::Heap(block) => block.grow(new_size, old_extent)?,
            Backing::MappedWritable(file) => file.grow(new_size as u64, old_extent)?,
            other => panic!("cannot resize a vector with {} storage", other.kind()),
        }
        self.store_header(header);
        Ok(())
    }

    pub(crate) fn push_in_place(&mut self, element: T) -> Result<()> {
        let index = self.len();
        self.resize_in_place(index + 1)?;
        self.as_mut_slice()[index] = element;
        Ok(())
    }

    pub(crate) fn extend_in_place(&mut self, elements: &[T]) -> Result<()> {
        let start = self.len();
        self.resize_in_place(start + elements.len())?;
        self.as_mut_slice()[start..].copy_from_slice(elements);
        Ok(())
    }

    pub(crate) fn set_in_place(&mut self, index: usize, element: T) -> Result<()> {
        if index >= self.len() {
            self.resize_in_place(index + 1)?;
        }
        self.as_mut_slice()[index] = element;
        Ok(())
    }

    /// Set the element count to `n`
    ///
    /// Within the current capacity only the count changes and the storage
    /// stays where it is. Beyond it the capacity becomes the smallest power
    /// of two >= `n` and the new bytes read as zero.
    ///
    /// # Panics
    ///
    /// Panics for read-only and embedded vectors.
    pub fn resize(mut self, n: usize) -> Result<Self> {
        self.resize_in_place(n)?;
        Ok(self)
    }

    /// Append one element
    pub fn append(mut self, element: T) -> Result<Self> {
        self.push_in_place(element)?;
        Ok(self)
    }

    /// Append a slice of elements
    pub fn append_many(mut self, elements: &[T]) -> Result<Self> {
        self.extend_in_place(elements)?;
        Ok(self)
    }

    /// Store `element` at `index`, growing the vector to `index + 1` first
    /// when needed
    pub fn set(mut self, index: usize, element: T) -> Result<Self> {
        self.set_in_place(index, element)?;
        Ok(self)
    }

    /// `msync` a writable mapping; no-op for other backings
    pub fn flush(&self) -> Result<()> {
        if let Backing::MappedWritable(file) = &self.backing {
            file.map.flush()?;
        }
        Ok(())
    }

    /// Release the storage, reporting any error
    ///
    /// A writable file is stamped closed, unmapped and closed. Embedded views
    /// never free the region they point into.
    pub fn release(mut self) -> Result<()> {
        std::mem::replace(&mut self.backing, Backing::Closed).release()
    }
}

impl<T: Element> Drop for Vector<T> {
    fn drop(&mut self) {
        if matches!(self.backing, Backing::Closed) {
            return;
        }
        let backing = std::mem::replace(&mut self.backing, Backing::Closed);
        let kind = backing.kind();
        if let Err(e) = backing.release() {
            log::warn!("failed to release {} vector: {}", kind, e);
        }
    }
}

impl<T: Element> Deref for Vector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Element> IndexMut<usize> for Vector<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T: Element> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("backing", &self.backing.kind())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("mode", &self.mode())
            .field("data", &self.as_slice())
            .finish()
    }
}
