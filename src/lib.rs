//! # mmvec: Header-Prefixed Vectors on Heap or Memory-Mapped Files
//!
//! This crate provides a minimal storage substrate: a self-describing growable
//! array that lives in process memory or is transparently backed by a
//! memory-mapped file, plus two structures built directly on it.
//!
//! ## Key Features
//!
//! - **Vector Engine**: [`Vector<T>`] with an 8-byte inline header, heap or
//!   file backed, read-only mappings and embedded views into shared regions
//! - **Persistence**: whole-image persist and restore, bit-exact on disk
//! - **Key Interning**: [`InternTable`] maps byte strings to dense `u32` ids
//! - **Ordering Index**: [`OrderingList`], an intrusive circular list over ids
//!
//! ## Quick Start
//!
//! ```rust
//! use mmvec::{Access, InternTable, OrderingList, Vector};
//!
//! # fn main() -> mmvec::Result<()> {
//! let dir = tempfile::tempdir()?;
//!
//! // File-backed vector
//! let path = dir.path().join("ids.vec");
//! let v = Vector::<u32>::open(&path, Access::Write)?;
//! let v = v.append_many(&[3, 5, 8])?;
//! v.release()?;
//!
//! let v = Vector::<u32>::open(&path, Access::ReadOnly)?;
//! assert_eq!(v.lower_bound(4), 1);
//!
//! // Key interning
//! let mut table = InternTable::new(8)?;
//! assert_eq!(table.intern(b"term")?, 1);
//!
//! // Ordering index
//! let mut order = OrderingList::new(3)?;
//! order.move_to_front(3)?;
//! assert_eq!(order.iter().collect::<Vec<_>>(), vec![3, 1, 2]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod containers;
pub mod error;
pub mod hash_map;
pub mod vector;

// Re-export core types
pub use config::{Config, InternConfig, VectorConfig};
pub use containers::{OrderLink, OrderingList};
pub use error::{MmvecError, Result};
pub use hash_map::{InternStats, InternTable, KeyHasher, KeySpan};
pub use vector::{Access, Element, IdTime, IdValue, Keyed, VecHeader, Vector};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library (currently no-op, for future use)
pub fn init() {
    log::debug!("Initializing mmvec v{}", VERSION);
}
