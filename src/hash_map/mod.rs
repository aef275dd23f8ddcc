//! Key interning built on [`Vector`](crate::vector::Vector)
//!
//! [`InternTable`] assigns dense ids to byte-string keys. The
//! [`hash_functions`] module holds the hashers it can probe with.

pub mod hash_functions;
pub mod intern_table;

pub use hash_functions::{multiadd_hash, murmur3_32, AHashKeys, KeyHasher, Murmur3, MultiAdd};
pub use intern_table::{InternStats, InternTable, KeySpan, KEYS_FILE, SLOTS_FILE, SPANS_FILE};
