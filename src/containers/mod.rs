//! Containers layered on [`Vector`](crate::vector::Vector)
//!
//! - **`OrderingList`** - intrusive circular ordering of integer ids, usable
//!   as an LRU order or any caller-defined sequence

pub mod ordering_list;

pub use ordering_list::{OrderLink, OrderingList, SENTINEL};
