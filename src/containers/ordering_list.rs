//! Intrusive ordering index over integer ids
//!
//! A circular doubly-linked list whose nodes are the entries of a
//! [`Vector<OrderLink>`]: node `id` is `links[id]`, and index 0 is the
//! sentinel. Following `next` from the sentinel visits every linked id once
//! and comes back to 0. A detached node has `prev = next = 0`.
//!
//! Because the links live in a vector, the order can be kept in a
//! memory-mapped file and reopened later ([`OrderingList::from_vector`]).
//!
//! ```rust
//! use mmvec::containers::OrderingList;
//!
//! # fn main() -> mmvec::Result<()> {
//! let mut order = OrderingList::new(4)?;
//! order.remove(2);
//! order.insert_before(2, 3)?;
//! assert_eq!(order.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
//!
//! // LRU touch
//! order.move_to_front(4)?;
//! assert_eq!(order.first(), Some(4));
//! # Ok(())
//! # }
//! ```

use crate::error::{check_bounds, MmvecError, Result};
use crate::vector::{Element, Vector};

/// Sentinel id; never a member of the list
pub const SENTINEL: u32 = 0;

/// Neighbours of one node
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderLink {
    /// Previous id, 0 for the sentinel
    pub prev: u32,
    /// Next id, 0 for the sentinel
    pub next: u32,
}

unsafe impl Element for OrderLink {}

impl OrderLink {
    /// Links of a node that is not in the list
    pub const DETACHED: Self = Self { prev: 0, next: 0 };
}

/// Circular doubly-linked order over ids stored in a vector
pub struct OrderingList {
    links: Vector<OrderLink>,
}

impl OrderingList {
    /// List holding `1..=n` in ascending order
    pub fn new(n: u32) -> Result<Self> {
        let mut list = Self {
            links: Vector::new(n as usize + 1)?,
        };
        list.init(n)?;
        Ok(list)
    }

    /// Use `links` as the node array, e.g. a file-backed vector
    ///
    /// An empty writable vector is initialized with a lone sentinel; an
    /// empty read-only one is refused. Every link must point inside the
    /// array.
    pub fn from_vector(mut links: Vector<OrderLink>) -> Result<Self> {
        if links.is_empty() {
            if !links.is_writable() {
                return Err(MmvecError::read_only("initialize an empty ordering list"));
            }
            links.push_in_place(OrderLink::DETACHED)?;
        }
        validate_links(&links)?;
        Ok(Self { links })
    }

    /// Give back the node array
    pub fn into_vector(self) -> Vector<OrderLink> {
        self.links
    }

    /// Node array, sentinel first
    pub fn as_links(&self) -> &[OrderLink] {
        self.links.as_slice()
    }

    /// Reset to `1..=n` in ascending order; `n = 0` leaves only the sentinel
    pub fn init(&mut self, n: u32) -> Result<()> {
        self.links.resize_in_place(n as usize + 1)?;
        let links = self.links.as_mut_slice();
        for (i, link) in links.iter_mut().enumerate() {
            let i = i as u32;
            *link = OrderLink {
                prev: if i == 0 { n } else { i - 1 },
                next: if i == n { SENTINEL } else { i + 1 },
            };
        }
        Ok(())
    }

    /// Largest id the node array currently holds
    pub fn max_id(&self) -> u32 {
        (self.links.len() - 1) as u32
    }

    /// Check if `id` is in the list
    pub fn contains(&self, id: u32) -> bool {
        if id == SENTINEL {
            return false;
        }
        match self.links.get(id as usize) {
            Some(link) => *link != OrderLink::DETACHED || self.links[0].next == id,
            None => false,
        }
    }

    /// Check if no id is linked
    pub fn is_empty(&self) -> bool {
        self.links[0].next == SENTINEL
    }

    /// Number of linked ids, by walking the list
    pub fn linked_count(&self) -> usize {
        self.iter().count()
    }

    /// First id in order
    pub fn first(&self) -> Option<u32> {
        non_sentinel(self.links[0].next)
    }

    /// Last id in order
    pub fn last(&self) -> Option<u32> {
        non_sentinel(self.links[0].prev)
    }

    /// Id after `id`, `None` at the end or if `id` is not linked
    pub fn next(&self, id: u32) -> Option<u32> {
        if !self.contains(id) {
            return None;
        }
        non_sentinel(self.links[id as usize].next)
    }

    /// Id before `id`, `None` at the start or if `id` is not linked
    pub fn prev(&self, id: u32) -> Option<u32> {
        if !self.contains(id) {
            return None;
        }
        non_sentinel(self.links[id as usize].prev)
    }

    /// Iterate ids from first to last
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            links: self.links.as_slice(),
            current: self.links[0].next,
            remaining: self.links.len(),
        }
    }

    fn detach(&mut self, id: u32) {
        let links = self.links.as_mut_slice();
        let link = links[id as usize];
        links[link.prev as usize].next = link.next;
        links[link.next as usize].prev = link.prev;
        links[id as usize] = OrderLink::DETACHED;
    }

    /// Splice `id` immediately before `anchor`; `anchor = 0` appends
    ///
    /// The node array grows when `id` is beyond it. A linked `id` is moved.
    pub fn insert_before(&mut self, id: u32, anchor: u32) -> Result<()> {
        if id == SENTINEL || id == anchor {
            return Err(MmvecError::invalid_data(format!(
                "cannot insert id {} before {}",
                id, anchor
            )));
        }
        let len = self.links.len();
        check_bounds(anchor as usize, len)?;
        if anchor != SENTINEL && !self.contains(anchor) {
            return Err(MmvecError::invalid_data(format!("anchor {} is not linked", anchor)));
        }

        if id as usize >= len {
            self.links.resize_in_place(id as usize + 1)?;
            self.links.as_mut_slice()[len..].fill(OrderLink::DETACHED);
        } else if self.contains(id) {
            self.detach(id);
        }

        let links = self.links.as_mut_slice();
        let prev = links[anchor as usize].prev;
        links[id as usize] = OrderLink { prev, next: anchor };
        links[prev as usize].next = id;
        links[anchor as usize].prev = id;
        Ok(())
    }

    /// Unlink `id`; ids that are 0, out of range or detached are ignored
    pub fn remove(&mut self, id: u32) {
        if self.contains(id) {
            self.detach(id);
        }
    }

    /// Insert or move `id` to the front
    pub fn push_front(&mut self, id: u32) -> Result<()> {
        match self.first() {
            Some(first) if first == id => Ok(()),
            Some(first) => self.insert_before(id, first),
            None => self.insert_before(id, SENTINEL),
        }
    }

    /// Insert or move `id` to the back
    pub fn push_back(&mut self, id: u32) -> Result<()> {
        self.insert_before(id, SENTINEL)
    }

    /// Unlink and return the first id
    pub fn pop_front(&mut self) -> Option<u32> {
        let id = self.first()?;
        self.detach(id);
        Some(id)
    }

    /// Unlink and return the last id
    pub fn pop_back(&mut self) -> Option<u32> {
        let id = self.last()?;
        self.detach(id);
        Some(id)
    }

    /// Mark `id` most recently used
    pub fn move_to_front(&mut self, id: u32) -> Result<()> {
        self.push_front(id)
    }

    /// Mark `id` least recently used
    pub fn move_to_back(&mut self, id: u32) -> Result<()> {
        self.push_back(id)
    }
}

impl std::fmt::Debug for OrderingList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Reject node arrays with links past the end
fn validate_links(links: &Vector<OrderLink>) -> Result<()> {
    let len = links.len();
    let bad = links
        .iter()
        .enumerate()
        .find(|(_, link)| link.prev as usize >= len || link.next as usize >= len);
    let Some((id, link)) = bad else {
        return Ok(());
    };
    let target = link.prev.max(link.next) as u64;
    match links.path() {
        Some(path) => {
            log::error!(
                "corrupted ordering list {}: node {} links to {} of {} nodes",
                path.display(),
                id,
                target,
                len
            );
            Err(MmvecError::corrupted(path, "link within node array", len as u64, target))
        }
        None => Err(MmvecError::invalid_data(format!(
            "node {} links ({}, {}) outside {} nodes",
            id, link.prev, link.next, len
        ))),
    }
}

fn non_sentinel(id: u32) -> Option<u32> {
    (id != SENTINEL).then_some(id)
}

/// Iterator over linked ids in order
pub struct Iter<'a> {
    links: &'a [OrderLink],
    current: u32,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        // remaining bounds the walk on a damaged node array
        if self.current == SENTINEL || self.remaining == 0 {
            return None;
        }
        let id = self.current;
        self.current = self.links.get(id as usize).map_or(SENTINEL, |l| l.next);
        self.remaining -= 1;
        Some(id)
    }
}

impl<'a> IntoIterator for &'a OrderingList {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
