//! The 8-byte record stored in front of every vector's payload.
//!
//! Layout (little-endian):
//!
//! ```text
//! bytes 0..4   count   u32
//! bytes 4..8   limit   bits  0..10   0 = capacity equals count, else log2(capacity)
//!              esize   bits 10..20   bytes per element
//!              mode    bits 20..32   0 heap, 1 closed/read-only, 2 embedded, else live writer
//! ```

use crate::error::{MmvecError, Result};
use std::path::Path;

/// Size of the header in bytes
pub const HEADER_SIZE: usize = 8;

/// Mode value of a heap-owned vector
pub const MODE_HEAP: u16 = 0;
/// Mode value of a closed file and of every persisted image
pub const MODE_CLOSED: u16 = 1;
/// Mode value of a view living inside a larger container
pub const MODE_EMBEDDED: u16 = 2;

/// Largest element size the 10-bit field can hold
pub const MAX_ESIZE: usize = (1 << 10) - 1;

const FIELD_MASK: u32 = (1 << 10) - 1;
const MODE_MASK: u32 = (1 << 12) - 1;

/// Largest `limit` a 32-bit count can ever require
const MAX_LIMIT: u16 = 32;

/// Decoded vector header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VecHeader {
    /// Number of live elements
    pub count: u32,
    /// 0, or log2 of the allocated capacity
    pub limit: u16,
    /// Bytes per element
    pub esize: u16,
    /// Backing mode tag
    pub mode: u16,
}

impl VecHeader {
    /// Header of a fresh vector with exact capacity
    pub fn new(count: u32, esize: u16, mode: u16) -> Self {
        Self { count, limit: 0, esize, mode }
    }

    /// Number of element slots the payload holds
    #[inline]
    pub fn capacity(&self) -> u64 {
        if self.limit == 0 {
            self.count as u64
        } else {
            1u64 << self.limit
        }
    }

    /// Total bytes of header plus payload
    #[inline]
    pub fn byte_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.capacity() * self.esize as u64
    }

    /// Serialize into the on-disk representation
    pub fn pack(&self) -> [u8; HEADER_SIZE] {
        let word = (self.limit as u32 & FIELD_MASK)
            | ((self.esize as u32 & FIELD_MASK) << 10)
            | ((self.mode as u32 & MODE_MASK) << 20);
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(&self.count.to_le_bytes());
        out[4..].copy_from_slice(&word.to_le_bytes());
        out
    }

    /// Deserialize from the first eight bytes of `bytes`
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`HEADER_SIZE`].
    pub fn unpack(bytes: &[u8]) -> Self {
        let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let word = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self {
            count,
            limit: (word & FIELD_MASK) as u16,
            esize: ((word >> 10) & FIELD_MASK) as u16,
            mode: ((word >> 20) & MODE_MASK) as u16,
        }
    }

    /// Write the packed header into the first eight bytes of `bytes`
    #[inline]
    pub fn store(&self, bytes: &mut [u8]) {
        bytes[..HEADER_SIZE].copy_from_slice(&self.pack());
    }

    /// Decode a header read from `path`, checking the fields that would
    /// make size arithmetic meaningless
    pub fn read_checked(bytes: &[u8], path: &Path) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MmvecError::corrupted(
                path,
                "file shorter than header",
                HEADER_SIZE as u64,
                bytes.len() as u64,
            ));
        }
        let header = Self::unpack(bytes);
        if header.limit > MAX_LIMIT {
            return Err(MmvecError::corrupted(
                path,
                "capacity exponent",
                MAX_LIMIT as u64,
                header.limit as u64,
            ));
        }
        if header.limit != 0 && (header.count as u64) > header.capacity() {
            return Err(MmvecError::corrupted(
                path,
                "count within capacity",
                header.capacity(),
                header.count as u64,
            ));
        }
        Ok(header)
    }
}

/// `limit` for a vector that must hold `n > 0` elements: `ilog2(n-1) + 1`,
/// which is the exponent of the smallest power of two >= `n` (at least 1)
#[inline]
pub fn limit_for(n: u32) -> u16 {
    debug_assert!(n > 0);
    let bits = u32::BITS - (n - 1).leading_zeros();
    bits.max(1) as u16
}
