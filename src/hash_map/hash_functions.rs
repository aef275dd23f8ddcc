//! Key hash functions for the intern table
//!
//! A persisted table is only meaningful with the hasher it was built with:
//! slot positions are derived from the hash, and every [`KeySpan`] stores it.
//!
//! [`KeySpan`]: super::KeySpan

use ahash::RandomState;

/// Hash function mapping a byte-string key to 32 bits
pub trait KeyHasher {
    /// Hash `key`
    fn hash(&self, key: &[u8]) -> u32;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Multiply-add hash `h = h * 129 + byte`, starting at 0
///
/// Cheap and good enough for identifier-like keys; the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiAdd;

impl KeyHasher for MultiAdd {
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        multiadd_hash(key)
    }

    fn name(&self) -> &'static str {
        "multiadd"
    }
}

/// `h = (h << 7) + h + byte` over `bytes`, wrapping
#[inline]
pub fn multiadd_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |h, &b| (h << 7).wrapping_add(h).wrapping_add(b as u32))
}

/// MurmurHash3 (x86, 32-bit)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Murmur3 {
    /// Initial hash state
    pub seed: u32,
}

impl Murmur3 {
    /// Hasher with the given seed
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }
}

impl KeyHasher for Murmur3 {
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        murmur3_32(key, self.seed)
    }

    fn name(&self) -> &'static str {
        "murmur3"
    }
}

/// MurmurHash3 x86_32 of `bytes`
pub fn murmur3_32(bytes: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = bytes.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &b) in tail.iter().enumerate() {
            k ^= (b as u32) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    h ^= bytes.len() as u32;
    fmix32(h)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}

/// aHash with fixed seeds, so hashes are stable across runs of the same build
#[derive(Clone)]
pub struct AHashKeys {
    state: RandomState,
}

impl AHashKeys {
    /// Hasher seeded with four fixed keys
    pub fn with_seeds(k0: u64, k1: u64, k2: u64, k3: u64) -> Self {
        Self {
            state: RandomState::with_seeds(k0, k1, k2, k3),
        }
    }
}

impl Default for AHashKeys {
    fn default() -> Self {
        Self::with_seeds(
            0x243f_6a88_85a3_08d3,
            0x1319_8a2e_0370_7344,
            0xa409_3822_299f_31d0,
            0x082e_fa98_ec4e_6c89,
        )
    }
}

impl std::fmt::Debug for AHashKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AHashKeys")
    }
}

impl KeyHasher for AHashKeys {
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        let h = self.state.hash_one(key);
        (h ^ (h >> 32)) as u32
    }

    fn name(&self) -> &'static str {
        "ahash"
    }
}
