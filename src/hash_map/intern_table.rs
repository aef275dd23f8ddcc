//! Append-only key interning table
//!
//! Maps byte-string keys to dense 1-based `u32` ids in first-seen order and
//! back. Storage is three vectors:
//!
//! - `slots`: `2^bits` entries, each 0 (empty) or an id; never grows
//! - `spans`: one [`KeySpan`] per id, indexed by `id - 1`
//! - `bytes`: arena holding a copy of every key
//!
//! Collisions are resolved by linear probing with wrap-around. Keys are
//! never removed and the table is never rehashed: once every slot is taken,
//! interning a new key fails with [`MmvecError::TableFull`].
//!
//! # Examples
//!
//! ```rust
//! use mmvec::hash_map::InternTable;
//!
//! # fn main() -> mmvec::Result<()> {
//! let mut table = InternTable::new(4)?;
//! let a = table.intern(b"alpha")?;
//! let b = table.intern(b"beta")?;
//! assert_eq!((a, b), (1, 2));
//! assert_eq!(table.intern(b"alpha")?, 1);
//! assert_eq!(table.resolve(2), Some(&b"beta"[..]));
//! # Ok(())
//! # }
//! ```

use super::hash_functions::{KeyHasher, MultiAdd};
use crate::config::{Config, InternConfig};
use crate::error::{MmvecError, Result};
use crate::vector::{Access, Element, Vector};
use std::fmt;
use std::fs;
use std::path::Path;

/// File holding the slot array inside a table directory
pub const SLOTS_FILE: &str = "slots.vec";
/// File holding the key spans inside a table directory
pub const SPANS_FILE: &str = "spans.vec";
/// File holding the key arena inside a table directory
pub const KEYS_FILE: &str = "keys.vec";

/// Location of one key inside the arena
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySpan {
    /// Byte offset into the arena
    pub offset: u32,
    /// Key length in bytes
    pub len: u32,
    /// Hash the key was inserted under
    pub hash: u32,
}

unsafe impl Element for KeySpan {}

impl KeySpan {
    fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}

/// Statistics for an intern table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternStats {
    /// Number of interned keys
    pub keys: usize,
    /// Number of slots
    pub slots: usize,
    /// `keys / slots`
    pub load_factor: f64,
    /// Total bytes held by the key arena
    pub key_bytes: usize,
    /// Longest probe sequence that ended in a new key on this handle
    pub max_probe: usize,
    /// Keys inserted away from their home slot
    pub collisions: u64,
}

enum Probe {
    Occupied(u32),
    Vacant(usize),
    Full,
}

/// Open-addressing map from byte-string keys to dense ids
pub struct InternTable<H: KeyHasher = MultiAdd> {
    mask: usize,
    slots: Vector<u32>,
    spans: Vector<KeySpan>,
    bytes: Vector<u8>,
    hasher: H,
    probe_warn_threshold: usize,
    max_probe: usize,
    collisions: u64,
}

impl InternTable<MultiAdd> {
    /// Empty table with `2^bits` slots and the default hasher
    pub fn new(bits: u32) -> Result<Self> {
        Self::with_hasher(bits, MultiAdd)
    }

    /// Empty table from a configuration, with the default hasher
    pub fn with_config(config: &InternConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, MultiAdd)
    }

    /// Restore a saved table into heap memory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::load_with_hasher(dir, MultiAdd)
    }

    /// Back a table by the vector files in `dir`
    pub fn open<P: AsRef<Path>>(dir: P, access: Access, bits: u32) -> Result<Self> {
        Self::open_with_hasher(dir, access, bits, MultiAdd)
    }
}

impl<H: KeyHasher> InternTable<H> {
    /// Empty table with `2^bits` slots
    pub fn with_hasher(bits: u32, hasher: H) -> Result<Self> {
        Self::with_config_and_hasher(&InternConfig::with_bits(bits), hasher)
    }

    /// Empty table from a configuration
    pub fn with_config_and_hasher(config: &InternConfig, hasher: H) -> Result<Self> {
        config.validate()?;
        let slots = Vector::new(config.slot_count())?;
        let spans = Vector::new(0)?;
        let bytes = Vector::new(0)?;
        Ok(Self::from_parts(slots, spans, bytes, hasher, config.probe_warn_threshold))
    }

    fn from_parts(
        slots: Vector<u32>,
        spans: Vector<KeySpan>,
        bytes: Vector<u8>,
        hasher: H,
        probe_warn_threshold: usize,
    ) -> Self {
        Self {
            mask: slots.len() - 1,
            slots,
            spans,
            bytes,
            hasher,
            probe_warn_threshold,
            max_probe: 0,
            collisions: 0,
        }
    }

    /// Restore a table saved with [`InternTable::save`] into heap memory
    pub fn load_with_hasher<P: AsRef<Path>>(dir: P, hasher: H) -> Result<Self> {
        let dir = dir.as_ref();
        let slots = Vector::restore(dir.join(SLOTS_FILE))?;
        let spans = Vector::restore(dir.join(SPANS_FILE))?;
        let bytes = Vector::restore(dir.join(KEYS_FILE))?;
        validate_parts(dir, &slots, &spans, &bytes)?;
        log::debug!("loaded intern table from {} ({} keys)", dir.display(), spans.len());
        Ok(Self::from_parts(slots, spans, bytes, hasher, InternConfig::default().probe_warn_threshold))
    }

    /// Back a table by the vector files in `dir`
    ///
    /// With [`Access::Write`] the directory is created if needed and a new
    /// table gets `2^bits` slots; an existing table keeps its stored slot
    /// count. A read-only table resolves and finds keys but refuses new ones.
    pub fn open_with_hasher<P: AsRef<Path>>(dir: P, access: Access, bits: u32, hasher: H) -> Result<Self> {
        let dir = dir.as_ref();
        let config = InternConfig::with_bits(bits);
        config.validate()?;
        if access == Access::Write {
            fs::create_dir_all(dir)?;
        }

        let mut slots = Vector::<u32>::open(dir.join(SLOTS_FILE), access)?;
        let spans = Vector::<KeySpan>::open(dir.join(SPANS_FILE), access)?;
        let bytes = Vector::<u8>::open(dir.join(KEYS_FILE), access)?;
        if slots.is_empty() && slots.is_writable() {
            slots.resize_in_place(config.slot_count())?;
            log::debug!("created intern table in {} with {} slots", dir.display(), config.slot_count());
        }
        validate_parts(dir, &slots, &spans, &bytes)?;
        log::debug!("opened intern table {} for {} ({} keys)", dir.display(), access, spans.len());
        Ok(Self::from_parts(slots, spans, bytes, hasher, config.probe_warn_threshold))
    }

    /// Override the probe length that triggers a warning
    pub fn set_probe_warn_threshold(&mut self, threshold: usize) {
        self.probe_warn_threshold = threshold;
    }

    fn span_bytes(&self, span: &KeySpan) -> &[u8] {
        &self.bytes.as_slice()[span.range()]
    }

    fn probe(&self, key: &[u8], hash: u32) -> (Probe, usize) {
        let slots = self.slots.as_slice();
        let spans = self.spans.as_slice();
        let mut pos = hash as usize & self.mask;
        for probes in 1..=slots.len() {
            let id = slots[pos];
            if id == 0 {
                return (Probe::Vacant(pos), probes);
            }
            let span = &spans[id as usize - 1];
            if span.hash == hash && self.span_bytes(span) == key {
                return (Probe::Occupied(id), probes);
            }
            pos = (pos + 1) & self.mask;
        }
        (Probe::Full, slots.len())
    }

    /// Id of `key`, interning it first if it is new
    ///
    /// Ids start at 1 and follow first-seen order.
    pub fn intern(&mut self, key: &[u8]) -> Result<u32> {
        let hash = self.hasher.hash(key);
        let (probe, probes) = self.probe(key, hash);
        let pos = match probe {
            Probe::Occupied(id) => return Ok(id),
            Probe::Full => return Err(MmvecError::table_full(self.slot_count())),
            Probe::Vacant(pos) => pos,
        };
        if !self.is_writable() {
            return Err(MmvecError::read_only("intern a new key"));
        }
        self.max_probe = self.max_probe.max(probes);
        if probes > self.probe_warn_threshold {
            log::warn!(
                "{} intern probe took {} slots ({} of {} slots used)",
                self.hasher.name(),
                probes,
                self.len(),
                self.slot_count()
            );
        }

        let offset = self.bytes.len();
        let end = offset + key.len();
        if u32::try_from(end).is_err() {
            return Err(MmvecError::capacity_overflow(end as u64));
        }
        let id = self.spans.len() as u32 + 1;
        self.bytes.extend_in_place(key)?;
        self.spans.push_in_place(KeySpan {
            offset: offset as u32,
            len: key.len() as u32,
            hash,
        })?;
        self.slots.as_mut_slice()[pos] = id;
        if probes > 1 {
            self.collisions += 1;
        }
        Ok(id)
    }

    /// Key interned as `id`, or `None` outside `1..=len()`
    pub fn resolve(&self, id: u32) -> Option<&[u8]> {
        let index = (id as usize).checked_sub(1)?;
        let span = self.spans.get(index)?;
        self.bytes.as_slice().get(span.range())
    }

    /// Id of `key` without interning it
    pub fn lookup(&self, key: &[u8]) -> Option<u32> {
        match self.probe(key, self.hasher.hash(key)).0 {
            Probe::Occupied(id) => Some(id),
            Probe::Vacant(_) | Probe::Full => None,
        }
    }

    /// Check if `key` has been interned
    pub fn contains(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }

    /// Number of interned keys
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if no key has been interned
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Number of slots, which bounds the number of keys
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// log2 of the slot count
    pub fn bits(&self) -> u32 {
        self.slots.len().trailing_zeros()
    }

    /// Whether new keys can be interned
    pub fn is_writable(&self) -> bool {
        self.slots.is_writable() && self.spans.is_writable() && self.bytes.is_writable()
    }

    /// Hasher the table probes with
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Iterate over `(id, key)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.spans
            .iter()
            .enumerate()
            .map(move |(i, span)| (i as u32 + 1, self.span_bytes(span)))
    }

    /// Current statistics
    pub fn stats(&self) -> InternStats {
        InternStats {
            keys: self.len(),
            slots: self.slot_count(),
            load_factor: self.len() as f64 / self.slot_count() as f64,
            key_bytes: self.bytes.len(),
            max_probe: self.max_probe,
            collisions: self.collisions,
        }
    }

    /// Persist the three vectors into `dir`, creating it if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.slots.persist(dir.join(SLOTS_FILE))?;
        self.spans.persist(dir.join(SPANS_FILE))?;
        self.bytes.persist(dir.join(KEYS_FILE))?;
        log::debug!("saved intern table to {} ({} keys)", dir.display(), self.len());
        Ok(())
    }

    /// Flush file-backed vectors to disk
    pub fn flush(&self) -> Result<()> {
        self.slots.flush()?;
        self.spans.flush()?;
        self.bytes.flush()
    }

    /// Release all storage, reporting the first error
    pub fn release(self) -> Result<()> {
        let Self { slots, spans, bytes, .. } = self;
        let slots = slots.release();
        let spans = spans.release();
        let bytes = bytes.release();
        slots.and(spans).and(bytes)
    }
}

impl<H: KeyHasher> fmt::Debug for InternTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternTable")
            .field("hasher", &self.hasher.name())
            .field("keys", &self.len())
            .field("slots", &self.slot_count())
            .field("writable", &self.is_writable())
            .finish()
    }
}

fn corrupted_table(path: &Path, what: &'static str, expected: u64, actual: u64) -> MmvecError {
    log::error!(
        "corrupted intern table {}: {} expected {}, found {}",
        path.display(),
        what,
        expected,
        actual
    );
    MmvecError::corrupted(path, what, expected, actual)
}

/// Check that the three vectors describe one consistent table
fn validate_parts(dir: &Path, slots: &Vector<u32>, spans: &Vector<KeySpan>, bytes: &Vector<u8>) -> Result<()> {
    let slot_count = slots.len();
    if !slot_count.is_power_of_two() || slot_count < 2 || slot_count > 1 << 31 {
        return Err(corrupted_table(
            &dir.join(SLOTS_FILE),
            "power-of-two slot count",
            slot_count.next_power_of_two() as u64,
            slot_count as u64,
        ));
    }

    let keys = spans.len();
    let mut occupied = 0usize;
    for &id in slots.iter() {
        if id == 0 {
            continue;
        }
        if id as usize > keys {
            return Err(corrupted_table(&dir.join(SLOTS_FILE), "slot id within key count", keys as u64, id as u64));
        }
        occupied += 1;
    }
    if occupied != keys {
        return Err(corrupted_table(&dir.join(SLOTS_FILE), "occupied slots", keys as u64, occupied as u64));
    }

    let arena = bytes.len() as u64;
    for span in spans.iter() {
        let end = span.offset as u64 + span.len as u64;
        if end > arena {
            return Err(corrupted_table(&dir.join(SPANS_FILE), "span within key arena", arena, end));
        }
    }
    Ok(())
}
