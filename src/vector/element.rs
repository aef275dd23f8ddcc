//! Element types a [`Vector`](super::Vector) can hold.

use std::cmp::Ordering;

/// Plain-old-data type that can live inside a vector image.
///
/// Vector payloads are reinterpreted straight from heap bytes, file
/// mappings and foreign regions, so an element must accept any bit pattern.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - every bit pattern of `size_of::<Self>()` bytes is a valid value
/// - the type has no padding bytes
/// - `size_of::<Self>()` is in `1..=1023` and `align_of::<Self>() <= 8`
pub unsafe trait Element: Copy + Send + Sync + 'static {}

macro_rules! impl_element {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Element for $t {})*
    };
}

impl_element!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Record whose first field is a `u32` id that sorted vectors are keyed on
pub trait Keyed {
    /// Leading id of the record
    fn key(&self) -> u32;
}

impl Keyed for u32 {
    #[inline]
    fn key(&self) -> u32 {
        *self
    }
}

/// Id paired with a score, as stored in ranked posting vectors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IdValue {
    /// Document or term id
    pub id: u32,
    /// Score attached to the id
    pub value: f32,
}

unsafe impl Element for IdValue {}

impl Keyed for IdValue {
    #[inline]
    fn key(&self) -> u32 {
        self.id
    }
}

impl IdValue {
    /// Create a record
    pub fn new(id: u32, value: f32) -> Self {
        Self { id, value }
    }

    /// Ascending by id
    pub fn cmp_by_id(a: &Self, b: &Self) -> Ordering {
        a.id.cmp(&b.id)
    }

    /// Descending by value, ties broken by ascending id
    pub fn cmp_by_value_desc(a: &Self, b: &Self) -> Ordering {
        b.value.total_cmp(&a.value).then(a.id.cmp(&b.id))
    }
}

/// Id paired with a timestamp in seconds
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdTime {
    /// Document or term id
    pub id: u32,
    /// Timestamp attached to the id
    pub time: u32,
}

unsafe impl Element for IdTime {}

impl Keyed for IdTime {
    #[inline]
    fn key(&self) -> u32 {
        self.id
    }
}

impl IdTime {
    /// Create a record
    pub fn new(id: u32, time: u32) -> Self {
        Self { id, time }
    }

    /// Ascending by id
    pub fn cmp_by_id(a: &Self, b: &Self) -> Ordering {
        a.id.cmp(&b.id)
    }

    /// Newest first, ties broken by ascending id
    pub fn cmp_by_time_desc(a: &Self, b: &Self) -> Ordering {
        b.time.cmp(&a.time).then(a.id.cmp(&b.id))
    }
}
