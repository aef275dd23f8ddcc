//! Sorting and bounded binary search.

use super::{Element, Keyed, Vector};
use std::cmp::Ordering;

impl<T: Element> Vector<T> {
    /// Stable in-place sort of the first `len()` elements
    ///
    /// # Panics
    ///
    /// Panics for read-only and embedded vectors.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.as_mut_slice().sort_by(compare);
    }

    /// Unstable in-place sort of the first `len()` elements
    ///
    /// # Panics
    ///
    /// Panics for read-only and embedded vectors.
    pub fn sort_unstable_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.as_mut_slice().sort_unstable_by(compare);
    }
}

impl<T: Element + Keyed> Vector<T> {
    /// Index of the first element whose key is >= `id`, or `len()`
    ///
    /// The vector must be sorted by key. This is an insertion point, not a
    /// membership test; see [`Vector::find`].
    pub fn lower_bound(&self, id: u32) -> usize {
        self.as_slice().partition_point(|e| e.key() < id)
    }

    /// Element whose key equals `id` in a key-sorted vector
    pub fn find(&self, id: u32) -> Option<&T> {
        let slice = self.as_slice();
        slice.get(self.lower_bound(id)).filter(|e| e.key() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{IdTime, IdValue};
    use super::*;

    #[test]
    fn test_lower_bound_on_ids() {
        let v = Vector::<u32>::new(0).unwrap().append_many(&[2, 4, 4, 9]).unwrap();
        assert_eq!(v.lower_bound(0), 0);
        assert_eq!(v.lower_bound(2), 0);
        assert_eq!(v.lower_bound(3), 1);
        assert_eq!(v.lower_bound(4), 1);
        assert_eq!(v.lower_bound(5), 3);
        assert_eq!(v.lower_bound(10), 4);
        assert_eq!(v.find(9), Some(&9));
        assert_eq!(v.find(5), None);
        assert_eq!(v.find(100), None);
    }

    #[test]
    fn test_lower_bound_empty() {
        let v = Vector::<IdValue>::new(0).unwrap();
        assert_eq!(v.lower_bound(1), 0);
        assert!(v.find(1).is_none());
    }

    #[test]
    fn test_sort_records_then_search() {
        let records = [
            IdValue::new(30, 0.1),
            IdValue::new(10, 0.9),
            IdValue::new(20, 0.5),
        ];
        let mut v = Vector::<IdValue>::new(0).unwrap().append_many(&records).unwrap();
        v.sort_by(IdValue::cmp_by_id);
        assert_eq!(v.lower_bound(15), 1);
        assert_eq!(v.find(20).map(|r| r.value), Some(0.5));

        v.sort_unstable_by(IdValue::cmp_by_value_desc);
        let ids: Vec<u32> = v.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_sort_only_touches_live_elements() {
        let v = Vector::<IdTime>::new(0)
            .unwrap()
            .append_many(&[IdTime::new(3, 1), IdTime::new(1, 2), IdTime::new(2, 3)])
            .unwrap();
        let mut v = v.resize(2).unwrap();
        v.sort_by(IdTime::cmp_by_id);
        assert_eq!(v.as_slice(), &[IdTime::new(1, 2), IdTime::new(3, 1)]);
        let v = v.resize(3).unwrap();
        assert_eq!(v[2], IdTime::new(2, 3));
    }
}
