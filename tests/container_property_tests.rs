//! Property-based tests for vectors, the intern table and the ordering index

use mmvec::{InternTable, OrderingList, Vector};
use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};

// =============================================================================
// PROPERTY TEST GENERATORS
// =============================================================================

#[derive(Debug, Clone)]
enum VecOp {
    Append(u32),
    AppendMany(Vec<u32>),
    Resize(usize),
    Set(usize, u32),
}

fn vec_ops_strategy() -> impl Strategy<Value = Vec<VecOp>> {
    prop::collection::vec(
        prop_oneof![
            any::<u32>().prop_map(VecOp::Append),
            prop::collection::vec(any::<u32>(), 0..20).prop_map(VecOp::AppendMany),
            (0usize..300).prop_map(VecOp::Resize),
            (0usize..300, any::<u32>()).prop_map(|(i, v)| VecOp::Set(i, v)),
        ],
        0..100,
    )
}

#[derive(Debug, Clone)]
enum ListOp {
    InsertBefore(u32, u32),
    Remove(u32),
    MoveToFront(u32),
    PopBack,
}

fn list_ops_strategy() -> impl Strategy<Value = Vec<ListOp>> {
    prop::collection::vec(
        prop_oneof![
            (1u32..40, 0u32..40).prop_map(|(id, anchor)| ListOp::InsertBefore(id, anchor)),
            (0u32..50).prop_map(ListOp::Remove),
            (1u32..40).prop_map(ListOp::MoveToFront),
            Just(ListOp::PopBack),
        ],
        0..200,
    )
}

// =============================================================================
// VECTOR PROPERTY TESTS
// =============================================================================

proptest! {
    #[test]
    fn prop_vector_matches_model(ops in vec_ops_strategy()) {
        let mut v = Vector::<u32>::new(0).unwrap();
        // whole allocated payload, including slots past the count
        let mut buf: Vec<u32> = Vec::new();
        let mut len = 0usize;

        fn model_resize(buf: &mut Vec<u32>, len: &mut usize, n: usize) {
            if n > buf.len() {
                buf.resize(n.next_power_of_two().max(2), 0);
            }
            *len = n;
        }

        for op in ops {
            match op {
                VecOp::Append(x) => {
                    v = v.append(x).unwrap();
                    let n = len + 1;
                    model_resize(&mut buf, &mut len, n);
                    buf[len - 1] = x;
                }
                VecOp::AppendMany(xs) => {
                    v = v.append_many(&xs).unwrap();
                    let start = len;
                    model_resize(&mut buf, &mut len, start + xs.len());
                    buf[start..len].copy_from_slice(&xs);
                }
                VecOp::Resize(n) => {
                    v = v.resize(n).unwrap();
                    model_resize(&mut buf, &mut len, n);
                }
                VecOp::Set(i, x) => {
                    v = v.set(i, x).unwrap();
                    if i >= len {
                        model_resize(&mut buf, &mut len, i + 1);
                    }
                    buf[i] = x;
                }
            }

            prop_assert_eq!(v.as_slice(), &buf[..len]);
            prop_assert!(v.capacity() >= v.len());
            let cap = v.capacity();
            prop_assert!(cap == v.len() || cap.is_power_of_two());
            if !buf.is_empty() {
                prop_assert_eq!(cap, buf.len());
            }
        }
    }

    #[test]
    fn prop_shrink_then_regrow_keeps_address(n in 1usize..5000, shrink in 0usize..5000) {
        let v = Vector::<u64>::new(0).unwrap().resize(n).unwrap();
        let cap = v.capacity();
        prop_assert!(cap.is_power_of_two());
        let ptr = v.as_ptr();
        let v = v.resize(shrink.min(cap)).unwrap();
        let v = v.resize(cap).unwrap();
        prop_assert_eq!(v.as_ptr(), ptr);
        prop_assert_eq!(v.capacity(), cap);
    }

    #[test]
    fn prop_persist_restore_round_trip(data in prop::collection::vec(any::<i64>(), 0..500)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("round.vec");
        let v = Vector::<i64>::new(0).unwrap().append_many(&data).unwrap();
        v.persist(&path).unwrap();

        let restored = Vector::<i64>::restore(&path).unwrap();
        prop_assert_eq!(restored.len(), v.len());
        prop_assert_eq!(restored.esize(), v.esize());
        prop_assert_eq!(restored.as_slice(), v.as_slice());

        let mapped = Vector::<i64>::open(&path, mmvec::Access::ReadOnly).unwrap();
        prop_assert_eq!(mapped.as_slice(), data.as_slice());
    }

    #[test]
    fn prop_lower_bound_is_partition_point(mut data in prop::collection::vec(0u32..1000, 0..200), id in 0u32..1100) {
        data.sort_unstable();
        let v = Vector::<u32>::new(0).unwrap().append_many(&data).unwrap();
        let expected = data.iter().position(|&x| x >= id).unwrap_or(data.len());
        prop_assert_eq!(v.lower_bound(id), expected);
    }
}

// =============================================================================
// INTERN TABLE PROPERTY TESTS
// =============================================================================

proptest! {
    #[test]
    fn prop_interning_is_idempotent_and_dense(
        keys in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..12), 0..300)
    ) {
        let mut table = InternTable::new(10).unwrap();
        let mut model: HashMap<Vec<u8>, u32> = HashMap::new();

        for key in &keys {
            let id = table.intern(key).unwrap();
            let next = model.len() as u32 + 1;
            let expected = *model.entry(key.clone()).or_insert(next);
            prop_assert_eq!(id, expected);
            prop_assert_eq!(table.resolve(id), Some(key.as_slice()));
        }
        prop_assert_eq!(table.len(), model.len());
        for (key, id) in &model {
            prop_assert_eq!(table.lookup(key), Some(*id));
        }
    }
}

// =============================================================================
// ORDERING LIST PROPERTY TESTS
// =============================================================================

proptest! {
    #[test]
    fn prop_ordering_list_matches_deque(n in 0u32..20, ops in list_ops_strategy()) {
        let mut list = OrderingList::new(n).unwrap();
        let mut model: VecDeque<u32> = (1..=n).collect();

        for op in ops {
            match op {
                ListOp::InsertBefore(id, anchor) => {
                    let anchor_ok = anchor == 0 || model.contains(&anchor);
                    let in_range = (anchor as usize) < list.as_links().len();
                    let result = list.insert_before(id, anchor);
                    if id == anchor || !in_range || !anchor_ok {
                        prop_assert!(result.is_err());
                        continue;
                    }
                    prop_assert!(result.is_ok());
                    model.retain(|&x| x != id);
                    match model.iter().position(|&x| x == anchor) {
                        Some(pos) => model.insert(pos, id),
                        None => model.push_back(id),
                    }
                }
                ListOp::Remove(id) => {
                    list.remove(id);
                    model.retain(|&x| x != id);
                }
                ListOp::MoveToFront(id) => {
                    list.move_to_front(id).unwrap();
                    model.retain(|&x| x != id);
                    model.push_front(id);
                }
                ListOp::PopBack => {
                    prop_assert_eq!(list.pop_back(), model.pop_back());
                }
            }

            let order: Vec<u32> = list.iter().collect();
            prop_assert_eq!(&order, &model.iter().copied().collect::<Vec<_>>());

            // prev mirrors next around the whole cycle
            let links = list.as_links();
            let mut id = 0u32;
            loop {
                let next = links[id as usize].next;
                prop_assert_eq!(links[next as usize].prev, id);
                id = next;
                if id == 0 {
                    break;
                }
            }
        }
    }
}
