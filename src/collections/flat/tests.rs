#![cfg(test)]

use proptest::prelude::*;

use super::*;
use crate::collections::header::{CountWidth, SlotKind};
use crate::util::alloc::{self, AllocStats};
use crate::util::panic::assert_panics;

fn leaf_values(vec: &FlatVector) -> Vec<Option<Vec<u8>>> {
    vec.iter().map(|slot| slot.as_leaf().map(<[u8]>::to_vec)).collect()
}

fn u32_at(vec: &FlatVector, index: isize) -> Option<u32> {
    let bytes = vec.get(index).ok()?.as_leaf()?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[test]
fn test_push_get_remove() {
    let mut vec = FlatVector::new(1, 1).expect("small allocation should succeed");
    for value in [5, 6, 7] {
        vec.push(&[value]).expect("small allocation should succeed");
    }

    assert_eq!(vec.len(), 3);
    assert_eq!(vec.get(-1).unwrap().as_leaf(), Some(&[7][..]));
    assert_eq!(vec.get(0).unwrap().as_leaf(), Some(&[5][..]));

    let removed = vec.remove(0).unwrap();
    assert_eq!(removed.into_leaf().as_deref(), Some(&[5][..]));
    assert_eq!(vec.len(), 2);
    assert_eq!(vec.get(0).unwrap().as_leaf(), Some(&[6][..]));
    assert_eq!(
        vec.get(1).unwrap().as_leaf(),
        Some(&[7][..]),
        "Removal below the threshold should shift the following elements left."
    );
}

#[test]
fn test_growth_is_geometric() {
    let mut vec = FlatVector::new(2, 1).expect("small allocation should succeed");
    assert!(vec.has_slack());

    let mut caps = Vec::new();
    for i in 0..9_u16 {
        vec.push(&i.to_le_bytes()).expect("small allocation should succeed");
        caps.push(vec.cap());
    }

    assert_eq!(caps, [1, 2, 4, 4, 8, 8, 8, 8, 16], "Capacity should double when exhausted.");
    assert!(vec.has_slack(), "9 of 16 slots used should leave slack.");
}

#[test]
fn test_header_promotion() {
    let mut vec = FlatVector::new(4, 1).expect("small allocation should succeed");
    assert_eq!(vec.width(), CountWidth::U8);

    let mut transitions = Vec::new();
    let mut width = vec.width();
    for i in 0..70_000_u32 {
        vec.push(&i.to_le_bytes()).expect("allocation should succeed");
        if vec.width() != width {
            width = vec.width();
            transitions.push((vec.len(), width));
        }
    }

    assert_eq!(
        transitions,
        [(255, CountWidth::U16), (65_535, CountWidth::U32)],
        "Each promotion should happen exactly once, when the count runs out of headroom."
    );
    for i in [0, 1, 254, 255, 256, 65_534, 65_535, 69_999] {
        assert_eq!(u32_at(&vec, i as isize), Some(i), "Promotion should keep every element.");
    }
    assert_eq!(vec.len(), 70_000);
}

#[test]
fn test_negative_indices() {
    let mut vec = FlatVector::new(1, 4).expect("small allocation should succeed");
    for value in [1, 2, 3] {
        vec.push(&[value]).expect("no growth needed");
    }

    assert_eq!(vec.get(-3).unwrap().as_leaf(), Some(&[1][..]));
    assert_eq!(vec.last().and_then(Slot::as_leaf), Some(&[3][..]));
    assert_eq!(vec.get(-4).unwrap_err(), OutOfBound { index: -4, len: 3 });
    assert_eq!(vec.get(3).unwrap_err(), OutOfBound { index: 3, len: 3 });

    let empty = FlatVector::new(1, 1).expect("small allocation should succeed");
    assert!(empty.get(0).is_err());
    assert!(empty.get(-1).is_err());
    assert!(empty.last().is_none());
}

#[test]
fn test_set_and_set_growing() {
    let mut vec = FlatVector::new(1, 2).expect("small allocation should succeed");
    vec.push(&[1]).unwrap();
    vec.push(&[2]).unwrap();

    vec.set(1, &[9]).unwrap();
    assert_eq!(vec.get(1).unwrap().as_leaf(), Some(&[9][..]));
    assert_eq!(
        vec.set(5, &[1]).unwrap_err(),
        OutOfBound { index: 5, len: 2 },
        "Strict set shouldn't grow the vector."
    );

    vec.set_growing(5, &[4]).unwrap();
    assert_eq!(
        leaf_values(&vec),
        [Some(vec![1]), Some(vec![9]), Some(vec![0]), Some(vec![0]), Some(vec![0]), Some(vec![4])],
        "Slots skipped by set_growing should read as zero."
    );

    vec.set_growing(0, &[7]).unwrap();
    assert_eq!(vec.len(), 6, "Overwriting shouldn't change the length.");

    if let SlotMut::Leaf(bytes) = vec.get_mut(-1).unwrap() {
        bytes[0] = 5;
    }
    assert_eq!(vec.get(5).unwrap().as_leaf(), Some(&[5][..]));
}

#[test]
fn test_insert_pop() {
    let mut vec = FlatVector::new(1, 1).expect("small allocation should succeed");
    for value in [1, 2, 4] {
        vec.push(&[value]).unwrap();
    }

    vec.insert(2, &[3]).unwrap();
    vec.insert(0, &[0]).unwrap();
    vec.insert(5, &[5]).unwrap();
    assert_eq!(
        vec.iter().filter_map(Slot::as_leaf).map(|b| b[0]).collect::<Vec<_>>(),
        [0, 1, 2, 3, 4, 5]
    );

    let err = vec.insert(7, &[0]).unwrap_err();
    assert!(err.is_out_of_bound());
    assert_eq!(vec.len(), 6);

    assert_eq!(vec.pop().and_then(Removed::into_leaf).as_deref(), Some(&[5][..]));
    assert_eq!(vec.len(), 5);

    while vec.pop().is_some() {}
    assert!(vec.is_empty());
    assert!(vec.pop().is_none());
}

#[test]
fn test_remove_middle_and_bounds() {
    let mut vec = FlatVector::new(1, 1).expect("small allocation should succeed");
    for value in 0..10 {
        vec.push(&[value]).unwrap();
    }

    vec.remove(3).unwrap();
    vec.remove(8).unwrap();
    assert_eq!(
        vec.iter().filter_map(Slot::as_leaf).map(|b| b[0]).collect::<Vec<_>>(),
        [0, 1, 2, 4, 5, 6, 7, 8],
        "Removing the last slot shouldn't move anything."
    );
    assert_eq!(vec.tombstone_count(), 0, "Small vectors never defer removals.");
    assert_eq!(vec.remove(8).unwrap_err(), OutOfBound { index: 8, len: 8 });
}

#[test]
fn test_tombstone_compaction() {
    let len = COMPACTION_THRESHOLD + 10;
    let mut vec = FlatVector::new(4, len).expect("allocation should succeed");
    for i in 0..len as u32 {
        vec.push(&i.to_le_bytes()).unwrap();
    }

    let removed = vec.remove(10).unwrap();
    assert_eq!(removed.into_leaf().as_deref(), Some(&10_u32.to_le_bytes()[..]));
    assert_eq!(vec.len(), len, "Deferred removal shouldn't change the length.");
    assert!(vec.get(10).unwrap().is_vacant());
    assert_eq!(u32_at(&vec, 11), Some(11), "Deferred removal shouldn't move anything.");
    assert_eq!(vec.tombstone_count(), 1);

    assert!(vec.remove(10).unwrap().is_vacant(), "A slot can't be removed twice.");
    assert_eq!(vec.tombstone_count(), 1);

    for i in 20..(20 + TOMBSTONE_CAP - 2) {
        vec.remove(i).unwrap();
    }
    assert_eq!(vec.tombstone_count(), TOMBSTONE_CAP - 1);
    assert_eq!(vec.len(), len);

    vec.remove(len - 1).unwrap();
    assert_eq!(vec.tombstone_count(), 0, "A full buffer should be compacted immediately.");
    assert_eq!(vec.len(), len - TOMBSTONE_CAP);
    assert_eq!(u32_at(&vec, 10), Some(11));
    assert_eq!(u32_at(&vec, 18), Some(19));
    assert_eq!(u32_at(&vec, 19), Some(20 + TOMBSTONE_CAP as u32 - 2));
    assert_eq!(u32_at(&vec, -1), Some(len as u32 - 2));
    assert!(vec.iter().all(|slot| slot.is_leaf()), "Compaction should leave no holes.");
}

#[test]
fn test_insert_compacts_first() {
    let len = COMPACTION_THRESHOLD + 2;
    let mut vec = FlatVector::new(4, len + 1).expect("allocation should succeed");
    for i in 0..len as u32 {
        vec.push(&i.to_le_bytes()).unwrap();
    }

    vec.remove(0).unwrap();
    vec.remove(1).unwrap();
    assert_eq!(vec.tombstone_count(), 2);

    vec.insert(0, &u32::MAX.to_le_bytes()).unwrap();
    assert_eq!(vec.tombstone_count(), 0);
    assert_eq!(vec.len(), len - 1);
    assert_eq!(u32_at(&vec, 0), Some(u32::MAX));
    assert_eq!(u32_at(&vec, 1), Some(2));

    vec.compact();
    assert_eq!(vec.len(), len - 1, "Compacting with no tombstones should do nothing.");
}

#[test]
fn test_rejected_insert_keeps_tombstones() {
    let len = COMPACTION_THRESHOLD + 2;
    let mut vec = FlatVector::new(4, len + 1).expect("allocation should succeed");
    for i in 0..len as u32 {
        vec.push(&i.to_le_bytes()).unwrap();
    }
    vec.remove(0).unwrap();

    let err = vec.insert(len, &[0; 4]).unwrap_err();
    assert_eq!(
        err,
        VectorError::OutOfBound(OutOfBound { index: len as isize, len: len - 1 }),
        "The bound should be the length once pending removals are closed."
    );
    assert_eq!(vec.len(), len, "A rejected insert shouldn't compact.");
    assert_eq!(vec.tombstone_count(), 1);
    assert!(vec.get(0).unwrap().is_vacant());
    assert_eq!(u32_at(&vec, 1), Some(1));

    vec.insert(len - 1, &[0xFF; 4]).expect("the compacted end should be a valid position");
    assert_eq!(vec.len(), len);
    assert_eq!(vec.tombstone_count(), 0);
    assert_eq!(u32_at(&vec, 0), Some(1));
    assert_eq!(u32_at(&vec, -1), Some(u32::MAX));
}

#[test]
fn test_promotion_to_u64() {
    let mut vec = FlatVector::new(0, 1).expect("small allocation should succeed");
    let empty: &[u8] = &[];

    vec.set_growing(u32::MAX as usize - 2, empty).unwrap();
    assert_eq!(vec.len(), u32::MAX as usize - 1);
    assert_eq!(vec.width(), CountWidth::U32);

    vec.push(empty).unwrap();
    assert_eq!(vec.len(), u32::MAX as usize);
    assert_eq!(
        vec.width(),
        CountWidth::U64,
        "A count with no headroom left in 32 bits should move to 64 bits."
    );

    vec.push(empty).unwrap();
    assert_eq!(vec.len(), u32::MAX as usize + 1);
    assert!(vec.get(-1).unwrap().is_leaf());
    assert!(vec.get(u32::MAX as isize).is_ok());
}

#[test]
fn test_nested_tombstones() {
    let before = AllocStats::now();
    {
        let mut root = FlatVector::nested(1).expect("small allocation should succeed");
        root.set_growing(COMPACTION_THRESHOLD + 4, FlatVector::new(1, 1).unwrap()).unwrap();
        for i in 0..4 {
            root.set(i, FlatVector::new(1, 1).unwrap()).unwrap();
        }
        assert_eq!(AllocStats::since(before).live, 6);

        let taken = root.remove(1).unwrap();
        assert!(taken.is_nested(), "A deferred removal should hand back the child.");
        assert_eq!(root.tombstone_count(), 1);
        assert!(root.get(1).unwrap().is_vacant());
        drop(taken);
        assert_eq!(AllocStats::since(before).live, 5);

        root.remove(2).unwrap();
        assert_eq!(AllocStats::since(before).live, 4, "An unused removal should release the child.");
        assert!(root.remove(2).unwrap().is_vacant());

        root.compact();
        assert_eq!(root.len(), COMPACTION_THRESHOLD + 3);
        assert_eq!(AllocStats::since(before).live, 4, "Compaction shouldn't release anything.");
        assert!(root.get(0).unwrap().is_nested());
        assert!(root.get(1).unwrap().is_nested());
        assert!(root.get(2).unwrap().is_vacant());
        assert!(root.get(-1).unwrap().is_nested());

        root.remove(0).unwrap();
        assert_eq!(root.tombstone_count(), 1);
        assert_eq!(AllocStats::since(before).live, 3);
    }
    assert_eq!(
        AllocStats::since(before).live,
        0,
        "Dropping a root with pending removals should release every remaining child."
    );
}

#[test]
fn test_out_of_memory_keeps_state() {
    let mut vec = FlatVector::new(1, 1).expect("small allocation should succeed");
    vec.push(&[1]).unwrap();

    {
        let _guard = alloc::fail_after(0);
        assert_eq!(vec.push(&[2]).unwrap_err(), OutOfMemory { size: 2 + 2 });
        assert!(vec.set_growing(10, &[2]).is_err());
        assert!(vec.insert(0, &[2]).unwrap_err().is_out_of_memory());
        assert!(vec.reserve(100).is_err());
    }
    assert_eq!(vec.len(), 1);
    assert_eq!(vec.cap(), 1);
    assert_eq!(leaf_values(&vec), [Some(vec![1])]);

    // Fill to the last count a single byte can hold, so the next push needs a promotion.
    for value in 1..254 {
        vec.push(&[value as u8]).unwrap();
    }
    assert_eq!(vec.len(), 254);
    assert!(vec.has_slack());

    {
        let _guard = alloc::fail_after(0);
        assert!(vec.push(&[0]).is_err(), "A promotion needs a new block.");
    }
    assert_eq!(vec.width(), CountWidth::U8, "A failed promotion shouldn't change the header.");
    assert_eq!(vec.len(), 254);
    assert_eq!(vec.get(-1).unwrap().as_leaf(), Some(&[253][..]));

    vec.push(&[0]).expect("allocation should succeed once failures stop");
    assert_eq!(vec.width(), CountWidth::U16);
}

#[test]
fn test_reserve_and_shrink() {
    let mut vec = FlatVector::new(8, 1).expect("small allocation should succeed");
    vec.push(&[0; 8]).unwrap();
    vec.push(&[1; 8]).unwrap();

    vec.reserve(10).unwrap();
    assert_eq!(vec.cap(), 12);
    assert!(vec.has_slack());

    vec.shrink_to_fit().unwrap();
    assert_eq!(vec.cap(), 2);
    assert!(!vec.has_slack());
    assert_eq!(vec.get(1).unwrap().as_leaf(), Some(&[1; 8][..]));
}

#[test]
fn test_element_mismatch_panics() {
    assert_panics!({
        let mut vec = FlatVector::new(2, 1).unwrap();
        let _ = vec.push(&[1]);
    });
    assert_panics!({
        let mut vec = FlatVector::new(1, 1).unwrap();
        let _ = vec.push(FlatVector::new(1, 1).unwrap());
    });
    assert_panics!({
        let mut vec = FlatVector::nested(1).unwrap();
        let _ = vec.push(&[0; 8]);
    });
}

#[test]
fn test_nested_ownership() {
    let before = AllocStats::now();
    {
        let mut root = FlatVector::nested(1).expect("small allocation should succeed");
        assert_eq!(root.kind(), SlotKind::Nested);

        for i in 0..3 {
            let mut child = FlatVector::new(1, 1).expect("small allocation should succeed");
            child.push(&[i]).unwrap();
            root.push(child).unwrap();
        }
        assert_eq!(AllocStats::since(before).live, 4);

        let child = root.get(1).unwrap().as_nested().expect("slot should hold a vector");
        assert_eq!(child.get(0).unwrap().as_leaf(), Some(&[1][..]));

        let child = root.get_mut(2).unwrap().into_nested().expect("slot should hold a vector");
        child.push(&[9]).unwrap();
        assert_eq!(root.get(2).unwrap().as_nested().map(FlatVector::len), Some(2));

        let taken = root.remove(0).unwrap().into_nested().expect("slot should hold a vector");
        assert_eq!(taken.get(0).unwrap().as_leaf(), Some(&[0][..]));
        drop(taken);
        assert_eq!(AllocStats::since(before).live, 3);

        root.set(0, FlatVector::new(1, 1).unwrap()).unwrap();
        assert_eq!(
            AllocStats::since(before).live,
            3,
            "Overwriting a nested slot should release the previous child."
        );

        root.set_growing(4, FlatVector::nested(1).unwrap()).unwrap();
        assert!(root.get(3).unwrap().is_vacant(), "Skipped nested slots should be vacant.");
        assert!(root.get(2).unwrap().is_vacant());
        assert_eq!(root.iter().filter(|slot| slot.is_nested()).count(), 3);
    }
    assert_eq!(AllocStats::since(before).live, 0, "Dropping the root should release every child.");
}

#[test]
fn test_iter() {
    let mut vec = FlatVector::new(1, 1).expect("small allocation should succeed");
    for value in 0..5 {
        vec.push(&[value]).unwrap();
    }

    let iter = vec.iter();
    assert_eq!(iter.len(), 5);
    assert_eq!(
        iter.rev().filter_map(Slot::as_leaf).map(|b| b[0]).collect::<Vec<_>>(),
        [4, 3, 2, 1, 0]
    );
    assert_eq!((&vec).into_iter().count(), 5);

    let debug = format!("{vec:?}");
    assert!(debug.contains("len: 5"), "Debug output should describe the vector: {debug}");
}

#[test]
fn test_release() {
    let before = AllocStats::now();
    let vec = FlatVector::new(16, 64).expect("small allocation should succeed");
    vec.release();

    let stats = AllocStats::since(before);
    assert_eq!(stats.allocated, 1);
    assert_eq!(stats.released, 1);
}

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
    Insert(usize, u8),
    Remove(usize),
    Set(usize, u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Push),
        1 => Just(Op::Pop),
        1 => (0..40_usize, any::<u8>()).prop_map(|(i, v)| Op::Insert(i, v)),
        1 => (0..40_usize).prop_map(Op::Remove),
        1 => (0..40_usize, any::<u8>()).prop_map(|(i, v)| Op::Set(i, v)),
    ]
}

proptest! {
    #[test]
    fn prop_matches_vec_model(ops in prop::collection::vec(op(), 0..200)) {
        let mut vec = FlatVector::new(2, 1).unwrap();
        let mut model: Vec<[u8; 2]> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    prop_assert_eq!(vec.push(&[v, !v]).unwrap(), model.len());
                    model.push([v, !v]);
                },
                Op::Pop => {
                    let popped = vec.pop().and_then(Removed::into_leaf);
                    let expected = model.pop();
                    prop_assert_eq!(popped.as_deref(), expected.as_ref().map(|b| &b[..]));
                },
                Op::Insert(i, v) => {
                    let result = vec.insert(i, &[v, v]);
                    prop_assert_eq!(result.is_ok(), i <= model.len());
                    if i <= model.len() {
                        model.insert(i, [v, v]);
                    }
                },
                Op::Remove(i) => {
                    let result = vec.remove(i);
                    prop_assert_eq!(result.is_ok(), i < model.len());
                    if i < model.len() {
                        let removed = model.remove(i);
                        let leaf = result.unwrap().into_leaf();
                        prop_assert_eq!(leaf.as_deref(), Some(&removed[..]));
                    }
                },
                Op::Set(i, v) => {
                    prop_assert_eq!(vec.set(i, &[v, 0]).is_ok(), i < model.len());
                    if let Some(slot) = model.get_mut(i) {
                        *slot = [v, 0];
                    }
                },
            }

            prop_assert_eq!(vec.len(), model.len());
            prop_assert!(vec.cap() >= vec.len());
            prop_assert_eq!(vec.has_slack(), vec.cap() > vec.len());
        }

        let contents: Vec<&[u8]> = vec.iter().filter_map(Slot::as_leaf).collect();
        let expected: Vec<&[u8]> = model.iter().map(|b| &b[..]).collect();
        prop_assert_eq!(contents, expected);
    }
}
