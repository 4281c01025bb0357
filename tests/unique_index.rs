mod common;

use std::collections::BTreeMap;

use bplus_index::{IndexError, Order, Shape, UniqueIndex};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 2_000;

/// A key range small enough for frequent collisions at `TEST_SIZE` operations.
fn key_strategy() -> impl Strategy<Value = i32> {
    -500i32..500i32
}

fn order_strategy() -> impl Strategy<Value = usize> {
    2usize..=9
}

// ─── Operations enum for driving randomized tests ────────────────────────────

#[derive(Debug, Clone)]
enum IndexOp {
    Insert(i32, i64),
    Delete(i32),
    Remove(i32),
    Search(i32),
    SearchMut(i32, i64),
    ContainsKey(i32),
}

fn index_op_strategy() -> impl Strategy<Value = IndexOp> {
    prop_oneof![
        5 => (key_strategy(), any::<i64>()).prop_map(|(k, v)| IndexOp::Insert(k, v)),
        2 => key_strategy().prop_map(IndexOp::Delete),
        2 => key_strategy().prop_map(IndexOp::Remove),
        1 => key_strategy().prop_map(IndexOp::Search),
        1 => (key_strategy(), any::<i64>()).prop_map(|(k, v)| IndexOp::SearchMut(k, v)),
        1 => key_strategy().prop_map(IndexOp::ContainsKey),
    ]
}

fn keys_of(index: &UniqueIndex<i32, ()>) -> Vec<i32> {
    index.iter().map(|(k, _)| *k).collect()
}

// ─── Model-based tests ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Replays a random operation sequence on both the index and a `BTreeMap`, comparing
    /// every result and checking the tree invariants as it goes.
    #[test]
    fn ops_match_btreemap(order in order_strategy(), ops in proptest::collection::vec(index_op_strategy(), TEST_SIZE)) {
        common::init_tracing();
        let mut index: UniqueIndex<i32, i64> = UniqueIndex::new(order).unwrap();
        let mut model: BTreeMap<i32, i64> = BTreeMap::new();

        for (step, op) in ops.iter().enumerate() {
            match op {
                IndexOp::Insert(k, v) => {
                    prop_assert_eq!(index.insert(*k, *v), model.insert(*k, *v), "insert({}, {})", k, v);
                }
                IndexOp::Delete(k) => {
                    prop_assert_eq!(index.delete(k), model.remove(k).is_some(), "delete({})", k);
                }
                IndexOp::Remove(k) => {
                    prop_assert_eq!(index.remove(k), model.remove(k), "remove({})", k);
                }
                IndexOp::Search(k) => {
                    prop_assert_eq!(index.search(k), model.get(k), "search({})", k);
                }
                IndexOp::SearchMut(k, v) => {
                    if let Some(value) = index.search_mut(k) {
                        *value = *v;
                    }
                    if let Some(value) = model.get_mut(k) {
                        *value = *v;
                    }
                    prop_assert_eq!(index.search(k), model.get(k), "search_mut({})", k);
                }
                IndexOp::ContainsKey(k) => {
                    prop_assert_eq!(index.contains_key(k), model.contains_key(k), "contains_key({})", k);
                }
            }

            prop_assert_eq!(index.len(), model.len());
            if step % 50 == 0 {
                index.validate();
            }
        }

        index.validate();
        let entries: Vec<_> = index.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(entries, expected);
    }

    /// Inserting keys then deleting all of them, in any order, returns to an empty root leaf.
    #[test]
    fn insert_all_then_delete_all_leaves_empty_root(
        order in order_strategy(),
        keys in proptest::collection::vec(key_strategy(), 1..400),
        seed in any::<u64>(),
    ) {
        let mut index = UniqueIndex::new(order).unwrap();
        for &key in &keys {
            index.insert(key, ());
        }
        index.validate();

        let mut distinct: Vec<i32> = keys_of(&index);
        // Deterministic shuffle driven by the seed.
        let mut state = seed | 1;
        for i in (1..distinct.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = usize::try_from(state % (i as u64 + 1)).unwrap();
            distinct.swap(i, j);
        }

        for key in &distinct {
            prop_assert!(index.delete(key));
            index.validate();
        }
        prop_assert!(index.is_empty());
        prop_assert_eq!(index.shape(), Shape::Leaf(Vec::new()));
    }

    /// A delete of an absent key reports not-found and changes nothing.
    #[test]
    fn absent_delete_changes_nothing(
        order in order_strategy(),
        keys in proptest::collection::btree_set(0i32..1_000, 1..300),
        probe in 1_000i32..2_000,
    ) {
        let mut index = UniqueIndex::new(order).unwrap();
        for &key in &keys {
            index.insert(key, key);
        }
        let before = index.shape();
        prop_assert!(!index.delete(&probe));
        prop_assert_eq!(index.remove(&probe), None);
        prop_assert_eq!(index.shape(), before);
        prop_assert_eq!(index.len(), keys.len());
    }
}

// ─── Construction ────────────────────────────────────────────────────────────

#[test]
fn rejects_orders_below_two() {
    for order in [0, 1] {
        let err = UniqueIndex::<i32, i32>::new(order).unwrap_err();
        assert_eq!(err, IndexError::InvalidOrder { order });
    }
    assert!(UniqueIndex::<i32, i32>::new(2).is_ok());
}

#[test]
fn with_order_and_default() {
    let index: UniqueIndex<i32, i32> = UniqueIndex::with_order(Order::new(5).unwrap());
    assert_eq!(index.order().get(), 5);
    let index: UniqueIndex<i32, i32> = UniqueIndex::default();
    assert_eq!(index.order(), Order::default());
}

// ─── Structural scenarios ────────────────────────────────────────────────────

#[test]
fn borrow_is_skipped_at_minimum_occupancy() {
    common::init_tracing();
    let mut index = UniqueIndex::new(2).unwrap();
    for key in [10, 20, 30] {
        index.insert(key, ());
    }
    assert_eq!(
        index.shape(),
        Shape::Internal {
            keys: vec![30],
            children: vec![Shape::Leaf(vec![10, 20]), Shape::Leaf(vec![30])],
        }
    );

    assert!(index.delete(&10));
    assert_eq!(
        index.shape(),
        Shape::Internal {
            keys: vec![30],
            children: vec![Shape::Leaf(vec![20]), Shape::Leaf(vec![30])],
        }
    );

    assert!(index.delete(&20));
    assert_eq!(index.shape(), Shape::Leaf(vec![30]));
    index.validate();
}

#[test]
fn increasing_inserts_split_an_internal_node() {
    common::init_tracing();
    let mut index = UniqueIndex::new(2).unwrap();
    for key in [10, 20, 30, 40, 50, 60] {
        index.insert(key, ());
    }
    assert_eq!(index.shape().height(), 2);
    assert_eq!(index.shape().keys(), [30, 50]);

    index.insert(70, ());
    let shape = index.shape();
    assert_eq!(
        shape,
        Shape::Internal {
            keys: vec![50],
            children: vec![
                Shape::Internal {
                    keys: vec![30],
                    children: vec![Shape::Leaf(vec![10, 20]), Shape::Leaf(vec![30, 40])],
                },
                Shape::Internal {
                    keys: vec![70],
                    children: vec![Shape::Leaf(vec![50, 60]), Shape::Leaf(vec![70])],
                },
            ],
        }
    );
    assert_eq!(shape.height(), 3);
    assert_eq!(keys_of(&index), [10, 20, 30, 40, 50, 60, 70]);
    index.validate();
}

#[test]
fn removing_everything_shrinks_height_step_by_step() {
    let mut index = UniqueIndex::new(3).unwrap();
    for key in 0..200 {
        index.insert(key, ());
    }
    let mut last_height = index.shape().height();
    assert!(last_height >= 4);

    for key in (0..200).rev() {
        assert!(index.delete(&key));
        let height = index.shape().height();
        assert!(height <= last_height, "height grew from {last_height} to {height}");
        last_height = height;
    }
    assert_eq!(index.shape(), Shape::Leaf(Vec::new()));
}

#[test]
fn string_keys_borrow_as_str() {
    let mut index = UniqueIndex::new(4).unwrap();
    for id in ["p-010", "p-003", "p-007", "p-001", "p-020", "p-015"] {
        index.insert(id.to_string(), id.len());
    }
    assert_eq!(index.search("p-007"), Some(&5));
    assert!(index.delete("p-003"));
    assert!(!index.contains_key("p-003"));
    assert_eq!(index.first_key_value().map(|(k, _)| k.as_str()), Some("p-001"));
    assert_eq!(index.last_key_value().map(|(k, _)| k.as_str()), Some("p-020"));
    index.validate();
}

#[test]
fn shape_renders_as_tree() {
    let index: UniqueIndex<i32, ()> = {
        let mut index = UniqueIndex::new(2).unwrap();
        index.extend([10, 20, 30, 40, 50].map(|k| (k, ())));
        index
    };
    assert_eq!(index.shape().to_string(), "[30, 50]\n├── [10, 20]\n├── [30, 40]\n└── [50]\n");
}
