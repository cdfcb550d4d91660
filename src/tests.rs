extern crate std;

use std::{format, ops::Range, prelude::v1::*, string::String, vec};

use proptest::prelude::*;

use crate::model;

use super::*;

fn insert_find_all(keys: &[u32]) {
    let mut tree: WavlTree<u32, u32> = WavlTree::new();

    for &key in keys {
        tree.insert(key, key * 10);
        tree.assert_invariants();
    }

    for key in keys {
        assert_eq!(tree.get(key), Some(&(key * 10)), "item not found");
    }
}

fn permutations(n: u32) -> Vec<Vec<u32>> {
    if n == 0 {
        return vec![vec![]];
    }

    let mut out = Vec::new();
    for perm in permutations(n - 1) {
        for idx in 0..=perm.len() {
            let mut p = perm.clone();
            p.insert(idx, n - 1);
            out.push(p);
        }
    }
    out
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn up_to_six_elems_find() {
    for n in 4..=6 {
        for keys in permutations(n) {
            insert_find_all(&keys);
        }
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: WavlTree<u32, u32> = WavlTree::new();

    for &key in keys {
        tree.insert(key, key);
        tree.assert_invariants();
    }

    for key in keys {
        assert_eq!(tree.remove(key), Some(*key));
        assert_eq!(tree.get(key), None);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(key, key);
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(tree.remove(key), Some(*key));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_up_to_seven() {
    for n in 4..=7 {
        for keys in permutations(n) {
            insert_remove_all(&keys);
        }
    }
}

// Removes every key of a full tree in every order, for every insertion order.
#[test]
fn remove_every_order_of_five() {
    for inserted in permutations(5) {
        for removed in permutations(5) {
            let mut tree: WavlTree<u32, ()> = WavlTree::new();
            for &key in &inserted {
                tree.insert(key, ());
            }

            for (n, key) in removed.iter().enumerate() {
                assert_eq!(tree.remove(key), Some(()));
                tree.assert_invariants();
                assert_eq!(tree.len(), 4 - n);
            }
        }
    }
}

fn sample_tree() -> WavlTree<u32, &'static str> {
    let mut tree = WavlTree::new();

    tree.insert(1, "123");
    tree.insert(3, "234");
    tree.insert(4, "dfa3");
    tree.insert(6, "sd4");
    tree.insert(5, "jcd4");
    tree.insert(2, "bcd4");

    tree
}

#[test]
fn sample_insert_and_find() {
    let tree = sample_tree();
    tree.assert_invariants();

    assert_eq!(tree.len(), 6);
    assert!(!tree.is_empty());
    assert_eq!(
        tree.iter().map(|(&k, _)| k).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5, 6]
    );
    assert_eq!(tree.get(&4), Some(&"dfa3"));
}

#[test]
fn sample_delete() {
    let mut tree = sample_tree();

    tree.remove(&1);
    tree.remove(&2);
    tree.assert_invariants();

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.get(&1), None);
    assert_eq!(tree.get(&2), None);
    assert_eq!(tree.get(&4), Some(&"dfa3"));
    assert_eq!(
        tree.iter().map(|(&k, _)| k).collect::<Vec<_>>(),
        vec![3, 4, 5, 6]
    );
}

#[test]
fn sample_clear() {
    let mut tree = sample_tree();

    tree.clear();

    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    for key in 1..=6 {
        assert_eq!(tree.get(&key), None);
    }
    assert_eq!(tree.iter().next(), None);
    assert!(tree.cursor_first().is_ghost());

    // The tree is usable after clearing.
    tree.insert(7, "x");
    tree.assert_invariants();
    assert_eq!(tree.get(&7), Some(&"x"));
}

#[test]
fn find_cursor_set_leaves_other_values() {
    let mut tree = sample_tree();

    {
        let mut curs = tree.find_mut(&4);
        assert_eq!(curs.value(), Some(&"dfa3"));
        assert_eq!(curs.set("bdsf"), Ok("dfa3"));
        assert_eq!(curs.value(), Some(&"bdsf"));

        curs.move_next();
        assert_eq!(curs.key(), Some(&5));
    }

    assert_eq!(tree.get(&4), Some(&"bdsf"));
    assert_eq!(tree.get(&5), Some(&"jcd4"));
    tree.assert_invariants();
}

#[test]
fn find_missing_key() {
    let mut tree = sample_tree();

    assert!(tree.find(&10).is_ghost());
    assert_eq!(tree.find(&10).get(), None);
    assert_eq!(tree.find_mut(&0).set("nope"), Err("nope"));

    // Removing a missing key is a no-op.
    assert_eq!(tree.remove(&10), None);
    assert_eq!(tree.len(), 6);
    tree.assert_invariants();
}

#[test]
fn cursor_walks_in_order() {
    let tree = sample_tree();

    let mut curs = tree.cursor_first();
    let mut keys = Vec::new();
    while let Some(&key) = curs.key() {
        keys.push(key);
        curs.move_next();
    }
    assert_eq!(keys, vec![1, 2, 3, 4, 5, 6]);

    // The ghost wraps around to the first element.
    curs.move_next();
    assert_eq!(curs.key(), Some(&1));

    let mut curs = tree.cursor_last();
    assert_eq!(curs.key(), Some(&6));
    curs.move_prev();
    assert_eq!(curs.peek_prev(), Some((&4, &"dfa3")));
    assert_eq!(curs.peek_next(), Some((&6, &"sd4")));
}

#[test]
fn cursor_remove_binary_node_stays_in_place() {
    let mut tree: WavlTree<u32, u32> = WavlTree::new();
    for key in 0..15 {
        tree.insert(key, key);
    }

    // The root of a tree built from ascending keys has two children.
    let root_key = *tree.preorder().next().unwrap().key;

    let mut curs = tree.find_mut(&root_key);
    assert_eq!(curs.remove_current(), Some((root_key, root_key)));
    assert_eq!(curs.key(), Some(&(root_key + 1)));
    assert_eq!(curs.remove_current_and_move_prev(), Some((root_key + 1, root_key + 1)));
    assert_eq!(curs.key(), Some(&(root_key - 1)));
    drop(curs);

    tree.assert_invariants();
    assert_eq!(tree.len(), 13);
}

#[test]
fn duplicate_keys_keep_insertion_order() {
    let mut tree: WavlTree<u32, &str> = WavlTree::new();

    tree.insert(2, "a");
    tree.insert(1, "x");
    tree.insert(2, "b");
    tree.insert(3, "y");
    tree.insert(2, "c");
    tree.assert_invariants();

    assert_eq!(tree.len(), 5);
    assert_eq!(
        tree.iter().map(|(&k, &v)| (k, v)).collect::<Vec<_>>(),
        vec![(1, "x"), (2, "a"), (2, "b"), (2, "c"), (3, "y")]
    );

    let mut removed = Vec::new();
    while let Some(value) = tree.remove(&2) {
        removed.push(value);
        tree.assert_invariants();
    }
    removed.sort_unstable();
    assert_eq!(removed, vec!["a", "b", "c"]);
    assert_eq!(tree.len(), 2);
}

#[test]
fn ascending_inserts_stay_logarithmic() {
    let mut tree: WavlTree<u32, u32> = WavlTree::new();

    for key in 1..=1000 {
        tree.insert(key, key);
    }
    tree.assert_invariants();

    // 2 * log2(1001) < 20
    assert!(tree.height() <= 19, "height {}", tree.height());
    assert_eq!(tree.first_key_value(), Some((&1, &1)));
    assert_eq!(tree.last_key_value(), Some((&1000, &1000)));
}

#[test]
fn height_stays_logarithmic_after_deletions() {
    let mut tree: WavlTree<u32, ()> = WavlTree::new();

    for key in 0..4096 {
        tree.insert(key, ());
    }
    // Delete three out of four keys, leaving 1024.
    for key in (0..4096).filter(|k| k % 4 != 0) {
        tree.remove(&key);
    }
    tree.assert_invariants();

    assert_eq!(tree.len(), 1024);
    // 2 * log2(1025) < 21
    assert!(tree.height() <= 20, "height {}", tree.height());
}

#[test]
fn pop_first_and_last() {
    let mut tree = sample_tree();

    assert_eq!(tree.pop_first(), Some((1, "123")));
    assert_eq!(tree.pop_last(), Some((6, "sd4")));
    tree.assert_invariants();

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.first_key_value(), Some((&2, &"bcd4")));
    assert_eq!(tree.last_key_value(), Some((&5, &"jcd4")));

    let mut empty: WavlTree<u32, ()> = WavlTree::new();
    assert_eq!(empty.pop_first(), None);
    assert_eq!(empty.pop_last(), None);
}

#[test]
fn iterators() {
    let mut tree = sample_tree();

    assert_eq!(tree.iter().len(), 6);
    assert_eq!(
        tree.iter().rev().map(|(&k, _)| k).collect::<Vec<_>>(),
        vec![6, 5, 4, 3, 2, 1]
    );

    // Both ends meet without yielding an entry twice.
    let mut iter = tree.iter();
    assert_eq!(iter.next().map(|(&k, _)| k), Some(1));
    assert_eq!(iter.next_back().map(|(&k, _)| k), Some(6));
    assert_eq!(iter.map(|(&k, _)| k).collect::<Vec<_>>(), vec![2, 3, 4, 5]);

    for (_, value) in tree.iter_mut() {
        *value = "v";
    }
    assert!(tree.iter().all(|(_, &v)| v == "v"));

    let owned: Vec<(u32, &str)> = tree.into_iter().collect();
    assert_eq!(owned.len(), 6);
    assert_eq!(owned[0], (1, "v"));
}

#[test]
fn get_mut_and_contains() {
    let mut tree = sample_tree();

    *tree.get_mut(&3).unwrap() = "changed";
    assert_eq!(tree.get(&3), Some(&"changed"));
    assert!(tree.contains_key(&3));
    assert!(!tree.contains_key(&7));
    assert_eq!(tree.get_key_value(&3), Some((&3, &"changed")));
    assert_eq!(tree.remove_entry(&3), Some((3, "changed")));
}

#[test]
fn borrowed_key_lookup() {
    let mut tree: WavlTree<String, u32> = WavlTree::new();
    tree.insert(String::from("b"), 2);
    tree.insert(String::from("a"), 1);

    assert_eq!(tree.get("a"), Some(&1));
    assert_eq!(tree.remove("b"), Some(2));
    assert_eq!(format!("{tree:?}"), "{\"a\": 1}");
}

#[test]
fn drop_releases_entries() {
    use std::rc::Rc;

    let marker = Rc::new(());
    let mut tree: WavlTree<u32, Rc<()>> = WavlTree::new();
    for key in 0..100 {
        tree.insert(key, Rc::clone(&marker));
    }
    tree.remove(&50);
    assert_eq!(Rc::strong_count(&marker), 100);

    drop(tree);
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn model_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_model_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        keys in proptest::collection::vec(0u32..64, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(keys, ops);
    }
}
