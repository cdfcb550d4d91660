//! Differential testing of [`WavlTree`] against a sorted `Vec` of entries.
//!
//! The `Vec` keeps entries ordered by key, with equal keys in insertion order, which is exactly
//! the in-order sequence a `WavlTree` holds. Every inserted value is unique, so an entry returned
//! by the tree identifies one position in the model.

extern crate std;

use std::{mem, prelude::v1::*};

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::WavlTree;

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum KeyChoice {
    /// Picks a key already in the model, so that operations hit and duplicates appear.
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> KeyChoice {
        KeyChoice::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> KeyChoice {
        KeyChoice::Random(random)
    }
}

fn key_strategy() -> impl Strategy<Value = KeyChoice> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(KeyChoice),
    Get(KeyChoice),
    Remove(KeyChoice),
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

impl Op {
    fn finalize(self, entries: &[(u32, u32)]) -> FinalOp {
        fn get_key(entries: &[(u32, u32)], choice: KeyChoice) -> u32 {
            match choice {
                KeyChoice::Index(idx) => {
                    if entries.is_empty() {
                        idx as u32
                    } else {
                        entries[idx % entries.len()].0
                    }
                }
                KeyChoice::Random(key) => key,
            }
        }

        match self {
            Op::Insert(choice) => FinalOp::Insert(get_key(entries, choice)),
            Op::Get(choice) => FinalOp::Get(get_key(entries, choice)),
            Op::Remove(choice) => FinalOp::Remove(get_key(entries, choice)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Get(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Clearing is rare, so that trees grow large enough to need deep rebalancing.
    proptest::prop_oneof![
        40 => key_strategy().prop_map(Op::Insert),
        20 => key_strategy().prop_map(Op::Get),
        25 => key_strategy().prop_map(Op::Remove),
        5 => Just(Op::First),
        5 => Just(Op::PopFirst),
        5 => Just(Op::Last),
        5 => Just(Op::PopLast),
        1 => Just(Op::Clear),
    ]
}

/// The ordered entries a tree is expected to hold.
#[derive(Debug, Default)]
struct Model {
    entries: Vec<(u32, u32)>,
}

impl Model {
    fn insert(&mut self, key: u32, value: u32) {
        // After every entry with an equal key.
        let idx = self.entries.partition_point(|&(k, _)| k <= key);
        self.entries.insert(idx, (key, value));
    }

    fn has_key(&self, key: u32) -> bool {
        self.entries.iter().any(|&(k, _)| k == key)
    }

    fn contains(&self, key: u32, value: u32) -> bool {
        self.entries.contains(&(key, value))
    }

    fn remove(&mut self, key: u32, value: u32) -> bool {
        match self.entries.iter().position(|&e| e == (key, value)) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Returns the height a WAVL tree of `len` elements may not exceed.
fn height_bound(len: usize) -> usize {
    2 * (usize::BITS - len.leading_zeros()) as usize
}

pub fn run_model_equivalence(ops: Vec<Op>) {
    let mut model = Model::default();
    let mut wavl: WavlTree<u32, u32> = WavlTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&model.entries);
        let value = op_id as u32;

        match final_op {
            FinalOp::Insert(key) => {
                model.insert(key, value);
                wavl.insert(key, value);
            }

            FinalOp::Get(key) => match wavl.get_key_value(&key) {
                Some((&k, &v)) => {
                    assert_eq!(k, key, "FinalOp #{op_id}: {final_op:?}");
                    assert!(model.contains(k, v), "FinalOp #{op_id}: {final_op:?}");
                }
                None => assert!(!model.has_key(key), "FinalOp #{op_id}: {final_op:?}"),
            },

            FinalOp::Remove(key) => match wavl.remove_entry(&key) {
                Some((k, v)) => {
                    assert_eq!(k, key, "FinalOp #{op_id}: {final_op:?}");
                    assert!(model.remove(k, v), "FinalOp #{op_id}: {final_op:?}");
                }
                None => assert!(!model.has_key(key), "FinalOp #{op_id}: {final_op:?}"),
            },

            FinalOp::First => {
                let from_model = model.entries.first().map(|(k, v)| (k, v));
                let from_wavl = wavl.first_key_value();

                assert_eq!(from_model, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_model = (!model.entries.is_empty()).then(|| model.entries.remove(0));
                let from_wavl = wavl.pop_first();

                assert_eq!(from_model, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_model = model.entries.last().map(|(k, v)| (k, v));
                let from_wavl = wavl.last_key_value();

                assert_eq!(from_model, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_model = model.entries.pop();
                let from_wavl = wavl.pop_last();

                assert_eq!(from_model, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Clear => {
                model.entries.clear();
                wavl.clear();
            }
        }

        wavl.assert_invariants();
        assert_eq!(model.entries.len(), wavl.len());
        assert!(wavl.height() <= height_bound(wavl.len()));
        assert!(model.entries.iter().map(|(k, v)| (k, v)).eq(wavl.iter()));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    Set(u32),
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        (0u32..1000).prop_map(CursorOp::Set),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub keys: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn key(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            // A narrow key space, so that duplicates are common.
            u8::arbitrary(u).map(u32::from).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_keys = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let keys = core::iter::repeat_with(|| key(u))
            .take(num_keys.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(CursorEquivalenceInput { keys, ops })
    }
}

pub fn run_cursor_equivalence(keys: Vec<u32>, ops: Vec<CursorOp>) {
    // Ideally this would be a BTreeMap cursor, but it doesn't allow duplicate keys.
    let mut vec: Vec<(u32, u32)> = Vec::with_capacity(keys.len());
    let mut wavl: WavlTree<u32, u32> = WavlTree::new();

    for (idx, key) in keys.into_iter().enumerate() {
        vec.push((key, idx as u32));
        wavl.insert(key, idx as u32);
    }

    // A stable sort keeps equal keys in insertion order.
    vec.sort_by_key(|&(key, _)| key);

    fn vec_curs_prev(v: &[(u32, u32)], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next(v: &[(u32, u32)], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    fn entry(v: &[(u32, u32)], curs: Option<usize>) -> Option<(&u32, &u32)> {
        curs.map(|i| (&v[i].0, &v[i].1))
    }

    let mut vec_curs = vec_curs_next(&vec, None);
    let mut wavl_curs = wavl.cursor_first_mut();

    // Check that the initial states are equivalent.
    assert_eq!(entry(&vec, vec_curs), wavl_curs.get());

    for op in ops {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                wavl_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                wavl_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = entry(&vec, vec_curs_next(&vec, vec_curs));
                let w = wavl_curs.peek_next();

                assert_eq!(v, w);
            }

            CursorOp::PeekPrev => {
                let v = entry(&vec, vec_curs_prev(&vec, vec_curs));
                let w = wavl_curs.peek_prev();

                assert_eq!(v, w);
            }

            CursorOp::Set(value) => {
                let v = vec_curs.map(|i| mem::replace(&mut vec[i].1, value));
                let w = wavl_curs.set(value).ok();

                assert_eq!(v, w);
            }

            CursorOp::RemoveCurrent => {
                let v = vec_curs.map(|i| vec.remove(i));

                if vec_curs == Some(vec.len()) {
                    vec_curs = None;
                }

                let w = wavl_curs.remove_current();

                assert_eq!(v, w);
            }

            CursorOp::RemoveCurrentMovePrev => {
                let new_v_curs = vec_curs.is_some().then(|| vec_curs_prev(&vec, vec_curs));
                let v = vec_curs.map(|i| vec.remove(i));

                if let Some(vc) = new_v_curs {
                    vec_curs = vc;
                }

                let w = wavl_curs.remove_current_and_move_prev();

                assert_eq!(v, w);
            }
        }

        assert_eq!(entry(&vec, vec_curs), wavl_curs.get());
    }

    drop(wavl_curs);

    wavl.assert_invariants();
    assert!(vec.iter().map(|(k, v)| (k, v)).eq(wavl.iter()));
}
