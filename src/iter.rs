use core::{iter::FusedIterator, marker::PhantomData};

use crate::{
    node::{self, Link, Node},
    WavlTree,
};

/// Front and back positions of a double-ended walk over a tree.
///
/// The walk steps by in-order successor from the front and by predecessor from the back. `len`
/// counts the entries not yet yielded, so the two ends never cross.
struct Range<K, V> {
    front: Link<K, V>,
    back: Link<K, V>,
    len: usize,
}

impl<K, V> Range<K, V> {
    fn new(tree: &WavlTree<K, V>) -> Self {
        let root = tree.root();

        unsafe {
            Range {
                front: root.map(|r| node::min_in_subtree(r)),
                back: root.map(|r| node::max_in_subtree(r)),
                len: tree.len(),
            }
        }
    }

    fn next_node(&mut self) -> Link<K, V> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.front = unsafe { node::successor(cur) };
        self.len -= 1;

        Some(cur)
    }

    fn next_back_node(&mut self) -> Link<K, V> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.back = unsafe { node::predecessor(cur) };
        self.len -= 1;

        Some(cur)
    }
}

/// An iterator over the entries of a [`WavlTree`], in key order.
pub struct Iter<'tree, K, V> {
    range: Range<K, V>,
    _tree: PhantomData<&'tree Node<K, V>>,
}

impl<'tree, K, V> Iter<'tree, K, V> {
    pub(crate) fn new(tree: &'tree WavlTree<K, V>) -> Self {
        Iter {
            range: Range::new(tree),
            _tree: PhantomData,
        }
    }
}

impl<'tree, K, V> Iterator for Iter<'tree, K, V> {
    type Item = (&'tree K, &'tree V);

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.range.next_node()?;
        unsafe { Some((node::key(cur), node::value(cur))) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.range.len, Some(self.range.len))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let cur = self.range.next_back_node()?;
        unsafe { Some((node::key(cur), node::value(cur))) }
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            range: Range {
                front: self.range.front,
                back: self.range.back,
                len: self.range.len,
            },
            _tree: PhantomData,
        }
    }
}

/// An iterator over the entries of a [`WavlTree`], in key order, with mutable values.
pub struct IterMut<'tree, K, V> {
    range: Range<K, V>,
    _tree: PhantomData<&'tree mut Node<K, V>>,
}

impl<'tree, K, V> IterMut<'tree, K, V> {
    pub(crate) fn new(tree: &'tree mut WavlTree<K, V>) -> Self {
        IterMut {
            range: Range::new(tree),
            _tree: PhantomData,
        }
    }
}

impl<'tree, K, V> Iterator for IterMut<'tree, K, V> {
    type Item = (&'tree K, &'tree mut V);

    fn next(&mut self) -> Option<Self::Item> {
        // Each node is yielded at most once, so the mutable borrows are disjoint.
        let cur = self.range.next_node()?;
        unsafe { Some((node::key(cur), node::value_mut(cur))) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.range.len, Some(self.range.len))
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let cur = self.range.next_back_node()?;
        unsafe { Some((node::key(cur), node::value_mut(cur))) }
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An owning iterator over the entries of a [`WavlTree`], in key order.
pub struct IntoIter<K, V> {
    tree: WavlTree<K, V>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(tree: WavlTree<K, V>) -> Self {
        IntoIter { tree }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.tree.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.tree.pop_last()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}
