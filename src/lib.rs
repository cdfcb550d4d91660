//! An ordered map backed by a weak AVL tree, or WAVL tree.
#![no_std]

// Conventions used in comments are from Haeupler, Sen and Tarjan:
// - The rank of a node `x` is denoted `r(x)`. A missing node has rank -1.
// - The parent of a node `x` is denoted `p(x)`.
// - The rank difference of a node `x` is given by `r(p(x)) - r(x)`.
// - A node `x` is an `i`-child if its rank difference is `i`.
// - A node is `i,j` if one of its children is an `i`-child and the other is a `j`-child.
//
// The fundamental invariants of a WAVL tree are:
// 1. All rank differences are either 1 or 2.
// 2. All leaves have rank 0.
//
// Corollaries:
// 3. All ancestors of a leaf have rank at least one.
// 4. All unary nodes are 1,2 with rank 1. The present child is a rank 0 leaf.
//
// Insertion can only break (1) by creating a 0-child. Removal can only break it by creating a
// 3-child, or break (2) by leaving a 2,2 leaf of rank 1. Each case is repaired bottom-up by
// promotions or demotions followed by at most two rotations.

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

mod cursor;
mod debug;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod node;
#[cfg(test)]
mod tests;

use core::{borrow::Borrow, cmp::Ordering, fmt, marker::PhantomData, ptr::NonNull};

use alloc::boxed::Box;
use cordyceps::Linked;

pub use cursor::{Cursor, CursorMut};
pub use debug::{Preorder, PreorderEntry};
pub use iter::{IntoIter, Iter, IterMut};

use node::{Dir, Link, Links, Node};

/// An ordered map based on a [WAVL tree].
///
/// Implementation based on the paper [Rank-Balanced Trees] by Haeupler, Sen and Tarjan.
///
/// Keys are ordered by their [`Ord`] implementation. Inserting a key equal to one already present
/// does not replace it: the new entry is placed after every existing equal key, in insertion
/// order.
///
/// [WAVL tree]: https://en.wikipedia.org/wiki/WAVL_tree
/// [Rank-Balanced Trees]: http://arks.princeton.edu/ark:/88435/pr1nz5z
pub struct WavlTree<K, V> {
    root: Link<K, V>,
    len: usize,
    _owns: PhantomData<Box<Node<K, V>>>,
}

impl<K, V> WavlTree<K, V> {
    /// Returns a new empty tree.
    pub const fn new() -> WavlTree<K, V> {
        WavlTree {
            root: None,
            len: 0,
            _owns: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    ///
    /// An empty tree has height 0. A tree of `n` elements has height at most `2 * log2(n + 1)`.
    pub fn height(&self) -> usize {
        fn height_at<K, V>(node: Link<K, V>) -> usize {
            match node {
                None => 0,
                Some(n) => unsafe {
                    1 + height_at(node::links(n).left()).max(height_at(node::links(n).right()))
                },
            }
        }

        height_at(self.root)
    }

    /// Returns the minimum key in the tree along with its value.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let first = unsafe { node::min_in_subtree(self.root?) };
        unsafe { Some((node::key(first), node::value(first))) }
    }

    /// Returns the maximum key in the tree along with its value.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let last = unsafe { node::max_in_subtree(self.root?) };
        unsafe { Some((node::key(last), node::value(last))) }
    }

    /// Removes and returns the entry with the minimum key.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let first = unsafe { node::min_in_subtree(self.root?) };
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the entry with the maximum key.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let last = unsafe { node::max_in_subtree(self.root?) };
        Some(unsafe { self.remove_at(last) })
    }

    /// Returns an iterator over the entries of the tree, in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Returns an iterator over the entries of the tree, in key order, with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self)
    }

    /// Returns a cursor pointing at the entry with the minimum key.
    ///
    /// If the tree is empty, the cursor points at the "ghost" non-element.
    pub fn cursor_first(&self) -> Cursor<'_, K, V> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing at the entry with the maximum key.
    pub fn cursor_last(&self) -> Cursor<'_, K, V> {
        Cursor::last(self)
    }

    /// Returns an editing cursor pointing at the entry with the minimum key.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::first(self)
    }

    /// Returns an editing cursor pointing at the entry with the maximum key.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, K, V> {
        CursorMut::last(self)
    }

    /// Clears the tree, removing all elements.
    ///
    /// This runs in _O(n)_ time and does not recurse.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = node::min_in_subtree(cur);
                let parent = node::links(cur).parent();
                let right = node::links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                if let Some(right) = right {
                    node::links_mut(right).set_parent(parent);
                }

                // Drop the node.
                drop(<Node<K, V> as Linked<Links<K, V>>>::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    pub(crate) fn root(&self) -> Link<K, V> {
        self.root
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`, or replaces
    // the root if `parent` is `None`.
    //
    // `new_child`'s parent pointer is not updated.
    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<K, V>,
        old_child: NonNull<Node<K, V>>,
        new_child: Link<K, V>,
    ) {
        match parent {
            Some(parent) => unsafe {
                let dir = self.which_child(parent, Some(old_child));
                node::links_mut(parent).set_child(dir, new_child);
            },
            None => self.root = new_child,
        }
    }

    // Returns the side of `parent` on which `child` hangs. A missing `child` matches a missing slot,
    // checking the left side first.
    #[inline]
    unsafe fn which_child(&self, parent: NonNull<Node<K, V>>, child: Link<K, V>) -> Dir {
        if unsafe { node::links(parent).left() } == child {
            Dir::Left
        } else {
            debug_assert_eq!(unsafe { node::links(parent).right() }, child);
            Dir::Right
        }
    }

    fn sibling(&self, node: NonNull<Node<K, V>>) -> Link<K, V> {
        unsafe {
            let parent = node::links(node).parent()?;
            let dir = self.which_child(parent, Some(node));
            node::links(parent).child(!dir)
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // `up` takes over `down`'s parent link, and the subtree of `up` lying between the two keys is
    // reattached under `down`. The ranks of affected nodes are not updated.
    unsafe fn rotate_at(&mut self, down: NonNull<Node<K, V>>, up: NonNull<Node<K, V>>) {
        unsafe {
            debug_assert_eq!(node::links(up).parent(), Some(down));

            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if node::links(down).right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            let across = node::links(up).child(dir);
            node::links_mut(down).set_child(!dir, across);
            if let Some(across) = across {
                node::links_mut(across).set_parent(Some(down));
            }

            // Relink `down`'s parent before `down` loses its parent link.
            let parent = node::links(down).parent();
            self.replace_child_or_set_root(parent, down, Some(up));

            node::links_mut(up).set_child(dir, Some(down));
            node::links_mut(down).set_parent(Some(up));
            node::links_mut(up).set_parent(parent);
        }
    }

    // Performs a double rotation, moving `up` (a grandchild of `down_second`, through
    // `down_first`) into `down_second`'s position.
    //
    // The ranks of affected nodes are not updated.
    unsafe fn rotate_twice_at(
        &mut self,
        down_second: NonNull<Node<K, V>>,
        down_first: NonNull<Node<K, V>>,
        up: NonNull<Node<K, V>>,
    ) {
        unsafe {
            self.rotate_at(down_first, up);
            self.rotate_at(down_second, up);
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of `node`.
    //
    // Invariants:
    // - `node` is a new leaf of rank 0.
    // - `node`'s parent was a leaf before the insertion, so it is now a rank 0, 0,1 node.
    fn rebalance_inserted(&mut self, node: NonNull<Node<K, V>>) {
        unsafe {
            debug_assert_eq!(node::links(node).rank(), 0);

            let mut x = node;
            let Some(mut parent) = node::links(node).parent() else {
                return;
            };

            let mut x_rank = 0;
            let mut parent_rank = node::links(parent).rank();
            let mut sibling_rank = node::rank(self.sibling(x));

            // While the parent is 0,1, promote it and ascend.
            while x_rank == parent_rank && x_rank == sibling_rank + 1 {
                node::links_mut(parent).promote();

                #[cfg(feature = "tracing")]
                tracing::trace!(rank = parent_rank + 1, "insert: promoted 0,1 node");

                // Ascend one level. Reaching the root restores the rank rule.
                (parent, x) = match node::links(parent).parent() {
                    Some(p) => (p, parent),
                    None => return,
                };

                x_rank = node::links(x).rank();
                parent_rank = node::links(parent).rank();
                sibling_rank = node::rank(self.sibling(x));
            }

            // If the parent is not 0,2, the rank rule holds.
            if x_rank != parent_rank || x_rank != sibling_rank + 2 {
                return;
            }

            // `x` is 1,2. `y` is its child on the side facing its own sibling.
            let z = parent;
            let dir = self.which_child(z, Some(x));
            let y = node::links(x).child(!dir);

            match y {
                Some(y) if node::links(y).rank() == x_rank - 1 => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(rank = x_rank, "insert: double rotation");

                    self.rotate_twice_at(z, x, y);
                    node::links_mut(y).promote();
                    node::links_mut(x).demote();
                }

                _ => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(rank = x_rank, "insert: single rotation");

                    self.rotate_at(z, x);
                }
            }

            // z is demoted in all cases.
            node::links_mut(z).demote();
        }
    }

    /// Removes `node` from the tree and returns its entry.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`.
    pub(crate) unsafe fn remove_at(&mut self, node: NonNull<Node<K, V>>) -> (K, V) {
        // A binary node trades entries with its successor, which by definition has no left child.
        // The successor's node is then unlinked in place of `node`, so `node` keeps its identity
        // and rank.
        let removed = unsafe {
            match (node::links(node).left(), node::links(node).right()) {
                (Some(_), Some(right)) => {
                    let successor = node::min_in_subtree(right);
                    node::swap_entries(node, successor);
                    successor
                }
                _ => node,
            }
        };

        unsafe { self.unlink(removed) };
        self.len -= 1;

        unsafe { <Node<K, V> as Linked<Links<K, V>>>::from_ptr(removed).into_entry() }
    }

    // Splices out `y`, which has at most one child, and restores the rank rule.
    //
    // After the splice exactly one of the following is true:
    // 1. The rank rule holds.
    // 2. `y` was a 2-child, so its replacement (possibly missing) is a 3-child.
    // 3. `y` was a 1-child leaf of a unary parent, which is now a 2,2 leaf of rank 1.
    unsafe fn unlink(&mut self, y: NonNull<Node<K, V>>) {
        unsafe {
            debug_assert!(node::links(y).left().is_none() || node::links(y).right().is_none());

            let parent = node::links(y).parent();
            let x = node::links(y).left().or(node::links(y).right());

            let was_2_child =
                parent.is_some_and(|p| node::links(p).rank() - node::links(y).rank() == 2);

            self.replace_child_or_set_root(parent, y, x);
            if let Some(x) = x {
                node::links_mut(x).set_parent(parent);
            }
            node::links_mut(y).clear();

            let Some(parent) = parent else {
                return;
            };

            if was_2_child {
                self.rebalance_3_child(parent, x);
            } else if x.is_none() && node::links(parent).is_leaf() {
                self.rebalance_2_2_leaf(parent);
            }
        }
    }

    // Demotes a 2,2 leaf of rank 1, repairing its parent if the leaf becomes a 3-child.
    unsafe fn rebalance_2_2_leaf(&mut self, leaf: NonNull<Node<K, V>>) {
        unsafe {
            debug_assert_eq!(node::links(leaf).rank(), 1);

            let parent = node::links(leaf).parent();
            let creates_3_child =
                parent.is_some_and(|p| node::links(p).rank() - node::links(leaf).rank() == 2);

            node::links_mut(leaf).demote();

            #[cfg(feature = "tracing")]
            tracing::trace!("remove: demoted 2,2 leaf");

            if let Some(parent) = parent.filter(|_| creates_3_child) {
                self.rebalance_3_child(parent, Some(leaf));
            }
        }
    }

    // Restores the rank rule when `x` (possibly missing) is a 3-child of `z`.
    unsafe fn rebalance_3_child(&mut self, mut z: NonNull<Node<K, V>>, mut x: Link<K, V>) {
        unsafe {
            // Demote while `x` is a 3-child and its sibling `y` is a 2-child or 2,2.
            loop {
                debug_assert_eq!(node::links(z).rank() - node::rank(x), 3);

                let dir = self.which_child(z, x);
                let y = node::links(z)
                    .child(!dir)
                    .expect("a 3-child always has a sibling");

                let z_rank = node::links(z).rank();
                if z_rank - node::links(y).rank() == 2 {
                    node::links_mut(z).demote();
                } else if self.is_2_2(y) {
                    node::links_mut(y).demote();
                    node::links_mut(z).demote();
                } else {
                    break;
                }

                #[cfg(feature = "tracing")]
                tracing::trace!(rank = z_rank - 1, "remove: demoted parent of 3-child");

                // Ascend if the demotion made `z` a 3-child.
                let Some(parent) = node::links(z).parent() else {
                    return;
                };
                if node::links(parent).rank() - node::links(z).rank() != 3 {
                    return;
                }

                x = Some(z);
                z = parent;
            }

            // `y` is a 1-child and not 2,2. `v` is its child facing `x`, `w` the other one.
            let dir = self.which_child(z, x);
            let y = node::links(z).child(!dir).expect("a 3-child always has a sibling");
            let v = node::links(y).child(dir);
            let w = node::links(y).child(!dir);

            if node::links(y).rank() - node::rank(w) == 1 {
                #[cfg(feature = "tracing")]
                tracing::trace!(rank = node::links(z).rank(), "remove: single rotation");

                self.rotate_at(z, y);
                node::links_mut(y).promote();
                node::links_mut(z).demote();

                // A leaf must have rank 0.
                if node::links(z).is_leaf() {
                    node::links_mut(z).demote();
                }
            } else {
                #[cfg(feature = "tracing")]
                tracing::trace!(rank = node::links(z).rank(), "remove: double rotation");

                let v = v.expect("`v` is a 1-child when `w` is a 2-child");
                self.rotate_twice_at(z, y, v);
                node::links_mut(v).promote_twice();
                node::links_mut(y).demote();
                node::links_mut(z).demote_twice();
            }
        }
    }

    unsafe fn is_2_2(&self, node: NonNull<Node<K, V>>) -> bool {
        unsafe {
            let rank = node::links(node).rank();
            let left_rank = node::rank(node::links(node).left());
            let right_rank = node::rank(node::links(node).right());

            left_rank == rank - 2 && right_rank == rank - 2
        }
    }
}

impl<K: Ord, V> WavlTree<K, V> {
    /// Inserts an entry into the tree.
    ///
    /// Existing entries with an equal key are kept; the new entry is ordered after them.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: K, value: V) {
        let ptr = <Node<K, V> as Linked<Links<K, V>>>::into_ptr(Node::new(key, value));

        let Some(root) = self.root else {
            // Tree is empty. Set the new node as the root and return.
            self.root = Some(ptr);
            self.len += 1;
            return;
        };

        let mut parent = root;

        // Descend the tree, looking for a suitable leaf.
        let parent_was_leaf = loop {
            let dir = match unsafe { node::key(ptr).cmp(node::key(parent)) } {
                Ordering::Less => Dir::Left,
                Ordering::Equal | Ordering::Greater => Dir::Right,
            };

            unsafe {
                match node::links(parent).child(dir) {
                    // Descend.
                    Some(child) => parent = child,

                    // Set the new node as child.
                    None => {
                        let was_leaf = node::links(parent).is_leaf();
                        node::links_mut(parent).set_child(dir, Some(ptr));
                        node::links_mut(ptr).set_parent(Some(parent));
                        break was_leaf;
                    }
                }
            }
        };

        self.len += 1;

        if parent_was_leaf {
            // The parent node is rank 0 and the newly inserted node is also rank 0, which violates
            // the rank rule.
            self.rebalance_inserted(ptr);
        }
    }

    /// Returns `true` if the tree contains an entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the value associated with `key`.
    ///
    /// If several entries share the key, the one closest to the root is returned.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(node::value(ptr)) }
    }

    /// Returns the stored key and value associated with `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some((node::key(ptr), node::value(ptr))) }
    }

    /// Returns a mutable reference to the value associated with `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(node::value_mut(ptr)) }
    }

    /// Returns a cursor pointing at the entry for `key`.
    ///
    /// If there is no such entry, the cursor points at the "ghost" non-element.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        Cursor::at(self, ptr)
    }

    /// Returns an editing cursor pointing at the entry for `key`.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key);
        CursorMut::at(self, ptr)
    }

    /// Removes the entry for `key`, returning its value.
    ///
    /// Removing a missing key leaves the tree unchanged.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry for `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        Some(unsafe { self.remove_at(ptr) })
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(node::key(cur).borrow()) {
                    Ordering::Less => opt_cur = node::links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = node::links(cur).right(),
                }
            }
        }
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Some(root) = self.root {
            unsafe {
                assert_eq!(node::links(root).parent(), None, "root has a parent");
                assert_eq!(self.assert_invariants_at(root), self.len, "len mismatch");
            }
        } else {
            assert_eq!(self.len, 0);
        }

        let mut iter = self.iter();
        if let Some((mut prev, _)) = iter.next() {
            for (key, _) in iter {
                assert!(prev <= key, "keys out of order");
                prev = key;
            }
        }
    }

    // Returns the number of nodes in the subtree.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(&self, node: NonNull<Node<K, V>>) -> usize {
        unsafe {
            let rank = node::links(node).rank();
            let mut count = 1;

            // Ensure all leaves have rank 0.
            if node::links(node).is_leaf() {
                assert_eq!(rank, 0, "leaf with nonzero rank");
            }

            for dir in [Dir::Left, Dir::Right] {
                let child = node::links(node).child(dir);

                // Ensure all rank differences are 1 or 2. A missing child has rank -1.
                let rank_diff = rank - node::rank(child);
                assert!([1, 2].contains(&rank_diff), "rank difference {rank_diff}");

                if let Some(child) = child {
                    // Ensure child's parent link points to this node.
                    let parent = node::links(child)
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent);

                    count += self.assert_invariants_at(child);
                }
            }

            count
        }
    }
}

impl<K, V> Default for WavlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for WavlTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for WavlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'tree, K, V> IntoIterator for &'tree WavlTree<K, V> {
    type Item = (&'tree K, &'tree V);
    type IntoIter = Iter<'tree, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'tree, K, V> IntoIterator for &'tree mut WavlTree<K, V> {
    type Item = (&'tree K, &'tree mut V);
    type IntoIter = IterMut<'tree, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for WavlTree<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}
