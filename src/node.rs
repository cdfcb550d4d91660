use alloc::boxed::Box;
use core::{
    mem,
    ops::Not,
    ptr::{self, NonNull},
};

use cordyceps::Linked;

pub(crate) type Link<K, V> = Option<NonNull<Node<K, V>>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// A tree vertex. Owns exactly one entry of the map.
pub(crate) struct Node<K, V> {
    links: Links<K, V>,
    pub(crate) key: K,
    pub(crate) value: V,
}

pub(crate) struct Links<K, V> {
    parent: Link<K, V>,
    children: [Link<K, V>; 2],
    rank: i8,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V) -> Box<Self> {
        Box::new(Node {
            links: Links::new(),
            key,
            value,
        })
    }

    pub(crate) fn into_entry(self: Box<Self>) -> (K, V) {
        let Node { key, value, .. } = *self;
        (key, value)
    }
}

unsafe impl<K, V> Linked<Links<K, V>> for Node<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<K, V>> {
        let ptr = ptr.as_ptr();
        // SAFETY: a field of a non-null node is non-null.
        unsafe { NonNull::new_unchecked(ptr::addr_of_mut!((*ptr).links)) }
    }
}

// The accessors below hand out references with an unbounded lifetime. Callers keep them as
// temporaries: a reference to a node's links must not outlive a mutation of the same links.

#[inline]
pub(crate) unsafe fn links<'a, K, V>(node: NonNull<Node<K, V>>) -> &'a Links<K, V> {
    unsafe { <Node<K, V> as Linked<Links<K, V>>>::links(node).as_ref() }
}

#[inline]
pub(crate) unsafe fn links_mut<'a, K, V>(node: NonNull<Node<K, V>>) -> &'a mut Links<K, V> {
    unsafe { <Node<K, V> as Linked<Links<K, V>>>::links(node).as_mut() }
}

#[inline]
pub(crate) unsafe fn key<'a, K, V>(node: NonNull<Node<K, V>>) -> &'a K {
    unsafe { &(*node.as_ptr()).key }
}

#[inline]
pub(crate) unsafe fn value<'a, K, V>(node: NonNull<Node<K, V>>) -> &'a V {
    unsafe { &(*node.as_ptr()).value }
}

#[inline]
pub(crate) unsafe fn value_mut<'a, K, V>(node: NonNull<Node<K, V>>) -> &'a mut V {
    unsafe { &mut (*node.as_ptr()).value }
}

/// Returns the rank of the pointed-to node, or -1 for a missing node.
#[inline]
pub(crate) unsafe fn rank<K, V>(node: Link<K, V>) -> i8 {
    node.map(|n| unsafe { links(n).rank() }).unwrap_or(-1)
}

/// Exchanges the entries held by two distinct nodes without touching their links.
pub(crate) unsafe fn swap_entries<K, V>(a: NonNull<Node<K, V>>, b: NonNull<Node<K, V>>) {
    debug_assert_ne!(a, b);

    unsafe {
        let (a, b) = (a.as_ptr(), b.as_ptr());
        ptr::swap(ptr::addr_of_mut!((*a).key), ptr::addr_of_mut!((*b).key));
        ptr::swap(ptr::addr_of_mut!((*a).value), ptr::addr_of_mut!((*b).value));
    }
}

/// Returns the minimum node in the subtree rooted at `root`.
#[inline]
pub(crate) unsafe fn min_in_subtree<K, V>(root: NonNull<Node<K, V>>) -> NonNull<Node<K, V>> {
    let mut cur = root;

    while let Some(left) = unsafe { links(cur).left() } {
        cur = left;
    }

    cur
}

/// Returns the maximum node in the subtree rooted at `root`.
#[inline]
pub(crate) unsafe fn max_in_subtree<K, V>(root: NonNull<Node<K, V>>) -> NonNull<Node<K, V>> {
    let mut cur = root;

    while let Some(right) = unsafe { links(cur).right() } {
        cur = right;
    }

    cur
}

/// Returns the in-order successor of `node`.
///
/// If `node` has a right subtree, this is that subtree's minimum. Otherwise it is the first
/// ancestor reached through a left-child edge.
pub(crate) unsafe fn successor<K, V>(node: NonNull<Node<K, V>>) -> Link<K, V> {
    unsafe {
        if let Some(right) = links(node).right() {
            return Some(min_in_subtree(right));
        }

        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).left() == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }
}

/// Returns the in-order predecessor of `node`.
pub(crate) unsafe fn predecessor<K, V>(node: NonNull<Node<K, V>>) -> Link<K, V> {
    unsafe {
        if let Some(left) = links(node).left() {
            return Some(max_in_subtree(left));
        }

        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).right() == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }
}

impl<K, V> Links<K, V> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            parent: None,
            children: [None; 2],
            rank: 0,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn rank(&self) -> i8 {
        self.rank
    }

    #[inline]
    pub(crate) fn parent(&self) -> Link<K, V> {
        self.parent
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link<K, V> {
        self.children[dir as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> Link<K, V> {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link<K, V> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Link<K, V>) -> Link<K, V> {
        mem::replace(&mut self.parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link<K, V>) -> Link<K, V> {
        mem::replace(&mut self.children[dir as usize], child)
    }

    /// Detaches these links from every other node and resets the rank.
    #[inline]
    pub(crate) fn clear(&mut self) {
        *self = Links::new();
    }

    #[inline]
    pub(crate) fn promote(&mut self) {
        self.rank = self.rank.checked_add(1).expect("rank overflow");
    }

    #[inline]
    pub(crate) fn promote_twice(&mut self) {
        self.rank = self.rank.checked_add(2).expect("rank overflow");
    }

    #[inline]
    pub(crate) fn demote(&mut self) {
        self.rank = self.rank.checked_sub(1).expect("rank underflow");
        debug_assert!(self.rank >= 0, "demoted below rank 0");
    }

    #[inline]
    pub(crate) fn demote_twice(&mut self) {
        self.rank = self.rank.checked_sub(2).expect("rank underflow");
        debug_assert!(self.rank >= 0, "demoted below rank 0");
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::{prelude::v1::*, vec};

    use super::*;

    // Builds a right-leaning chain 0 -> 1 -> 2 of leaked nodes and returns them.
    fn chain() -> Vec<NonNull<Node<u32, ()>>> {
        let nodes: Vec<_> = (0..3)
            .map(|k| <Node<u32, ()> as Linked<Links<u32, ()>>>::into_ptr(Node::new(k, ())))
            .collect();

        unsafe {
            for pair in nodes.windows(2) {
                links_mut(pair[0]).set_child(Dir::Right, Some(pair[1]));
                links_mut(pair[1]).set_parent(Some(pair[0]));
            }
        }

        nodes
    }

    fn free(nodes: Vec<NonNull<Node<u32, ()>>>) {
        for node in nodes {
            drop(unsafe { <Node<u32, ()> as Linked<Links<u32, ()>>>::from_ptr(node) });
        }
    }

    #[test]
    fn dir_not() {
        assert_eq!(!Dir::Left, Dir::Right);
        assert_eq!(!Dir::Right, Dir::Left);
    }

    #[test]
    fn rank_of_missing_node() {
        assert_eq!(unsafe { rank::<u32, ()>(None) }, -1);
    }

    #[test]
    fn promote_and_demote() {
        let mut links: Links<u32, ()> = Links::new();
        assert_eq!(links.rank(), 0);

        links.promote();
        links.promote_twice();
        assert_eq!(links.rank(), 3);

        links.demote();
        links.demote_twice();
        assert_eq!(links.rank(), 0);
    }

    #[test]
    fn successor_and_predecessor_walk_the_chain() {
        let nodes = chain();

        unsafe {
            let keys: Vec<u32> =
                core::iter::successors(Some(nodes[0]), |&n| successor(n)).map(|n| *key(n)).collect();
            assert_eq!(keys, vec![0, 1, 2]);

            let keys: Vec<u32> = core::iter::successors(Some(nodes[2]), |&n| predecessor(n))
                .map(|n| *key(n))
                .collect();
            assert_eq!(keys, vec![2, 1, 0]);

            assert_eq!(min_in_subtree(nodes[0]), nodes[0]);
            assert_eq!(max_in_subtree(nodes[0]), nodes[2]);
        }

        free(nodes);
    }

    #[test]
    fn swap_entries_keeps_links() {
        let nodes = chain();

        unsafe {
            swap_entries(nodes[0], nodes[2]);
            assert_eq!(*key(nodes[0]), 2);
            assert_eq!(*key(nodes[2]), 0);
            assert_eq!(links(nodes[0]).right(), Some(nodes[1]));
            assert_eq!(links(nodes[2]).parent(), Some(nodes[1]));
        }

        free(nodes);
    }
}
