use alloc::{collections::VecDeque, string::String, vec::Vec};
use core::{fmt, marker::PhantomData, ptr::NonNull};

use crate::{
    node::{self, Node},
    WavlTree,
};

/// A pre-order walk over a [`WavlTree`]: each node, then its left subtree, then its right subtree.
///
/// Yields the entry, its rank, and its depth below the root. Meant for diagnostics; the order
/// depends on the shape of the tree, not only on its keys.
pub struct Preorder<'tree, K, V> {
    stack: Vec<(NonNull<Node<K, V>>, usize)>,
    _tree: PhantomData<&'tree WavlTree<K, V>>,
}

impl<'tree, K, V> Iterator for Preorder<'tree, K, V> {
    type Item = PreorderEntry<'tree, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let (cur, depth) = self.stack.pop()?;

        unsafe {
            // Push right first so the left subtree is walked first.
            if let Some(right) = node::links(cur).right() {
                self.stack.push((right, depth + 1));
            }
            if let Some(left) = node::links(cur).left() {
                self.stack.push((left, depth + 1));
            }

            Some(PreorderEntry {
                key: node::key(cur),
                value: node::value(cur),
                rank: node::links(cur).rank(),
                depth,
            })
        }
    }
}

/// An entry yielded by [`Preorder`].
#[derive(Debug)]
pub struct PreorderEntry<'tree, K, V> {
    pub key: &'tree K,
    pub value: &'tree V,
    pub rank: i8,
    pub depth: usize,
}

impl<K, V> WavlTree<K, V> {
    /// Returns a pre-order walk over the tree.
    pub fn preorder(&self) -> Preorder<'_, K, V> {
        let mut stack = Vec::new();
        if let Some(root) = self.root() {
            stack.push((root, 0));
        }

        Preorder {
            stack,
            _tree: PhantomData,
        }
    }

    /// Writes the tree in pre-order, one node per line, indented by depth.
    pub fn write_preorder<W>(&self, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
        K: fmt::Debug,
        V: fmt::Debug,
    {
        for entry in self.preorder() {
            writeln!(
                w,
                "{:indent$}{:?} => {:?} (rank {})",
                "",
                entry.key,
                entry.value,
                entry.rank,
                indent = entry.depth * 2,
            )?;
        }

        Ok(())
    }

    /// Writes the tree as a Graphviz digraph. Nodes are labelled `key:rank`.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
        K: fmt::Debug,
    {
        let root = match self.root() {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<K, V> {
            Node(NonNull<Node<K, V>>, usize),
            Missing(u32),
        }

        // Nodes are identified by their in-order position, since keys may repeat.
        let mut positions = Vec::with_capacity(self.len());
        let mut cur = Some(unsafe { node::min_in_subtree(root) });
        while let Some(n) = cur {
            positions.push(n);
            cur = unsafe { node::successor(n) };
        }
        let id = |n: NonNull<Node<K, V>>| positions.iter().position(|&p| p == n).unwrap_or(0);

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root, id(root)));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let (node, node_id) = match queue.pop_front() {
                    Some(Item::Node(node, node_id)) => (node, node_id),
                    Some(Item::Missing(m)) => {
                        write!(w, "\"graph{name}-missing{m}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = unsafe { node::key(node) };
                let rank = unsafe { node::links(node).rank() };
                write!(w, "\"graph{name}-{node_id}\" [label=\"{key:?}:{rank}\"]; ")?;

                for child in unsafe { [node::links(node).left(), node::links(node).right()] } {
                    match child {
                        Some(child) => {
                            let child_id = id(child);
                            queue.push_back(Item::Node(child, child_id));
                            writeln!(links, "\"graph{name}-{node_id}\" -> \"graph{name}-{child_id}\";")?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{node_id}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
