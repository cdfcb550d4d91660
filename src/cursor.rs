use core::{marker::PhantomData, mem, ptr::NonNull};

use crate::{
    node::{self, Link},
    WavlTree,
};

/// A cursor over a [`WavlTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. A cursor at the ghost is exhausted.
pub struct Cursor<'tree, K, V> {
    curs: CursorRaw<K, V>,
    phantom: PhantomData<&'tree WavlTree<K, V>>,
}

impl<'tree, K, V> Cursor<'tree, K, V> {
    pub(crate) fn first(tree: &'tree WavlTree<K, V>) -> Cursor<'tree, K, V> {
        Cursor::at(tree, tree.root().map(|r| unsafe { node::min_in_subtree(r) }))
    }

    pub(crate) fn last(tree: &'tree WavlTree<K, V>) -> Cursor<'tree, K, V> {
        Cursor::at(tree, tree.root().map(|r| unsafe { node::max_in_subtree(r) }))
    }

    pub(crate) fn at(tree: &'tree WavlTree<K, V>, ptr: Link<K, V>) -> Cursor<'tree, K, V> {
        Cursor {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Returns `true` if the cursor points to the "ghost" non-element.
    pub fn is_ghost(&self) -> bool {
        self.curs.ptr.is_none()
    }

    /// Moves the cursor to the next element of the `WavlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the `WavlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns the entry pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<(&'tree K, &'tree V)> {
        self.curs
            .ptr
            .map(|p| unsafe { (node::key(p), node::value(p)) })
    }

    /// Returns the key of the entry pointed to by the cursor.
    pub fn key(&self) -> Option<&'tree K> {
        self.get().map(|(k, _)| k)
    }

    /// Returns the value of the entry pointed to by the cursor.
    pub fn value(&self) -> Option<&'tree V> {
        self.get().map(|(_, v)| v)
    }

    /// Returns the next entry.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<(&'tree K, &'tree V)> {
        unsafe { self.curs.peek_next() }.map(|p| unsafe { (node::key(p), node::value(p)) })
    }

    /// Returns the previous entry.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<(&'tree K, &'tree V)> {
        unsafe { self.curs.peek_prev() }.map(|p| unsafe { (node::key(p), node::value(p)) })
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }
}

/// A cursor over a [`WavlTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct CursorMut<'tree, K, V> {
    curs: CursorRaw<K, V>,
    phantom: PhantomData<&'tree mut WavlTree<K, V>>,
}

impl<'tree, K, V> CursorMut<'tree, K, V> {
    pub(crate) fn first(tree: &'tree mut WavlTree<K, V>) -> CursorMut<'tree, K, V> {
        let ptr = tree.root().map(|r| unsafe { node::min_in_subtree(r) });
        CursorMut::at(tree, ptr)
    }

    pub(crate) fn last(tree: &'tree mut WavlTree<K, V>) -> CursorMut<'tree, K, V> {
        let ptr = tree.root().map(|r| unsafe { node::max_in_subtree(r) });
        CursorMut::at(tree, ptr)
    }

    pub(crate) fn at(tree: &'tree mut WavlTree<K, V>, ptr: Link<K, V>) -> CursorMut<'tree, K, V> {
        CursorMut {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Returns `true` if the cursor points to the "ghost" non-element.
    pub fn is_ghost(&self) -> bool {
        self.curs.ptr.is_none()
    }

    /// Moves the cursor to the next element of the `WavlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the first
    /// element. If it is pointing to the last element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the `WavlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the last
    /// element. If it is pointing to the first element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns the entry pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<(&K, &V)> {
        self.curs
            .ptr
            .map(|p| unsafe { (node::key(p), node::value(p)) })
    }

    /// Returns the key of the entry pointed to by the cursor.
    pub fn key(&self) -> Option<&K> {
        self.get().map(|(k, _)| k)
    }

    /// Returns the value of the entry pointed to by the cursor.
    pub fn value(&self) -> Option<&V> {
        self.get().map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value pointed to by the cursor.
    ///
    /// Values do not take part in ordering, so they can be changed freely.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        self.curs.ptr.map(|p| unsafe { node::value_mut(p) })
    }

    /// Replaces the value pointed to by the cursor, returning the old value.
    ///
    /// If the cursor is pointing to the "ghost" non-element, `value` is handed back unchanged as
    /// `Err`.
    pub fn set(&mut self, value: V) -> Result<V, V> {
        match self.value_mut() {
            Some(slot) => Ok(mem::replace(slot, value)),
            None => Err(value),
        }
    }

    /// Returns the next entry.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<(&K, &V)> {
        unsafe { self.curs.peek_next() }.map(|p| unsafe { (node::key(p), node::value(p)) })
    }

    /// Returns the previous entry.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<(&K, &V)> {
        unsafe { self.curs.peek_prev() }.map(|p| unsafe { (node::key(p), node::value(p)) })
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed entry and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        unsafe { self.curs.remove_current() }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed entry and moves the cursor to the previous element. If the cursor
    /// is pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current_and_move_prev(&mut self) -> Option<(K, V)> {
        unsafe { self.curs.remove_current_and_move_prev() }
    }
}

struct CursorRaw<K, V> {
    tree: NonNull<WavlTree<K, V>>,
    ptr: Link<K, V>,
}

impl<K, V> CursorRaw<K, V> {
    fn first(&self) -> Link<K, V> {
        let root = unsafe { self.tree.as_ref().root() };
        root.map(|r| unsafe { node::min_in_subtree(r) })
    }

    fn last(&self) -> Link<K, V> {
        let root = unsafe { self.tree.as_ref().root() };
        root.map(|r| unsafe { node::max_in_subtree(r) })
    }

    unsafe fn move_next(&mut self) {
        self.ptr = unsafe { self.peek_next() };
    }

    unsafe fn move_prev(&mut self) {
        self.ptr = unsafe { self.peek_prev() };
    }

    unsafe fn peek_next(&self) -> Link<K, V> {
        match self.ptr {
            Some(p) => unsafe { node::successor(p) },
            None => self.first(),
        }
    }

    unsafe fn peek_prev(&self) -> Link<K, V> {
        match self.ptr {
            Some(p) => unsafe { node::predecessor(p) },
            None => self.last(),
        }
    }

    unsafe fn remove_current(&mut self) -> Option<(K, V)> {
        let remove = self.ptr?;

        // A binary node takes over its successor's entry and the successor's node is freed, so
        // the cursor already points at the next element once the removal is done.
        let binary = unsafe {
            node::links(remove).left().is_some() && node::links(remove).right().is_some()
        };
        if !binary {
            unsafe { self.move_next() };
        }

        let tree = unsafe { self.tree.as_mut() };
        Some(unsafe { tree.remove_at(remove) })
    }

    unsafe fn remove_current_and_move_prev(&mut self) -> Option<(K, V)> {
        let remove = self.ptr?;

        // The predecessor is never the node that gets freed.
        unsafe { self.move_prev() };

        let tree = unsafe { self.tree.as_mut() };
        Some(unsafe { tree.remove_at(remove) })
    }
}
