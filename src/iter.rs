//! Pre-order traversal iterators.
//!
//! All of them walk the trie with an explicit stack of child iterators, one
//! frame per depth, so enumeration is lazy and never recurses.

use std::iter::FusedIterator;
use std::{mem, slice, vec};

use crate::MultiKeyMap;

type Child<K, V> = (K, MultiKeyMap<K, V>);

/// Pre-order walk over every node, valued or not. Shared by the borrowing
/// iterators so the visiting order is defined in one place.
struct Walk<'a, K, V> {
    pending: Option<&'a MultiKeyMap<K, V>>,
    stack: Vec<slice::Iter<'a, Child<K, V>>>,
}

impl<'a, K, V> Walk<'a, K, V> {
    fn new(map: &'a MultiKeyMap<K, V>) -> Self {
        Self {
            pending: Some(map),
            stack: Vec::new(),
        }
    }

    /// Next node with its depth and the key element leading to it. The root
    /// comes first, at depth 0 and without a key.
    fn next_node(&mut self) -> Option<(usize, Option<&'a K>, &'a MultiKeyMap<K, V>)> {
        if let Some(root) = self.pending.take() {
            self.stack.push(root.children.iter());
            return Some((0, None, root));
        }

        loop {
            let frame = self.stack.last_mut()?;
            match frame.next() {
                Some((key, child)) => {
                    let depth = self.stack.len();
                    self.stack.push(child.children.iter());
                    return Some((depth, Some(key), child));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Borrowing iterator over `(path, &value)`, see [`MultiKeyMap::iter`].
pub struct Iter<'a, K, V> {
    walk: Walk<'a, K, V>,
    path: Vec<K>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(map: &'a MultiKeyMap<K, V>) -> Self {
        Self {
            walk: Walk::new(map),
            path: Vec::new(),
        }
    }
}

impl<'a, K: Clone, V> Iterator for Iter<'a, K, V> {
    type Item = (Vec<K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, key, node) = self.walk.next_node()?;
            if let Some(key) = key {
                self.path.truncate(depth - 1);
                self.path.push(key.clone());
            }
            if let Some(value) = &node.value {
                return Some((self.path.clone(), value));
            }
        }
    }
}

impl<K: Clone, V> FusedIterator for Iter<'_, K, V> {}

/// Key paths in enumeration order, see [`MultiKeyMap::keys`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(map: &'a MultiKeyMap<K, V>) -> Self {
        Self {
            inner: Iter::new(map),
        }
    }
}

impl<K: Clone, V> Iterator for Keys<'_, K, V> {
    type Item = Vec<K>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(path, _)| path)
    }
}

impl<K: Clone, V> FusedIterator for Keys<'_, K, V> {}

/// Values in enumeration order, see [`MultiKeyMap::values`].
pub struct Values<'a, K, V> {
    walk: Walk<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(map: &'a MultiKeyMap<K, V>) -> Self {
        Self {
            walk: Walk::new(map),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (_, _, node) = self.walk.next_node()?;
            if let Some(value) = &node.value {
                return Some(value);
            }
        }
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Owning iterator over `(path, value)`, in the same order as [`Iter`].
///
/// Nodes are emptied as they are reached, so what is left on the stack when
/// the iterator is dropped is only the unvisited remainder.
pub struct IntoIter<K, V> {
    pending: Option<MultiKeyMap<K, V>>,
    stack: Vec<vec::IntoIter<Child<K, V>>>,
    path: Vec<K>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(map: MultiKeyMap<K, V>) -> Self {
        Self {
            pending: Some(map),
            stack: Vec::new(),
            path: Vec::new(),
        }
    }
}

impl<K: Clone, V> Iterator for IntoIter<K, V> {
    type Item = (Vec<K>, V);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(mut root) = self.pending.take() {
            self.stack.push(mem::take(&mut root.children).into_iter());
            if let Some(value) = root.value.take() {
                return Some((Vec::new(), value));
            }
        }

        // `path.len() + 1 == stack.len()` between calls.
        loop {
            let frame = self.stack.last_mut()?;
            match frame.next() {
                Some((key, mut child)) => {
                    self.path.push(key);
                    self.stack.push(mem::take(&mut child.children).into_iter());
                    if let Some(value) = child.value.take() {
                        return Some((self.path.clone(), value));
                    }
                }
                None => {
                    self.stack.pop();
                    self.path.pop();
                }
            }
        }
    }
}

impl<K: Clone, V> FusedIterator for IntoIter<K, V> {}
