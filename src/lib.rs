//! # multikey-map
//!
//! A map addressed by key paths of any length, stored as a trie over the path
//! elements.
//!
//! Every node of the trie is itself a [`MultiKeyMap`]: it holds an optional
//! value and an insertion-ordered set of children, one per next key element.
//! The empty path addresses the root's own value.
//!
//! ## Example
//!
//! ```rust
//! use multikey_map::MultiKeyMap;
//!
//! let mut m: MultiKeyMap<&str, u32> = MultiKeyMap::new();
//! m.set(["I"], 1).set(["I", "I"], 2).set(["I", "V"], 4).set(["V"], 5);
//!
//! assert_eq!(m.get(&["I", "V"]), Some(&4));
//! assert!(!m.has(&["V", "I"]));
//! assert_eq!(m.len(), 4);
//! assert_eq!(m.to_string(), "[I]:1;[I,I]:2;[I,V]:4;[V]:5");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

mod iter;
mod tracing_helpers;

pub use iter::{IntoIter, Iter, Keys, Values};

use tracing_helpers::{debug_log, trace_log};

// =============================================================================
// MultiKeyMap
// =============================================================================

/// A map keyed by ordered sequences of `K`.
///
/// Layout:
/// - `value`: the entry stored at this node's path, `None` when there is none
/// - `children`: child nodes in first-insertion order
/// - `index`: key element -> position in `children`
///
/// Enumeration is depth-first pre-order: a node's own value comes before its
/// children, and children come in the order their key element was first set.
pub struct MultiKeyMap<K, V> {
    value: Option<V>,
    children: Vec<(K, MultiKeyMap<K, V>)>,
    index: HashMap<K, usize>,
}

impl<K, V> MultiKeyMap<K, V> {
    pub fn new() -> Self {
        Self {
            value: None,
            children: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Removes every entry, including the one at the empty path.
    pub fn clear(&mut self) {
        debug_log!(children = self.children.len(), "clearing multi-key map");
        self.value = None;
        self.children.clear();
        self.index.clear();
    }

    /// Number of stored values. Walks the whole trie.
    pub fn len(&self) -> usize {
        self.values().count()
    }

    /// Alias for [`len`](Self::len).
    #[inline]
    pub fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }

    /// Values in enumeration order, without materializing key paths.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self)
    }
}

impl<K: Hash + Eq + Clone, V> MultiKeyMap<K, V> {
    /// Builds a map by applying `set` to each entry in order. Later entries
    /// overwrite earlier ones with the same path.
    pub fn from_entries<P, I>(entries: I) -> Self
    where
        P: IntoIterator<Item = K>,
        I: IntoIterator<Item = (P, V)>,
    {
        entries.into_iter().collect()
    }

    /// Stores `value` at `keys` and returns the map for chaining.
    pub fn set(&mut self, keys: impl IntoIterator<Item = K>, value: V) -> &mut Self {
        self.insert(keys, value);
        self
    }

    /// Stores `value` at `keys`, returning the value it replaced.
    ///
    /// Intermediate nodes are created on demand. A newly created child is
    /// appended after its existing siblings.
    pub fn insert(&mut self, keys: impl IntoIterator<Item = K>, value: V) -> Option<V> {
        let mut node = self;
        for key in keys {
            node = node.child_or_insert(key);
        }
        node.value.replace(value)
    }

    fn child_or_insert(&mut self, key: K) -> &mut Self {
        let existing = self.index.get(&key).copied();
        let idx = match existing {
            Some(idx) => idx,
            None => {
                let idx = self.children.len();
                trace_log!(position = idx, "creating trie node");
                self.index.insert(key.clone(), idx);
                self.children.push((key, Self::new()));
                idx
            }
        };
        &mut self.children[idx].1
    }

    fn child(&self, key: &K) -> Option<&Self> {
        self.index.get(key).map(|&idx| &self.children[idx].1)
    }

    fn child_mut(&mut self, key: &K) -> Option<&mut Self> {
        let idx = *self.index.get(key)?;
        Some(&mut self.children[idx].1)
    }

    fn node(&self, keys: &[K]) -> Option<&Self> {
        let mut node = self;
        for key in keys {
            node = node.child(key)?;
        }
        Some(node)
    }

    fn node_mut(&mut self, keys: &[K]) -> Option<&mut Self> {
        let mut node = self;
        for key in keys {
            node = node.child_mut(key)?;
        }
        Some(node)
    }

    pub fn get(&self, keys: &[K]) -> Option<&V> {
        self.node(keys)?.value.as_ref()
    }

    pub fn get_mut(&mut self, keys: &[K]) -> Option<&mut V> {
        self.node_mut(keys)?.value.as_mut()
    }

    /// Whether a value is stored at exactly `keys`. A node that only exists
    /// as a prefix of longer paths does not count.
    pub fn has(&self, keys: &[K]) -> bool {
        self.get(keys).is_some()
    }

    /// Removes and returns the value at `keys`.
    ///
    /// The node itself stays in place, so its descendants remain reachable
    /// and its position among its siblings is kept if it is set again.
    pub fn remove(&mut self, keys: &[K]) -> Option<V> {
        self.node_mut(keys)?.value.take()
    }

    /// Removes the value at `keys`, returning whether there was one.
    pub fn delete(&mut self, keys: &[K]) -> bool {
        self.remove(keys).is_some()
    }

    /// Drops every descendant node that holds no value and has no valued
    /// descendants. Returns the number of nodes dropped.
    ///
    /// A path whose node was dropped is appended after its siblings if it is
    /// set again.
    pub fn prune(&mut self) -> usize {
        // Post-order rebuild: every node's children are detached into its
        // frame and only the non-empty ones are reattached when it is done.
        let mut removed = 0;
        let mut stack = vec![PruneFrame::detach(None, std::mem::take(self))];

        while let Some(top) = stack.last_mut() {
            if let Some((key, child)) = top.pending.next() {
                stack.push(PruneFrame::detach(Some(key), child));
                continue;
            }

            let Some(frame) = stack.pop() else { break };
            let PruneFrame {
                key,
                mut node,
                kept,
                total,
                ..
            } = frame;
            if kept.len() != total {
                node.index = kept
                    .iter()
                    .enumerate()
                    .map(|(idx, (k, _))| (k.clone(), idx))
                    .collect();
            }
            node.children = kept;

            match (stack.last_mut(), key) {
                (Some(parent), Some(key)) => {
                    if node.value.is_some() || !node.children.is_empty() {
                        parent.kept.push((key, node));
                    } else {
                        removed += 1;
                    }
                }
                _ => *self = node,
            }
        }

        debug_log!(removed, "pruned empty trie nodes");
        removed
    }
}

struct PruneFrame<K, V> {
    key: Option<K>,
    node: MultiKeyMap<K, V>,
    pending: std::vec::IntoIter<(K, MultiKeyMap<K, V>)>,
    kept: Vec<(K, MultiKeyMap<K, V>)>,
    total: usize,
}

impl<K, V> PruneFrame<K, V> {
    fn detach(key: Option<K>, mut node: MultiKeyMap<K, V>) -> Self {
        let children = std::mem::take(&mut node.children);
        let total = children.len();
        Self {
            key,
            node,
            pending: children.into_iter(),
            kept: Vec::with_capacity(total),
            total,
        }
    }
}

impl<K: Clone, V> MultiKeyMap<K, V> {
    /// Calls `f(value, path, map)` for every entry in pre-order. `path` is the
    /// full key path from this map, `map` is the map `for_each` was called on.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&V, &[K], &Self),
    {
        for (path, value) in self.iter() {
            f(value, &path, self);
        }
    }

    /// [`for_each`](Self::for_each) with an explicit context handed to every
    /// call.
    pub fn for_each_with<C, F>(&self, ctx: &mut C, mut f: F)
    where
        F: FnMut(&mut C, &V, &[K], &Self),
    {
        self.for_each(|value, path, map| f(ctx, value, path, map));
    }

    /// `(path, value)` pairs in pre-order. Each call starts a fresh traversal.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    pub fn entries(&self) -> Iter<'_, K, V> {
        self.iter()
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self)
    }
}

impl<K, V> Default for MultiKeyMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tears the subtree down through a work stack, one node at a time.
impl<K, V> Drop for MultiKeyMap<K, V> {
    fn drop(&mut self) {
        let mut stack: Vec<Self> = self.children.drain(..).map(|(_, child)| child).collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.children.drain(..).map(|(_, child)| child));
        }
    }
}

struct CloneFrame<'a, K, V> {
    src: &'a MultiKeyMap<K, V>,
    built: Vec<(K, MultiKeyMap<K, V>)>,
}

impl<K: Clone, V: Clone> Clone for MultiKeyMap<K, V> {
    fn clone(&self) -> Self {
        // `built.len()` is the index of the next child of `src` to copy.
        let mut stack = vec![CloneFrame {
            src: self,
            built: Vec::with_capacity(self.children.len()),
        }];

        while let Some(top) = stack.last_mut() {
            let src = top.src;
            if let Some((_, child)) = src.children.get(top.built.len()) {
                stack.push(CloneFrame {
                    src: child,
                    built: Vec::with_capacity(child.children.len()),
                });
                continue;
            }

            let children = std::mem::take(&mut top.built);
            stack.pop();
            let node = Self {
                value: src.value.clone(),
                children,
                index: src.index.clone(),
            };
            match stack.last_mut() {
                Some(parent) => {
                    let key = parent.src.children[parent.built.len()].0.clone();
                    parent.built.push((key, node));
                }
                None => return node,
            }
        }

        Self::new()
    }
}

impl<K: fmt::Debug + Clone, V: fmt::Debug> fmt::Debug for MultiKeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Renders entries as `[k0,k1,...]:value`, joined by `;`. An empty map
/// renders as an empty string.
impl<K: fmt::Display + Clone, V: fmt::Display> fmt::Display for MultiKeyMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, (path, value)) in self.iter().enumerate() {
            if n > 0 {
                f.write_str(";")?;
            }
            f.write_str("[")?;
            for (i, key) in path.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{key}")?;
            }
            write!(f, "]:{value}")?;
        }
        Ok(())
    }
}

/// Two maps are equal when they enumerate the same entries in the same order.
impl<K: PartialEq + Clone, V: PartialEq> PartialEq for MultiKeyMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<K: Eq + Clone, V: Eq> Eq for MultiKeyMap<K, V> {}

impl<K, V, P> FromIterator<(P, V)> for MultiKeyMap<K, V>
where
    K: Hash + Eq + Clone,
    P: IntoIterator<Item = K>,
{
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, P> Extend<(P, V)> for MultiKeyMap<K, V>
where
    K: Hash + Eq + Clone,
    P: IntoIterator<Item = K>,
{
    fn extend<I: IntoIterator<Item = (P, V)>>(&mut self, iter: I) {
        for (keys, value) in iter {
            self.insert(keys, value);
        }
    }
}

impl<K, V, P, const N: usize> From<[(P, V); N]> for MultiKeyMap<K, V>
where
    K: Hash + Eq + Clone,
    P: IntoIterator<Item = K>,
{
    fn from(entries: [(P, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a, K: Clone, V> IntoIterator for &'a MultiKeyMap<K, V> {
    type Item = (Vec<K>, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone, V> IntoIterator for MultiKeyMap<K, V> {
    type Item = (Vec<K>, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}


#[cfg(test)]
mod proptests;
