use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

fn validate_map<K: Hash + Eq, V>(m: &MultiKeyMap<K, V>) {
    let mut stack = vec![m];
    while let Some(node) = stack.pop() {
        assert_eq!(
            node.index.len(),
            node.children.len(),
            "index must cover every child exactly once"
        );
        for (idx, (key, child)) in node.children.iter().enumerate() {
            assert_eq!(
                node.index.get(key),
                Some(&idx),
                "index must point at the child's position"
            );
            stack.push(child);
        }
    }
}

/// Reference model: a flat map of entries plus the order in which each path
/// prefix was first created, which fully determines enumeration order.
#[derive(Default)]
struct Model {
    entries: HashMap<Vec<u8>, u16>,
    created: HashMap<Vec<u8>, usize>,
    next_rank: usize,
}

impl Model {
    fn insert(&mut self, path: &[u8], value: u16) -> Option<u16> {
        for len in 1..=path.len() {
            if !self.created.contains_key(&path[..len]) {
                self.created.insert(path[..len].to_vec(), self.next_rank);
                self.next_rank += 1;
            }
        }
        self.entries.insert(path.to_vec(), value)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.created.clear();
    }

    fn prune(&mut self) -> usize {
        let entries = &self.entries;
        let before = self.created.len();
        self.created
            .retain(|prefix, _| entries.keys().any(|path| path.starts_with(prefix)));
        before - self.created.len()
    }

    fn ordered(&self) -> Vec<(Vec<u8>, u16)> {
        let mut out: Vec<(Vec<u8>, u16)> =
            self.entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by_cached_key(|(path, _)| {
            (1..=path.len())
                .map(|len| self.created[&path[..len]])
                .collect::<Vec<usize>>()
        });
        out
    }
}

fn path_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A tiny alphabet keeps paths colliding and sharing prefixes.
    prop::collection::vec(0u8..3, 0..=4)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 10)]
    Set {
        #[proptest(strategy = "path_strategy()")]
        path: Vec<u8>,
        value: u16,
    },
    #[proptest(weight = 5)]
    Delete {
        #[proptest(strategy = "path_strategy()")]
        path: Vec<u8>,
    },
    #[proptest(weight = 4)]
    Get {
        #[proptest(strategy = "path_strategy()")]
        path: Vec<u8>,
    },
    #[proptest(weight = 1)]
    Prune,
    #[proptest(weight = 1)]
    Clear,
}

fn render(entries: &[(Vec<u8>, u16)]) -> String {
    entries
        .iter()
        .map(|(path, value)| {
            let keys: Vec<String> = path.iter().map(|k| k.to_string()).collect();
            format!("[{}]:{}", keys.join(","), value)
        })
        .collect::<Vec<_>>()
        .join(";")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=300)) {
        let mut m: MultiKeyMap<u8, u16> = MultiKeyMap::new();
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Set { path, value } => {
                    let old_m = m.insert(path.clone(), value);
                    let old_model = model.insert(&path, value);
                    prop_assert_eq!(old_m, old_model);
                }
                Op::Delete { path } => {
                    let removed = model.entries.remove(&path).is_some();
                    prop_assert_eq!(m.delete(&path), removed);
                    prop_assert!(!m.has(&path));
                }
                Op::Get { path } => {
                    prop_assert_eq!(m.get(&path), model.entries.get(&path));
                    prop_assert_eq!(m.has(&path), model.entries.contains_key(&path));
                }
                Op::Prune => {
                    let before: Vec<(Vec<u8>, u16)> = m.iter().map(|(k, v)| (k, *v)).collect();
                    prop_assert_eq!(m.prune(), model.prune());
                    let after: Vec<(Vec<u8>, u16)> = m.iter().map(|(k, v)| (k, *v)).collect();
                    prop_assert_eq!(before, after);
                }
                Op::Clear => {
                    m.clear();
                    model.clear();
                    prop_assert!(m.is_empty());
                }
            }

            prop_assert_eq!(m.len(), model.entries.len());
        }

        validate_map(&m);

        let expected = model.ordered();
        let got: Vec<(Vec<u8>, u16)> = m.iter().map(|(k, v)| (k, *v)).collect();
        prop_assert_eq!(&got, &expected);

        let keys: Vec<Vec<u8>> = m.keys().collect();
        let expected_keys: Vec<Vec<u8>> = expected.iter().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(keys, expected_keys);

        let values: Vec<u16> = m.values().copied().collect();
        let expected_values: Vec<u16> = expected.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(values, expected_values);

        let mut visited = Vec::new();
        m.for_each(|value, path, _| visited.push((path.to_vec(), *value)));
        prop_assert_eq!(&visited, &expected);

        prop_assert_eq!(m.to_string(), render(&expected));

        let owned: Vec<(Vec<u8>, u16)> = m.clone().into_iter().collect();
        prop_assert_eq!(owned, expected);
    }

    #[test]
    fn prop_from_entries_matches_sets(
        entries in prop::collection::vec((path_strategy(), any::<u16>()), 0..=64)
    ) {
        let built: MultiKeyMap<u8, u16> = MultiKeyMap::from_entries(entries.clone());
        let mut manual: MultiKeyMap<u8, u16> = MultiKeyMap::new();
        for (path, value) in entries {
            manual.set(path, value);
        }
        validate_map(&built);
        prop_assert_eq!(built, manual);
    }
}

/// Calls `f` once for every ordering of `items`, generated by swapping each
/// remaining element into the next fixed position.
fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn permute<T: Clone>(items: &mut Vec<T>, fixed: usize, f: &mut impl FnMut(Vec<T>)) {
        if fixed == items.len() {
            f(items.clone());
            return;
        }
        for i in fixed..items.len() {
            items.swap(fixed, i);
            permute(items, fixed + 1, f);
            items.swap(fixed, i);
        }
    }

    let mut items = items.to_vec();
    permute(&mut items, 0, &mut f);
}

/// Top-level children enumerate in the order they were first set, for every
/// insertion order, even when grandchildren are added in the opposite order.
#[test]
fn exhaustive_top_level_order_follows_first_insertion() {
    let tops = ["a", "b", "c", "d"];

    for_each_permutation(&tops, |perm| {
        let mut m: MultiKeyMap<&str, usize> = MultiKeyMap::new();
        for (i, top) in perm.iter().enumerate() {
            m.set([*top], i);
        }
        // Descendants added afterwards, in reverse, must not reorder the tops.
        for (i, top) in perm.iter().rev().enumerate() {
            m.set([*top, "x"], 100 + i);
        }
        validate_map(&m);

        let tops_seen: Vec<&str> = m
            .keys()
            .filter(|path| path.len() == 1)
            .map(|path| path[0])
            .collect();
        assert_eq!(tops_seen, perm);

        let expected: Vec<String> = perm
            .iter()
            .enumerate()
            .map(|(i, top)| format!("[{top}]:{i};[{top},x]:{}", 100 + perm.len() - 1 - i))
            .collect();
        assert_eq!(m.to_string(), expected.join(";"));
    });
}

/// Deleting every entry in every order only ever removes the targeted entry,
/// never disturbs the others, and leaves a trie of empty nodes that `prune`
/// clears completely.
#[test]
fn exhaustive_delete_order_small_set() {
    let paths: Vec<Vec<u8>> = vec![vec![], vec![0], vec![0, 0], vec![0, 1], vec![1], vec![1, 0, 0]];

    let mut base: MultiKeyMap<u8, usize> = MultiKeyMap::new();
    for (i, path) in paths.iter().enumerate() {
        base.set(path.clone(), i);
    }

    for_each_permutation(&paths, |perm| {
        let mut m = base.clone();
        let mut remaining = paths.len();

        for path in perm {
            assert!(m.delete(&path));
            assert!(!m.delete(&path));
            remaining -= 1;
            assert_eq!(m.len(), remaining);
            for other in &paths {
                if m.has(other) {
                    let idx = paths.iter().position(|p| p == other).unwrap();
                    assert_eq!(m.get(other), Some(&idx));
                }
            }
            validate_map(&m);
        }
        assert!(m.is_empty());
        assert_eq!(m.prune(), 6);
        assert!(m.children.is_empty());
    });
}
