// Copyright 2025 Cowboy AI, LLC.

//! Linear extension of a finite partial order
//!
//! Kahn-style pass sort: each pass emits every node that no remaining node
//! points at, in input order. A pass that emits nothing means the remainder
//! is cyclic.

use indexmap::IndexSet;
use std::fmt;
use std::hash::Hash;

/// The nodes left when no further root could be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicOrder<T> {
    /// Unresolved nodes, in input order
    pub unresolved: Vec<T>,
}

impl<T: fmt::Debug> fmt::Display for CyclicOrder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cyclic order among {:?}", self.unresolved)
    }
}

impl<T: fmt::Debug> std::error::Error for CyclicOrder<T> {}

/// Order `items` so every node precedes all of its successors
///
/// `successors(x)` names the nodes that must come after `x`; names outside
/// `items` are ignored. Duplicate items are kept once, at their first
/// position. The result depends only on the input order and the relation.
pub fn linear_extension<T, F, I>(items: &[T], mut successors: F) -> Result<Vec<T>, CyclicOrder<T>>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let nodes: IndexSet<T> = items.iter().cloned().collect();
    let mut edges: Vec<IndexSet<usize>> = Vec::with_capacity(nodes.len());
    let mut in_degree = vec![0usize; nodes.len()];

    for node in &nodes {
        let mut targets = IndexSet::new();
        for succ in successors(node) {
            if let Some(index) = nodes.get_index_of(&succ) {
                if targets.insert(index) {
                    in_degree[index] += 1;
                }
            }
        }
        edges.push(targets);
    }

    let mut remaining: Vec<usize> = (0..nodes.len()).collect();
    let mut ordered = Vec::with_capacity(nodes.len());

    while !remaining.is_empty() {
        let (roots, rest): (Vec<usize>, Vec<usize>) =
            remaining.iter().partition(|&&i| in_degree[i] == 0);

        if roots.is_empty() {
            return Err(CyclicOrder {
                unresolved: rest.iter().map(|&i| nodes[i].clone()).collect(),
            });
        }

        for &root in &roots {
            for &succ in &edges[root] {
                in_degree[succ] -= 1;
            }
            ordered.push(nodes[root].clone());
        }
        remaining = rest;
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn relation(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, Vec<&'static str>> {
        let mut map: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for (from, to) in pairs {
            map.entry(*from).or_default().push(*to);
        }
        map
    }

    #[test]
    fn test_edgeless_nodes_keep_input_order() {
        let order = linear_extension(&["c", "a", "b"], |_| Vec::new()).unwrap();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_edges_are_honoured() {
        let rel = relation(&[("b", "a"), ("c", "b")]);
        let order = linear_extension(&["a", "b", "c"], |n| {
            rel.get(n).cloned().unwrap_or_default()
        })
        .unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_pass_emits_all_roots_before_descending() {
        // d depends only on a, but b is also a root and must come first
        let rel = relation(&[("a", "d")]);
        let order = linear_extension(&["a", "d", "b"], |n| {
            rel.get(n).cloned().unwrap_or_default()
        })
        .unwrap();
        assert_eq!(order, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_cycle_reports_remainder() {
        let rel = relation(&[("a", "b"), ("b", "a"), ("c", "a")]);
        let err = linear_extension(&["a", "b", "c", "z"], |n| {
            rel.get(n).cloned().unwrap_or_default()
        })
        .unwrap_err();
        assert_eq!(err.unresolved, vec!["a", "b"]);
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let err = linear_extension(&["a"], |n| vec![*n]).unwrap_err();
        assert_eq!(err.unresolved, vec!["a"]);
    }

    #[test]
    fn test_unknown_successors_and_duplicates_ignored() {
        let order = linear_extension(&["a", "b", "a"], |n| {
            if *n == "a" {
                vec!["missing", "b", "b"]
            } else {
                vec![]
            }
        })
        .unwrap();
        assert_eq!(order, vec!["a", "b"]);
    }
}
