// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A stable variant of Kahn's algorithm for ordering plugins that declare
//! `before`/`after` constraints, plus the independent blacklist pass.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

/// An item that takes part in dependency ordering.
///
/// Every constraint names other items by their [`node_id`](Self::node_id).
/// Names that do not match any item in the sorted set are ignored.
pub trait DependencyNode {
    /// The identifier other items use to refer to this one.
    fn node_id(&self) -> &str;

    /// Identifiers of the items this one must precede.
    fn before(&self) -> &[String];

    /// Identifiers of the items this one must follow.
    fn after(&self) -> &[String];

    /// Identifiers of the items to drop from the set whenever this one is present.
    fn blacklist(&self) -> &[String];
}

impl<T: DependencyNode + ?Sized> DependencyNode for Arc<T> {
    fn node_id(&self) -> &str {
        (**self).node_id()
    }

    fn before(&self) -> &[String] {
        (**self).before()
    }

    fn after(&self) -> &[String] {
        (**self).after()
    }

    fn blacklist(&self) -> &[String] {
        (**self).blacklist()
    }
}

/// The outcome of [`sort_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedNodes<T> {
    /// Items in a valid order.
    pub ordered: Vec<T>,
    /// Items that sit on a cycle, or depend (transitively) on one.
    pub circular: Vec<T>,
}

/// The outcome of [`order_plugins`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOrder<T> {
    /// Surviving items in a valid order.
    pub ordered: Vec<T>,
    /// Items excluded because of a dependency cycle.
    pub circular: Vec<T>,
    /// Items removed by another item's blacklist.
    pub blacklisted: Vec<T>,
}

/// Splits `items` into `(kept, blacklisted)`.
///
/// Every blacklist entry that names a present item marks it for removal. All
/// removals are collected before any filtering happens, so two items that
/// blacklist each other are both removed. An item is never removed by its own
/// presence unless it names itself.
pub fn partition_blacklisted<T: DependencyNode>(items: Vec<T>) -> (Vec<T>, Vec<T>) {
    let present: HashSet<&str> = items.iter().map(|item| item.node_id()).collect();
    let doomed: HashSet<String> = items
        .iter()
        .flat_map(|item| item.blacklist().iter())
        .filter(|name| present.contains(name.as_str()))
        .cloned()
        .collect();

    items
        .into_iter()
        .partition(|item| !doomed.contains(item.node_id()))
}

/// Orders `items` so that every `before`/`after` constraint is honoured.
///
/// Among all items that are ready to be emitted, the one that appeared first in
/// the input is always chosen. Without constraints the input order is returned
/// unchanged, and independent chains keep their relative order.
///
/// Items whose in-degree never drops to zero are reported in
/// [`SortedNodes::circular`] rather than failing the whole sort, which includes
/// items downstream of a cycle and items that reference themselves.
pub fn sort_dependencies<T: DependencyNode>(items: Vec<T>) -> SortedNodes<T> {
    let count = items.len();
    if count == 0 {
        return SortedNodes {
            ordered: Vec::new(),
            circular: Vec::new(),
        };
    }

    let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        positions.entry(item.node_id()).or_default().push(index);
    }

    let mut adjacency_list: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0usize; count];

    // 1. Build adjacency list and in-degree counts, dropping unknown names.
    for (index, item) in items.iter().enumerate() {
        for name in item.before() {
            for &target in positions.get(name.as_str()).into_iter().flatten() {
                adjacency_list[index].push(target);
                in_degree[target] += 1;
            }
        }
        for name in item.after() {
            for &source in positions.get(name.as_str()).into_iter().flatten() {
                adjacency_list[source].push(index);
                in_degree[index] += 1;
            }
        }
    }

    // 2. Seed with all root items, keyed by input position.
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    // 3. Always emit the earliest ready item.
    let mut emission = Vec::with_capacity(count);
    while let Some(Reverse(index)) = ready.pop() {
        emission.push(index);
        for &child in &adjacency_list[index] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    // 4. Whatever was never emitted is stuck behind a cycle.
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let ordered = emission
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect();
    let circular = slots.into_iter().flatten().collect();

    SortedNodes { ordered, circular }
}

/// Runs the blacklist pass and then the ordering pass over the survivors.
pub fn order_plugins<T: DependencyNode>(items: Vec<T>) -> PluginOrder<T> {
    let (kept, blacklisted) = partition_blacklisted(items);
    let SortedNodes { ordered, circular } = sort_dependencies(kept);
    PluginOrder {
        ordered,
        circular,
        blacklisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Node {
        id: String,
        before: Vec<String>,
        after: Vec<String>,
        blacklist: Vec<String>,
    }

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            before: Vec::new(),
            after: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    impl Node {
        fn before(mut self, id: &str) -> Self {
            self.before.push(id.to_string());
            self
        }

        fn after(mut self, id: &str) -> Self {
            self.after.push(id.to_string());
            self
        }

        fn blacklist(mut self, id: &str) -> Self {
            self.blacklist.push(id.to_string());
            self
        }
    }

    impl DependencyNode for Node {
        fn node_id(&self) -> &str {
            &self.id
        }

        fn before(&self) -> &[String] {
            &self.before
        }

        fn after(&self) -> &[String] {
            &self.after
        }

        fn blacklist(&self) -> &[String] {
            &self.blacklist
        }
    }

    fn ids(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_unconstrained_keeps_input_order() {
        let sorted = sort_dependencies(vec![node("c"), node("a"), node("b")]);
        assert_eq!(ids(&sorted.ordered), vec!["c", "a", "b"]);
        assert!(sorted.circular.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let sorted = sort_dependencies(Vec::<Node>::new());
        assert!(sorted.ordered.is_empty());
        assert!(sorted.circular.is_empty());
    }

    #[test]
    fn test_before_and_after_edges() {
        // "late" asks to run after "early"; "first" asks to run before "early".
        let sorted = sort_dependencies(vec![
            node("late").after("early"),
            node("early"),
            node("first").before("early"),
        ]);
        assert_eq!(ids(&sorted.ordered), vec!["first", "early", "late"]);
    }

    #[test]
    fn test_self_reference_is_circular() {
        let sorted = sort_dependencies(vec![node("a"), node("loop").before("loop")]);
        assert_eq!(ids(&sorted.ordered), vec!["a"]);
        assert_eq!(ids(&sorted.circular), vec!["loop"]);

        let sorted = sort_dependencies(vec![node("loop").after("loop")]);
        assert_eq!(ids(&sorted.circular), vec!["loop"]);
    }

    #[test]
    fn test_unknown_dependency_is_ignored() {
        let sorted = sort_dependencies(vec![
            node("a").after("missing"),
            node("b").before("ghost"),
        ]);
        assert_eq!(ids(&sorted.ordered), vec!["a", "b"]);
        assert!(sorted.circular.is_empty());
    }

    #[test]
    fn test_cycle_excludes_downstream_chain() {
        let sorted = sort_dependencies(vec![
            node("A").before("B"),
            node("B").before("A"),
            node("C").after("B"),
            node("D").after("C"),
        ]);
        assert!(sorted.ordered.is_empty());
        assert_eq!(ids(&sorted.circular), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_cycle_leaves_independent_chain() {
        let sorted = sort_dependencies(vec![
            node("A").before("B"),
            node("B").before("A"),
            node("C"),
            node("D").after("C"),
        ]);
        assert_eq!(ids(&sorted.ordered), vec!["C", "D"]);
        assert_eq!(ids(&sorted.circular), vec!["A", "B"]);
    }

    #[test]
    fn test_independent_chains_keep_relative_order() {
        let sorted = sort_dependencies(vec![
            node("x2").after("x1"),
            node("y1"),
            node("x1"),
            node("y2").after("y1"),
        ]);
        // y1 is the earliest ready item, then x1 unblocks x2 which precedes y2.
        assert_eq!(ids(&sorted.ordered), vec!["y1", "x1", "x2", "y2"]);
    }

    #[test]
    fn test_blacklist_is_one_directional() {
        let (kept, removed) = partition_blacklisted(vec![
            node("A").blacklist("B"),
            node("B"),
            node("C").blacklist("D"),
            node("D"),
        ]);
        assert_eq!(ids(&kept), vec!["A", "C"]);
        assert_eq!(ids(&removed), vec!["B", "D"]);
    }

    #[test]
    fn test_mutual_blacklist_removes_both() {
        let (kept, removed) = partition_blacklisted(vec![
            node("A").blacklist("B"),
            node("B").blacklist("A"),
            node("C"),
        ]);
        assert_eq!(ids(&kept), vec!["C"]);
        assert_eq!(ids(&removed), vec!["A", "B"]);
    }

    #[test]
    fn test_blacklist_of_absent_item_is_ignored() {
        let (kept, removed) = partition_blacklisted(vec![node("A").blacklist("nobody")]);
        assert_eq!(ids(&kept), vec!["A"]);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_order_plugins_runs_both_passes() {
        let order = order_plugins(vec![
            node("fs").after("cache"),
            node("cache"),
            node("legacy"),
            node("modern").blacklist("legacy"),
        ]);
        assert_eq!(ids(&order.ordered), vec!["cache", "fs", "modern"]);
        assert_eq!(ids(&order.blacklisted), vec!["legacy"]);
        assert!(order.circular.is_empty());
    }

    #[test]
    fn test_blacklisted_items_do_not_constrain_order() {
        // "gone" would otherwise force "b" ahead of "a".
        let order = order_plugins(vec![
            node("a"),
            node("b"),
            node("gone").after("b").before("a"),
            node("killer").blacklist("gone"),
        ]);
        assert_eq!(ids(&order.ordered), vec!["a", "b", "killer"]);
    }
}
