//! Dependency graph over work items.
//!
//! Nodes are identified by opaque string ids and carry a [`DurationValue`].
//! An edge `(from, to)` means `from` must complete before `to` starts. Node
//! indices follow insertion order, and every traversal in this crate iterates
//! nodes and successor lists in that order, which keeps results
//! deterministic.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;

use crate::duration::DurationValue;

/// Dense node index, assigned in insertion order.
pub type NodeIdx = u32;

/// Errors raised while building or querying a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node referenced: {0}")]
    UnknownNodeReference(String),
    #[error("Node already exists: {0}")]
    DuplicateNode(String),
}

/// Borrowed view of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'g> {
    pub id: &'g str,
    pub duration: DurationValue,
}

/// Node ids and their dense indices.
#[derive(Debug, Clone, Default)]
struct NodeIds {
    by_id: FxHashMap<Box<str>, NodeIdx>,
    ids: Vec<Box<str>>,
}

impl NodeIds {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            by_id: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Append an id that is not yet present.
    fn push(&mut self, id: String) -> NodeIdx {
        let idx = self.ids.len() as NodeIdx;
        let id = id.into_boxed_str();
        self.by_id.insert(id.clone(), idx);
        self.ids.push(id);
        idx
    }

    #[inline]
    fn get(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    #[inline]
    fn resolve(&self, idx: NodeIdx) -> Option<&str> {
        self.ids.get(idx as usize).map(|id| &**id)
    }

    fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(|id| &**id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Directed graph of nodes and predecessor → successor edges.
///
/// Self-loops may be stored; cycle detection always reports them.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    ids: NodeIds,
    durations: Vec<DurationValue>,
    successors: Vec<Vec<NodeIdx>>,
    predecessors: Vec<Vec<NodeIdx>>,
    edge_set: FxHashSet<(NodeIdx, NodeIdx)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            ids: NodeIds::with_capacity(nodes),
            durations: Vec::with_capacity(nodes),
            successors: Vec::with_capacity(nodes),
            predecessors: Vec::with_capacity(nodes),
            edge_set: FxHashSet::default(),
        }
    }

    /// Build a graph from node and edge lists.
    pub fn from_parts<N, E>(
        nodes: impl IntoIterator<Item = (N, DurationValue)>,
        edges: impl IntoIterator<Item = (E, E)>,
    ) -> Result<Self, GraphError>
    where
        N: Into<String>,
        E: AsRef<str>,
    {
        let mut graph = Self::new();
        for (id, duration) in nodes {
            graph.add_node(id, duration)?;
        }
        for (from, to) in edges {
            graph.add_edge(from.as_ref(), to.as_ref())?;
        }
        Ok(graph)
    }

    /// Add a node. Ids are unique; re-adding an id is an error.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        duration: DurationValue,
    ) -> Result<NodeIdx, GraphError> {
        let id = id.into();
        if self.ids.get(&id).is_some() {
            return Err(GraphError::DuplicateNode(id));
        }
        let idx = self.ids.push(id);
        self.durations.push(duration);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        Ok(idx)
    }

    /// Add the edge `from → to`.
    ///
    /// Returns `false` if the edge was already present (the graph is left
    /// unchanged).
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<bool, GraphError> {
        let from_idx = self.require(from)?;
        let to_idx = self.require(to)?;
        if !self.edge_set.insert((from_idx, to_idx)) {
            return Ok(false);
        }
        self.successors[from_idx as usize].push(to_idx);
        self.predecessors[to_idx as usize].push(from_idx);
        Ok(true)
    }

    /// Remove the edge `from → to`. Returns `false` if it was not present.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> Result<bool, GraphError> {
        let from_idx = self.require(from)?;
        let to_idx = self.require(to)?;
        if !self.edge_set.remove(&(from_idx, to_idx)) {
            return Ok(false);
        }
        self.successors[from_idx as usize].retain(|&s| s != to_idx);
        self.predecessors[to_idx as usize].retain(|&p| p != from_idx);
        Ok(true)
    }

    /// Replace a node's duration, returning the previous value.
    pub fn update_duration(
        &mut self,
        id: &str,
        duration: DurationValue,
    ) -> Result<DurationValue, GraphError> {
        let idx = self.require(id)?;
        Ok(std::mem::replace(&mut self.durations[idx as usize], duration))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.get(id).is_some()
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.ids.get(from), self.ids.get(to)) {
            (Some(f), Some(t)) => self.edge_set.contains(&(f, t)),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.len() == 0
    }

    pub fn duration(&self, id: &str) -> Option<DurationValue> {
        self.ids.get(id).map(|idx| self.durations[idx as usize])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        self.ids
            .iter()
            .zip(self.durations.iter().copied())
            .map(|(id, duration)| Node { id, duration })
    }

    /// Edges grouped by source node in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.successors.iter().enumerate().flat_map(move |(from, succs)| {
            succs.iter().filter_map(move |&to| {
                Some((self.ids.resolve(from as NodeIdx)?, self.ids.resolve(to)?))
            })
        })
    }

    /// Ids of nodes that `id` points to.
    pub fn successors(&self, id: &str) -> Result<Vec<&str>, GraphError> {
        let idx = self.require(id)?;
        Ok(self.resolve_all(self.successor_indices(idx)))
    }

    /// Ids of nodes that point to `id`.
    pub fn predecessors(&self, id: &str) -> Result<Vec<&str>, GraphError> {
        let idx = self.require(id)?;
        Ok(self.resolve_all(self.predecessor_indices(idx)))
    }

    /// Nodes without predecessors, in insertion order.
    pub fn roots(&self) -> Vec<&str> {
        self.ids
            .iter()
            .zip(&self.predecessors)
            .filter(|(_, preds)| preds.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIdx> {
        self.ids.get(id)
    }

    pub fn id_of(&self, idx: NodeIdx) -> Option<&str> {
        self.ids.resolve(idx)
    }

    pub fn duration_at(&self, idx: NodeIdx) -> DurationValue {
        self.durations
            .get(idx as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn successor_indices(&self, idx: NodeIdx) -> &[NodeIdx] {
        self.successors
            .get(idx as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn predecessor_indices(&self, idx: NodeIdx) -> &[NodeIdx] {
        self.predecessors
            .get(idx as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_self_loop(&self, idx: NodeIdx) -> bool {
        self.edge_set.contains(&(idx, idx))
    }

    /// Partition node indices into weakly-connected components.
    ///
    /// Each component is sorted ascending; components are ordered by their
    /// first (lowest-index) node.
    pub fn weakly_connected_components(&self) -> Vec<Vec<NodeIdx>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();
        let mut queue: VecDeque<NodeIdx> = VecDeque::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            queue.push_back(start as NodeIdx);

            let mut component = Vec::new();
            while let Some(node) = queue.pop_front() {
                component.push(node);
                let neighbours = self
                    .successor_indices(node)
                    .iter()
                    .chain(self.predecessor_indices(node));
                for &next in neighbours {
                    if !visited[next as usize] {
                        visited[next as usize] = true;
                        queue.push_back(next);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components
    }

    /// Copy the given nodes and the edges among them into a new graph.
    ///
    /// Nodes keep their relative order from `members`; each node's successor
    /// list keeps its original order.
    pub fn subgraph(&self, members: &[NodeIdx]) -> DependencyGraph {
        let mut local = vec![None; self.node_count()];
        let mut sub = DependencyGraph::with_capacity(members.len());

        for &idx in members {
            let Some(id) = self.ids.resolve(idx) else {
                continue;
            };
            if let Ok(new_idx) = sub.add_node(id, self.duration_at(idx)) {
                local[idx as usize] = Some(new_idx);
            }
        }

        for &idx in members {
            let Some(from) = local.get(idx as usize).copied().flatten() else {
                continue;
            };
            for &succ in self.successor_indices(idx) {
                if let Some(to) = local.get(succ as usize).copied().flatten() {
                    if sub.edge_set.insert((from, to)) {
                        sub.successors[from as usize].push(to);
                        sub.predecessors[to as usize].push(from);
                    }
                }
            }
        }

        sub
    }

    fn require(&self, id: &str) -> Result<NodeIdx, GraphError> {
        self.ids
            .get(id)
            .ok_or_else(|| GraphError::UnknownNodeReference(id.to_string()))
    }

    fn resolve_all(&self, indices: &[NodeIdx]) -> Vec<&str> {
        indices
            .iter()
            .filter_map(|&idx| self.ids.resolve(idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(n: u64) -> DurationValue {
        DurationValue::from_minutes(n * 480)
    }

    fn make_graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph::from_parts(
            nodes.iter().map(|&id| (id, days(1))),
            edges.iter().copied(),
        )
        .unwrap()
    }

    #[test]
    fn test_add_nodes_and_edges() {
        let graph = make_graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "c")]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.successors("a").unwrap(), vec!["b", "c"]);
        assert_eq!(graph.predecessors("c").unwrap(), vec!["a", "b"]);
        assert_eq!(graph.roots(), vec!["a"]);
        assert!(graph.has_edge("a", "b"));
        assert!(!graph.has_edge("b", "a"));
    }

    #[test]
    fn test_indices_follow_insertion_order() {
        let graph = make_graph(&["task_b", "task_a"], &[]);
        assert_eq!(graph.index_of("task_b"), Some(0));
        assert_eq!(graph.index_of("task_a"), Some(1));
        assert_eq!(graph.id_of(1), Some("task_a"));
        assert_eq!(graph.id_of(7), None);
        assert_eq!(graph.index_of("missing"), None);
        assert!(!graph.is_empty());
        assert!(DependencyGraph::new().is_empty());
    }

    #[test]
    fn test_duplicate_edge_is_ignored() {
        let mut graph = make_graph(&["a", "b"], &[("a", "b")]);
        assert_eq!(graph.add_edge("a", "b"), Ok(false));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.successors("a").unwrap(), vec!["b"]);
    }

    #[test]
    fn test_duplicate_node_is_error() {
        let mut graph = make_graph(&["a"], &[]);
        assert_eq!(
            graph.add_node("a", days(2)),
            Err(GraphError::DuplicateNode("a".to_string()))
        );
        assert_eq!(graph.duration("a"), Some(days(1)));
    }

    #[test]
    fn test_unknown_node_reference() {
        let mut graph = make_graph(&["a"], &[]);
        assert_eq!(
            graph.add_edge("a", "ghost"),
            Err(GraphError::UnknownNodeReference("ghost".to_string()))
        );
        assert_eq!(
            graph.successors("ghost"),
            Err(GraphError::UnknownNodeReference("ghost".to_string()))
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_self_loop_is_stored() {
        let graph = make_graph(&["x"], &[("x", "x")]);
        let x = graph.index_of("x").unwrap();
        assert!(graph.has_self_loop(x));
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = make_graph(&["a", "b"], &[("a", "b")]);
        assert_eq!(graph.remove_edge("a", "b"), Ok(true));
        assert_eq!(graph.remove_edge("a", "b"), Ok(false));
        assert!(graph.predecessors("b").unwrap().is_empty());
        assert_eq!(graph.roots(), vec!["a", "b"]);
    }

    #[test]
    fn test_update_duration() {
        let mut graph = make_graph(&["a"], &[]);
        assert_eq!(graph.update_duration("a", days(3)), Ok(days(1)));
        assert_eq!(graph.duration("a"), Some(days(3)));
        assert!(graph.update_duration("b", days(3)).is_err());
    }

    #[test]
    fn test_nodes_and_edges_in_insertion_order() {
        let graph = make_graph(&["z", "y", "x"], &[("y", "x"), ("z", "x"), ("z", "y")]);
        let ids: Vec<&str> = graph.nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec!["z", "y", "x"]);
        let edges: Vec<(&str, &str)> = graph.edges().collect();
        assert_eq!(edges, vec![("z", "x"), ("z", "y"), ("y", "x")]);
    }

    #[test]
    fn test_weakly_connected_components() {
        let graph = make_graph(
            &["a", "b", "c", "d", "e"],
            &[("c", "a"), ("d", "e")],
        );
        assert_eq!(
            graph.weakly_connected_components(),
            vec![vec![0, 2], vec![1], vec![3, 4]]
        );
    }

    #[test]
    fn test_subgraph_keeps_edges_and_durations() {
        let mut graph = make_graph(&["a", "b", "c", "d"], &[("a", "c"), ("b", "d"), ("c", "a")]);
        graph.update_duration("c", days(4)).unwrap();

        let sub = graph.subgraph(&[0, 2]);
        assert_eq!(sub.nodes().map(|n| n.id).collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(sub.has_edge("a", "c"));
        assert!(sub.has_edge("c", "a"));
        assert_eq!(sub.edge_count(), 2);
        assert_eq!(sub.duration("c"), Some(days(4)));
        assert!(!sub.contains("b"));
    }
}
