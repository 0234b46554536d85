//! Cycle detection with Tarjan's strongly connected components algorithm.
//!
//! The depth-first search keeps its own frame stack instead of recursing, so
//! long dependency chains cannot overflow the thread stack. Each node gets a
//! discovery index and a low-link value; a node whose low-link equals its
//! index is the root of a component, which is popped off the component stack.
//!
//! Roots are tried in node insertion order and successors in edge insertion
//! order, so the reported components and their member order are stable.
//!
//! Complexity: O(V + E) time, O(V) extra space.

use std::fmt;

use thiserror::Error;

use crate::graph::{DependencyGraph, NodeIdx};

const UNVISITED: u32 = u32::MAX;

/// One dependency cycle, in the order its nodes were popped off the
/// algorithm's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: Vec<String>,
}

impl CycleReport {
    pub fn len(&self) -> usize {
        self.cycle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycle.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cycle.iter().any(|member| member == id)
    }

    pub fn is_self_loop(&self) -> bool {
        self.cycle.len() == 1
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.cycle.join(", "))
    }
}

/// Scheduling was refused because the graph contains cycles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Circular dependency detected: {}", join_reports(.reports))]
pub struct CycleError {
    reports: Vec<CycleReport>,
}

impl CycleError {
    pub fn new(reports: Vec<CycleReport>) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> &[CycleReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<CycleReport> {
        self.reports
    }
}

fn join_reports(reports: &[CycleReport]) -> String {
    reports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tarjan bookkeeping, indexed by node.
struct TarjanState {
    next_index: u32,
    index: Vec<u32>,
    low_link: Vec<u32>,
    on_stack: Vec<bool>,
    stack: Vec<NodeIdx>,
}

impl TarjanState {
    fn new(node_count: usize) -> Self {
        Self {
            next_index: 0,
            index: vec![UNVISITED; node_count],
            low_link: vec![UNVISITED; node_count],
            on_stack: vec![false; node_count],
            stack: Vec::new(),
        }
    }

    #[inline]
    fn is_visited(&self, node: NodeIdx) -> bool {
        self.index[node as usize] != UNVISITED
    }

    /// Assign discovery index and low-link, and push onto the stack.
    fn discover(&mut self, node: NodeIdx) {
        let slot = node as usize;
        self.index[slot] = self.next_index;
        self.low_link[slot] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[slot] = true;
    }

    fn lower(&mut self, node: NodeIdx, candidate: u32) {
        let slot = node as usize;
        if candidate < self.low_link[slot] {
            self.low_link[slot] = candidate;
        }
    }

    fn is_root(&self, node: NodeIdx) -> bool {
        self.low_link[node as usize] == self.index[node as usize]
    }

    /// Pop nodes until `root` has been popped.
    fn pop_component(&mut self, root: NodeIdx) -> Vec<NodeIdx> {
        let mut component = Vec::new();
        while let Some(top) = self.stack.pop() {
            self.on_stack[top as usize] = false;
            component.push(top);
            if top == root {
                break;
            }
        }
        component
    }
}

/// All strongly connected components, including single nodes, in the order
/// they are completed. Members are listed in pop order.
pub fn strongly_connected_components(graph: &DependencyGraph) -> Vec<Vec<NodeIdx>> {
    let n = graph.node_count();
    let mut state = TarjanState::new(n);
    let mut components = Vec::new();
    // DFS frames: (node, position in its successor list)
    let mut frames: Vec<(NodeIdx, usize)> = Vec::new();

    for root in 0..n as NodeIdx {
        if state.is_visited(root) {
            continue;
        }
        state.discover(root);
        frames.push((root, 0));

        while let Some(&(node, cursor)) = frames.last() {
            if let Some(&next) = graph.successor_indices(node).get(cursor) {
                if let Some(top) = frames.last_mut() {
                    top.1 += 1;
                }
                if !state.is_visited(next) {
                    state.discover(next);
                    frames.push((next, 0));
                } else if state.on_stack[next as usize] {
                    // Back edge into the current component
                    let next_index = state.index[next as usize];
                    state.lower(node, next_index);
                }
                continue;
            }

            // All successors explored
            frames.pop();
            if state.is_root(node) {
                components.push(state.pop_component(node));
            }
            if let Some(&(parent, _)) = frames.last() {
                let node_low = state.low_link[node as usize];
                state.lower(parent, node_low);
            }
        }
    }

    components
}

/// Report every cycle in `graph`.
///
/// A component is a cycle when it has more than one node, or a single node
/// with an edge to itself. An empty result means the graph is acyclic.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<CycleReport> {
    strongly_connected_components(graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.has_self_loop(*single),
            members => members.len() > 1,
        })
        .map(|component| CycleReport {
            cycle: component
                .into_iter()
                .filter_map(|idx| graph.id_of(idx).map(str::to_string))
                .collect(),
        })
        .collect()
}

pub fn is_acyclic(graph: &DependencyGraph) -> bool {
    detect_cycles(graph).is_empty()
}

/// `Ok(())` for an acyclic graph, otherwise every cycle found.
pub fn ensure_acyclic(graph: &DependencyGraph) -> Result<(), CycleError> {
    let reports = detect_cycles(graph);
    if reports.is_empty() {
        Ok(())
    } else {
        Err(CycleError::new(reports))
    }
}
