//! Graph View & Traversals (spec.md §4.5): read-only queries over a
//! snapshot of the active graph.
//!
//! A [`GraphView`] is built once via [`GraphView::load`] and never mutated;
//! traversal results it returns are independent of any mutation that
//! happens afterwards (spec.md: "snapshot builds are copy-on-read").

use std::collections::{HashMap, HashSet, VecDeque};

use graphstore_core::{Edge, GraphRepositories, Node};
use graphstore_proto::Id;

use crate::error::Error;
use crate::graph::Graph;
use crate::reference::Reference;

/// Default bound on `all_paths` enumeration depth, in number of edges.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// One element of a [`Path`]: either a node or an edge. Wrapped in
/// [`Reference`] so a future backend where resolving an element is not a
/// free hashmap lookup can defer it; the in-memory graph view always
/// resolves eagerly.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    Node(Reference<Node>),
    Edge(Reference<Edge>),
}

/// An ordered sequence of elements beginning and ending with a node
/// (spec.md §4.5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn edge_count(&self) -> usize {
        self.0.iter().filter(|e| matches!(e, PathElement::Edge(_))).count()
    }
}

/// A frozen snapshot of the active graph, ready for traversal queries.
pub struct GraphView(Graph);

impl GraphView {
    pub fn load(repos: &GraphRepositories) -> Result<Self, Error> {
        Ok(Self(Graph::load(repos)?))
    }

    /// Wrap an already-loaded [`Graph`] (e.g. the integrity engine's working
    /// copy, once it has finished mutating) without rebuilding from storage.
    pub fn from_graph(graph: Graph) -> Self {
        Self(graph)
    }

    /// Every node reachable from `id` by exactly one active edge, in either
    /// direction.
    pub fn neighbors(&self, id: Id) -> Vec<Id> {
        let mut seen = HashSet::new();
        for edge_id in self.0.out_edge_ids(id) {
            if let Some(edge) = self.0.edge(*edge_id) {
                seen.insert(edge.target.id);
            }
        }
        for edge_id in self.0.in_edge_ids(id) {
            if let Some(edge) = self.0.edge(*edge_id) {
                seen.insert(edge.source.id);
            }
        }
        seen.into_iter().collect()
    }

    pub fn outgoing_edges(&self, id: Id) -> Vec<Edge> {
        self.0
            .out_edge_ids(id)
            .iter()
            .filter_map(|edge_id| self.0.edge(*edge_id).cloned())
            .collect()
    }

    pub fn incoming_edges(&self, id: Id) -> Vec<Edge> {
        self.0
            .in_edge_ids(id)
            .iter()
            .filter_map(|edge_id| self.0.edge(*edge_id).cloned())
            .collect()
    }

    /// BFS over active edges; true iff some directed path from `from` to
    /// `to` exists.
    pub fn path_exists(&self, from: Id, to: Id) -> bool {
        if from == to {
            return self.0.node(from).is_some();
        }
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for edge_id in self.0.out_edge_ids(current) {
                let Some(edge) = self.0.edge(*edge_id) else {
                    continue;
                };
                let next = edge.target.id;
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Shortest directed path from `from` to `to` by edge count. Fails with
    /// [`Error::NoPath`] if none exists.
    pub fn shortest_path(&self, from: Id, to: Id) -> Result<Path, Error> {
        let origin = self
            .0
            .node(from)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("node {from}")))?;

        if from == to {
            return Ok(Path(vec![PathElement::Node(Reference::Loaded(origin))]));
        }

        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        let mut predecessor: HashMap<Id, Id> = HashMap::new();

        while let Some(current) = queue.pop_front() {
            for edge_id in self.0.out_edge_ids(current) {
                let Some(edge) = self.0.edge(*edge_id) else {
                    continue;
                };
                let next = edge.target.id;
                if !visited.insert(next) {
                    continue;
                }
                predecessor.insert(next, *edge_id);
                if next == to {
                    return Ok(self.reconstruct_path(from, to, &predecessor));
                }
                queue.push_back(next);
            }
        }

        Err(Error::NoPath {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn reconstruct_path(&self, from: Id, to: Id, predecessor: &HashMap<Id, Id>) -> Path {
        let mut edge_ids = Vec::new();
        let mut current = to;
        while current != from {
            let edge_id = predecessor[&current];
            edge_ids.push(edge_id);
            current = self.0.edge(edge_id).expect("predecessor edge must exist").source.id;
        }
        edge_ids.reverse();

        let mut elements = vec![PathElement::Node(Reference::Loaded(
            self.0.node(from).expect("origin must exist").clone(),
        ))];
        let mut node_id = from;
        for edge_id in edge_ids {
            let edge = self.0.edge(edge_id).expect("edge must exist").clone();
            node_id = edge.target.id;
            elements.push(PathElement::Edge(Reference::Loaded(edge)));
            elements.push(PathElement::Node(Reference::Loaded(
                self.0.node(node_id).expect("target node must exist").clone(),
            )));
        }
        Path(elements)
    }

    /// Every simple directed path from `from` to `to`, bounded by
    /// `max_depth` edges (defaults to [`DEFAULT_MAX_DEPTH`] when `None`).
    pub fn all_paths(&self, from: Id, to: Id, max_depth: Option<usize>) -> Vec<Path> {
        let max_depth = max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        let mut results = Vec::new();
        if self.0.node(from).is_none() || self.0.node(to).is_none() {
            return results;
        }
        let mut visited = HashSet::from([from]);
        let mut edge_stack = Vec::new();
        self.all_paths_dfs(from, to, max_depth, &mut visited, &mut edge_stack, &mut results);
        results
    }

    fn all_paths_dfs(
        &self,
        current: Id,
        to: Id,
        remaining_depth: usize,
        visited: &mut HashSet<Id>,
        edge_stack: &mut Vec<Id>,
        results: &mut Vec<Path>,
    ) {
        if current == to && !edge_stack.is_empty() {
            results.push(self.path_from_edge_stack(edge_stack));
            return;
        }
        if remaining_depth == 0 {
            return;
        }
        for edge_id in self.0.out_edge_ids(current) {
            let Some(edge) = self.0.edge(*edge_id) else {
                continue;
            };
            let next = edge.target.id;
            if visited.contains(&next) {
                continue;
            }
            visited.insert(next);
            edge_stack.push(*edge_id);
            self.all_paths_dfs(next, to, remaining_depth - 1, visited, edge_stack, results);
            edge_stack.pop();
            visited.remove(&next);
        }
    }

    fn path_from_edge_stack(&self, edge_stack: &[Id]) -> Path {
        let first_edge = self.0.edge(edge_stack[0]).expect("edge must exist");
        let mut elements = vec![PathElement::Node(Reference::Loaded(
            self.0.node(first_edge.source.id).expect("source node must exist").clone(),
        ))];
        for edge_id in edge_stack {
            let edge = self.0.edge(*edge_id).expect("edge must exist").clone();
            let target = edge.target.id;
            elements.push(PathElement::Edge(Reference::Loaded(edge)));
            elements.push(PathElement::Node(Reference::Loaded(
                self.0.node(target).expect("target node must exist").clone(),
            )));
        }
        Path(elements)
    }

    /// For every unordered pair of active nodes, the shortest path between
    /// them if one exists in either direction; pairs with no path in either
    /// direction are silently omitted.
    pub fn all_connected_paths(&self) -> Vec<(Id, Id, Path)> {
        let mut ids: Vec<Id> = self.0.nodes().map(|n| n.id()).collect();
        ids.sort();

        let mut out = Vec::new();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (ids[i], ids[j]);
                if let Ok(path) = self.shortest_path(a, b) {
                    out.push((a, b, path));
                } else if let Ok(path) = self.shortest_path(b, a) {
                    out.push((b, a, path));
                }
            }
        }
        out
    }
}
