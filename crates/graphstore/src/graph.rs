//! The integrity engine's in-memory working graph.
//!
//! Holds only the *active* version of every node, edge, and component,
//! indexed the way the engine and graph view need it: by id for direct
//! lookup, by incident node for traversal, and by referencing element for
//! component-membership checks. This mirrors the teacher's in-memory
//! catalog (`ormdb-core::catalog::Catalog`), which is likewise rebuilt from
//! storage into id-keyed maps rather than kept denormalized on disk.

use std::collections::{HashMap, HashSet};

use graphstore_core::{Component, Edge, GraphRepositories, Node};
use graphstore_proto::{Id, Locator};

use crate::error::Error;

/// A snapshot (or working copy, inside the integrity engine) of every
/// active node, edge, and component, plus the side tables the engine and
/// graph view need: adjacency by node id, and component membership by
/// referencing element locator.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: HashMap<Id, Node>,
    edges: HashMap<Id, Edge>,
    components: HashMap<Id, Component>,
    out_edges: HashMap<Id, Vec<Id>>,
    in_edges: HashMap<Id, Vec<Id>>,
    /// Element locator -> set of component ids it references. Keyed by the
    /// *element's* locator, not the component's, since membership is "does
    /// this element reference component X" independent of which version of
    /// X is current (spec.md §9: held as an external map, never as a
    /// back-reference on the element record itself).
    memberships: HashMap<Locator, HashSet<Id>>,
}

impl Graph {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rebuild the whole in-memory structure from every active node, edge,
    /// and component in `repos`.
    pub fn load(repos: &GraphRepositories) -> Result<Self, Error> {
        let mut graph = Self::empty();

        for id in repos.components.all_active_ids()? {
            if let Some(component) = repos.components.find_active(id)? {
                graph.put_component(component);
            }
        }
        for id in repos.nodes.all_active_ids()? {
            if let Some(node) = repos.nodes.find_active(id)? {
                graph.put_node(node);
            }
        }
        for id in repos.edges.all_active_ids()? {
            if let Some(edge) = repos.edges.find_active(id)? {
                graph.put_edge(edge);
            }
        }

        Ok(graph)
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: Id) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn component(&self, id: Id) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn out_edge_ids(&self, id: Id) -> &[Id] {
        self.out_edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_edge_ids(&self, id: Id) -> &[Id] {
        self.in_edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The set of component ids the element at `locator` references, if
    /// that element is currently active.
    pub fn memberships(&self, locator: Locator) -> Option<&HashSet<Id>> {
        self.memberships.get(&locator)
    }

    pub(crate) fn put_node(&mut self, node: Node) {
        let component_ids = node.components.iter().map(|c| c.id).collect();
        self.memberships.insert(node.locator, component_ids);
        self.nodes.insert(node.id(), node);
    }

    pub(crate) fn remove_node(&mut self, id: Id) -> Option<Node> {
        let node = self.nodes.remove(&id)?;
        self.memberships.remove(&node.locator);
        Some(node)
    }

    pub(crate) fn put_edge(&mut self, edge: Edge) {
        let component_ids = edge.components.iter().map(|c| c.id).collect();
        self.memberships.insert(edge.locator, component_ids);
        self.out_edges.entry(edge.source.id).or_default().push(edge.id());
        self.in_edges.entry(edge.target.id).or_default().push(edge.id());
        self.edges.insert(edge.id(), edge);
    }

    pub(crate) fn remove_edge(&mut self, id: Id) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        self.memberships.remove(&edge.locator);
        if let Some(ids) = self.out_edges.get_mut(&edge.source.id) {
            ids.retain(|e| *e != id);
        }
        if let Some(ids) = self.in_edges.get_mut(&edge.target.id) {
            ids.retain(|e| *e != id);
        }
        Some(edge)
    }

    pub(crate) fn put_component(&mut self, component: Component) {
        self.components.insert(component.id(), component);
    }

    pub(crate) fn remove_component(&mut self, id: Id) -> Option<Component> {
        self.components.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_core::StorageConfig;
    use graphstore_proto::{new_id, Data};
    use std::collections::BTreeSet;

    fn sample_node(locator: Locator) -> Node {
        Node {
            locator,
            node_type: "person".into(),
            data: Data::new("person"),
            components: BTreeSet::new(),
            created: 0,
            expired: None,
        }
    }

    #[test]
    fn put_and_remove_node_updates_memberships() {
        let mut graph = Graph::empty();
        let component = Locator::first(new_id());
        let mut node = sample_node(Locator::first(new_id()));
        node.components.insert(component);
        let id = node.id();
        let locator = node.locator;

        graph.put_node(node);
        assert_eq!(graph.memberships(locator).unwrap(), &HashSet::from([component.id]));

        graph.remove_node(id);
        assert!(graph.node(id).is_none());
        assert!(graph.memberships(locator).is_none());
    }

    #[test]
    fn put_edge_indexes_adjacency() {
        let mut graph = Graph::empty();
        let a = Locator::first(new_id());
        let b = Locator::first(new_id());
        let edge = Edge {
            locator: Locator::first(new_id()),
            edge_type: "knows".into(),
            source: a,
            target: b,
            data: Data::new("knows"),
            components: BTreeSet::new(),
            created: 0,
            expired: None,
        };
        let edge_id = edge.id();
        graph.put_edge(edge);

        assert_eq!(graph.out_edge_ids(a.id), &[edge_id]);
        assert_eq!(graph.in_edge_ids(b.id), &[edge_id]);

        graph.remove_edge(edge_id);
        assert!(graph.out_edge_ids(a.id).is_empty());
        assert!(graph.in_edge_ids(b.id).is_empty());
    }

    #[test]
    fn load_rebuilds_from_repositories() {
        let repos = GraphRepositories::open(StorageConfig::temporary()).unwrap();
        let node = sample_node(Locator::first(new_id()));
        repos.nodes.save(&node).unwrap();

        let graph = Graph::load(&repos).unwrap();
        assert!(graph.node(node.id()).is_some());
    }
}
