//! Service Facade (spec.md §4.6): thin per-entity coordinators that open a
//! session, delegate to the integrity engine or graph view, persist via the
//! repositories, and commit.
//!
//! Each method maps to exactly one logical operation in §4.4 or §4.5 — the
//! facade adds no behavior of its own beyond opening/committing the session
//! and, for plain lookups, reading straight through to the repositories. No
//! RPC/HTTP surface or DI wiring lives here; that is explicitly out of
//! scope per spec.md §1, mirroring the way the teacher crate keeps its core
//! free of a transport dependency and puts that in separate outer crates
//! this workspace declines to build.

use std::collections::BTreeSet;

use graphstore_core::{Component, Edge, Node, SessionFactory};
use graphstore_proto::{Data, Id, Locator};

use crate::engine::Engine;
use crate::error::Error;
use crate::graph::Graph;
use crate::view::{GraphView, Path};

/// `NodeFacade`'s client-facing surface (spec.md §6): `add`, `update`,
/// `find`, `find_active`, `find_at`, `find_all_versions`, `all_active`,
/// `all`, `expire`, `delete`.
pub struct NodeFacade {
    factory: SessionFactory,
}

impl NodeFacade {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    pub fn add(
        &self,
        node_type: impl Into<String>,
        data: Data,
        components: BTreeSet<Locator>,
        t: i64,
    ) -> Result<Node, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let node = Engine::new(&mut graph, &session).add_node(node_type, data, components, t)?;
        session.commit()?;
        Ok(node)
    }

    pub fn update(
        &self,
        id: Id,
        node_type: Option<String>,
        data: Option<Data>,
        components: Option<BTreeSet<Locator>>,
        t: i64,
    ) -> Result<Node, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let node = Engine::new(&mut graph, &session).update_node(id, node_type, data, components, t)?;
        session.commit()?;
        Ok(node)
    }

    pub fn expire(&self, id: Id, t: i64) -> Result<Node, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let node = Engine::new(&mut graph, &session).expire_node(id, t)?;
        session.commit()?;
        Ok(node)
    }

    pub fn find(&self, locator: Locator) -> Result<Option<Node>, Error> {
        Ok(self.factory.repositories().nodes.find(locator)?)
    }

    pub fn find_active(&self, id: Id) -> Result<Option<Node>, Error> {
        Ok(self.factory.repositories().nodes.find_active(id)?)
    }

    pub fn find_at(&self, id: Id, t: i64) -> Result<Option<Node>, Error> {
        Ok(self.factory.repositories().nodes.find_at(id, t)?)
    }

    pub fn find_all_versions(&self, id: Id) -> Result<Vec<Node>, Error> {
        Ok(self.factory.repositories().nodes.find_all(id)?)
    }

    pub fn all_active(&self) -> Result<Vec<Node>, Error> {
        let repo = &self.factory.repositories().nodes;
        let mut out = Vec::new();
        for id in repo.all_active_ids()? {
            if let Some(node) = repo.find_active(id)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    pub fn all(&self) -> Result<Vec<Node>, Error> {
        let repo = &self.factory.repositories().nodes;
        let mut out = Vec::new();
        for id in repo.all_ids()? {
            out.extend(repo.find_all(id)?);
        }
        Ok(out)
    }

    /// Administrative purge — hard-removes every version. Normal logical
    /// retirement is `expire`.
    pub fn delete(&self, id: Id) -> Result<bool, Error> {
        Ok(self.factory.repositories().nodes.delete(id)?)
    }
}

/// `EdgeFacade`'s client-facing surface, mirroring [`NodeFacade`].
pub struct EdgeFacade {
    factory: SessionFactory,
}

impl EdgeFacade {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &self,
        edge_type: impl Into<String>,
        source: Locator,
        target: Locator,
        data: Data,
        components: BTreeSet<Locator>,
        t: i64,
    ) -> Result<Edge, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let edge = Engine::new(&mut graph, &session).add_edge(edge_type, source, target, data, components, t)?;
        session.commit()?;
        Ok(edge)
    }

    pub fn update(
        &self,
        id: Id,
        edge_type: Option<String>,
        data: Option<Data>,
        components: Option<BTreeSet<Locator>>,
        t: i64,
    ) -> Result<Edge, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let edge = Engine::new(&mut graph, &session).update_edge(id, edge_type, data, components, t)?;
        session.commit()?;
        Ok(edge)
    }

    pub fn expire(&self, id: Id, t: i64) -> Result<Edge, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let edge = Engine::new(&mut graph, &session).expire_edge(id, t)?;
        session.commit()?;
        Ok(edge)
    }

    pub fn find(&self, locator: Locator) -> Result<Option<Edge>, Error> {
        Ok(self.factory.repositories().edges.find(locator)?)
    }

    pub fn find_active(&self, id: Id) -> Result<Option<Edge>, Error> {
        Ok(self.factory.repositories().edges.find_active(id)?)
    }

    pub fn find_at(&self, id: Id, t: i64) -> Result<Option<Edge>, Error> {
        Ok(self.factory.repositories().edges.find_at(id, t)?)
    }

    pub fn find_all_versions(&self, id: Id) -> Result<Vec<Edge>, Error> {
        Ok(self.factory.repositories().edges.find_all(id)?)
    }

    pub fn all_active(&self) -> Result<Vec<Edge>, Error> {
        let repo = &self.factory.repositories().edges;
        let mut out = Vec::new();
        for id in repo.all_active_ids()? {
            if let Some(edge) = repo.find_active(id)? {
                out.push(edge);
            }
        }
        Ok(out)
    }

    pub fn all(&self) -> Result<Vec<Edge>, Error> {
        let repo = &self.factory.repositories().edges;
        let mut out = Vec::new();
        for id in repo.all_ids()? {
            out.extend(repo.find_all(id)?);
        }
        Ok(out)
    }

    pub fn delete(&self, id: Id) -> Result<bool, Error> {
        Ok(self.factory.repositories().edges.delete(id)?)
    }
}

/// `ComponentFacade`'s client-facing surface, mirroring [`NodeFacade`].
pub struct ComponentFacade {
    factory: SessionFactory,
}

impl ComponentFacade {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    pub fn add(&self, component_type: impl Into<String>, data: Data, t: i64) -> Result<Component, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let component = Engine::new(&mut graph, &session).add_component(component_type, data, t)?;
        session.commit()?;
        Ok(component)
    }

    /// The deepest cascade in the system (spec.md §4.4): every edge and node
    /// still referencing the superseded component locator is recreated,
    /// each bumped by exactly one version, all sharing `t`.
    pub fn update(
        &self,
        id: Id,
        component_type: Option<String>,
        data: Option<Data>,
        t: i64,
    ) -> Result<Component, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let component = Engine::new(&mut graph, &session).update_component(id, component_type, data, t)?;
        session.commit()?;
        Ok(component)
    }

    /// No cascade: referencing elements keep the now-historical locator
    /// (spec.md §4.4, deliberate and load-bearing).
    pub fn expire(&self, id: Id, t: i64) -> Result<Component, Error> {
        let session = self.factory.open();
        let mut graph = Graph::load(session.repositories())?;
        let component = Engine::new(&mut graph, &session).expire_component(id, t)?;
        session.commit()?;
        Ok(component)
    }

    pub fn find(&self, locator: Locator) -> Result<Option<Component>, Error> {
        Ok(self.factory.repositories().components.find(locator)?)
    }

    pub fn find_active(&self, id: Id) -> Result<Option<Component>, Error> {
        Ok(self.factory.repositories().components.find_active(id)?)
    }

    pub fn find_at(&self, id: Id, t: i64) -> Result<Option<Component>, Error> {
        Ok(self.factory.repositories().components.find_at(id, t)?)
    }

    pub fn find_all_versions(&self, id: Id) -> Result<Vec<Component>, Error> {
        Ok(self.factory.repositories().components.find_all(id)?)
    }

    pub fn all_active(&self) -> Result<Vec<Component>, Error> {
        let repo = &self.factory.repositories().components;
        let mut out = Vec::new();
        for id in repo.all_active_ids()? {
            if let Some(component) = repo.find_active(id)? {
                out.push(component);
            }
        }
        Ok(out)
    }

    pub fn all(&self) -> Result<Vec<Component>, Error> {
        let repo = &self.factory.repositories().components;
        let mut out = Vec::new();
        for id in repo.all_ids()? {
            out.extend(repo.find_all(id)?);
        }
        Ok(out)
    }

    pub fn delete(&self, id: Id) -> Result<bool, Error> {
        Ok(self.factory.repositories().components.delete(id)?)
    }
}

/// `GraphFacade`'s client-facing surface (spec.md §6): `has_path`,
/// `shortest_path`, `active_connected`, `neighbors`. Every call loads a
/// fresh [`GraphView`] snapshot, so results never observe a mutation that
/// happens after the call returns.
pub struct GraphFacade {
    factory: SessionFactory,
}

impl GraphFacade {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    pub fn has_path(&self, from: Id, to: Id) -> Result<bool, Error> {
        let view = GraphView::load(self.factory.repositories())?;
        Ok(view.path_exists(from, to))
    }

    pub fn shortest_path(&self, from: Id, to: Id) -> Result<Path, Error> {
        let view = GraphView::load(self.factory.repositories())?;
        view.shortest_path(from, to)
    }

    pub fn all_paths(&self, from: Id, to: Id, max_depth: Option<usize>) -> Result<Vec<Path>, Error> {
        let view = GraphView::load(self.factory.repositories())?;
        Ok(view.all_paths(from, to, max_depth))
    }

    pub fn active_connected(&self) -> Result<Vec<(Id, Id, Path)>, Error> {
        let view = GraphView::load(self.factory.repositories())?;
        Ok(view.all_connected_paths())
    }

    pub fn neighbors(&self, id: Id) -> Result<Vec<Id>, Error> {
        let view = GraphView::load(self.factory.repositories())?;
        Ok(view.neighbors(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_core::{GraphRepositories, StorageConfig};
    use graphstore_proto::Data;

    fn harness() -> (NodeFacade, EdgeFacade, ComponentFacade, GraphFacade) {
        let repos = GraphRepositories::open(StorageConfig::temporary()).unwrap();
        let factory = SessionFactory::new(repos);
        (
            NodeFacade::new(factory.clone()),
            EdgeFacade::new(factory.clone()),
            ComponentFacade::new(factory.clone()),
            GraphFacade::new(factory),
        )
    }

    #[test]
    fn node_facade_add_update_find_roundtrip() {
        let (nodes, _edges, _components, _graph) = harness();

        let v1 = nodes.add("person", Data::new("person"), BTreeSet::new(), 0).unwrap();
        assert_eq!(nodes.find_active(v1.id()).unwrap().unwrap(), v1);

        let v2 = nodes
            .update(v1.id(), None, Some(Data::new("person").with_field("name", "Ada")), None, 10)
            .unwrap();
        assert_eq!(v2.locator.version, 2);
        assert_eq!(nodes.find(v1.locator).unwrap().unwrap().expired, Some(10));
        assert_eq!(nodes.find_all_versions(v1.id()).unwrap().len(), 2);

        let expired = nodes.expire(v1.id(), 20).unwrap();
        assert_eq!(expired.expired, Some(20));
        assert!(nodes.find_active(v1.id()).unwrap().is_none());
    }

    #[test]
    fn node_facade_delete_purges_all_versions() {
        let (nodes, _edges, _components, _graph) = harness();
        let v1 = nodes.add("person", Data::new("person"), BTreeSet::new(), 0).unwrap();
        nodes.update(v1.id(), None, None, None, 5).unwrap();

        assert!(nodes.delete(v1.id()).unwrap());
        assert!(nodes.find_all_versions(v1.id()).unwrap().is_empty());
        assert!(nodes.find_active(v1.id()).unwrap().is_none());
    }

    #[test]
    fn edge_and_graph_facade_expose_traversals() {
        let (nodes, edges, _components, graph) = harness();

        let a = nodes.add("n", Data::new("n"), BTreeSet::new(), 0).unwrap();
        let b = nodes.add("n", Data::new("n"), BTreeSet::new(), 0).unwrap();
        let c = nodes.add("n", Data::new("n"), BTreeSet::new(), 0).unwrap();
        edges
            .add("e", a.locator, b.locator, Data::new("e"), BTreeSet::new(), 0)
            .unwrap();
        edges
            .add("e", b.locator, c.locator, Data::new("e"), BTreeSet::new(), 0)
            .unwrap();

        assert!(graph.has_path(a.id(), c.id()).unwrap());
        assert!(!graph.has_path(c.id(), a.id()).unwrap());

        let path = graph.shortest_path(a.id(), c.id()).unwrap();
        assert_eq!(path.edge_count(), 2);

        assert_eq!(graph.neighbors(b.id()).unwrap().len(), 2);
        assert_eq!(graph.active_connected().unwrap().len(), 2);
    }

    #[test]
    fn component_facade_update_cascades_through_node_facade() {
        let (nodes, _edges, components, _graph) = harness();

        let c = components.add("tag", Data::new("tag"), 0).unwrap();
        let n = nodes
            .add("person", Data::new("person"), BTreeSet::from([c.locator]), 1)
            .unwrap();

        let c2 = components.update(c.id(), None, None, 2).unwrap();
        let n2 = nodes.find_active(n.id()).unwrap().unwrap();

        assert_eq!(n2.locator.version, 2);
        assert!(n2.components.contains(&c2.locator));
        assert!(!n2.components.contains(&c.locator));
    }

    #[test]
    fn component_facade_expire_leaves_nodes_untouched() {
        let (nodes, _edges, components, _graph) = harness();

        let c = components.add("tag", Data::new("tag"), 0).unwrap();
        let n = nodes
            .add("person", Data::new("person"), BTreeSet::from([c.locator]), 1)
            .unwrap();

        components.expire(c.id(), 2).unwrap();

        let n_unchanged = nodes.find_active(n.id()).unwrap().unwrap();
        assert_eq!(n_unchanged.locator.version, 1);
        assert!(n_unchanged.components.contains(&c.locator));
    }
}
