//! The integrity engine (spec.md §4.4): the in-memory, cascading mutation
//! operations for nodes, edges, and components.
//!
//! Every operation here is `expire-at-t` then `create-new-at-t`, sharing one
//! primitive for all update variants (spec.md §9, "update composition").
//! Writes are staged onto the [`Session`] and applied to the in-memory
//! [`Graph`] together, so the two never drift apart mid-cascade.

use std::collections::{BTreeSet, HashSet, VecDeque};

use graphstore_core::{Component, Edge, Node, Session};
use graphstore_proto::{new_id, Data, Id, Locator};

use crate::error::Error;
use crate::graph::Graph;
use crate::remap::ComponentRemap;

/// Runs integrity operations against one in-memory [`Graph`], staging the
/// resulting writes onto `session`. Constructed fresh per logical operation
/// by the service facade.
pub struct Engine<'a> {
    graph: &'a mut Graph,
    session: &'a Session,
}

impl<'a> Engine<'a> {
    pub fn new(graph: &'a mut Graph, session: &'a Session) -> Self {
        Self { graph, session }
    }

    // ---- Node operations -------------------------------------------------

    /// `Node.add(type, data, components, t)`. Every component locator must
    /// resolve to a component active right now.
    #[tracing::instrument(skip(self, data))]
    pub fn add_node(
        &mut self,
        node_type: impl Into<String>,
        data: Data,
        components: BTreeSet<Locator>,
        t: i64,
    ) -> Result<Node, Error> {
        for component in &components {
            self.require_component_active(*component)?;
        }
        let node = Node {
            locator: Locator::first(new_id()),
            node_type: node_type.into(),
            data,
            components,
            created: t,
            expired: None,
        };
        self.apply_node_save(node.clone());
        Ok(node)
    }

    /// `Node.update(id, type?, data?, components?, t)`. Expires the active
    /// version, creates the incremented one, and recreates every edge
    /// incident to it with the changed endpoint rewritten.
    #[tracing::instrument(skip(self, node_type, data, components))]
    pub fn update_node(
        &mut self,
        id: Id,
        node_type: Option<String>,
        data: Option<Data>,
        components: Option<BTreeSet<Locator>>,
        t: i64,
    ) -> Result<Node, Error> {
        if let Some(components) = &components {
            for component in components {
                self.require_component_active(*component)?;
            }
        }
        let mut already_recreated = HashSet::new();
        self.update_node_internal(id, node_type, data, components, t, None, &mut already_recreated)
    }

    /// `Node.expire(id, t)`. Expires every active incident edge first, then
    /// the node itself; returns the now-expired record.
    #[tracing::instrument(skip(self))]
    pub fn expire_node(&mut self, id: Id, t: i64) -> Result<Node, Error> {
        let active = self
            .graph
            .node(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("node {id} has no active version")))?;

        let incident: HashSet<Id> = self
            .graph
            .out_edge_ids(id)
            .iter()
            .chain(self.graph.in_edge_ids(id).iter())
            .copied()
            .collect();
        for edge_id in incident {
            if let Some(edge) = self.graph.edge(edge_id).cloned() {
                tracing::debug!(edge = %edge_id, "expiring edge incident to expired node");
                self.apply_edge_expire(&edge, t);
            }
        }

        self.apply_node_expire(&active, t);
        Ok(Node {
            expired: Some(t),
            ..active
        })
    }

    /// Shared implementation behind both the public `update_node` and the
    /// node-cascade phase of `Component.update`. `remap`, when set, is
    /// applied to the components set of every edge recreated here, on top
    /// of endpoint rewriting. `already_recreated` is shared across the
    /// whole enclosing operation so no edge is ever bumped twice.
    fn update_node_internal(
        &mut self,
        id: Id,
        node_type: Option<String>,
        data: Option<Data>,
        components: Option<BTreeSet<Locator>>,
        t: i64,
        remap: Option<&ComponentRemap>,
        already_recreated: &mut HashSet<Id>,
    ) -> Result<Node, Error> {
        let active = self
            .graph
            .node(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("node {id} has no active version")))?;

        let incident_ids: HashSet<Id> = self
            .graph
            .out_edge_ids(id)
            .iter()
            .chain(self.graph.in_edge_ids(id).iter())
            .copied()
            .collect();
        let incident_edges: Vec<Edge> = incident_ids
            .iter()
            .filter_map(|edge_id| self.graph.edge(*edge_id).cloned())
            .collect();

        self.apply_node_expire(&active, t);

        let new_locator = active.locator.increment();
        let new_node = Node {
            locator: new_locator,
            node_type: node_type.unwrap_or_else(|| active.node_type.clone()),
            data: data.unwrap_or_else(|| active.data.clone()),
            components: components.unwrap_or_else(|| active.components.clone()),
            created: t,
            expired: None,
        };
        self.apply_node_save(new_node.clone());

        for edge in incident_edges {
            let edge_id = edge.id();
            if already_recreated.contains(&edge_id) {
                tracing::debug!(edge = %edge_id, "skipping edge already recreated this operation");
                continue;
            }
            let new_source = (edge.source == active.locator).then_some(new_locator);
            let new_target = (edge.target == active.locator).then_some(new_locator);
            self.recreate_edge(&edge, new_source, new_target, remap, t);
            already_recreated.insert(edge_id);
        }

        Ok(new_node)
    }

    // ---- Edge operations ---------------------------------------------------

    /// `Edge.add(type, source, target, data, components, t)`. Rejects the
    /// add if it would close a cycle within the set of active edges sharing
    /// a component with the new edge.
    #[tracing::instrument(skip(self, data))]
    pub fn add_edge(
        &mut self,
        edge_type: impl Into<String>,
        source: Locator,
        target: Locator,
        data: Data,
        components: BTreeSet<Locator>,
        t: i64,
    ) -> Result<Edge, Error> {
        self.require_active_node(source)?;
        self.require_active_node(target)?;
        for component in &components {
            self.require_component_active(*component)?;
        }
        for component in &components {
            if self.component_scoped_path_exists(target.id, source.id, *component) {
                return Err(Error::CycleRejected(format!(
                    "edge {source} -> {target} would close a cycle within component {component}"
                )));
            }
        }

        let edge = Edge {
            locator: Locator::first(new_id()),
            edge_type: edge_type.into(),
            source,
            target,
            data,
            components,
            created: t,
            expired: None,
        };
        self.apply_edge_save(edge.clone());
        Ok(edge)
    }

    /// `Edge.update(id, type?, data?, components?, t)`.
    #[tracing::instrument(skip(self, edge_type, data, components))]
    pub fn update_edge(
        &mut self,
        id: Id,
        edge_type: Option<String>,
        data: Option<Data>,
        components: Option<BTreeSet<Locator>>,
        t: i64,
    ) -> Result<Edge, Error> {
        let active = self
            .graph
            .edge(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("edge {id} has no active version")))?;
        self.apply_edge_expire(&active, t);

        let new_edge = Edge {
            locator: active.locator.increment(),
            edge_type: edge_type.unwrap_or_else(|| active.edge_type.clone()),
            source: active.source,
            target: active.target,
            data: data.unwrap_or_else(|| active.data.clone()),
            components: components.unwrap_or_else(|| active.components.clone()),
            created: t,
            expired: None,
        };
        self.apply_edge_save(new_edge.clone());
        Ok(new_edge)
    }

    /// `Edge.expire(id, t)`. No cascade.
    #[tracing::instrument(skip(self))]
    pub fn expire_edge(&mut self, id: Id, t: i64) -> Result<Edge, Error> {
        let active = self
            .graph
            .edge(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("edge {id} has no active version")))?;
        self.apply_edge_expire(&active, t);
        Ok(Edge {
            expired: Some(t),
            ..active
        })
    }

    /// Expire `edge`, then create the next version with `new_source`/
    /// `new_target` substituted for whichever endpoints changed (`None`
    /// keeps the original) and `remap` applied to its components.
    fn recreate_edge(
        &mut self,
        edge: &Edge,
        new_source: Option<Locator>,
        new_target: Option<Locator>,
        remap: Option<&ComponentRemap>,
        t: i64,
    ) -> Edge {
        self.apply_edge_expire(edge, t);
        let new_edge = Edge {
            locator: edge.locator.increment(),
            edge_type: edge.edge_type.clone(),
            source: new_source.unwrap_or(edge.source),
            target: new_target.unwrap_or(edge.target),
            data: edge.data.clone(),
            components: match remap {
                Some(remap) => remap.apply(&edge.components),
                None => edge.components.clone(),
            },
            created: t,
            expired: None,
        };
        self.apply_edge_save(new_edge.clone());
        new_edge
    }

    /// True iff a path from `from` to `to` exists using only active edges
    /// whose components include `component` — i.e. whether an edge
    /// `to -> from` carrying `component` would close a cycle.
    fn component_scoped_path_exists(&self, from: Id, to: Id, component: Locator) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for edge_id in self.graph.out_edge_ids(current) {
                let Some(edge) = self.graph.edge(*edge_id) else {
                    continue;
                };
                if !edge.components.contains(&component) {
                    continue;
                }
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

    // ---- Component operations ----------------------------------------------

    /// `Component.add(type, data, t)`.
    #[tracing::instrument(skip(self, data))]
    pub fn add_component(&mut self, component_type: impl Into<String>, data: Data, t: i64) -> Result<Component, Error> {
        let component = Component {
            locator: Locator::first(new_id()),
            component_type: component_type.into(),
            data,
            created: t,
            expired: None,
        };
        self.apply_component_save(component.clone());
        Ok(component)
    }

    /// `Component.update(id, type?, data?, t)` — the deepest cascade.
    ///
    /// Phase order (spec.md §5): expire/save the component, recreate every
    /// edge directly referencing it (edge-first phase), then cascade every
    /// node directly referencing it through [`Engine::update_node_internal`],
    /// which skips edges the edge-first phase already recreated.
    #[tracing::instrument(skip(self, component_type, data))]
    pub fn update_component(
        &mut self,
        id: Id,
        component_type: Option<String>,
        data: Option<Data>,
        t: i64,
    ) -> Result<Component, Error> {
        let active = self
            .graph
            .component(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("component {id} has no active version")))?;

        self.apply_component_expire(&active, t);
        let new_locator = active.locator.increment();
        let new_component = Component {
            locator: new_locator,
            component_type: component_type.unwrap_or_else(|| active.component_type.clone()),
            data: data.unwrap_or_else(|| active.data.clone()),
            created: t,
            expired: None,
        };
        self.apply_component_save(new_component.clone());

        let mut remap = ComponentRemap::new();
        remap.insert(active.locator, new_locator);
        let mut already_recreated = HashSet::new();

        let affected_edges: Vec<Id> = self
            .graph
            .edges()
            .filter(|edge| edge.components.contains(&active.locator))
            .map(|edge| edge.id())
            .collect();
        for edge_id in affected_edges {
            let edge = self.graph.edge(edge_id).cloned().expect("id just collected from graph.edges()");
            tracing::debug!(edge = %edge_id, "recreating edge referencing updated component");
            self.recreate_edge(&edge, None, None, Some(&remap), t);
            already_recreated.insert(edge_id);
        }

        let affected_nodes: Vec<Id> = self
            .graph
            .nodes()
            .filter(|node| node.components.contains(&active.locator))
            .map(|node| node.id())
            .collect();
        for node_id in affected_nodes {
            let node = self.graph.node(node_id).cloned().expect("id just collected from graph.nodes()");
            let remapped_components = remap.apply(&node.components);
            tracing::debug!(node = %node_id, "cascading node update for updated component");
            self.update_node_internal(
                node_id,
                None,
                None,
                Some(remapped_components),
                t,
                Some(&remap),
                &mut already_recreated,
            )?;
        }

        Ok(new_component)
    }

    /// `Component.expire(id, t)`. No cascade: elements keep referencing the
    /// now-historical locator (spec.md §4.4, deliberate and load-bearing).
    #[tracing::instrument(skip(self))]
    pub fn expire_component(&mut self, id: Id, t: i64) -> Result<Component, Error> {
        let active = self
            .graph
            .component(id)
            .cloned()
            .ok_or_else(|| Error::NotActive(format!("component {id} has no active version")))?;
        self.apply_component_expire(&active, t);
        Ok(Component {
            expired: Some(t),
            ..active
        })
    }

    // ---- preconditions -------------------------------------------------

    fn require_active_node(&self, locator: Locator) -> Result<(), Error> {
        match self.graph.node(locator.id) {
            Some(node) if node.locator == locator => Ok(()),
            _ => Err(Error::NotActive(format!("{locator} is not an active node"))),
        }
    }

    fn require_component_active(&self, locator: Locator) -> Result<(), Error> {
        match self.graph.component(locator.id) {
            Some(component) if component.locator == locator => Ok(()),
            _ => Err(Error::InvalidArgument(format!("component {locator} is not active"))),
        }
    }

    // ---- staging + graph mutation, applied together ---------------------

    fn apply_node_save(&mut self, node: Node) {
        self.session.stage_save_node(node.clone());
        self.graph.put_node(node);
    }

    fn apply_node_expire(&mut self, node: &Node, t: i64) {
        self.session.stage_expire_node(node.id(), t);
        self.graph.remove_node(node.id());
    }

    fn apply_edge_save(&mut self, edge: Edge) {
        self.session.stage_save_edge(edge.clone());
        self.graph.put_edge(edge);
    }

    fn apply_edge_expire(&mut self, edge: &Edge, t: i64) {
        self.session.stage_expire_edge(edge.id(), t);
        self.graph.remove_edge(edge.id());
    }

    fn apply_component_save(&mut self, component: Component) {
        self.session.stage_save_component(component.clone());
        self.graph.put_component(component);
    }

    fn apply_component_expire(&mut self, component: &Component, t: i64) {
        self.session.stage_expire_component(component.id(), t);
        self.graph.remove_component(component.id());
    }
}
