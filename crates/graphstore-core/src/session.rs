//! Graph-level repository aggregate, and the scoped unit-of-work
//! ([`Session`]/[`SessionFactory`]) the integrity engine commits through
//! (spec.md §4.3).

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use graphstore_proto::Id;

use crate::entity::{Component, Edge, Node};
use crate::error::StorageError;
use crate::repository::Repository;
use crate::storage::{StorageConfig, StorageEngine};

/// `{nodes, edges, components}` — a single object binding all three
/// entity-kind repositories to one backend.
#[derive(Clone)]
pub struct GraphRepositories {
    pub nodes: Repository<Node>,
    pub edges: Repository<Edge>,
    pub components: Repository<Component>,
}

impl GraphRepositories {
    /// Open (or create) a sled database at `config.path` and bind all three
    /// repositories to it.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let engine = Arc::new(StorageEngine::open(config)?);
        Ok(Self {
            nodes: Repository::new(Arc::clone(&engine)),
            edges: Repository::new(Arc::clone(&engine)),
            components: Repository::new(engine),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    RolledBack,
}

/// One staged write, queued by the integrity engine while it computes a
/// cascade and flushed to the repositories on [`Session::commit`].
///
/// Staging (rather than writing through immediately) is what gives the
/// engine unit-of-work semantics on top of a backend — `sled` itself has no
/// notion of a multi-call, cross-repository transaction — and what makes
/// [`Session::rollback`] free: a rolled-back session simply never flushes.
enum StagedOp {
    SaveNode(Node),
    ExpireNode(Id, i64),
    SaveEdge(Edge),
    ExpireEdge(Id, i64),
    SaveComponent(Component),
    ExpireComponent(Id, i64),
}

/// A scoped acquisition of the graph repositories for one unit of work.
///
/// Mirrors spec.md §4.3: `commit()`/`rollback()` are explicit, and a
/// `Session` dropped without either is auto-rolled-back — no partial cascade
/// is ever observable by another reader, because nothing is written until
/// `commit` succeeds.
pub struct Session {
    repos: GraphRepositories,
    ops: RefCell<Vec<StagedOp>>,
    state: Cell<SessionState>,
}

impl Session {
    fn new(repos: GraphRepositories) -> Self {
        Self {
            repos,
            ops: RefCell::new(Vec::new()),
            state: Cell::new(SessionState::Open),
        }
    }

    pub fn repositories(&self) -> &GraphRepositories {
        &self.repos
    }

    pub fn stage_save_node(&self, node: Node) {
        self.ops.borrow_mut().push(StagedOp::SaveNode(node));
    }

    pub fn stage_expire_node(&self, id: Id, at: i64) {
        self.ops.borrow_mut().push(StagedOp::ExpireNode(id, at));
    }

    pub fn stage_save_edge(&self, edge: Edge) {
        self.ops.borrow_mut().push(StagedOp::SaveEdge(edge));
    }

    pub fn stage_expire_edge(&self, id: Id, at: i64) {
        self.ops.borrow_mut().push(StagedOp::ExpireEdge(id, at));
    }

    pub fn stage_save_component(&self, component: Component) {
        self.ops.borrow_mut().push(StagedOp::SaveComponent(component));
    }

    pub fn stage_expire_component(&self, id: Id, at: i64) {
        self.ops.borrow_mut().push(StagedOp::ExpireComponent(id, at));
    }

    /// Flush every staged write to the repositories, in the order they were
    /// staged. The deterministic cascade ordering from spec.md §5 is
    /// preserved because the integrity engine stages operations in that
    /// order as it runs.
    #[tracing::instrument(skip(self))]
    pub fn commit(self) -> Result<(), StorageError> {
        for op in self.ops.borrow_mut().drain(..) {
            match op {
                StagedOp::SaveNode(node) => self.repos.nodes.save(&node)?,
                StagedOp::ExpireNode(id, at) => {
                    self.repos.nodes.expire(id, at)?;
                }
                StagedOp::SaveEdge(edge) => self.repos.edges.save(&edge)?,
                StagedOp::ExpireEdge(id, at) => {
                    self.repos.edges.expire(id, at)?;
                }
                StagedOp::SaveComponent(component) => self.repos.components.save(&component)?,
                StagedOp::ExpireComponent(id, at) => {
                    self.repos.components.expire(id, at)?;
                }
            }
        }
        self.state.set(SessionState::Committed);
        Ok(())
    }

    /// Discard every staged write. Nothing was ever written, so this is
    /// just bookkeeping — equivalent to dropping the session without
    /// committing.
    pub fn rollback(self) {
        self.ops.borrow_mut().clear();
        self.state.set(SessionState::RolledBack);
    }

    pub fn is_open(&self) -> bool {
        self.state.get() == SessionState::Open
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.get() == SessionState::Open {
            self.ops.borrow_mut().clear();
            self.state.set(SessionState::RolledBack);
        }
    }
}

/// Yields fresh [`Session`]s bound to one set of graph repositories.
#[derive(Clone)]
pub struct SessionFactory {
    repos: GraphRepositories,
}

impl SessionFactory {
    pub fn new(repos: GraphRepositories) -> Self {
        Self { repos }
    }

    pub fn open(&self) -> Session {
        Session::new(self.repos.clone())
    }

    /// Read-only access to the underlying repositories, for facade calls
    /// that don't need the integrity engine (plain lookups, administrative
    /// delete).
    pub fn repositories(&self) -> &GraphRepositories {
        &self.repos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;
    use graphstore_proto::{new_id, Data, Locator};
    use std::collections::BTreeSet;

    fn factory() -> SessionFactory {
        let repos = GraphRepositories::open(StorageConfig::temporary()).unwrap();
        SessionFactory::new(repos)
    }

    fn sample_node(locator: Locator) -> Node {
        Node {
            locator,
            node_type: "person".into(),
            data: Data::new("person"),
            components: BTreeSet::new(),
            created: 100,
            expired: None,
        }
    }

    #[test]
    fn commit_flushes_staged_writes() {
        let factory = factory();
        let session = factory.open();
        let locator = Locator::first(new_id());
        session.stage_save_node(sample_node(locator));
        session.commit().unwrap();

        assert!(factory
            .repos
            .nodes
            .find_active(locator.id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let factory = factory();
        let session = factory.open();
        let locator = Locator::first(new_id());
        session.stage_save_node(sample_node(locator));
        session.rollback();

        assert!(factory
            .repos
            .nodes
            .find_active(locator.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn drop_without_commit_auto_rolls_back() {
        let factory = factory();
        let locator = Locator::first(new_id());
        {
            let session = factory.open();
            session.stage_save_node(sample_node(locator));
        }

        assert!(factory
            .repos
            .nodes
            .find_active(locator.id)
            .unwrap()
            .is_none());
    }
}
