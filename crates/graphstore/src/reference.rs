//! Lazy resolution of a locator to its entity (spec.md §9).
//!
//! Edges carry *locators* to their endpoints rather than owning the node
//! records themselves, so resolving a path element to the full record is a
//! separate, possibly-deferred step. This keeps the graph free of raw
//! pointer cycles (edge -> node -> edge) and keeps the door open for a
//! backend where resolution is not a free hashmap lookup.

use graphstore_core::StoredEntity;
use graphstore_proto::Locator;

/// Either an already-materialized entity or just the locator naming it.
///
/// The two variants compare equal whenever they denote the same locator,
/// regardless of whether one side has been resolved.
#[derive(Debug, Clone)]
pub enum Reference<T> {
    Loaded(T),
    Unloaded(Locator),
}

impl<T: StoredEntity> Reference<T> {
    pub fn locator(&self) -> Locator {
        match self {
            Reference::Loaded(value) => value.locator(),
            Reference::Unloaded(locator) => *locator,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Reference::Loaded(_))
    }

    /// Return the entity, resolving it via `resolver` if this reference is
    /// still unloaded.
    pub fn resolve<E>(self, resolver: impl FnOnce(Locator) -> Result<T, E>) -> Result<T, E> {
        match self {
            Reference::Loaded(value) => Ok(value),
            Reference::Unloaded(locator) => resolver(locator),
        }
    }
}

impl<T: StoredEntity> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.locator() == other.locator()
    }
}

impl<T: StoredEntity> Eq for Reference<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_core::Node;
    use graphstore_proto::{new_id, Data};
    use std::collections::BTreeSet;

    fn sample_node() -> Node {
        Node {
            locator: Locator::first(new_id()),
            node_type: "person".into(),
            data: Data::new("person"),
            components: BTreeSet::new(),
            created: 0,
            expired: None,
        }
    }

    #[test]
    fn loaded_and_unloaded_compare_by_locator() {
        let node = sample_node();
        let loaded = Reference::Loaded(node.clone());
        let unloaded = Reference::<Node>::Unloaded(node.locator);
        assert_eq!(loaded, unloaded);
    }

    #[test]
    fn resolve_skips_resolver_when_already_loaded() {
        let node = sample_node();
        let loaded = Reference::Loaded(node.clone());
        let resolved = loaded
            .resolve(|_| -> Result<Node, ()> { panic!("resolver should not run") })
            .unwrap();
        assert_eq!(resolved, node);
    }

    #[test]
    fn resolve_invokes_resolver_when_unloaded() {
        let node = sample_node();
        let unloaded = Reference::Unloaded(node.locator);
        let resolved = unloaded.resolve(|locator| Ok::<_, ()>(Node { locator, ..node.clone() }));
        assert_eq!(resolved.unwrap(), node);
    }
}
