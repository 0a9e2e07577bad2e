//! Entities: the immutable, versioned records the storage contract deals in.
//!
//! A [`Node`], [`Edge`], or [`Component`] is never mutated in place —
//! callers always produce a new value and hand it to a [`crate::Repository`]
//! for storage. Each type's `locator`, `created`, and `expired` fields are
//! the temporal identity spec.md §3 describes; everything else is
//! entity-kind-specific payload that round-trips through rkyv into a
//! [`crate::storage::Record`]'s opaque `payload` bytes.

use std::collections::BTreeSet;

use graphstore_proto::{Data, Id, Locator};
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::StorageError;

/// Common shape every versioned entity kind implements so that
/// [`crate::Repository`] can be generic over "a node, an edge, or a
/// component" without knowing which.
pub trait StoredEntity: Sized + Clone {
    /// The entity-kind tag used for the storage engine's type index
    /// (`all_ids`/`all_active_ids` scope by this).
    const KIND: &'static str;

    fn locator(&self) -> Locator;
    fn created(&self) -> i64;
    fn expired(&self) -> Option<i64>;

    /// Encode everything except `locator`/`created`/`expired` — those are
    /// carried by the storage engine's [`crate::storage::Record`] envelope
    /// and the `(id, version)` key, not duplicated into the payload.
    fn encode_body(&self) -> Result<Vec<u8>, StorageError>;

    /// Reassemble an entity from a decoded payload plus the temporal
    /// fields the storage engine already knows.
    fn decode_body(
        locator: Locator,
        created: i64,
        expired: Option<i64>,
        bytes: &[u8],
    ) -> Result<Self, StorageError>;
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
struct NodeBody {
    node_type: String,
    data: Data,
    components: Vec<Locator>,
}

/// A node version: `{locator, type, data, created, expired?}` plus the set
/// of component locators this version references (spec.md §3/§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub locator: Locator,
    pub node_type: String,
    pub data: Data,
    pub components: BTreeSet<Locator>,
    pub created: i64,
    pub expired: Option<i64>,
}

impl Node {
    pub fn id(&self) -> Id {
        self.locator.id
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }
}

impl StoredEntity for Node {
    const KIND: &'static str = "node";

    fn locator(&self) -> Locator {
        self.locator
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn expired(&self) -> Option<i64> {
        self.expired
    }

    fn encode_body(&self) -> Result<Vec<u8>, StorageError> {
        let body = NodeBody {
            node_type: self.node_type.clone(),
            data: self.data.clone(),
            components: self.components.iter().copied().collect(),
        };
        rkyv::to_bytes::<rkyv::rancor::Error>(&body)
            .map(|v| v.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn decode_body(
        locator: Locator,
        created: i64,
        expired: Option<i64>,
        bytes: &[u8],
    ) -> Result<Self, StorageError> {
        let body: NodeBody = rkyv::from_bytes::<NodeBody, rkyv::rancor::Error>(bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;
        Ok(Self {
            locator,
            node_type: body.node_type,
            data: body.data,
            components: body.components.into_iter().collect(),
            created,
            expired,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
struct EdgeBody {
    edge_type: String,
    source: Locator,
    target: Locator,
    data: Data,
    components: Vec<Locator>,
}

/// An edge version. `source`/`target` bind to a *specific node version*,
/// not just a node id — an edge is pinned to the endpoint versions that
/// existed when it was created (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub locator: Locator,
    pub edge_type: String,
    pub source: Locator,
    pub target: Locator,
    pub data: Data,
    pub components: BTreeSet<Locator>,
    pub created: i64,
    pub expired: Option<i64>,
}

impl Edge {
    pub fn id(&self) -> Id {
        self.locator.id
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }
}

impl StoredEntity for Edge {
    const KIND: &'static str = "edge";

    fn locator(&self) -> Locator {
        self.locator
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn expired(&self) -> Option<i64> {
        self.expired
    }

    fn encode_body(&self) -> Result<Vec<u8>, StorageError> {
        let body = EdgeBody {
            edge_type: self.edge_type.clone(),
            source: self.source,
            target: self.target,
            data: self.data.clone(),
            components: self.components.iter().copied().collect(),
        };
        rkyv::to_bytes::<rkyv::rancor::Error>(&body)
            .map(|v| v.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn decode_body(
        locator: Locator,
        created: i64,
        expired: Option<i64>,
        bytes: &[u8],
    ) -> Result<Self, StorageError> {
        let body: EdgeBody = rkyv::from_bytes::<EdgeBody, rkyv::rancor::Error>(bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;
        Ok(Self {
            locator,
            edge_type: body.edge_type,
            source: body.source,
            target: body.target,
            data: body.data,
            components: body.components.into_iter().collect(),
            created,
            expired,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
struct ComponentBody {
    component_type: String,
    data: Data,
}

/// A component version: a named metadata entity that nodes and edges
/// reference via their `components` set (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub locator: Locator,
    pub component_type: String,
    pub data: Data,
    pub created: i64,
    pub expired: Option<i64>,
}

impl Component {
    pub fn id(&self) -> Id {
        self.locator.id
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }
}

impl StoredEntity for Component {
    const KIND: &'static str = "component";

    fn locator(&self) -> Locator {
        self.locator
    }

    fn created(&self) -> i64 {
        self.created
    }

    fn expired(&self) -> Option<i64> {
        self.expired
    }

    fn encode_body(&self) -> Result<Vec<u8>, StorageError> {
        let body = ComponentBody {
            component_type: self.component_type.clone(),
            data: self.data.clone(),
        };
        rkyv::to_bytes::<rkyv::rancor::Error>(&body)
            .map(|v| v.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn decode_body(
        locator: Locator,
        created: i64,
        expired: Option<i64>,
        bytes: &[u8],
    ) -> Result<Self, StorageError> {
        let body: ComponentBody = rkyv::from_bytes::<ComponentBody, rkyv::rancor::Error>(bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))?;
        Ok(Self {
            locator,
            component_type: body.component_type,
            data: body.data,
            created,
            expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_proto::new_id;

    #[test]
    fn node_body_roundtrip() {
        let node = Node {
            locator: Locator::first(new_id()),
            node_type: "person".into(),
            data: Data::new("person").with_field("name", "Ada"),
            components: BTreeSet::from([Locator::first(new_id())]),
            created: 100,
            expired: None,
        };
        let bytes = node.encode_body().unwrap();
        let decoded = Node::decode_body(node.locator, node.created, node.expired, &bytes).unwrap();
        assert_eq!(node, decoded);
    }

    #[test]
    fn edge_body_roundtrip() {
        let edge = Edge {
            locator: Locator::first(new_id()),
            edge_type: "knows".into(),
            source: Locator::first(new_id()),
            target: Locator::first(new_id()),
            data: Data::new("knows"),
            components: BTreeSet::new(),
            created: 10,
            expired: Some(20),
        };
        let bytes = edge.encode_body().unwrap();
        let decoded = Edge::decode_body(edge.locator, edge.created, edge.expired, &bytes).unwrap();
        assert_eq!(edge, decoded);
    }

    #[test]
    fn component_body_roundtrip() {
        let component = Component {
            locator: Locator::first(new_id()),
            component_type: "tag".into(),
            data: Data::new("tag").with_field("label", "blue"),
            created: 5,
            expired: None,
        };
        let bytes = component.encode_body().unwrap();
        let decoded =
            Component::decode_body(component.locator, component.created, component.expired, &bytes)
                .unwrap();
        assert_eq!(component, decoded);
    }
}
