//! Bitemporal, versioned property-graph store with cascading referential
//! integrity.
//!
//! This crate owns spec.md §4.4 (Integrity Engine), §4.5 (Graph View &
//! Traversals), and §4.6 (Service Facade): the in-memory mutating graph
//! operations, the read-only traversal queries over an active snapshot, and
//! the thin per-entity facades that tie both to the storage contract in
//! `graphstore-core`.
//!
//! # Modules
//!
//! - [`clock`] - the timestamp seam between deterministic engine logic and
//!   wall-clock-reading callers
//! - [`engine`] - the integrity engine: `Node`/`Edge`/`Component`
//!   `add`/`update`/`expire`, including the component-update cascade
//! - [`error`] - the facade-level error type
//! - [`facade`] - per-entity service facades (`NodeFacade`, `EdgeFacade`,
//!   `ComponentFacade`, `GraphFacade`)
//! - [`graph`] - the in-memory working graph the engine mutates and the
//!   graph view reads
//! - [`reference`] - the lazy `Reference<T>` locator-resolution sum type
//! - [`remap`] - the component-remap table threaded through
//!   `Component.update`'s cascade
//! - [`view`] - the read-only `GraphView` and its traversal queries

pub mod clock;
pub mod engine;
pub mod error;
pub mod facade;
pub mod graph;
pub mod reference;
pub mod remap;
pub mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::Engine;
pub use error::Error;
pub use facade::{ComponentFacade, EdgeFacade, GraphFacade, NodeFacade};
pub use graph::Graph;
pub use reference::Reference;
pub use remap::ComponentRemap;
pub use view::{GraphView, Path, PathElement, DEFAULT_MAX_DEPTH};

/// Re-export the storage contract crate.
pub use graphstore_core as core;
/// Re-export identifier/locator/data-payload primitives.
pub use graphstore_proto as proto;
