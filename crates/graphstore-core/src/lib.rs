//! Storage contract and entity records for the bitemporal graph store.
//!
//! This crate owns spec.md §3 (Entities) and §4.3 (Storage Contract): the
//! `Node`/`Edge`/`Component` record types, the sled-backed [`StorageEngine`]
//! and generic [`Repository`], and the [`Session`]/[`SessionFactory`] unit
//! of work the integrity engine (in the `graphstore` crate) commits through.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod entity;
pub mod error;
pub mod repository;
pub mod session;
pub mod storage;

pub use entity::{Component, Edge, Node, StoredEntity};
pub use error::StorageError;
pub use repository::Repository;
pub use session::{GraphRepositories, Session, SessionFactory};
pub use storage::{Record, StorageConfig, StorageEngine, VersionedKey};

/// Re-export protocol types used throughout the storage contract.
pub use graphstore_proto as proto;
