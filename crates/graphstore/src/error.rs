//! Facade-level error types.

use thiserror::Error;

/// Errors surfaced by the integrity engine, graph view, and service facade.
///
/// A recoverable error (`CycleRejected`, `NotActive`, `NotFound`,
/// `InvalidArgument`, `Conflict`) leaves the session intact — the caller may
/// issue another operation on it. `StorageError` and `Internal` are not
/// recoverable: the caller must roll the session back.
#[derive(Debug, Error)]
pub enum Error {
    /// A locator or id has no corresponding record.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation required an unexpired version that does not exist.
    #[error("not active: {0}")]
    NotActive(String),

    /// Adding an edge would close a cycle within a single component.
    #[error("cycle rejected: {0}")]
    CycleRejected(String),

    /// A precondition was violated (e.g. a component locator not active at
    /// operation time).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage backend refused a read or write.
    #[error("storage error: {0}")]
    Storage(#[from] graphstore_core::StorageError),

    /// `(id, version)` already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An invariant the engine itself is responsible for was violated. This
    /// is never constructed speculatively — only when a cascade
    /// postcondition the engine checked itself did not hold.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// No path exists between two nodes.
    #[error("no path between {from} and {to}")]
    NoPath {
        /// Source node id (textual form).
        from: String,
        /// Target node id (textual form).
        to: String,
    },
}
