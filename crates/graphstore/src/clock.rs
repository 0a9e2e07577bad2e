//! Timestamp seam used by the facade.
//!
//! The integrity engine and graph view never read the wall clock — every
//! timestamp an operation produces is supplied by its caller, so cascades
//! stay deterministic and testable. `Clock` is the narrow boundary where a
//! real timestamp actually gets read, analogous to the engine's own habit
//! of keeping wall-clock reads behind a small seam (see
//! `ormdb-core::metrics::MetricsRegistry`'s `started_at: Instant`).

use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time in milliseconds since the Unix epoch, matching
/// the millisecond precision the storage contract stores timestamps at.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Reads the real wall clock via [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_millis() as i64
    }
}

/// A test double that always returns the same configured instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}
