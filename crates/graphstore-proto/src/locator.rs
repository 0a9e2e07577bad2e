//! Locators: the `(id, version)` pair naming one version of one entity.

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

use crate::id::Id;

/// The first version assigned to any newly created entity.
pub const FIRST_VERSION: u64 = 1;

/// A `(id, version)` pair uniquely naming one version of one entity.
///
/// Two locators sharing an `id` but differing in `version` denote two
/// versions of the same logical entity; only one such version may be
/// active (unexpired) at a time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize)]
pub struct Locator {
    pub id: Id,
    pub version: u64,
}

impl Locator {
    /// The locator for the first version of a brand new entity.
    pub fn first(id: Id) -> Self {
        Self {
            id,
            version: FIRST_VERSION,
        }
    }

    /// Returns the locator for the next version of the same entity.
    pub fn increment(&self) -> Self {
        Self {
            id: self.id,
            version: self.version + 1,
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
