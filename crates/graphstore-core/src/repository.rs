//! The versioned repository contract (spec.md §4.3), implemented once over
//! the sled-backed [`StorageEngine`] and generic over entity kind.

use std::marker::PhantomData;
use std::sync::Arc;

use graphstore_proto::{Id, Locator};

use crate::entity::StoredEntity;
use crate::error::StorageError;
use crate::storage::{Record, StorageEngine, VersionedKey};

/// A versioned repository for one entity kind (node, edge, or component).
///
/// Every method here maps directly onto a bullet in spec.md §4.3: `save` is
/// idempotent on `(id, version)`, `expire` sets `expired` on the currently
/// active row, and the `find*` family covers exact-version, active, and
/// point-in-time lookup.
pub struct Repository<E: StoredEntity> {
    engine: Arc<StorageEngine>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: StoredEntity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            _marker: PhantomData,
        }
    }
}

impl<E: StoredEntity> Repository<E> {
    pub fn new(engine: Arc<StorageEngine>) -> Self {
        Self {
            engine,
            _marker: PhantomData,
        }
    }

    /// Insert a new version. Never updates an existing `(id, version)` row
    /// in place except through [`Repository::expire`].
    #[tracing::instrument(skip(self, entity), fields(kind = E::KIND))]
    pub fn save(&self, entity: &E) -> Result<(), StorageError> {
        let locator = entity.locator();
        let key = VersionedKey::for_locator(locator.id, locator.version);
        let record = Record::new(entity.encode_body()?, entity.created());
        let record = match entity.expired() {
            Some(at) => record.expire_at(at),
            None => record,
        };
        self.engine.put_typed(E::KIND, key, record)
    }

    /// Set `expired = at` on `id`'s currently active version. Returns
    /// `false` (without error) if `id` has no active version.
    #[tracing::instrument(skip(self), fields(kind = E::KIND))]
    pub fn expire(&self, id: Id, at: i64) -> Result<bool, StorageError> {
        match self.engine.get_active(id.as_bytes())? {
            Some((version, _)) => self.engine.expire(id.as_bytes(), version, at),
            None => Ok(false),
        }
    }

    /// Exact-version lookup.
    pub fn find(&self, locator: Locator) -> Result<Option<E>, StorageError> {
        match self.engine.get(locator.id.as_bytes(), locator.version)? {
            Some(record) => Ok(Some(E::decode_body(
                locator,
                record.created,
                record.expired,
                &record.payload,
            )?)),
            None => Ok(None),
        }
    }

    /// The unexpired version of `id`, if any.
    pub fn find_active(&self, id: Id) -> Result<Option<E>, StorageError> {
        match self.engine.get_active(id.as_bytes())? {
            Some((version, record)) => {
                let locator = Locator { id, version };
                Ok(Some(E::decode_body(
                    locator,
                    record.created,
                    record.expired,
                    &record.payload,
                )?))
            }
            None => Ok(None),
        }
    }

    /// The version active at `t`: highest version with `created <= t` and
    /// `expired` absent or `> t`.
    pub fn find_at(&self, id: Id, at: i64) -> Result<Option<E>, StorageError> {
        match self.engine.get_at(id.as_bytes(), at)? {
            Some((version, record)) => {
                let locator = Locator { id, version };
                Ok(Some(E::decode_body(
                    locator,
                    record.created,
                    record.expired,
                    &record.payload,
                )?))
            }
            None => Ok(None),
        }
    }

    /// Every version of `id`, ascending.
    pub fn find_all(&self, id: Id) -> Result<Vec<E>, StorageError> {
        let mut out = Vec::new();
        for result in self.engine.scan_versions(id.as_bytes()) {
            let (version, record) = result?;
            let locator = Locator { id, version };
            out.push(E::decode_body(
                locator,
                record.created,
                record.expired,
                &record.payload,
            )?);
        }
        Ok(out)
    }

    /// Every id ever saved under this entity kind, regardless of whether its
    /// latest version is active.
    pub fn all_ids(&self) -> Result<Vec<Id>, StorageError> {
        self.engine
            .list_entity_ids(E::KIND)
            .map(|r| r.map(Id::from_bytes))
            .collect()
    }

    /// Every id under this entity kind whose latest version is active.
    pub fn all_active_ids(&self) -> Result<Vec<Id>, StorageError> {
        Ok(self
            .engine
            .list_active_entity_ids(E::KIND)?
            .into_iter()
            .map(Id::from_bytes)
            .collect())
    }

    /// Hard-remove every version of `id`. Administrative purge only — use
    /// `expire` for logical retirement.
    #[tracing::instrument(skip(self), fields(kind = E::KIND))]
    pub fn delete(&self, id: Id) -> Result<bool, StorageError> {
        let existed = self.engine.get_latest(id.as_bytes())?.is_some();
        self.engine.delete_typed(E::KIND, id.as_bytes())?;
        Ok(existed)
    }
}
