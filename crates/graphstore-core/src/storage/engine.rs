//! Storage engine implementation.

use super::{Record, StorageConfig, VersionedKey};
use crate::error::StorageError;
use sled::{Db, Tree};

/// Tree name for entity data.
const DATA_TREE: &str = "data";

/// Tree name for metadata (latest versions, etc.).
const META_TREE: &str = "meta";

/// Tree name for entity type index.
const TYPE_INDEX_TREE: &str = "index:entity_type";

/// Prefix for latest-version pointers in the meta tree.
const LATEST_PREFIX: &[u8] = b"latest:";

/// The storage engine wrapping sled with explicit entity versions.
///
/// `StorageEngine` knows nothing about nodes, edges, or components; it
/// stores an opaque [`Record`] per `(entity_id, version)` key and leaves
/// interpretation of `payload` to the repository layer built on top.
pub struct StorageEngine {
    db: Db,
    data_tree: Tree,
    meta_tree: Tree,
    type_index_tree: Tree,
}

impl StorageEngine {
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let sled_config = config.to_sled_config();
        let db = sled_config.open()?;
        let data_tree = db.open_tree(DATA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;
        let type_index_tree = db.open_tree(TYPE_INDEX_TREE)?;

        Ok(Self {
            db,
            data_tree,
            meta_tree,
            type_index_tree,
        })
    }

    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Store a new version of an entity. Never overwrites an existing
    /// `(entity_id, version)` pair with different payload; callers are
    /// responsible for choosing a fresh version number.
    pub fn put(&self, key: VersionedKey, record: Record) -> Result<(), StorageError> {
        let key_bytes = key.encode();
        let value_bytes = record.to_bytes()?;

        self.data_tree.insert(key_bytes, value_bytes)?;
        self.update_latest(&key.entity_id, key.version)?;

        Ok(())
    }

    /// Rewrite the stored record for `(entity_id, version)` with `expired`
    /// set. This is the only in-place mutation the engine performs; the
    /// payload and `created` timestamp are untouched.
    pub fn expire(
        &self,
        entity_id: &[u8; 16],
        version: u64,
        at: i64,
    ) -> Result<bool, StorageError> {
        let key = VersionedKey::new(*entity_id, version);
        let key_bytes = key.encode();

        match self.data_tree.get(&key_bytes)? {
            Some(bytes) => {
                let record = Record::from_bytes(&bytes)?;
                if !record.is_active() {
                    return Ok(false);
                }
                let expired = record.expire_at(at);
                self.data_tree.insert(key_bytes, expired.to_bytes()?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Look up one exact version of an entity.
    pub fn get(&self, entity_id: &[u8; 16], version: u64) -> Result<Option<Record>, StorageError> {
        let key = VersionedKey::new(*entity_id, version);
        match self.data_tree.get(key.encode())? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Look up the highest version stored for an entity, regardless of
    /// whether it is active.
    pub fn get_latest(&self, entity_id: &[u8; 16]) -> Result<Option<(u64, Record)>, StorageError> {
        let latest_key = self.latest_key(entity_id);
        let version = match self.meta_tree.get(&latest_key)? {
            Some(bytes) => {
                let mut version_bytes = [0u8; 8];
                version_bytes.copy_from_slice(&bytes);
                u64::from_be_bytes(version_bytes)
            }
            None => return Ok(None),
        };

        match self.get(entity_id, version)? {
            Some(record) => Ok(Some((version, record))),
            None => Ok(None),
        }
    }

    /// The currently unexpired version of an entity, if any.
    pub fn get_active(&self, entity_id: &[u8; 16]) -> Result<Option<(u64, Record)>, StorageError> {
        match self.get_latest(entity_id)? {
            Some((version, record)) if record.is_active() => Ok(Some((version, record))),
            _ => Ok(None),
        }
    }

    /// The highest version with `created <= at` and not yet expired at
    /// `at` (`expired` absent, or `expired > at`).
    pub fn get_at(&self, entity_id: &[u8; 16], at: i64) -> Result<Option<(u64, Record)>, StorageError> {
        let mut best: Option<(u64, Record)> = None;
        for result in self.scan_versions(entity_id) {
            let (version, record) = result?;
            let matches = record.created <= at && record.expired.map(|e| e > at).unwrap_or(true);
            if matches {
                best = Some((version, record));
            }
        }
        Ok(best)
    }

    /// Every stored version of an entity, ascending by version.
    pub fn scan_versions(
        &self,
        entity_id: &[u8; 16],
    ) -> impl Iterator<Item = Result<(u64, Record), StorageError>> + '_ {
        let min_key = VersionedKey::min_for_entity(*entity_id);
        let max_key = VersionedKey::max_for_entity(*entity_id);
        let entity_id = *entity_id;

        self.data_tree
            .range(min_key.encode()..=max_key.encode())
            .map(move |result| {
                let (key_bytes, value_bytes) = result?;
                let key = VersionedKey::decode(&key_bytes).ok_or(StorageError::InvalidKey)?;
                if key.entity_id != entity_id {
                    return Err(StorageError::InvalidKey);
                }
                let record = Record::from_bytes(&value_bytes)?;
                Ok((key.version, record))
            })
    }

    /// Hard-remove every version of an entity. Used only for
    /// administrative purge, never for logical retirement (use `expire`).
    pub fn delete(&self, entity_id: &[u8; 16]) -> Result<(), StorageError> {
        let min_key = VersionedKey::min_for_entity(*entity_id);
        let max_key = VersionedKey::max_for_entity(*entity_id);

        let keys: Vec<_> = self
            .data_tree
            .range(min_key.encode()..=max_key.encode())
            .keys()
            .collect::<Result<Vec<_>, _>>()?;

        for key in keys {
            self.data_tree.remove(key)?;
        }
        self.meta_tree.remove(self.latest_key(entity_id))?;

        Ok(())
    }

    // ========== Entity Type-Aware Methods ==========

    pub fn put_typed(
        &self,
        entity_type: &str,
        key: VersionedKey,
        record: Record,
    ) -> Result<(), StorageError> {
        self.put(key, record)?;
        let index_key = self.type_index_key(entity_type, &key.entity_id);
        self.type_index_tree.insert(index_key, &[])?;
        Ok(())
    }

    pub fn delete_typed(&self, entity_type: &str, entity_id: &[u8; 16]) -> Result<(), StorageError> {
        let index_key = self.type_index_key(entity_type, entity_id);
        self.type_index_tree.remove(index_key)?;
        self.delete(entity_id)
    }

    /// All ids ever recorded under an entity type, whether or not their
    /// current version is active.
    pub fn list_entity_ids(
        &self,
        entity_type: &str,
    ) -> impl Iterator<Item = Result<[u8; 16], StorageError>> + '_ {
        let prefix = self.type_index_prefix(entity_type);
        let prefix_len = prefix.len();

        self.type_index_tree.scan_prefix(&prefix).map(move |result| {
            let (key, _) = result?;
            if key.len() != prefix_len + 16 {
                return Err(StorageError::InvalidKey);
            }
            let mut entity_id = [0u8; 16];
            entity_id.copy_from_slice(&key[prefix_len..]);
            Ok(entity_id)
        })
    }

    /// Ids under an entity type whose latest stored version is active.
    pub fn list_active_entity_ids(
        &self,
        entity_type: &str,
    ) -> Result<Vec<[u8; 16]>, StorageError> {
        let mut ids = Vec::new();
        for id in self.list_entity_ids(entity_type) {
            let id = id?;
            if self.get_active(&id)?.is_some() {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn type_index_key(&self, entity_type: &str, entity_id: &[u8; 16]) -> Vec<u8> {
        let mut key = Vec::with_capacity(entity_type.len() + 1 + 16);
        key.extend_from_slice(entity_type.as_bytes());
        key.push(0);
        key.extend_from_slice(entity_id);
        key
    }

    fn type_index_prefix(&self, entity_type: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(entity_type.len() + 1);
        prefix.extend_from_slice(entity_type.as_bytes());
        prefix.push(0);
        prefix
    }

    // ========== End Entity Type-Aware Methods ==========

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn size_on_disk(&self) -> Result<u64, StorageError> {
        Ok(self.db.size_on_disk()?)
    }

    fn update_latest(&self, entity_id: &[u8; 16], version: u64) -> Result<(), StorageError> {
        let latest_key = self.latest_key(entity_id);
        self.meta_tree.insert(&latest_key, &version.to_be_bytes())?;
        Ok(())
    }

    fn latest_key(&self, entity_id: &[u8; 16]) -> Vec<u8> {
        let mut key = Vec::with_capacity(LATEST_PREFIX.len() + 16);
        key.extend_from_slice(LATEST_PREFIX);
        key.extend_from_slice(entity_id);
        key
    }

    pub(crate) fn data_tree(&self) -> &Tree {
        &self.data_tree
    }

    pub(crate) fn meta_tree(&self) -> &Tree {
        &self.meta_tree
    }

    pub(crate) fn type_index_tree(&self) -> &Tree {
        &self.type_index_tree
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use graphstore_proto::id::new_id;

    struct TestDb {
        engine: StorageEngine,
        _dir: tempfile::TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = StorageEngine;
        fn deref(&self) -> &Self::Target {
            &self.engine
        }
    }

    fn test_engine() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        TestDb { engine, _dir: dir }
    }

    fn fresh_id() -> [u8; 16] {
        *new_id().as_bytes()
    }

    #[test]
    fn test_put_and_get() {
        let engine = test_engine();
        let entity_id = fresh_id();
        let record = Record::new(vec![1, 2, 3, 4, 5], 100);
        let key = VersionedKey::new(entity_id, 1);

        engine.put(key, record.clone()).unwrap();

        let retrieved = engine.get(&entity_id, 1).unwrap().unwrap();
        assert_eq!(retrieved.payload, record.payload);
    }

    #[test]
    fn test_get_latest() {
        let engine = test_engine();
        let entity_id = fresh_id();

        engine
            .put(VersionedKey::new(entity_id, 1), Record::new(vec![1], 100))
            .unwrap();
        engine
            .put(VersionedKey::new(entity_id, 2), Record::new(vec![2], 200))
            .unwrap();
        engine
            .put(VersionedKey::new(entity_id, 3), Record::new(vec![3], 300))
            .unwrap();

        let (version, latest) = engine.get_latest(&entity_id).unwrap().unwrap();
        assert_eq!(version, 3);
        assert_eq!(latest.payload, vec![3]);
    }

    #[test]
    fn test_get_at_timestamp() {
        let engine = test_engine();
        let entity_id = fresh_id();

        engine
            .put(VersionedKey::new(entity_id, 1), Record::new(vec![1], 100))
            .unwrap();
        engine.expire(&entity_id, 1, 200).unwrap();
        engine
            .put(VersionedKey::new(entity_id, 2), Record::new(vec![2], 200))
            .unwrap();

        let (version, record) = engine.get_at(&entity_id, 150).unwrap().unwrap();
        assert_eq!(version, 1);
        assert_eq!(record.payload, vec![1]);

        let (version, record) = engine.get_at(&entity_id, 250).unwrap().unwrap();
        assert_eq!(version, 2);
        assert_eq!(record.payload, vec![2]);

        assert!(engine.get_at(&entity_id, 50).unwrap().is_none());
    }

    #[test]
    fn test_scan_versions() {
        let engine = test_engine();
        let entity_id = fresh_id();

        engine
            .put(VersionedKey::new(entity_id, 1), Record::new(vec![1], 100))
            .unwrap();
        engine
            .put(VersionedKey::new(entity_id, 2), Record::new(vec![2], 200))
            .unwrap();
        engine
            .put(VersionedKey::new(entity_id, 3), Record::new(vec![3], 300))
            .unwrap();

        let versions: Vec<_> = engine
            .scan_versions(&entity_id)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].0, 1);
        assert_eq!(versions[1].0, 2);
        assert_eq!(versions[2].0, 3);
    }

    #[test]
    fn test_expire_then_supersede() {
        let engine = test_engine();
        let entity_id = fresh_id();

        engine
            .put(VersionedKey::new(entity_id, 1), Record::new(vec![1, 2, 3], 100))
            .unwrap();
        assert!(engine.get_active(&entity_id).unwrap().is_some());

        engine.expire(&entity_id, 1, 200).unwrap();
        assert!(engine.get_active(&entity_id).unwrap().is_none());

        let old = engine.get(&entity_id, 1).unwrap().unwrap();
        assert_eq!(old.payload, vec![1, 2, 3]);
        assert_eq!(old.expired, Some(200));
    }

    #[test]
    fn test_hard_delete_removes_all_versions() {
        let engine = test_engine();
        let entity_id = fresh_id();

        engine
            .put(VersionedKey::new(entity_id, 1), Record::new(vec![1], 100))
            .unwrap();
        engine.expire(&entity_id, 1, 200).unwrap();
        engine
            .put(VersionedKey::new(entity_id, 2), Record::new(vec![2], 200))
            .unwrap();

        engine.delete(&entity_id).unwrap();

        assert!(engine.get(&entity_id, 1).unwrap().is_none());
        assert!(engine.get(&entity_id, 2).unwrap().is_none());
        assert!(engine.get_latest(&entity_id).unwrap().is_none());
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path());
        let entity_id = fresh_id();

        {
            let engine = StorageEngine::open(config.clone()).unwrap();
            engine
                .put(VersionedKey::new(entity_id, 1), Record::new(vec![1, 2, 3], 100))
                .unwrap();
            engine.flush().unwrap();
        }

        {
            let engine = StorageEngine::open(config).unwrap();
            let record = engine.get(&entity_id, 1).unwrap().unwrap();
            assert_eq!(record.payload, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_put_typed_and_list() {
        let engine = test_engine();

        let user1 = fresh_id();
        let user2 = fresh_id();
        let post1 = fresh_id();

        engine
            .put_typed("ScanTestUser", VersionedKey::new(user1, 1), Record::new(vec![1], 100))
            .unwrap();
        engine
            .put_typed("ScanTestUser", VersionedKey::new(user2, 1), Record::new(vec![2], 100))
            .unwrap();
        engine
            .put_typed("ScanTestPost", VersionedKey::new(post1, 1), Record::new(vec![3], 100))
            .unwrap();

        let users: Vec<_> = engine
            .list_entity_ids("ScanTestUser")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(users.len(), 2);

        let posts: Vec<_> = engine
            .list_entity_ids("ScanTestPost")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0], post1);

        let comments: Vec<_> = engine
            .list_entity_ids("ScanTestComment")
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(comments.len(), 0);
    }

    #[test]
    fn test_list_active_excludes_expired() {
        let engine = test_engine();

        let id1 = fresh_id();
        let id2 = fresh_id();

        engine
            .put_typed("DeleteTestUser", VersionedKey::new(id1, 1), Record::new(vec![1], 100))
            .unwrap();
        engine
            .put_typed("DeleteTestUser", VersionedKey::new(id2, 1), Record::new(vec![2], 100))
            .unwrap();

        let active = engine.list_active_entity_ids("DeleteTestUser").unwrap();
        assert_eq!(active.len(), 2);

        engine.expire(&id1, 1, 200).unwrap();

        let active = engine.list_active_entity_ids("DeleteTestUser").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], id2);
    }
}
