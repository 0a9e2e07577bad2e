//! Versioned key encoding.

use std::fmt;

use graphstore_proto::id::Id;

/// Size of an entity id in bytes.
pub const ENTITY_ID_SIZE: usize = 16;

/// Size of the version counter in bytes.
pub const VERSION_SIZE: usize = 8;

/// Total key size.
pub const KEY_SIZE: usize = ENTITY_ID_SIZE + VERSION_SIZE;

/// A versioned key combining an entity id and a version number.
///
/// Key format: `[entity_id (16 bytes)][version (8 bytes, big-endian)]`.
///
/// Big-endian encoding keeps lexicographic byte ordering consistent with
/// numeric ordering, so range scans over one entity's versions come back in
/// ascending version order without a secondary sort.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionedKey {
    pub entity_id: [u8; ENTITY_ID_SIZE],
    pub version: u64,
}

impl VersionedKey {
    pub fn new(entity_id: [u8; ENTITY_ID_SIZE], version: u64) -> Self {
        Self { entity_id, version }
    }

    pub fn for_locator(id: Id, version: u64) -> Self {
        Self::new(*id.as_bytes(), version)
    }

    pub fn encode(&self) -> [u8; KEY_SIZE] {
        let mut buf = [0u8; KEY_SIZE];
        buf[..ENTITY_ID_SIZE].copy_from_slice(&self.entity_id);
        buf[ENTITY_ID_SIZE..].copy_from_slice(&self.version.to_be_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_SIZE {
            return None;
        }

        let mut entity_id = [0u8; ENTITY_ID_SIZE];
        entity_id.copy_from_slice(&bytes[..ENTITY_ID_SIZE]);

        let mut version_bytes = [0u8; VERSION_SIZE];
        version_bytes.copy_from_slice(&bytes[ENTITY_ID_SIZE..]);
        let version = u64::from_be_bytes(version_bytes);

        Some(Self { entity_id, version })
    }

    /// The prefix shared by every key belonging to `entity_id`, for range
    /// scans over all versions of one entity.
    pub fn entity_prefix(entity_id: &[u8; ENTITY_ID_SIZE]) -> [u8; ENTITY_ID_SIZE] {
        *entity_id
    }

    pub fn min_for_entity(entity_id: [u8; ENTITY_ID_SIZE]) -> Self {
        Self::new(entity_id, 0)
    }

    pub fn max_for_entity(entity_id: [u8; ENTITY_ID_SIZE]) -> Self {
        Self::new(entity_id, u64::MAX)
    }
}

impl fmt::Debug for VersionedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: String = self.entity_id.iter().map(|b| format!("{b:02x}")).collect();
        f.debug_struct("VersionedKey")
            .field("entity_id", &hex)
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let entity_id = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        let key = VersionedKey::new(entity_id, 42);
        let encoded = key.encode();
        let decoded = VersionedKey::decode(&encoded).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_lexicographic_ordering_matches_version_ordering() {
        let entity_id = [0u8; 16];

        let key1 = VersionedKey::new(entity_id, 1);
        let key2 = VersionedKey::new(entity_id, 2);
        let key3 = VersionedKey::new(entity_id, 10);

        assert!(key1.encode() < key2.encode());
        assert!(key2.encode() < key3.encode());
    }

    #[test]
    fn test_decode_invalid_length() {
        let short = [0u8; 10];
        assert!(VersionedKey::decode(&short).is_none());

        let long = [0u8; 30];
        assert!(VersionedKey::decode(&long).is_none());
    }
}
