//! The generic on-disk envelope for one entity version.

use crate::error::StorageError;
use rkyv::{Archive, Deserialize, Serialize};

/// A stored entity version.
///
/// `payload` is an opaque, entity-kind-specific encoding (node, edge, or
/// component) produced by the repository layer; the storage engine never
/// looks inside it. `created`/`expired` are millisecond-precision Unix
/// timestamps shared by every record an operation produces, matching the
/// temporal fields the integrity engine reasons about.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    pub payload: Vec<u8>,
    pub created: i64,
    pub expired: Option<i64>,
}

impl Record {
    pub fn new(payload: Vec<u8>, created: i64) -> Self {
        Self {
            payload,
            created,
            expired: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.expired.is_none()
    }

    /// Returns an identical record with `expired` set, leaving `payload`
    /// and `created` untouched. Expiring never rewrites the payload.
    pub fn expire_at(&self, at: i64) -> Self {
        Self {
            payload: self.payload.clone(),
            created: self.created,
            expired: Some(at),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| StorageError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_roundtrip() {
        let record = Record::new(vec![1, 2, 3, 4, 5], 1_700_000_000_000);
        let bytes = record.to_bytes().unwrap();
        let decoded = Record::from_bytes(&bytes).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_expire_preserves_payload() {
        let record = Record::new(vec![9, 9, 9], 10);
        let expired = record.expire_at(20);
        assert_eq!(expired.payload, record.payload);
        assert_eq!(expired.created, record.created);
        assert_eq!(expired.expired, Some(20));
        assert!(!expired.is_active());
        assert!(record.is_active());
    }
}
