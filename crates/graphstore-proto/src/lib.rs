//! Identifier, locator, and data-payload primitives shared by the storage
//! and integrity layers.
//!
//! # Modules
//!
//! - [`id`] - random, collision-resistant element identifiers
//! - [`locator`] - the `(id, version)` pair naming one entity version
//! - [`value`] - typed scalar/array values carried inside a payload
//! - [`data`] - the payload attached to nodes, edges, and components
//! - [`codec`] - interchangeable serializers for [`data::Data`]
//! - [`error`] - codec error types
//!
//! # Serialization
//!
//! [`Id`], [`Locator`], and [`Value`] all derive `rkyv::Archive`,
//! `rkyv::Serialize`, and `rkyv::Deserialize` so the storage engine can
//! embed them directly in on-disk records without an intermediate codec
//! step:
//!
//! ```ignore
//! use graphstore_proto::Locator;
//!
//! let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&locator).unwrap();
//! let archived = rkyv::access::<graphstore_proto::ArchivedLocator, rkyv::rancor::Error>(&bytes).unwrap();
//! let deserialized: Locator = rkyv::deserialize::<Locator, rkyv::rancor::Error>(archived).unwrap();
//! ```

pub mod codec;
pub mod data;
pub mod error;
pub mod id;
pub mod locator;
pub mod value;

pub use codec::{Codec, PropertyMapCodec, TextualCodec};
pub use data::Data;
pub use error::CodecError;
pub use id::{new_id, Id};
pub use locator::Locator;
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_roundtrips_through_rkyv() {
        let locator = Locator::first(new_id());
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&locator).unwrap();
        let archived =
            rkyv::access::<locator::ArchivedLocator, rkyv::rancor::Error>(&bytes).unwrap();
        let deserialized: Locator =
            rkyv::deserialize::<Locator, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(locator, deserialized);
    }

    #[test]
    fn data_roundtrips_through_both_codecs() {
        // Multiple, non-alphabetical field names so a codec that loses field
        // order (or narrow numeric width) cannot pass by accident.
        let data = Data::new("widget")
            .with_field("count", 7i64)
            .with_field("label", "box")
            .with_field("weight", 3i32);

        let prop_bytes = PropertyMapCodec.serialize(&data);
        assert_eq!(PropertyMapCodec.deserialize(&prop_bytes, "widget").unwrap(), data);

        let json_bytes = TextualCodec.serialize(&data);
        assert_eq!(TextualCodec.deserialize(&json_bytes, "widget").unwrap(), data);
    }
}
