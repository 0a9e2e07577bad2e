//! Element identifiers.

use std::fmt;

use rand::RngCore;
use rkyv::{Archive, Deserialize, Serialize};

/// Number of random bytes backing an [`Id`].
///
/// 16 bytes gives 128 bits of entropy, comfortably above the 120-bit floor
/// required to keep collision probability over a billion generated ids
/// below 1e-12.
const ID_BYTES: usize = 16;

/// A stable, opaque element identifier.
///
/// Ids are generated randomly rather than derived from content or sequence,
/// so two calls to [`new_id`] never collide in practice and an id carries no
/// information about the entity it names. The textual form is URL-safe
/// base64 without padding, which keeps ids compact and usable directly in
/// paths or query strings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize)]
pub struct Id([u8; ID_BYTES]);

impl Id {
    /// Build an id from raw bytes, e.g. when reconstructing one read back
    /// from storage.
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// The id's raw byte representation.
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// Parse an id from its URL-safe base64 textual form.
    pub fn parse(text: &str) -> Option<Self> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(text)
            .ok()?;
        let bytes: [u8; ID_BYTES] = decoded.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use base64::Engine;
        write!(
            f,
            "{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.0)
        )
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({self})")
    }
}

/// Generate a new random, collision-resistant element id.
///
/// Bytes come from the OS CSPRNG via `rand::thread_rng`, not a counter or
/// timestamp, so ids carry no ordering information by construction.
pub fn new_id() -> Id {
    let mut bytes = [0u8; ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    Id(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_text() {
        let id = new_id();
        let text = id.to_string();
        let parsed = Id::parse(&text).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn text_is_url_safe() {
        for _ in 0..256 {
            let text = new_id().to_string();
            assert!(text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(new_id()));
        }
    }
}
