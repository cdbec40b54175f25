//! Contains common, primitive types shared across the crate.
//!
//! Using distinct identifier types keeps city ids, view handles and plain
//! strings from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use uuid::Uuid;

new_key_type! {
    /// Uniquely and safely identifies a view attached to the engine.
    ///
    /// This key is returned by `attach_view` and is never reused, so a stale
    /// handle can not detach a view that was attached later.
    pub struct ViewId;
}

/// The opaque, immutable identifier of a tracked city.
///
/// Fresh ids are random UUIDs rendered as strings. Ids read back from a
/// persisted document are kept verbatim, whatever their format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(String);

impl CityId {
    /// Generates a new random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_do_not_collide() {
        let a = CityId::generate();
        let b = CityId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn serializes_as_a_bare_string() {
        let id = CityId::from("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
    }
}
