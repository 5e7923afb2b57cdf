//! Entity identity
//!
//! Entity ids are derived from persistent strings with a fixed hash, never
//! from allocation order, so a saved scene reloads with the same ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Stable entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Derive the id for a persistent string id
    pub fn from_persistent_id(persistent_id: &str) -> Self {
        Self(xxh3_64(persistent_id.as_bytes()))
    }

    /// Get the raw id
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_string_same_id() {
        assert_eq!(
            EntityId::from_persistent_id("player-ship"),
            EntityId::from_persistent_id("player-ship")
        );
    }

    #[test]
    fn test_distinct_strings_distinct_ids() {
        let ids: HashSet<EntityId> = (0..10_000)
            .map(|i| EntityId::from_persistent_id(&format!("entity-{i}")))
            .collect();
        assert_eq!(ids.len(), 10_000);
        assert_ne!(EntityId::from_persistent_id("a"), EntityId::from_persistent_id("b"));
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(EntityId::new(0xff).to_string(), "00000000000000ff");
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&EntityId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
