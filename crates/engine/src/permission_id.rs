//! Permission identity for the dependency index.
//!
//! A `PermissionId` is opaque: the backend hands out integers for some
//! deployments and string codes for others. Both normalize to the same
//! textual form, so `7` and `"7"` name the same permission.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unique identifier for a permission in a catalog.
///
/// Used as the node type of the dependency index and as the element type of
/// every selection. Numeric ids order by value (`2 < 10`) and sort ahead of
/// string codes, which order lexicographically.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PermissionId(String);

impl PermissionId {
    /// Create a new PermissionId.
    #[inline]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The textual form of the id.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for ids that cannot name a permission (empty or whitespace).
    ///
    /// Session operations reject these instead of treating them as unknown.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl Ord for PermissionId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_numeric(), other.is_numeric()) {
            (true, true) => self
                .0
                .len()
                .cmp(&other.0.len())
                .then_with(|| self.0.cmp(&other.0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for PermissionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for PermissionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<u64> for PermissionId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl From<i64> for PermissionId {
    fn from(raw: i64) -> Self {
        Self(raw.to_string())
    }
}

impl From<u32> for PermissionId {
    fn from(raw: u32) -> Self {
        Self(raw.to_string())
    }
}

impl From<i32> for PermissionId {
    fn from(raw: i32) -> Self {
        Self(raw.to_string())
    }
}

impl Serialize for PermissionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct PermissionIdVisitor;

impl<'de> Visitor<'de> for PermissionIdVisitor {
    type Value = PermissionId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a permission id (integer or string)")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(PermissionId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(PermissionId::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(PermissionId::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(PermissionId(v))
    }
}

impl<'de> Deserialize<'de> for PermissionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PermissionIdVisitor)
    }
}

/// Parse a comma-separated id list (`"1, 2,users.read"`).
///
/// Empty segments are skipped, so a trailing comma is harmless.
pub fn parse_id_list(input: &str) -> Vec<PermissionId> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PermissionId::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_string_ids_are_equal() {
        let from_int: PermissionId = serde_json::from_str("7").unwrap();
        let from_str: PermissionId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(from_int, from_str);
        assert_eq!(from_int, PermissionId::from(7u64));
    }

    #[test]
    fn test_serializes_as_string() {
        let id = PermissionId::from(42u64);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }

    #[test]
    fn test_rejects_non_scalar() {
        assert!(serde_json::from_str::<PermissionId>("[1]").is_err());
        assert!(serde_json::from_str::<PermissionId>("null").is_err());
    }

    #[test]
    fn test_numeric_ids_order_by_value() {
        let mut ids: Vec<PermissionId> = ["10", "users.read", "2", "1", "007", "admin"]
            .into_iter()
            .map(PermissionId::from)
            .collect();
        ids.sort();

        let sorted: Vec<&str> = ids.iter().map(PermissionId::as_str).collect();
        assert_eq!(sorted, ["1", "2", "10", "007", "admin", "users.read"]);
    }

    #[test]
    fn test_blank() {
        assert!(PermissionId::from("").is_blank());
        assert!(PermissionId::from("   ").is_blank());
        assert!(!PermissionId::from("users.read").is_blank());
    }

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list(" 1, 2,,users.read ,");
        assert_eq!(
            ids,
            vec![
                PermissionId::from("1"),
                PermissionId::from("2"),
                PermissionId::from("users.read"),
            ]
        );
        assert!(parse_id_list("").is_empty());
    }
}
