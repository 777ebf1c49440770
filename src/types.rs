//! Core domain types for lineage crawling.
//!
//! Asset identities, the raw attribution fields reported by the catalog,
//! and the resolved metadata stored on every graph node.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// Fully-qualified asset identifier (`catalog.schema.table`).
///
/// Equality and hashing are on the string form, so two ids referring to the
/// same table with different casing are distinct assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

/// Error returned by [`AssetId::parse`] for identifiers that are not
/// three non-empty dot-separated parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid asset id '{0}': expected catalog.schema.table")]
pub struct InvalidAssetId(pub String);

impl AssetId {
    /// Wrap a service-supplied identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a user-supplied identifier, requiring `catalog.schema.table`.
    pub fn parse(s: &str) -> Result<Self, InvalidAssetId> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(InvalidAssetId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Build an id from its three name parts.
    pub fn from_parts(catalog: &str, schema: &str, name: &str) -> Self {
        Self(format!("{catalog}.{schema}.{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AssetId {
    type Err = InvalidAssetId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// Attribution fields as reported by the catalog for one asset.
///
/// Anything else the service returns is dropped at the client boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttribution {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl RawAttribution {
    pub fn new(
        owner: Option<&str>,
        created_by: Option<&str>,
        updated_by: Option<&str>,
    ) -> Self {
        Self {
            owner: owner.map(str::to_string),
            created_by: created_by.map(str::to_string),
            updated_by: updated_by.map(str::to_string),
        }
    }
}

/// Resolved metadata stored on a graph node.
///
/// `attributed_contact` is always derived by
/// [`resolve`](crate::resolver::resolve); there is no public constructor
/// that accepts it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetMetadata {
    pub owner: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub attributed_contact: String,
}

impl AssetMetadata {
    /// Metadata for an asset whose attribution could not be fetched.
    pub fn empty() -> Self {
        crate::resolver::resolve(RawAttribution::default())
    }

    /// True when none of the attribution fields are present.
    pub fn is_empty(&self) -> bool {
        self.owner.is_none() && self.created_by.is_none() && self.updated_by.is_none()
    }

    pub(crate) fn from_resolved(raw: RawAttribution, attributed_contact: String) -> Self {
        Self {
            owner: raw.owner,
            created_by: raw.created_by,
            updated_by: raw.updated_by,
            attributed_contact,
        }
    }
}

impl Default for AssetMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_three_part_names() {
        let id = AssetId::parse("main.sales.orders").unwrap();
        assert_eq!(id.as_str(), "main.sales.orders");
        assert_eq!(id, AssetId::from_parts("main", "sales", "orders"));
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = AssetId::parse("  main.sales.orders\n").unwrap();
        assert_eq!(id.to_string(), "main.sales.orders");
    }

    #[test]
    fn parse_rejects_short_and_empty_parts() {
        assert!(AssetId::parse("sales.orders").is_err());
        assert!(AssetId::parse("main..orders").is_err());
        assert!(AssetId::parse("a.b.c.d").is_err());
        assert!(AssetId::parse("a.b.c.").is_err());
        assert!(AssetId::parse("").is_err());
    }

    #[test]
    fn new_keeps_unqualified_service_ids() {
        let id = AssetId::new("orphan");
        assert_eq!(id.as_str(), "orphan");
        assert!("orphan".parse::<AssetId>().is_err());
    }

    #[test]
    fn equality_is_on_string_form() {
        assert_eq!(AssetId::new("a.b.c"), AssetId::from_parts("a", "b", "c"));
        assert_ne!(AssetId::new("a.b.c"), AssetId::new("A.b.c"));
    }

    #[test]
    fn asset_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&AssetId::new("a.b.c")).unwrap();
        assert_eq!(json, "\"a.b.c\"");
    }

    #[test]
    fn empty_metadata_has_sentinel_contact() {
        let meta = AssetMetadata::empty();
        assert!(meta.is_empty());
        assert_eq!(meta.attributed_contact, "N/A");
    }

    #[test]
    fn raw_attribution_ignores_unknown_fields() {
        let raw: RawAttribution = serde_json::from_str(
            r#"{"owner":"o","table_type":"MANAGED","columns":[]}"#,
        )
        .unwrap();
        assert_eq!(raw.owner.as_deref(), Some("o"));
        assert!(raw.created_by.is_none());
    }
}
