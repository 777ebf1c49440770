//! Attribution resolution.
//!
//! Collapses the catalog's attribution fields into a single contact:
//! whoever last touched the asset, else whoever created it, else the
//! formal owner.

use crate::types::{AssetMetadata, RawAttribution};

/// Contact recorded when no attribution field is usable.
pub const NO_CONTACT: &str = "N/A";

/// Resolve raw attribution into node metadata.
///
/// Priority: `updated_by`, `created_by`, `owner`, then [`NO_CONTACT`].
/// Empty strings count as absent.
pub fn resolve(raw: RawAttribution) -> AssetMetadata {
    let contact = [&raw.updated_by, &raw.created_by, &raw.owner]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| NO_CONTACT.to_string());

    AssetMetadata::from_resolved(raw, contact)
}
