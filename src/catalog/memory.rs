//! In-memory catalog with scripted failures and call accounting.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::error::{ClientError, Result};
use super::CatalogClient;
use crate::types::{AssetId, RawAttribution};

/// Which catalog operation a recorded call was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    ListAssets,
    GetMetadata,
    GetDownstream,
}

/// A fixed lineage graph served through [`CatalogClient`].
///
/// Metadata lookups for unknown assets fail with `NotFound`; downstream
/// lookups for unknown assets return an empty list, as leaf tables do.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    schemas: HashMap<(String, String), Vec<AssetId>>,
    metadata: HashMap<AssetId, RawAttribution>,
    downstream: HashMap<AssetId, Vec<AssetId>>,
    failing_schemas: HashSet<(String, String)>,
    failing_metadata: HashSet<AssetId>,
    failing_downstream: HashSet<AssetId>,
    malformed_downstream: HashSet<AssetId>,
    calls: Mutex<Vec<(CallKind, String)>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the assets listed for `catalog.schema`.
    pub fn with_schema(mut self, catalog: &str, schema: &str, assets: &[&str]) -> Self {
        self.schemas.insert(
            (catalog.to_string(), schema.to_string()),
            assets.iter().map(|a| AssetId::new(*a)).collect(),
        );
        self
    }

    /// Register attribution for an asset.
    pub fn with_metadata(mut self, id: &str, raw: RawAttribution) -> Self {
        self.metadata.insert(AssetId::new(id), raw);
        self
    }

    /// Register an asset owned by `owner` with its downstream list.
    pub fn with_asset(self, id: &str, owner: &str, downstream: &[&str]) -> Self {
        self.with_metadata(id, RawAttribution::new(Some(owner), None, None))
            .with_downstream(id, downstream)
    }

    pub fn with_downstream(mut self, id: &str, downstream: &[&str]) -> Self {
        self.downstream.insert(
            AssetId::new(id),
            downstream.iter().map(|d| AssetId::new(*d)).collect(),
        );
        self
    }

    pub fn fail_listing(mut self, catalog: &str, schema: &str) -> Self {
        self.failing_schemas
            .insert((catalog.to_string(), schema.to_string()));
        self
    }

    pub fn fail_metadata(mut self, id: &str) -> Self {
        self.failing_metadata.insert(AssetId::new(id));
        self
    }

    pub fn fail_downstream(mut self, id: &str) -> Self {
        self.failing_downstream.insert(AssetId::new(id));
        self
    }

    /// Make the downstream lookup for `id` answer with an unusable payload.
    pub fn malformed_downstream(mut self, id: &str) -> Self {
        self.malformed_downstream.insert(AssetId::new(id));
        self
    }

    /// Number of calls of `kind` made for `target` (an asset id, or
    /// `catalog.schema` for listings).
    pub fn call_count(&self, kind: CallKind, target: &str) -> usize {
        self.lock_calls()
            .iter()
            .filter(|(k, t)| *k == kind && t == target)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock_calls().len()
    }

    fn record(&self, kind: CallKind, target: &str) {
        self.lock_calls().push((kind, target.to_string()));
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(CallKind, String)>> {
        // A poisoned log still holds valid entries.
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CatalogClient for InMemoryCatalog {
    async fn list_assets(&self, catalog: &str, schema: &str) -> Result<Vec<AssetId>> {
        self.record(CallKind::ListAssets, &format!("{catalog}.{schema}"));
        let key = (catalog.to_string(), schema.to_string());
        if self.failing_schemas.contains(&key) {
            return Err(ClientError::Unavailable(format!(
                "cannot list {catalog}.{schema}"
            )));
        }
        self.schemas
            .get(&key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("schema {catalog}.{schema}")))
    }

    async fn get_metadata(&self, id: &AssetId) -> Result<RawAttribution> {
        self.record(CallKind::GetMetadata, id.as_str());
        if self.failing_metadata.contains(id) {
            return Err(ClientError::Unavailable(format!("metadata for {id}")));
        }
        self.metadata
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    async fn get_downstream(&self, id: &AssetId) -> Result<Vec<AssetId>> {
        self.record(CallKind::GetDownstream, id.as_str());
        if self.failing_downstream.contains(id) {
            return Err(ClientError::Unavailable(format!("lineage for {id}")));
        }
        if self.malformed_downstream.contains(id) {
            return Err(ClientError::MalformedResponse(format!(
                "lineage for {id} missing table name"
            )));
        }
        Ok(self.downstream.get(id).cloned().unwrap_or_default())
    }
}
