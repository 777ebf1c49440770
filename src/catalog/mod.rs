//! Catalog access layer.
//!
//! [`CatalogClient`] is the seam between the crawler and the metadata
//! service. [`UnityCatalogClient`] talks to the Databricks REST API;
//! [`InMemoryCatalog`] serves a fixed lineage graph for tests and benches.

pub mod config;
pub mod error;
pub mod memory;
pub mod unity;

use std::future::Future;

use crate::types::{AssetId, RawAttribution};

pub use config::{CatalogConfig, CatalogConfigBuilder};
pub use error::{ClientError, Result};
pub use memory::InMemoryCatalog;
pub use unity::UnityCatalogClient;

/// Queries the crawler issues against a lineage/metadata service.
///
/// Implementations drop any fields beyond those in [`RawAttribution`].
pub trait CatalogClient {
    /// List the assets in `catalog.schema`, in service order.
    fn list_assets(
        &self,
        catalog: &str,
        schema: &str,
    ) -> impl Future<Output = Result<Vec<AssetId>>> + Send;

    /// Fetch the attribution fields for one asset.
    fn get_metadata(&self, id: &AssetId) -> impl Future<Output = Result<RawAttribution>> + Send;

    /// Fetch the direct downstream consumers of one asset, in service order.
    fn get_downstream(&self, id: &AssetId) -> impl Future<Output = Result<Vec<AssetId>>> + Send;
}
