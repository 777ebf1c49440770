//! Configuration data structures.
//!
//! Defines the YAML config format: how to reach the catalog and how to pace
//! a crawl. Every field has a default so partial files are valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogConfig, ClientError};
use crate::crawler::CrawlOptions;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files, environment variables, and CLI flags; see
/// [`loader`](super::loader) for the merge order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactConfig {
    /// How to reach the metadata service.
    #[serde(default)]
    pub catalog: CatalogSection,

    /// Traversal tuning.
    #[serde(default)]
    pub crawl: CrawlSection,
}

impl ImpactConfig {
    /// Build the HTTP client configuration, validating it.
    pub fn catalog_config(&self) -> Result<CatalogConfig, ClientError> {
        let section = &self.catalog;
        let mut builder = CatalogConfig::builder(section.host.clone().unwrap_or_default())
            .timeout(Duration::from_secs(section.timeout_secs))
            .max_retries(section.max_retries)
            .retry_initial_delay(Duration::from_millis(section.retry_initial_delay_ms))
            .retry_max_delay(Duration::from_millis(section.retry_max_delay_ms));
        if let Some(ref token) = section.token {
            builder = builder.token(token.clone());
        }
        builder.build()
    }

    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            pacing: Duration::from_millis(self.crawl.pacing_ms),
            time_limit: self.crawl.deadline_secs.map(Duration::from_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogSection
// ---------------------------------------------------------------------------

/// Catalog connection settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSection {
    /// Workspace URL.
    #[serde(default)]
    pub host: Option<String>,

    /// Personal access token. Prefer `DATABRICKS_TOKEN` over storing it here.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            host: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl std::fmt::Debug for CatalogSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSection")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay_ms", &self.retry_initial_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CrawlSection
// ---------------------------------------------------------------------------

/// Crawl pacing and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Wait between successive asset visits, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Stop visiting new assets after this many seconds.
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            deadline_secs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

fn default_pacing_ms() -> u64 {
    200
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
