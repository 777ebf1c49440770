//! Downstream lineage crawler.
//!
//! Walks the catalog depth-first from a set of root assets, fetching each
//! asset's attribution and downstream list exactly once, and records the
//! result in a [`LineageGraph`]. The walk uses an explicit stack, so deep
//! lineage chains cannot overflow the call stack; the visiting order is the
//! same pre-order a recursive walk would produce.
//!
//! Per-asset failures never abort the crawl: the asset is recorded with
//! whatever could be fetched and a [`CrawlWarning`] is collected. Only a
//! failure to enumerate the root set is fatal.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CatalogClient, ClientError};
use crate::graph::lineage::LineageGraph;
use crate::observability::redact_secrets;
use crate::resolver::resolve;
use crate::types::{AssetId, AssetMetadata, InvalidAssetId};

/// Delay between successive asset visits unless configured otherwise.
pub const DEFAULT_PACING: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where a crawl starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Roots {
    /// Explicit root assets, visited in the given order.
    Assets(Vec<AssetId>),
    /// Every asset listed in `catalog.schema`, in service order.
    Schema { catalog: String, schema: String },
}

impl Roots {
    /// Parse user-supplied root ids, requiring `catalog.schema.table`.
    pub fn parse_assets<S: AsRef<str>>(ids: &[S]) -> Result<Self, CrawlError> {
        let assets = ids
            .iter()
            .map(|s| AssetId::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Roots::Assets(assets))
    }

    pub fn schema(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Roots::Schema {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }
}

/// Tuning for a single crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Fixed wait between successive asset visits. Zero disables pacing.
    pub pacing: Duration,
    /// Stop visiting new assets once this much time has passed.
    pub time_limit: Option<Duration>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            time_limit: None,
        }
    }
}

impl CrawlOptions {
    /// No pacing, no time limit.
    pub fn unpaced() -> Self {
        Self {
            pacing: Duration::ZERO,
            time_limit: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Which lookup failed for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStage {
    Metadata,
    Downstream,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchStage::Metadata => "metadata",
            FetchStage::Downstream => "downstream",
        })
    }
}

/// How a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Transport, status or service failure.
    Fetch,
    /// The service answered with an unexpected shape.
    MalformedResponse,
}

/// A per-asset failure that was recovered by recording partial data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlWarning {
    pub asset: AssetId,
    pub stage: FetchStage,
    pub kind: WarningKind,
    pub message: String,
}

/// How a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// Every reachable asset was visited.
    Complete,
    /// The cancellation token fired.
    Cancelled,
    /// The configured time limit elapsed.
    DeadlineExceeded,
}

/// Counters collected during a crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub roots: usize,
    pub assets_visited: usize,
    pub edges_recorded: usize,
    pub api_calls: usize,
    pub max_depth: u32,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Everything a crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub graph: LineageGraph,
    pub warnings: Vec<CrawlWarning>,
    pub stats: CrawlStats,
    pub status: CrawlStatus,
}

impl CrawlReport {
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_complete(&self) -> bool {
        self.status == CrawlStatus::Complete
    }
}

/// Errors that abort a crawl before any graph is produced.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("cannot enumerate assets in {catalog}.{schema}: {source}")]
    Enumeration {
        catalog: String,
        schema: String,
        #[source]
        source: ClientError,
    },

    #[error(transparent)]
    InvalidRoot(#[from] InvalidAssetId),
}

// ---------------------------------------------------------------------------
// VisitedSet
// ---------------------------------------------------------------------------

/// Assets already dispatched for lookup.
#[derive(Debug, Default)]
struct VisitedSet(HashSet<AssetId>);

impl VisitedSet {
    /// Check-and-insert in one step. Returns `true` if `id` was not yet
    /// visited and is now marked.
    fn mark(&mut self, id: &AssetId) -> bool {
        if self.0.contains(id) {
            return false;
        }
        self.0.insert(id.clone())
    }

    fn contains(&self, id: &AssetId) -> bool {
        self.0.contains(id)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sequential lineage crawler bound to a catalog client.
pub struct Crawler<'a, C> {
    client: &'a C,
    options: CrawlOptions,
    cancel: CancellationToken,
}

impl<'a, C: CatalogClient> Crawler<'a, C> {
    pub fn new(client: &'a C, options: CrawlOptions) -> Self {
        Self {
            client,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the crawl at the next visit boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Resolve `roots` and crawl everything downstream of them.
    ///
    /// Fails only if the root schema cannot be listed.
    pub async fn crawl(&self, roots: &Roots) -> Result<CrawlReport, CrawlError> {
        let (root_ids, listing_calls) = match roots {
            Roots::Assets(ids) => (ids.clone(), 0),
            Roots::Schema { catalog, schema } => {
                tracing::info!(catalog = %catalog, schema = %schema, "Listing root assets");
                let ids = self
                    .client
                    .list_assets(catalog, schema)
                    .await
                    .map_err(|source| CrawlError::Enumeration {
                        catalog: catalog.clone(),
                        schema: schema.clone(),
                        source,
                    })?;
                if ids.is_empty() {
                    tracing::info!(catalog = %catalog, schema = %schema, "No assets found");
                }
                (ids, 1)
            }
        };

        let mut report = self.crawl_assets(&root_ids).await;
        report.stats.api_calls += listing_calls;
        Ok(report)
    }

    /// Crawl downstream from explicit roots, in the given order.
    pub async fn crawl_assets(&self, roots: &[AssetId]) -> CrawlReport {
        let started = Instant::now();
        let deadline = self.options.time_limit.map(|limit| started + limit);

        let mut graph = LineageGraph::new();
        let mut visited = VisitedSet::default();
        let mut warnings = Vec::new();
        let mut stats = CrawlStats {
            roots: roots.len(),
            ..CrawlStats::default()
        };
        let mut status = CrawlStatus::Complete;

        // Reverse push so roots and neighbours pop in list order.
        let mut stack: Vec<(AssetId, u32)> = roots.iter().rev().map(|r| (r.clone(), 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            if visited.contains(&id) {
                continue;
            }

            if !visited.is_empty() {
                self.pace().await;
            }
            if let Some(stop) = self.interruption(deadline) {
                tracing::warn!(
                    status = ?stop,
                    visited = graph.len(),
                    "Crawl interrupted before {}",
                    id
                );
                status = stop;
                break;
            }

            visited.mark(&id);
            stats.max_depth = stats.max_depth.max(depth);
            tracing::info!(depth, "{}↳ {}", "  ".repeat(depth as usize), id);

            let metadata = match self.client.get_metadata(&id).await {
                Ok(raw) => resolve(raw),
                Err(err) => {
                    warnings.push(self.recover(&id, FetchStage::Metadata, &err));
                    AssetMetadata::empty()
                }
            };
            let downstream = match self.client.get_downstream(&id).await {
                Ok(list) => list,
                Err(err) => {
                    warnings.push(self.recover(&id, FetchStage::Downstream, &err));
                    Vec::new()
                }
            };
            stats.api_calls += 2;

            stack.extend(
                downstream
                    .iter()
                    .rev()
                    .filter(|next| !visited.contains(next))
                    .map(|next| (next.clone(), depth + 1)),
            );
            stats.edges_recorded += downstream.len();
            graph.add_node(id, metadata, downstream);
        }

        stats.assets_visited = graph.len();
        stats.elapsed = started.elapsed();

        tracing::info!(
            assets = stats.assets_visited,
            edges = stats.edges_recorded,
            warnings = warnings.len(),
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "Crawl finished"
        );

        CrawlReport {
            graph,
            warnings,
            stats,
            status,
        }
    }

    async fn pace(&self) {
        if self.options.pacing.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(self.options.pacing) => {}
        }
    }

    fn interruption(&self, deadline: Option<Instant>) -> Option<CrawlStatus> {
        if self.cancel.is_cancelled() {
            return Some(CrawlStatus::Cancelled);
        }
        match deadline {
            Some(at) if Instant::now() >= at => Some(CrawlStatus::DeadlineExceeded),
            _ => None,
        }
    }

    fn recover(&self, id: &AssetId, stage: FetchStage, err: &ClientError) -> CrawlWarning {
        let kind = if err.is_malformed() {
            WarningKind::MalformedResponse
        } else {
            WarningKind::Fetch
        };
        let message = redact_secrets(&err.to_string());
        tracing::warn!(
            asset = %id,
            stage = %stage,
            kind = ?kind,
            error = %message,
            "Lookup failed, recording partial node"
        );
        CrawlWarning {
            asset: id.clone(),
            stage,
            kind,
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
