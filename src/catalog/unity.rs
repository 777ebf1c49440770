//! Databricks Unity Catalog client with retries.
//!
//! Uses the tables API for listing and attribution, and the lineage-tracking
//! API for downstream edges. Only table-typed downstream entries become
//! edges; notebooks, jobs and dashboards carry no `tableInfo` and are skipped.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    policies::ExponentialBackoff, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::config::CatalogConfig;
use super::error::{ClientError, Result};
use super::CatalogClient;
use crate::types::{AssetId, RawAttribution};

const TABLES_PATH: &str = "/api/2.1/unity-catalog/tables";
const LINEAGE_PATH: &str = "/api/2.0/lineage-tracking/table-lineage";

// Guards against a service that keeps handing back the same page token.
const MAX_LIST_PAGES: usize = 10_000;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListTablesResponse {
    #[serde(default)]
    tables: Vec<TableSummary>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSummary {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct LineageResponse {
    #[serde(default)]
    downstreams: Vec<LineageEntry>,
}

#[derive(Debug, Deserialize)]
struct LineageEntry {
    #[serde(rename = "tableInfo", default)]
    table_info: Option<TableInfo>,
}

#[derive(Debug, Deserialize)]
struct TableInfo {
    #[serde(default)]
    catalog_name: Option<String>,
    #[serde(default)]
    schema_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl TableInfo {
    fn asset_id(&self) -> Option<AssetId> {
        match (&self.catalog_name, &self.schema_name, &self.name) {
            (Some(c), Some(s), Some(n)) if !c.is_empty() && !s.is_empty() && !n.is_empty() => {
                Some(AssetId::from_parts(c, s, n))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// UnityCatalogClient
// ---------------------------------------------------------------------------

/// HTTP client for the Unity Catalog and lineage-tracking REST APIs.
///
/// One connection pool is shared by every request the client issues.
pub struct UnityCatalogClient {
    http: ClientWithMiddleware,
    config: CatalogConfig,
}

impl UnityCatalogClient {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("lineage-impact")),
        );
        if let Some(ref token) = config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::Config("Invalid token format".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(config.retry_initial_delay, config.retry_max_delay)
            .build_with_max_retries(config.max_retries);

        let http = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                CatalogRetryStrategy,
            ))
            .build();

        Ok(Self { http, config })
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.config.base_url(), path))
            .map_err(|e| ClientError::Config(format!("Invalid request URL: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let start = std::time::Instant::now();
        let path = url.path().to_string();

        tracing::debug!(path = %path, "Sending request");

        let response = self.http.get(url).send().await?;
        let status = response.status();

        tracing::debug!(
            path = %path,
            status = %status.as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "Received response"
        );

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(std::time::Duration::from_secs);
        let body = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|e| {
                ClientError::MalformedResponse(format!("{path}: {e}"))
            });
        }

        let message = serde_json::from_slice::<ApiError>(&body)
            .ok()
            .and_then(|e| match (e.error_code, e.message) {
                (Some(code), Some(msg)) => Some(format!("{code}: {msg}")),
                (None, Some(msg)) => Some(msg),
                (Some(code), None) => Some(code),
                (None, None) => None,
            })
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(&body);
                if text.trim().is_empty() {
                    status.to_string()
                } else {
                    text.into_owned()
                }
            });

        Err(status_to_error(status, message, retry_after))
    }
}

fn status_to_error(
    status: StatusCode,
    message: String,
    retry_after: Option<std::time::Duration>,
) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited { retry_after },
        s => ClientError::Status {
            status: s.as_u16(),
            message,
        },
    }
}

impl CatalogClient for UnityCatalogClient {
    async fn list_assets(&self, catalog: &str, schema: &str) -> Result<Vec<AssetId>> {
        let mut assets = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("catalog_name", catalog), ("schema_name", schema)];
            if let Some(ref token) = page_token {
                query.push(("page_token", token.as_str()));
            }
            let page: ListTablesResponse = self.get(self.url(TABLES_PATH, &query)?).await?;
            assets.extend(page.tables.into_iter().map(|t| AssetId::new(t.full_name)));

            match page.next_page_token {
                Some(next) if !next.is_empty() && Some(&next) != page_token.as_ref() => {
                    page_token = Some(next);
                }
                _ => return Ok(assets),
            }
        }

        Err(ClientError::MalformedResponse(format!(
            "listing {catalog}.{schema} did not terminate after {MAX_LIST_PAGES} pages"
        )))
    }

    async fn get_metadata(&self, id: &AssetId) -> Result<RawAttribution> {
        let path = format!("{TABLES_PATH}/{}", urlencoding::encode(id.as_str()));
        self.get(self.url(&path, &[])?).await
    }

    async fn get_downstream(&self, id: &AssetId) -> Result<Vec<AssetId>> {
        let url = self.url(
            LINEAGE_PATH,
            &[("table_name", id.as_str()), ("direction", "DOWNSTREAM")],
        )?;
        let lineage: LineageResponse = self.get(url).await?;

        let mut downstream = Vec::with_capacity(lineage.downstreams.len());
        for entry in lineage.downstreams {
            let Some(info) = entry.table_info else {
                continue;
            };
            let next = info.asset_id().ok_or_else(|| {
                ClientError::MalformedResponse(format!(
                    "downstream of {id} has incomplete tableInfo"
                ))
            })?;
            downstream.push(next);
        }
        Ok(downstream)
    }
}

// ---------------------------------------------------------------------------
// Retry strategy
// ---------------------------------------------------------------------------

/// Retries 5xx, 429, timeouts and connection failures. Every request the
/// client makes is a GET, so all of them are safe to repeat.
struct CatalogRetryStrategy;

impl RetryableStrategy for CatalogRetryStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<reqwest::Response>) -> Option<Retryable> {
        match res {
            Ok(response) => {
                let status = response.status();
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    Some(Retryable::Transient)
                } else if status.is_success() {
                    None
                } else {
                    Some(Retryable::Fatal)
                }
            }
            Err(reqwest_middleware::Error::Reqwest(error))
                if error.is_timeout() || error.is_connect() =>
            {
                Some(Retryable::Transient)
            }
            Err(_) => Some(Retryable::Fatal),
        }
    }
}
