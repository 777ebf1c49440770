//! Catalog client configuration and builder.

use std::fmt;
use std::time::Duration;

use super::error::{ClientError, Result};

/// Connection settings for the Unity Catalog REST API.
///
/// `Debug` masks the token so the config can be logged safely.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Workspace URL, e.g. `https://abc.cloud.databricks.com`.
    pub host: String,
    /// Personal access token sent as a bearer token.
    pub token: Option<String>,
    /// Per-request timeout (default: 30 seconds).
    pub timeout: Duration,
    /// Retries for transient failures (default: 3).
    pub max_retries: u32,
    /// Initial backoff delay (default: 200ms).
    pub retry_initial_delay: Duration,
    /// Backoff ceiling (default: 10 seconds).
    pub retry_max_delay: Duration,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_initial_delay: Duration::from_millis(200),
            retry_max_delay: Duration::from_secs(10),
            user_agent: format!("lineage-impact/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("host", &self.host)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay", &self.retry_initial_delay)
            .field("retry_max_delay", &self.retry_max_delay)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CatalogConfig {
    /// Minimum allowed request timeout.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    pub fn builder(host: impl Into<String>) -> CatalogConfigBuilder {
        CatalogConfigBuilder::new(host)
    }

    /// Host with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config(
                "host cannot be empty (set --host or DATABRICKS_HOST)".to_string(),
            ));
        }

        let url = url::Url::parse(&self.host)
            .map_err(|e| ClientError::Config(format!("Invalid host '{}': {}", self.host, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "host must be http(s), got scheme '{}'",
                url.scheme()
            )));
        }

        if self.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ClientError::Config("token cannot be blank".to_string()));
        }

        if self.retry_initial_delay > self.retry_max_delay {
            return Err(ClientError::Config(format!(
                "retry_initial_delay ({:?}) must be <= retry_max_delay ({:?})",
                self.retry_initial_delay, self.retry_max_delay
            )));
        }

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(ClientError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Builder for [`CatalogConfig`].
#[derive(Debug)]
pub struct CatalogConfigBuilder {
    config: CatalogConfig,
}

impl CatalogConfigBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: CatalogConfig {
                host: host.into(),
                ..Default::default()
            },
        }
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retry_initial_delay(mut self, delay: Duration) -> Self {
        self.config.retry_initial_delay = delay;
        self
    }

    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.config.retry_max_delay = delay;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<CatalogConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CatalogConfig::default();
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("lineage-impact/"));
    }

    #[test]
    fn builder_sets_fields() {
        let config = CatalogConfig::builder("https://abc.cloud.databricks.com/")
            .token("dapi-test")
            .timeout(Duration::from_secs(5))
            .max_retries(1)
            .build()
            .unwrap();

        assert_eq!(config.base_url(), "https://abc.cloud.databricks.com");
        assert_eq!(config.token.as_deref(), Some("dapi-test"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = CatalogConfig::builder("").build().unwrap_err();
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn non_http_host_is_rejected() {
        assert!(CatalogConfig::builder("ftp://example.com").build().is_err());
        assert!(CatalogConfig::builder("not a url").build().is_err());
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(CatalogConfig::builder("https://h").token("  ").build().is_err());
    }

    #[test]
    fn retry_bounds_are_checked() {
        let err = CatalogConfig::builder("https://h")
            .retry_initial_delay(Duration::from_secs(5))
            .retry_max_delay(Duration::from_secs(1))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("retry_initial_delay"));
    }

    #[test]
    fn timeout_floor() {
        assert!(CatalogConfig::builder("https://h")
            .timeout(Duration::from_millis(10))
            .build()
            .is_err());
        assert!(CatalogConfig::builder("https://h")
            .timeout(CatalogConfig::MIN_TIMEOUT)
            .build()
            .is_ok());
    }

    #[test]
    fn token_masked_in_debug() {
        let config = CatalogConfig::builder("https://h")
            .token("dapi0123456789abcdef")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("dapi0123456789abcdef"));
        assert!(debug.contains("REDACTED"));
    }
}
