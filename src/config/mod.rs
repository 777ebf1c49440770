//! Configuration: YAML schema and multi-source loading.

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::{CatalogSection, CrawlSection, ImpactConfig};
