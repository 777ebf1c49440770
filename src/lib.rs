//! Lineage impact analysis for Unity Catalog.
//!
//! Crawls downstream table lineage from a set of roots, attributes each
//! asset to a contact, and answers which assets and people a change to a
//! table would reach.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod graph;
pub mod observability;
pub mod output;
pub mod resolver;
pub mod types;

pub use catalog::{CatalogClient, InMemoryCatalog, UnityCatalogClient};
pub use crawler::{CrawlOptions, CrawlReport, CrawlStatus, Crawler, Roots};
pub use graph::LineageGraph;
pub use types::{AssetId, AssetMetadata, RawAttribution};
