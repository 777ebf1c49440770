//! Persisting crawled graphs as JSON.
//!
//! The file is the nested `asset -> {metadata, downstream}` mapping with
//! two-space indentation, keys in discovery order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{ImpactError, Result};
use crate::graph::lineage::LineageGraph;

/// Output file used when none is given.
pub const DEFAULT_OUTPUT: &str = "downstream_dependencies.json";

/// Write `graph` to `path`, replacing any existing file.
pub fn write_graph(path: &Path, graph: &LineageGraph) -> Result<()> {
    let io_err = |source| ImpactError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, graph).map_err(|source| ImpactError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), nodes = graph.len(), "Wrote lineage graph");
    Ok(())
}

/// Load a graph previously written by [`write_graph`].
pub fn read_graph(path: &Path) -> Result<LineageGraph> {
    let file = File::open(path).map_err(|source| ImpactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ImpactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::types::{AssetId, AssetMetadata, RawAttribution};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> LineageGraph {
        let mut g = LineageGraph::new();
        g.add_node(
            AssetId::new("main.sales.orders"),
            resolve(RawAttribution::new(Some("ann"), None, Some("bob"))),
            vec![AssetId::new("main.mart.daily")],
        );
        g.add_node(
            AssetId::new("main.mart.daily"),
            AssetMetadata::empty(),
            vec![],
        );
        g
    }

    #[test]
    fn writes_indented_json_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_graph(&path, &sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let orders = text.find("\"main.sales.orders\"").unwrap();
        let daily_key = text.find("\"main.mart.daily\": {").unwrap();
        assert!(orders < daily_key);
        assert!(text.starts_with("{\n  \"main.sales.orders\": {\n    \"metadata\": {"));
        assert!(text.contains("\"attributed_contact\": \"bob\""));
    }

    #[test]
    fn read_back_equals_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/out.json");
        let graph = sample();
        write_graph(&path, &graph).unwrap();
        assert_eq!(read_graph(&path).unwrap(), graph);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_graph(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ImpactError::Io { .. }));
    }

    #[test]
    fn read_invalid_json_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        let err = read_graph(&path).unwrap_err();
        assert!(matches!(err, ImpactError::Json { .. }));
    }
}
