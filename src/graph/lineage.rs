//! In-memory lineage graph.
//!
//! Nodes are stored in first-discovery order and indexed by [`AssetId`].
//! Each key is written at most once per crawl; there is no removal.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::resolver::resolve;
use crate::types::{AssetId, AssetMetadata, RawAttribution};

/// One crawled asset and its downstream consumers, in service order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: AssetId,
    pub metadata: AssetMetadata,
    pub downstream: Vec<AssetId>,
}

/// Insertion-ordered mapping from asset id to node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineageGraph {
    nodes: Vec<Node>,
    index: HashMap<AssetId, usize>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node. Returns `false` (and keeps the existing node) if `id`
    /// is already present.
    pub fn add_node(
        &mut self,
        id: AssetId,
        metadata: AssetMetadata,
        downstream: Vec<AssetId>,
    ) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id,
            metadata,
            downstream,
        });
        true
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &AssetId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Position of `id` in discovery order.
    pub fn position(&self, id: &AssetId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in first-discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.nodes.iter().map(|n| &n.id)
    }

    /// Total number of recorded downstream edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.downstream.len()).sum()
    }

    /// Edges whose target is not a key, as `(source, target)` pairs.
    ///
    /// Empty for any graph produced by a crawl that ran to completion.
    pub fn dangling_edges(&self) -> Vec<(&AssetId, &AssetId)> {
        self.nodes
            .iter()
            .flat_map(|n| n.downstream.iter().map(move |d| (&n.id, d)))
            .filter(|(_, target)| !self.contains(target))
            .collect()
    }

    /// Nested `id -> {metadata, downstream}` mapping, insertion-ordered.
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing plain strings and options into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<'a> IntoIterator for &'a LineageGraph {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct NodeRecordRef<'a> {
    metadata: &'a AssetMetadata,
    downstream: &'a [AssetId],
}

#[derive(Deserialize)]
struct NodeRecord {
    #[serde(default)]
    metadata: RawAttribution,
    #[serde(default)]
    downstream: Vec<AssetId>,
}

impl Serialize for LineageGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for node in &self.nodes {
            map.serialize_entry(
                &node.id,
                &NodeRecordRef {
                    metadata: &node.metadata,
                    downstream: &node.downstream,
                },
            )?;
        }
        map.end()
    }
}

/// Loading re-derives `attributed_contact` from the stored raw fields, so a
/// hand-edited contact in the file is not trusted.
impl<'de> Deserialize<'de> for LineageGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GraphVisitor;

        impl<'de> Visitor<'de> for GraphVisitor {
            type Value = LineageGraph;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of asset id to {metadata, downstream}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut graph = LineageGraph::new();
                while let Some((id, record)) = access.next_entry::<AssetId, NodeRecord>()? {
                    graph.add_node(id, resolve(record.metadata), record.downstream);
                }
                Ok(graph)
            }
        }

        deserializer.deserialize_map(GraphVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
