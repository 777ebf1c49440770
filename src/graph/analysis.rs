//! Impact analysis over a crawled lineage graph.
//!
//! Answers "what breaks if I change this asset": the transitive downstream
//! closure, who to notify, and which assets sit on lineage cycles.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::graph::lineage::LineageGraph;
use crate::resolver::NO_CONTACT;
use crate::types::AssetId;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// An asset reached from the starting point, with its hop distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactedAsset {
    pub id: AssetId,
    pub depth: u32,
    /// Attributed contact, or `None` if the asset is referenced but was
    /// never recorded as a node.
    pub contact: Option<String>,
}

/// A strongly connected component of the lineage graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleInfo {
    pub asset_ids: Vec<AssetId>,
    pub size: usize,
}

/// Impacted assets owned by one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactImpact {
    pub contact: String,
    pub assets: Vec<AssetId>,
}

// ---------------------------------------------------------------------------
// downstream_closure
// ---------------------------------------------------------------------------

/// Every asset transitively downstream of `start`, excluding `start` itself.
///
/// BFS, so each asset carries its shortest distance. Results are ordered by
/// depth, then by the order edges were encountered.
pub fn downstream_closure(graph: &LineageGraph, start: &AssetId) -> Vec<ImpactedAsset> {
    let mut out = Vec::new();
    let mut seen: HashSet<&AssetId> = HashSet::new();
    let mut queue: VecDeque<(&AssetId, u32)> = VecDeque::new();

    seen.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        let Some(node) = graph.get(current) else {
            continue;
        };
        for next in &node.downstream {
            if seen.insert(next) {
                out.push(ImpactedAsset {
                    id: next.clone(),
                    depth: depth + 1,
                    contact: graph.get(next).map(|n| n.metadata.attributed_contact.clone()),
                });
                queue.push_back((next, depth + 1));
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// contacts_to_notify
// ---------------------------------------------------------------------------

/// Group the downstream closure of `start` by attributed contact.
///
/// Contacts appear in first-seen order. Assets with no usable contact are
/// left out.
pub fn contacts_to_notify(graph: &LineageGraph, start: &AssetId) -> Vec<ContactImpact> {
    let mut groups: Vec<ContactImpact> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for impacted in downstream_closure(graph, start) {
        let Some(contact) = impacted.contact else {
            continue;
        };
        if contact == NO_CONTACT {
            continue;
        }
        match slot.get(&contact) {
            Some(&i) => groups[i].assets.push(impacted.id),
            None => {
                slot.insert(contact.clone(), groups.len());
                groups.push(ContactImpact {
                    contact,
                    assets: vec![impacted.id],
                });
            }
        }
    }

    groups
}

// ---------------------------------------------------------------------------
// detect_cycles
// ---------------------------------------------------------------------------

/// Strongly connected components that form cycles: size >= 2, or a single
/// asset listing itself downstream.
///
/// Tarjan's algorithm with an explicit call stack, so long lineage chains do
/// not exhaust the thread stack. Only recorded nodes are considered as
/// sources; edges into unrecorded ids are ignored.
pub fn detect_cycles(graph: &LineageGraph) -> Vec<CycleInfo> {
    let n = graph.len();
    let adj: Vec<Vec<usize>> = graph
        .iter()
        .map(|node| {
            node.downstream
                .iter()
                .filter_map(|d| graph.position(d))
                .collect()
        })
        .collect();
    let ids: Vec<&AssetId> = graph.ids().collect();

    const UNVISITED: usize = usize::MAX;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut counter = 0usize;
    let mut cycles = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        // (vertex, next edge to examine)
        let mut call: Vec<(usize, usize)> = vec![(root, 0)];
        index[root] = counter;
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(v, edge)) = call.last() {
            if edge < adj[v].len() {
                let w = adj[v][edge];
                if let Some(top) = call.last_mut() {
                    top.1 += 1;
                }
                if index[w] == UNVISITED {
                    index[w] = counter;
                    lowlink[w] = counter;
                    counter += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                let is_cycle = component.len() >= 2 || adj[v].contains(&v);
                if is_cycle {
                    component.sort_unstable();
                    let asset_ids: Vec<AssetId> =
                        component.iter().map(|&i| ids[i].clone()).collect();
                    cycles.push(CycleInfo {
                        size: asset_ids.len(),
                        asset_ids,
                    });
                }
            }
        }
    }

    cycles
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
