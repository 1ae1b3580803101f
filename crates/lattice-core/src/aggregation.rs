//! Module-level rollup of entity edges
//!
//! Renderers drawing package diagrams want one arrow per module pair, not
//! one per member edge. This collapses the relationship multigraph onto
//! owning modules with per-kind counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::RelationGraph;
use crate::model::{EntityId, SemanticModel};

/// A summary arrow between two modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEdgeSummary {
    pub source: EntityId,
    /// External when the underlying edges leave the project.
    pub target: EntityId,
    pub count: usize,
    /// Breakdown by relationship kind name.
    pub kind_counts: BTreeMap<String, usize>,
}

/// Collapse entity edges to module→module summaries. Intra-module edges are
/// dropped; output is ordered by (source, target).
pub fn aggregate_module_edges(
    model: &SemanticModel,
    graph: &RelationGraph,
) -> Vec<ModuleEdgeSummary> {
    let mut buckets: BTreeMap<(EntityId, EntityId), BTreeMap<String, usize>> = BTreeMap::new();

    for edge in graph.all_edges() {
        let Some(source_module) = model.owning_module(&edge.source) else {
            continue;
        };
        let target_module = if edge.target.is_external() {
            EntityId::external()
        } else {
            match model.owning_module(&edge.target) {
                Some(m) => m,
                None => continue,
            }
        };
        if source_module == target_module {
            continue;
        }
        *buckets
            .entry((source_module, target_module))
            .or_default()
            .entry(edge.kind.name().to_string())
            .or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|((source, target), kind_counts)| ModuleEdgeSummary {
            source,
            target,
            count: kind_counts.values().sum(),
            kind_counts,
        })
        .collect()
}
