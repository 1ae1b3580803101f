//! The analysis result and its persistence format

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::diagnostics::Diagnostic;
use crate::flow::FlowTrace;
use crate::graph::RelationGraph;
use crate::model::{EntityId, Routine, SemanticModel, TypeDecl};

/// Counts per entity kind, edge kind, and flow terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Summary {
    pub modules: usize,
    pub types: usize,
    pub routines: usize,
    pub attributes: usize,
    pub edges: BTreeMap<String, usize>,
    pub terminals: BTreeMap<String, usize>,
    pub diagnostics: usize,
    pub total_loc: u64,
}

impl Summary {
    pub fn compute(
        model: &SemanticModel,
        graph: &RelationGraph,
        flows: &BTreeMap<EntityId, Vec<FlowTrace>>,
        diagnostics: &[Diagnostic],
    ) -> Self {
        let mut edges: BTreeMap<String, usize> = BTreeMap::new();
        for edge in graph.all_edges() {
            *edges.entry(edge.kind.name().to_string()).or_insert(0) += 1;
        }
        let mut terminals: BTreeMap<String, usize> = BTreeMap::new();
        for traces in flows.values() {
            for trace in traces {
                *terminals.entry(trace.terminal.name().to_string()).or_insert(0) += 1;
            }
        }
        Summary {
            modules: model.modules.len(),
            types: model.types.len(),
            routines: model.routines.len(),
            attributes: model.attributes.len(),
            edges,
            terminals,
            diagnostics: diagnostics.len(),
            total_loc: model.modules.values().map(|m| m.loc as u64).sum(),
        }
    }
}

/// Everything the pipeline produced. Read-only after build; consumers pull
/// the catalogue, the edge list, the traces, and the diagnostics from here.
#[derive(Debug)]
pub struct AnalysisResult {
    pub model: SemanticModel,
    pub graph: RelationGraph,
    /// Traces grouped by entry routine, ordered by entry id.
    pub flows: BTreeMap<EntityId, Vec<FlowTrace>>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl AnalysisResult {
    pub fn traces_for(&self, entry: &EntityId) -> &[FlowTrace] {
        self.flows.get(entry).map(|t| t.as_slice()).unwrap_or(&[])
    }

    /// First type with the given simple name.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.model.find_type(name)
    }

    /// Routine by its qualified name.
    pub fn find_routine(&self, qualified: &str) -> Option<&Routine> {
        self.model.find_routine(qualified)
    }

    /// Serialise to the renderer-facing document: one section per entity
    /// kind, a flat relationship list, flows grouped by entry, diagnostics,
    /// and the summary. Byte-stable for a fixed input.
    pub fn to_json(&self) -> Value {
        let relationships: Vec<Value> = self
            .graph
            .all_edges()
            .map(|e| serde_json::to_value(e).expect("edge serialises"))
            .collect();
        let entries: Vec<Value> = self
            .flows
            .iter()
            .map(|(routine_id, traces)| {
                json!({
                    "routine_id": routine_id,
                    "traces": traces,
                })
            })
            .collect();
        json!({
            "modules": self.model.modules,
            "types": self.model.types,
            "routines": self.model.routines,
            "attributes": self.model.attributes,
            "relationships": relationships,
            "flows": { "entries": entries },
            "diagnostics": self.diagnostics,
            "summary": self.summary,
        })
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).expect("result serialises")
    }
}
