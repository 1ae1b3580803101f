//! Relationship multigraph over entity identifiers

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::model::EntityId;

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Inherits,
    Implements,
    UsesTrait,
    Imports,
    Composes,
    Aggregates,
    Associates,
    Calls,
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Inherits => "inherits",
            RelationKind::Implements => "implements",
            RelationKind::UsesTrait => "uses_trait",
            RelationKind::Imports => "imports",
            RelationKind::Composes => "composes",
            RelationKind::Aggregates => "aggregates",
            RelationKind::Associates => "associates",
            RelationKind::Calls => "calls",
        }
    }
}

/// Cardinality hint on composition/aggregation/association edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

/// Where an inferred fact was first observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub file: String,
    pub line: u32,
}

/// A directed relationship edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    pub provenance: Provenance,
}

/// The relationship multigraph. Entities hold no outgoing edge collections;
/// all edges live here, addressed by identifier.
#[derive(Debug, Default)]
pub struct RelationGraph {
    inner: StableDiGraph<EntityId, RelationEdge>,
    index: HashMap<EntityId, NodeIndex>,
}

impl RelationGraph {
    pub fn new() -> Self {
        RelationGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    fn node_for(&mut self, id: &EntityId) -> NodeIndex {
        if let Some(idx) = self.index.get(id) {
            return *idx;
        }
        let idx = self.inner.add_node(id.clone());
        self.index.insert(id.clone(), idx);
        idx
    }

    /// Insert an edge. Duplicate (source, target, kind) triples are
    /// coalesced; the first provenance wins.
    pub fn add_edge(&mut self, edge: RelationEdge) -> bool {
        if self.has_edge(&edge.source, &edge.target, edge.kind) {
            return false;
        }
        let source = self.node_for(&edge.source);
        let target = self.node_for(&edge.target);
        self.inner.add_edge(source, target, edge);
        true
    }

    pub fn has_edge(&self, source: &EntityId, target: &EntityId, kind: RelationKind) -> bool {
        self.edges_from(source)
            .any(|e| &e.target == target && e.kind == kind)
    }

    /// Any edge of the given kind out of `source`, regardless of target.
    pub fn has_edge_of_kind(&self, source: &EntityId, kind: RelationKind) -> bool {
        self.edges_from(source).any(|e| e.kind == kind)
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// All edges, in insertion order.
    pub fn all_edges(&self) -> impl Iterator<Item = &RelationEdge> {
        self.inner
            .edge_indices()
            .filter_map(|idx| self.inner.edge_weight(idx))
    }

    pub fn edges_of_kind(&self, kind: RelationKind) -> impl Iterator<Item = &RelationEdge> {
        self.all_edges().filter(move |e| e.kind == kind)
    }

    pub fn edges_from<'a>(
        &'a self,
        source: &EntityId,
    ) -> Box<dyn Iterator<Item = &'a RelationEdge> + 'a> {
        match self.index.get(source) {
            Some(idx) => Box::new(
                self.inner
                    .edges_directed(*idx, Direction::Outgoing)
                    .map(|e| e.weight()),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn edges_to<'a>(
        &'a self,
        target: &EntityId,
    ) -> Box<dyn Iterator<Item = &'a RelationEdge> + 'a> {
        match self.index.get(target) {
            Some(idx) => Box::new(
                self.inner
                    .edges_directed(*idx, Direction::Incoming)
                    .map(|e| e.weight()),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Targets of `inherits` edges out of `source`, in insertion order.
    /// External targets are included; callers skip them when walking.
    pub fn bases_of(&self, source: &EntityId) -> Vec<EntityId> {
        let mut out: Vec<(usize, EntityId)> = Vec::new();
        for idx in self.inner.edge_indices() {
            if let Some(e) = self.inner.edge_weight(idx) {
                if e.kind == RelationKind::Inherits && &e.source == source {
                    out.push((idx.index(), e.target.clone()));
                }
            }
        }
        out.sort_by_key(|(i, _)| *i);
        out.into_iter().map(|(_, id)| id).collect()
    }
}
