//! Lattice — language-neutral semantic models of multi-language codebases
//!
//! Ingests a project tree (Python, PHP, JavaScript, TypeScript) and produces
//! entities, directed relationships, and bounded call-flow traces for
//! downstream renderers. The single operation is [`analyze`]; everything it
//! returns lives in [`AnalysisResult`].

pub use lattice_analyzer::{analyze, analyze_with_cancel};
pub use lattice_core::{
    AnalysisConfig, AnalysisError, AnalysisResult, CancelToken, Diagnostic, DiagnosticKind,
    EntityId, EntityKind, EntryPoint, FlowConfig, FlowTrace, HelperConfig, Language,
    LanguageConfig, ModuleEdgeSummary, RelationKind, SemanticModel, Summary, Terminal,
    aggregate_module_edges,
};

/// Convenience re-exports for consumers that need the full model surface.
pub mod model {
    pub use lattice_core::model::*;
}

pub mod graph {
    pub use lattice_core::graph::*;
}
