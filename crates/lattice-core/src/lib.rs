//! Lattice Core — semantic model, relationship graph, and flow traces

pub mod aggregation;
pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod flow;
pub mod graph;
pub mod model;
pub mod result;

#[cfg(test)]
pub mod tests;

pub use aggregation::{ModuleEdgeSummary, aggregate_module_edges};
pub use cancel::CancelToken;
pub use config::{
    AnalysisConfig, EntryPoint, FlowConfig, HelperConfig, LanguageConfig, LanguagesConfig,
    RelationshipConfig,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, ParseStage};
pub use error::{AnalysisError, Phase};
pub use flow::{FlowHop, FlowTrace, Terminal};
pub use graph::{Cardinality, Provenance, RelationEdge, RelationGraph, RelationKind};
pub use model::{
    AttrOrigin, Attribute, AttributeKind, CallSite, Decorator, DocBlock, DocParam, EntityId,
    EntityKind, Import, ImportShape, ImportedName, Language, LocalBinding, Module, ModuleConstant,
    Owner, Parameter, Receiver, Routine, RoutineKind, SemanticModel, Span, TypeDecl, TypeKind,
    TypeRef, Variadic, Visibility,
};
pub use result::{AnalysisResult, Summary};
