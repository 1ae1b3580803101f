//! Per-file raw entity records — front-end output, model-builder input
//!
//! Records are value-typed and independent per file, so per-file parsing can
//! fan out; the builder re-sorts by relative path before it consumes them.

use serde::{Deserialize, Serialize};

use lattice_core::model::{
    AttrOrigin, AttributeKind, CallSite, Decorator, DocBlock, Import, Language, LocalBinding,
    ModuleConstant, Parameter, Receiver, Span, TypeKind, Visibility,
};

/// Everything one front-end extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileRecord {
    /// Forward-slash path relative to the project root.
    pub rel_path: String,
    pub language: Option<Language>,
    pub loc: u32,
    /// Declared namespace (PHP); empty for languages where the builder
    /// derives the package from the path.
    pub namespace: Vec<String>,
    pub imports: Vec<Import>,
    pub constants: Vec<ModuleConstant>,
    /// Type declarations, flattened; nesting is encoded in `qualified`.
    pub types: Vec<TypeRecord>,
    /// Module-level routines.
    pub routines: Vec<RoutineRecord>,
    /// True when a degraded reader produced this record.
    pub best_effort: bool,
}

/// A class/interface/trait/enum prior to identifier assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub kind: TypeKind,
    pub name: String,
    /// Dotted path within the module (`Outer.Inner` for nested classes).
    pub qualified: String,
    /// Base type expressions, verbatim, in declaration order.
    pub bases: Vec<String>,
    pub interfaces: Vec<String>,
    pub traits_used: Vec<String>,
    pub methods: Vec<RoutineRecord>,
    pub attributes: Vec<AttributeRecord>,
    pub span: Span,
    pub doc: Option<DocBlock>,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub is_final: bool,
    pub decorators: Vec<Decorator>,
    pub best_effort: bool,
}

/// A routine prior to identifier assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineRecord {
    pub name: String,
    pub params: Vec<Parameter>,
    pub return_annotation: Option<String>,
    pub receiver: Receiver,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    pub is_generator: bool,
    /// Arrow functions and other bound lambdas.
    pub is_lambda: bool,
    pub span: Span,
    pub doc: Option<DocBlock>,
    pub visibility: Visibility,
    pub decorators: Vec<Decorator>,
    pub call_sites: Vec<CallSite>,
    pub locals: Vec<LocalBinding>,
    pub best_effort: bool,
}

impl RoutineRecord {
    pub fn named(name: impl Into<String>) -> Self {
        RoutineRecord {
            name: name.into(),
            params: Vec::new(),
            return_annotation: None,
            receiver: Receiver::None,
            is_static: false,
            is_abstract: false,
            is_async: false,
            is_generator: false,
            is_lambda: false,
            span: Span::default(),
            doc: None,
            visibility: Visibility::Public,
            decorators: Vec::new(),
            call_sites: Vec::new(),
            locals: Vec::new(),
            best_effort: false,
        }
    }
}

/// An attribute prior to identifier assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub name: String,
    pub kind: AttributeKind,
    pub declared_type: Option<String>,
    pub default_expr: Option<String>,
    pub origin: AttrOrigin,
    pub line: u32,
    pub visibility: Visibility,
    pub is_static: bool,
}

impl AttributeRecord {
    pub fn named(name: impl Into<String>, kind: AttributeKind, line: u32) -> Self {
        AttributeRecord {
            name: name.into(),
            kind,
            declared_type: None,
            default_expr: None,
            origin: AttrOrigin::Unknown,
            line,
            visibility: Visibility::Public,
            is_static: false,
        }
    }

    /// The type the attribute evidently has: declared if present, else the
    /// constructed type from its initialiser.
    pub fn evident_type(&self) -> Option<&str> {
        if let Some(t) = &self.declared_type {
            return Some(t);
        }
        match &self.origin {
            AttrOrigin::Constructed(t) => Some(t),
            _ => None,
        }
    }
}

/// Preference order when one attribute sees several constructor
/// assignments: constructed > parameter > other. Composition therefore wins
/// when an attribute is both constructed locally and reassigned from a
/// parameter.
pub fn origin_rank(origin: &AttrOrigin) -> u8 {
    match origin {
        AttrOrigin::Constructed(_) => 3,
        AttrOrigin::Parameter(_) => 2,
        AttrOrigin::Other => 1,
        AttrOrigin::Unknown => 0,
    }
}
