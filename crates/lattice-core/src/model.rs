//! Core data structures for the semantic model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an entity: `<kind>:<file>:<qualified-name>[:<ordinal>]`.
///
/// Identifiers are deterministic strings so that re-runs over an unchanged
/// tree produce identical ids. The distinguished [`EntityId::external`]
/// sentinel stands in for symbols that resolve to nothing inside the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EntityId(pub String);

/// Sentinel spelling for unresolvable references.
pub const EXTERNAL_ID: &str = "external";

impl EntityId {
    pub fn new(kind: EntityKind, file: &str, qualified_name: &str) -> Self {
        EntityId(format!("{}:{}:{}", kind.tag(), file, qualified_name))
    }

    /// Same id with an ordinal suffix, used when two entities in one file
    /// claim the same qualified name.
    pub fn with_ordinal(&self, ordinal: u32) -> Self {
        EntityId(format!("{}:{}", self.0, ordinal))
    }

    pub fn external() -> Self {
        EntityId(EXTERNAL_ID.to_string())
    }

    pub fn is_external(&self) -> bool {
        self.0 == EXTERNAL_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminates the four addressable entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Module,
    Type,
    Routine,
    Attribute,
}

impl EntityKind {
    /// Prefix used in identifier strings.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Module => "module",
            EntityKind::Type => "type",
            EntityKind::Routine => "routine",
            EntityKind::Attribute => "attr",
        }
    }
}

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Php,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Php => "php",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    /// Default extension set, overridable through configuration.
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::Php => &["php"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::TypeScript => &["ts", "tsx"],
        }
    }

    pub fn all() -> [Language; 4] {
        [
            Language::Python,
            Language::Php,
            Language::JavaScript,
            Language::TypeScript,
        ]
    }
}

/// 1-based inclusive line span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }
}

/// Visibility where the language has it; Python maps the underscore
/// convention onto Private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// The shape of an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportShape {
    /// `import x` / `use Foo\Bar;` / `import x from 'y'`
    Plain,
    /// `from x import a, b` / `import { a, b } from 'y'`
    Named,
    /// `from ..x import a`, with the dot depth recorded separately
    Relative,
}

/// One imported binding, with its optional local alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// An import recorded on a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub shape: ImportShape,
    /// Module path as written (dotted, backslashed, or slashed per language).
    pub module: String,
    /// Named bindings; empty for plain imports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<ImportedName>,
    /// Leading-dot count for relative imports, zero otherwise.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub relative_depth: u32,
    pub line: u32,
    /// Filled by the model builder; External when the import leaves the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<EntityId>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// A top-level constant in a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConstant {
    pub name: String,
    /// Right-hand side, verbatim.
    pub value: String,
    pub line: u32,
}

/// A source file in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: EntityId,
    /// Forward-slash path relative to the project root.
    pub path: String,
    pub language: Language,
    /// Namespace path: package directories (Python), declared namespace
    /// (PHP), or the extension-stripped module path (JS/TS).
    pub package: Vec<String>,
    pub imports: Vec<Import>,
    pub constants: Vec<ModuleConstant>,
    /// Top-level routines, in declaration order.
    pub routines: Vec<EntityId>,
    /// Top-level type declarations, in declaration order.
    pub types: Vec<EntityId>,
    pub loc: u32,
}

/// Tag for a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Trait,
    Enum,
    /// TS `type X = …` aliases.
    Alias,
}

/// A reference from one type to another, textual until the builder seals it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// The expression as written (`base.Mixin`, `\App\Contracts\Engine`).
    pub text: String,
    /// Dotted normalisation when the expression is a simple name or
    /// attribute chain; equals `text` otherwise.
    pub normalized: String,
    /// Resolved target; External when the name binds outside the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
}

impl TypeRef {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let normalized = text.clone();
        TypeRef {
            text,
            normalized,
            target: None,
        }
    }
}

/// A decorator (Python) or annotation-style decorator (TS), raw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
}

/// A class, interface, trait, or enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: EntityId,
    pub kind: TypeKind,
    pub name: String,
    pub qualified_name: String,
    pub module: EntityId,
    /// Base classes, in declaration order.
    pub bases: Vec<TypeRef>,
    /// Implemented interfaces (PHP `implements`, TS `implements`).
    pub interfaces: Vec<TypeRef>,
    /// Used traits (PHP `use` inside a class body).
    pub traits_used: Vec<TypeRef>,
    /// Methods, in declaration order.
    pub methods: Vec<EntityId>,
    /// Attributes, in declaration order.
    pub attributes: Vec<EntityId>,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<DocBlock>,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<Decorator>,
    /// True when the record came from a degraded (regex) reader.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub best_effort: bool,
}

/// Tag for a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    Function,
    Method,
    Lambda,
}

/// What owns a routine: a module (free function) or a type (method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Module(EntityId),
    Type(EntityId),
}

impl Owner {
    pub fn id(&self) -> &EntityId {
        match self {
            Owner::Module(id) | Owner::Type(id) => id,
        }
    }
}

/// The elided first parameter of Python methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    #[default]
    None,
    /// `self`
    Instance,
    /// `cls`
    Class,
}

/// Variadic marker on a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variadic {
    #[default]
    No,
    /// `*args` / rest parameter
    Args,
    /// `**kwargs`
    KwArgs,
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_default: bool,
    #[serde(default, skip_serializing_if = "variadic_is_no")]
    pub variadic: Variadic,
}

fn variadic_is_no(v: &Variadic) -> bool {
    matches!(v, Variadic::No)
}

/// A syntactic call expression inside a routine body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee expression, verbatim (`self.start`, `helper`, `engine.run`).
    pub callee: String,
    /// Receiver expression when the call has one (`self`, `engine`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Simple name of the called routine (last path segment).
    pub name: String,
    pub line: u32,
}

/// A local variable whose type is syntactically evident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBinding {
    pub name: String,
    /// Annotated or constructed type, as written.
    pub type_text: String,
    /// True when the binding is a fresh constructor call (`x = Engine()`).
    pub constructed: bool,
    pub line: u32,
}

/// A function, method, or bound lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: EntityId,
    pub kind: RoutineKind,
    pub name: String,
    pub qualified_name: String,
    pub owner: Owner,
    pub params: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,
    pub receiver: Receiver,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<DocBlock>,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<Decorator>,
    /// Call expressions in the body; consumed by the flow analyzer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_sites: Vec<CallSite>,
    /// Locals with evident types; used for receiver resolution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locals: Vec<LocalBinding>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub best_effort: bool,
}

/// Attribute kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Instance,
    ClassLevel,
    Property,
    Constant,
}

/// How the attribute receives its value inside the constructor. Drives
/// composition/aggregation inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttrOrigin {
    /// `self.x = Engine()`: freshly constructed, type text attached.
    Constructed(String),
    /// `self.x = driver` where `driver` is a constructor parameter.
    Parameter(String),
    /// Assigned from some other expression.
    Other,
    #[default]
    Unknown,
}

/// A property, field, class constant, or class-level variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: EntityId,
    pub name: String,
    pub owner: EntityId,
    pub kind: AttributeKind,
    /// Declared type, as written, when the language supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    /// Sealed reference for the declared type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<EntityId>,
    /// Default or constant expression, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_expr: Option<String>,
    pub origin: AttrOrigin,
    pub line: u32,
    pub visibility: Visibility,
    pub is_static: bool,
}

/// A documented parameter extracted from a doc comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocParam {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_text: Option<String>,
    pub description: String,
}

/// Structured documentation attached to a type or routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocBlock {
    /// The raw documentation text, verbatim.
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<DocParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raises: Vec<String>,
}

/// The unified entity catalogue. Ordered maps keep iteration and
/// serialisation deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticModel {
    pub modules: BTreeMap<EntityId, Module>,
    pub types: BTreeMap<EntityId, TypeDecl>,
    pub routines: BTreeMap<EntityId, Routine>,
    pub attributes: BTreeMap<EntityId, Attribute>,
}

impl SemanticModel {
    pub fn module(&self, id: &EntityId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn type_decl(&self, id: &EntityId) -> Option<&TypeDecl> {
        self.types.get(id)
    }

    pub fn routine(&self, id: &EntityId) -> Option<&Routine> {
        self.routines.get(id)
    }

    pub fn attribute(&self, id: &EntityId) -> Option<&Attribute> {
        self.attributes.get(id)
    }

    pub fn entity_count(&self) -> usize {
        self.modules.len() + self.types.len() + self.routines.len() + self.attributes.len()
    }

    /// The module an entity ultimately belongs to.
    pub fn owning_module(&self, id: &EntityId) -> Option<EntityId> {
        if self.modules.contains_key(id) {
            return Some(id.clone());
        }
        if let Some(t) = self.types.get(id) {
            return Some(t.module.clone());
        }
        if let Some(r) = self.routines.get(id) {
            return match &r.owner {
                Owner::Module(m) => Some(m.clone()),
                Owner::Type(t) => self.types.get(t).map(|t| t.module.clone()),
            };
        }
        if let Some(a) = self.attributes.get(id) {
            return self.types.get(&a.owner).map(|t| t.module.clone());
        }
        None
    }

    /// First type with the given simple name, in id order.
    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.values().find(|t| t.name == name)
    }

    /// Routine by its qualified name.
    pub fn find_routine(&self, qualified: &str) -> Option<&Routine> {
        self.routines.values().find(|r| r.qualified_name == qualified)
    }
}
