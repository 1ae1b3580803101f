//! Python front-end using tree-sitter
//!
//! Static syntactic parse only; nothing is evaluated. The implicit
//! `self`/`cls` first parameter is elided from exported parameter lists and
//! kept as a receiver flag on the routine.

use tree_sitter::Node;

use lattice_core::model::{
    AttrOrigin, AttributeKind, CallSite, Decorator, Import, ImportShape, ImportedName,
    LocalBinding, ModuleConstant, Parameter, Receiver, Span, TypeKind, Variadic, Visibility,
};

use crate::docparse;
use crate::extractor::{ExtractOptions, FrontEnd, FrontEndError, SourceFile, count_lines};
use crate::parser_pool::{Grammar, ParserPool};
use crate::records::{AttributeRecord, FileRecord, RoutineRecord, TypeRecord, origin_rank};

pub struct PythonFrontEnd {
    pool: ParserPool,
}

impl PythonFrontEnd {
    pub fn new(pool: ParserPool) -> Self {
        Self { pool }
    }
}

impl FrontEnd for PythonFrontEnd {
    fn name(&self) -> &'static str {
        "python"
    }

    fn parse_file(
        &self,
        file: &SourceFile,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<FileRecord, FrontEndError> {
        let tree = self
            .pool
            .parse_blocking(Grammar::Python, source)
            .map_err(|e| FrontEndError::parse(e.to_string()))?;
        let root = tree.root_node();
        if root.kind() != "module" {
            return Err(FrontEndError::parse(format!(
                "unexpected root node `{}`",
                root.kind()
            )));
        }
        if let Some(line) = crate::parser_pool::first_error_line(&root) {
            return Err(FrontEndError::parse(format!("syntax error near line {line}")));
        }

        let mut record = FileRecord {
            rel_path: file.rel_path.clone(),
            language: Some(file.language),
            loc: count_lines(source),
            ..FileRecord::default()
        };

        let extractor = Extractor {
            source: source.as_bytes(),
            options: *options,
        };
        extractor.module(root, &mut record);
        Ok(record)
    }
}

struct Extractor<'a> {
    source: &'a [u8],
    options: ExtractOptions,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node) -> String {
        node.utf8_text(self.source).unwrap_or_default().to_string()
    }

    fn line(&self, node: Node) -> u32 {
        node.start_position().row as u32 + 1
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            node.start_position().row as u32 + 1,
            node.end_position().row as u32 + 1,
        )
    }

    fn module(&self, root: Node, record: &mut FileRecord) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.plain_import(child, record),
                "import_from_statement" => self.from_import(child, record),
                "function_definition" => {
                    let routine = self.routine(child, &[], false);
                    record.routines.push(routine);
                }
                "class_definition" => self.class(child, &[], None, record),
                "decorated_definition" => {
                    let decorators = self.decorators(child);
                    if let Some(definition) = child.child_by_field_name("definition") {
                        match definition.kind() {
                            "function_definition" => {
                                let routine = self.routine(definition, &decorators, false);
                                record.routines.push(routine);
                            }
                            "class_definition" => {
                                self.class(definition, &decorators, None, record)
                            }
                            _ => {}
                        }
                    }
                }
                "expression_statement" => {
                    if let Some(assignment) =
                        child.named_child(0).filter(|n| n.kind() == "assignment")
                    {
                        self.module_constant(assignment, record);
                    }
                }
                _ => {}
            }
        }
    }

    /// `import a.b` and `import a.b as c`.
    fn plain_import(&self, node: Node, record: &mut FileRecord) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => record.imports.push(Import {
                    shape: ImportShape::Plain,
                    module: self.text(child),
                    names: Vec::new(),
                    relative_depth: 0,
                    line: self.line(node),
                    resolved: None,
                }),
                "aliased_import" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let alias = child.child_by_field_name("alias").map(|n| self.text(n));
                    record.imports.push(Import {
                        shape: ImportShape::Plain,
                        module: name.clone(),
                        names: alias
                            .map(|a| {
                                vec![ImportedName {
                                    name,
                                    alias: Some(a),
                                }]
                            })
                            .unwrap_or_default(),
                        relative_depth: 0,
                        line: self.line(node),
                        resolved: None,
                    });
                }
                _ => {}
            }
        }
    }

    /// `from x import a, b as c`, including relative forms.
    fn from_import(&self, node: Node, record: &mut FileRecord) {
        let mut module = String::new();
        let mut depth = 0u32;
        if let Some(module_node) = node.child_by_field_name("module_name") {
            match module_node.kind() {
                "dotted_name" => module = self.text(module_node),
                "relative_import" => {
                    let mut cursor = module_node.walk();
                    for part in module_node.children(&mut cursor) {
                        match part.kind() {
                            "import_prefix" => {
                                depth = self.text(part).chars().filter(|c| *c == '.').count() as u32
                            }
                            "dotted_name" => module = self.text(part),
                            _ => {}
                        }
                    }
                }
                _ => module = self.text(module_node),
            }
        }

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if node
                .child_by_field_name("module_name")
                .is_some_and(|m| m.id() == child.id())
            {
                continue;
            }
            match child.kind() {
                "dotted_name" => names.push(ImportedName {
                    name: self.text(child),
                    alias: None,
                }),
                "aliased_import" => names.push(ImportedName {
                    name: child
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default(),
                    alias: child.child_by_field_name("alias").map(|n| self.text(n)),
                }),
                "wildcard_import" => names.push(ImportedName {
                    name: "*".to_string(),
                    alias: None,
                }),
                _ => {}
            }
        }

        record.imports.push(Import {
            shape: if depth > 0 {
                ImportShape::Relative
            } else {
                ImportShape::Named
            },
            module,
            names,
            relative_depth: depth,
            line: self.line(node),
            resolved: None,
        });
    }

    /// A top-level assignment whose target is one uppercase identifier.
    fn module_constant(&self, assignment: Node, record: &mut FileRecord) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = self.text(left);
        if !is_constant_name(&name) {
            return;
        }
        let value = assignment
            .child_by_field_name("right")
            .map(|n| self.text(n))
            .unwrap_or_default();
        record.constants.push(ModuleConstant {
            name,
            value,
            line: self.line(assignment),
        });
    }

    fn decorators(&self, decorated: Node) -> Vec<Decorator> {
        let mut out = Vec::new();
        let mut cursor = decorated.walk();
        for child in decorated.named_children(&mut cursor) {
            if child.kind() != "decorator" {
                continue;
            }
            let Some(expr) = child.named_child(0) else {
                continue;
            };
            if expr.kind() == "call" {
                let name = expr
                    .child_by_field_name("function")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let args = expr.child_by_field_name("arguments").map(|n| self.text(n));
                out.push(Decorator { name, args });
            } else {
                out.push(Decorator {
                    name: self.text(expr),
                    args: None,
                });
            }
        }
        out
    }

    fn class(
        &self,
        node: Node,
        decorators: &[Decorator],
        outer: Option<&str>,
        record: &mut FileRecord,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        let qualified = match outer {
            Some(outer) => format!("{outer}.{name}"),
            None => name.clone(),
        };

        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for arg in superclasses.named_children(&mut cursor) {
                // `metaclass=...` and other keyword arguments are not bases.
                if arg.kind() == "keyword_argument" || arg.kind() == "comment" {
                    continue;
                }
                bases.push(self.text(arg));
            }
        }

        let mut type_record = TypeRecord {
            kind: TypeKind::Class,
            name: name.clone(),
            qualified: qualified.clone(),
            bases,
            interfaces: Vec::new(),
            traits_used: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            span: self.span(node),
            doc: None,
            visibility: python_visibility(&name),
            is_abstract: decorators.iter().any(|d| is_abstract_decorator(&d.name)),
            is_final: decorators.iter().any(|d| d.name.ends_with("final")),
            decorators: decorators.to_vec(),
            best_effort: false,
        };

        let Some(body) = node.child_by_field_name("body") else {
            record.types.push(type_record);
            return;
        };

        if self.options.detect_docstrings {
            type_record.doc = self.docstring(body);
        }

        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "function_definition" => self.class_member(child, &[], &mut type_record),
                "decorated_definition" => {
                    let member_decorators = self.decorators(child);
                    if let Some(definition) = child.child_by_field_name("definition") {
                        match definition.kind() {
                            "function_definition" => self.class_member(
                                definition,
                                &member_decorators,
                                &mut type_record,
                            ),
                            "class_definition" => self.class(
                                definition,
                                &member_decorators,
                                Some(&qualified),
                                record,
                            ),
                            _ => {}
                        }
                    }
                }
                "class_definition" => self.class(child, &[], Some(&qualified), record),
                "expression_statement" => {
                    if let Some(assignment) =
                        child.named_child(0).filter(|n| n.kind() == "assignment")
                    {
                        self.class_attribute(assignment, &mut type_record);
                    }
                }
                _ => {}
            }
        }

        record.types.push(type_record);
    }

    /// A method, or a `@property` accessor recorded as an attribute.
    fn class_member(&self, node: Node, decorators: &[Decorator], type_record: &mut TypeRecord) {
        if decorators.iter().any(|d| d.name == "property") {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.text(n))
                .unwrap_or_default();
            let mut attr = AttributeRecord::named(name.clone(), AttributeKind::Property, self.line(node));
            attr.declared_type = node.child_by_field_name("return_type").map(|n| self.text(n));
            attr.visibility = python_visibility(&name);
            type_record.attributes.push(attr);
            return;
        }
        // Property setters shadow the accessor already recorded.
        if decorators
            .iter()
            .any(|d| d.name.ends_with(".setter") || d.name.ends_with(".deleter"))
        {
            return;
        }

        let routine = self.routine(node, decorators, true);
        if routine.name == "__init__" {
            self.init_attributes(node, &routine, type_record);
        }
        type_record.methods.push(routine);
    }

    /// Class-body assignment → class-level attribute.
    fn class_attribute(&self, assignment: Node, type_record: &mut TypeRecord) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" {
            return;
        }
        let name = self.text(left);
        let mut attr = AttributeRecord::named(name.clone(), AttributeKind::ClassLevel, self.line(assignment));
        if self.options.detect_types {
            attr.declared_type = assignment.child_by_field_name("type").map(|n| self.text(n));
        }
        attr.default_expr = assignment.child_by_field_name("right").map(|n| self.text(n));
        attr.visibility = python_visibility(&name);
        attr.is_static = true;
        type_record.attributes.push(attr);
    }

    /// `self.<name> = …` assignments inside `__init__`.
    fn init_attributes(&self, node: Node, routine: &RoutineRecord, type_record: &mut TypeRecord) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let param_names: Vec<&str> = routine.params.iter().map(|p| p.name.as_str()).collect();
        self.collect_self_assignments(body, &param_names, type_record);
    }

    fn collect_self_assignments(
        &self,
        node: Node,
        param_names: &[&str],
        type_record: &mut TypeRecord,
    ) {
        if node.kind() == "assignment" {
            self.self_assignment(node, param_names, type_record);
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            // Nested defs own their assignments.
            if matches!(child.kind(), "function_definition" | "class_definition") {
                continue;
            }
            self.collect_self_assignments(child, param_names, type_record);
        }
    }

    fn self_assignment(&self, assignment: Node, param_names: &[&str], type_record: &mut TypeRecord) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "attribute" {
            return;
        }
        let receiver = left.child_by_field_name("object");
        if !receiver.is_some_and(|r| r.kind() == "identifier" && self.text(r) == "self") {
            return;
        }
        let Some(attr_name) = left.child_by_field_name("attribute") else {
            return;
        };
        let name = self.text(attr_name);

        let declared_type = if self.options.detect_types {
            assignment.child_by_field_name("type").map(|n| self.text(n))
        } else {
            None
        };
        let origin = assignment
            .child_by_field_name("right")
            .map(|right| self.assignment_origin(right, param_names))
            .unwrap_or(AttrOrigin::Unknown);

        if let Some(existing) = type_record.attributes.iter_mut().find(|a| a.name == name) {
            // A constructed assignment outranks a parameter hand-off, which
            // outranks anything else.
            if origin_rank(&origin) > origin_rank(&existing.origin) {
                existing.origin = origin;
            }
            if existing.declared_type.is_none() {
                existing.declared_type = declared_type;
            }
            return;
        }

        let mut attr = AttributeRecord::named(name.clone(), AttributeKind::Instance, self.line(assignment));
        attr.declared_type = declared_type;
        attr.origin = origin;
        attr.visibility = python_visibility(&name);
        type_record.attributes.push(attr);
    }

    fn assignment_origin(&self, right: Node, param_names: &[&str]) -> AttrOrigin {
        match right.kind() {
            "call" => {
                let Some(function) = right.child_by_field_name("function") else {
                    return AttrOrigin::Other;
                };
                let text = self.text(function);
                if is_constructor_name(&text) {
                    AttrOrigin::Constructed(text)
                } else {
                    AttrOrigin::Other
                }
            }
            "identifier" => {
                let text = self.text(right);
                if param_names.contains(&text.as_str()) {
                    AttrOrigin::Parameter(text)
                } else {
                    AttrOrigin::Other
                }
            }
            _ => AttrOrigin::Other,
        }
    }

    fn routine(&self, node: Node, decorators: &[Decorator], in_class: bool) -> RoutineRecord {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();

        let is_static = decorators.iter().any(|d| d.name == "staticmethod");
        let is_classmethod = decorators.iter().any(|d| d.name == "classmethod");

        let mut routine = RoutineRecord::named(name.clone());
        routine.span = self.span(node);
        routine.visibility = python_visibility(&name);
        routine.decorators = decorators.to_vec();
        routine.is_static = is_static;
        routine.is_abstract = decorators.iter().any(|d| is_abstract_decorator(&d.name));
        routine.is_async = node.child(0).is_some_and(|c| c.kind() == "async");
        if self.options.detect_types {
            routine.return_annotation =
                node.child_by_field_name("return_type").map(|n| self.text(n));
        }

        if let Some(parameters) = node.child_by_field_name("parameters") {
            routine.params = self.parameters(parameters);
        }
        if in_class && !is_static {
            let expected = if is_classmethod { "cls" } else { "self" };
            if routine.params.first().is_some_and(|p| p.name == expected) {
                routine.params.remove(0);
                routine.receiver = if is_classmethod {
                    Receiver::Class
                } else {
                    Receiver::Instance
                };
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            if self.options.detect_docstrings {
                routine.doc = self.docstring(body);
            }
            routine.is_generator = contains_yield(body);
            self.collect_calls(body, &mut routine.call_sites);
            self.collect_locals(body, &mut routine.locals);
        }
        routine
    }

    fn parameters(&self, parameters: Node) -> Vec<Parameter> {
        let mut out = Vec::new();
        let mut cursor = parameters.walk();
        for param in parameters.named_children(&mut cursor) {
            match param.kind() {
                "identifier" => out.push(Parameter {
                    name: self.text(param),
                    annotation: None,
                    has_default: false,
                    variadic: Variadic::No,
                }),
                "typed_parameter" => {
                    let inner = param.named_child(0);
                    let variadic = match inner.map(|n| n.kind()) {
                        Some("list_splat_pattern") => Variadic::Args,
                        Some("dictionary_splat_pattern") => Variadic::KwArgs,
                        _ => Variadic::No,
                    };
                    let name = inner
                        .map(|n| self.text(n).trim_start_matches('*').to_string())
                        .unwrap_or_default();
                    out.push(Parameter {
                        name,
                        annotation: self
                            .options
                            .detect_types
                            .then(|| param.child_by_field_name("type").map(|n| self.text(n)))
                            .flatten(),
                        has_default: false,
                        variadic,
                    });
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = param
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    out.push(Parameter {
                        name,
                        annotation: self
                            .options
                            .detect_types
                            .then(|| param.child_by_field_name("type").map(|n| self.text(n)))
                            .flatten(),
                        has_default: true,
                        variadic: Variadic::No,
                    });
                }
                "list_splat_pattern" => out.push(Parameter {
                    name: self.text(param).trim_start_matches('*').to_string(),
                    annotation: None,
                    has_default: false,
                    variadic: Variadic::Args,
                }),
                "dictionary_splat_pattern" => out.push(Parameter {
                    name: self.text(param).trim_start_matches('*').to_string(),
                    annotation: None,
                    has_default: false,
                    variadic: Variadic::KwArgs,
                }),
                // Bare `*` and `/` markers carry no parameter.
                _ => {}
            }
        }
        out
    }

    /// Leading string literal of a class or function body.
    fn docstring(&self, body: Node) -> Option<lattice_core::model::DocBlock> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0)?;
        if string.kind() != "string" {
            return None;
        }
        let mut content = String::new();
        let mut cursor = string.walk();
        for part in string.children(&mut cursor) {
            if part.kind() == "string_content" {
                content.push_str(&self.text(part));
            }
        }
        if content.is_empty() {
            return None;
        }
        Some(docparse::parse_python_docstring(&content))
    }

    fn collect_calls(&self, node: Node, out: &mut Vec<CallSite>) {
        if node.kind() == "call" {
            if let Some(function) = node.child_by_field_name("function") {
                match function.kind() {
                    "identifier" => out.push(CallSite {
                        callee: self.text(function),
                        receiver: None,
                        name: self.text(function),
                        line: self.line(node),
                    }),
                    "attribute" => {
                        let receiver =
                            function.child_by_field_name("object").map(|n| self.text(n));
                        let name = function
                            .child_by_field_name("attribute")
                            .map(|n| self.text(n))
                            .unwrap_or_default();
                        out.push(CallSite {
                            callee: self.text(function),
                            receiver,
                            name,
                            line: self.line(node),
                        });
                    }
                    _ => {}
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if matches!(child.kind(), "function_definition" | "class_definition") {
                continue;
            }
            self.collect_calls(child, out);
        }
    }

    fn collect_locals(&self, node: Node, out: &mut Vec<LocalBinding>) {
        if node.kind() == "assignment" {
            if let Some(left) = node.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    let name = self.text(left);
                    let annotation = node.child_by_field_name("type").map(|n| self.text(n));
                    let constructed = node.child_by_field_name("right").and_then(|right| {
                        if right.kind() != "call" {
                            return None;
                        }
                        let function = right.child_by_field_name("function")?;
                        let text = self.text(function);
                        is_constructor_name(&text).then_some(text)
                    });
                    match (annotation, constructed) {
                        (Some(type_text), _) if self.options.detect_types => {
                            out.push(LocalBinding {
                                name,
                                type_text,
                                constructed: false,
                                line: self.line(node),
                            });
                        }
                        (_, Some(type_text)) => out.push(LocalBinding {
                            name,
                            type_text,
                            constructed: true,
                            line: self.line(node),
                        }),
                        _ => {}
                    }
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if matches!(child.kind(), "function_definition" | "class_definition") {
                continue;
            }
            self.collect_locals(child, out);
        }
    }
}

/// `UPPER_SNAKE` with at least one letter.
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// A call target that reads as a constructor: last dotted segment starts
/// with an uppercase letter.
fn is_constructor_name(text: &str) -> bool {
    text.rsplit('.')
        .next()
        .and_then(|s| s.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

fn is_abstract_decorator(name: &str) -> bool {
    name == "abstractmethod" || name.ends_with(".abstractmethod")
}

fn python_visibility(name: &str) -> Visibility {
    if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

/// Yield anywhere in the body, not counting nested defs.
fn contains_yield(node: Node) -> bool {
    if node.kind() == "yield" {
        return true;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "function_definition" | "class_definition" | "lambda") {
            continue;
        }
        if contains_yield(child) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> FileRecord {
        let front_end = PythonFrontEnd::new(ParserPool::new(1));
        let file = SourceFile {
            abs_path: PathBuf::from("/project/app.py"),
            rel_path: "app.py".to_string(),
            language: lattice_core::model::Language::Python,
        };
        let options = ExtractOptions {
            detect_docstrings: true,
            detect_types: true,
        };
        front_end.parse_file(&file, source, &options).unwrap()
    }

    #[test]
    fn extracts_classes_and_bases() {
        let record = parse("class A:\n    pass\n\nclass B(A):\n    pass\n");
        assert_eq!(record.types.len(), 2);
        assert_eq!(record.types[0].name, "A");
        assert!(record.types[0].bases.is_empty());
        assert_eq!(record.types[1].bases, vec!["A"]);
    }

    #[test]
    fn elides_self_and_records_receiver() {
        let record = parse(
            "class A:\n    def run(self, speed: int = 3):\n        pass\n    @staticmethod\n    def helper(x):\n        pass\n    @classmethod\n    def make(cls):\n        pass\n",
        );
        let methods = &record.types[0].methods;
        assert_eq!(methods[0].name, "run");
        assert_eq!(methods[0].receiver, Receiver::Instance);
        assert_eq!(methods[0].params.len(), 1);
        assert_eq!(methods[0].params[0].name, "speed");
        assert_eq!(methods[0].params[0].annotation.as_deref(), Some("int"));
        assert!(methods[0].params[0].has_default);

        assert!(methods[1].is_static);
        assert_eq!(methods[1].receiver, Receiver::None);
        assert_eq!(methods[1].params.len(), 1);

        assert_eq!(methods[2].receiver, Receiver::Class);
        assert!(methods[2].params.is_empty());
    }

    #[test]
    fn captures_variadics() {
        let record = parse("def call(*args, **kwargs):\n    pass\n");
        let params = &record.routines[0].params;
        assert_eq!(params[0].variadic, Variadic::Args);
        assert_eq!(params[0].name, "args");
        assert_eq!(params[1].variadic, Variadic::KwArgs);
        assert_eq!(params[1].name, "kwargs");
    }

    #[test]
    fn records_init_attribute_origins() {
        let record = parse(
            "class Car:\n    def __init__(self, driver):\n        self.engine = Engine()\n        self.driver = driver\n        self.count = 0\n",
        );
        let attrs = &record.types[0].attributes;
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].name, "engine");
        assert_eq!(attrs[0].origin, AttrOrigin::Constructed("Engine".to_string()));
        assert_eq!(attrs[1].origin, AttrOrigin::Parameter("driver".to_string()));
        assert_eq!(attrs[2].origin, AttrOrigin::Other);
    }

    #[test]
    fn module_constants_require_uppercase_targets() {
        let record = parse("MAX_SPEED = 120\nlower = 1\n");
        assert_eq!(record.constants.len(), 1);
        assert_eq!(record.constants[0].name, "MAX_SPEED");
        assert_eq!(record.constants[0].value, "120");
    }

    #[test]
    fn records_import_shapes() {
        let record = parse("import os.path\nfrom .a import A\nfrom m import b as c\n");
        assert_eq!(record.imports.len(), 3);
        assert_eq!(record.imports[0].shape, ImportShape::Plain);
        assert_eq!(record.imports[0].module, "os.path");
        assert_eq!(record.imports[1].shape, ImportShape::Relative);
        assert_eq!(record.imports[1].relative_depth, 1);
        assert_eq!(record.imports[1].module, "a");
        assert_eq!(record.imports[1].names[0].name, "A");
        assert_eq!(record.imports[2].shape, ImportShape::Named);
        assert_eq!(record.imports[2].names[0].alias.as_deref(), Some("c"));
    }

    #[test]
    fn flags_async_and_generator() {
        let record = parse("async def a():\n    pass\n\ndef g():\n    yield 1\n");
        assert!(record.routines[0].is_async);
        assert!(!record.routines[0].is_generator);
        assert!(record.routines[1].is_generator);
    }

    #[test]
    fn collects_call_sites_and_locals() {
        let record = parse(
            "def drive():\n    engine = Engine()\n    engine.start()\n    honk()\n",
        );
        let routine = &record.routines[0];
        assert_eq!(routine.locals.len(), 1);
        assert!(routine.locals[0].constructed);
        assert_eq!(routine.locals[0].type_text, "Engine");

        let names: Vec<&str> = routine.call_sites.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"start"));
        assert!(names.contains(&"honk"));
        let start = routine.call_sites.iter().find(|c| c.name == "start").unwrap();
        assert_eq!(start.receiver.as_deref(), Some("engine"));
    }

    #[test]
    fn property_becomes_attribute() {
        let record = parse(
            "class A:\n    @property\n    def speed(self) -> int:\n        return self._speed\n",
        );
        assert!(record.types[0].methods.is_empty());
        let attrs = &record.types[0].attributes;
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].kind, AttributeKind::Property);
        assert_eq!(attrs[0].declared_type.as_deref(), Some("int"));
    }

    #[test]
    fn nested_classes_are_qualified() {
        let record = parse("class Outer:\n    class Inner:\n        pass\n");
        let qualified: Vec<&str> = record.types.iter().map(|t| t.qualified.as_str()).collect();
        assert!(qualified.contains(&"Outer.Inner"));
        assert!(qualified.contains(&"Outer"));
    }

    #[test]
    fn docstring_is_parsed() {
        let record = parse(
            "def go(speed):\n    \"\"\"Go fast.\n\n    Args:\n        speed: how fast\n    \"\"\"\n    pass\n",
        );
        let doc = record.routines[0].doc.as_ref().unwrap();
        assert!(doc.text.contains("Go fast."));
        assert_eq!(doc.params.len(), 1);
        assert_eq!(doc.params[0].name, "speed");
    }
}
