//! JS/TS extraction used by the `lattice-jshelper` binary
//!
//! The helper process parses with tree-sitter and normalises straight into
//! the shared record schema; the front-end on the other side of the pipe
//! never sees language syntax. Kept in the library so the logic is
//! unit-testable without spawning a process.

use tree_sitter::{Node, Parser};

use lattice_core::model::{
    AttrOrigin, AttributeKind, CallSite, Decorator, DocBlock, Import, ImportShape, ImportedName,
    Language, LocalBinding, ModuleConstant, Parameter, Receiver, Span, TypeKind, Variadic,
    Visibility,
};

use crate::docparse;
use crate::extractor::{FrontEndError, count_lines};
use crate::jsproto::{Dialect, HelperRequest};
use crate::records::{AttributeRecord, FileRecord, RoutineRecord, TypeRecord, origin_rank};

pub fn extract(request: &HelperRequest) -> Result<FileRecord, FrontEndError> {
    let language: tree_sitter::Language = match request.dialect {
        Dialect::JavaScript | Dialect::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    };
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| FrontEndError::tokenize(format!("failed to load grammar: {e}")))?;
    let tree = parser
        .parse(&request.source, None)
        .ok_or_else(|| FrontEndError::parse("parser produced no tree"))?;
    if let Some(line) = crate::parser_pool::first_error_line(&tree.root_node()) {
        return Err(FrontEndError::parse(format!("syntax error near line {line}")));
    }

    let mut record = FileRecord {
        rel_path: request.rel_path.clone(),
        language: Some(match request.dialect {
            Dialect::JavaScript | Dialect::Jsx => Language::JavaScript,
            Dialect::TypeScript | Dialect::Tsx => Language::TypeScript,
        }),
        loc: count_lines(&request.source),
        ..FileRecord::default()
    };

    let extractor = Extractor {
        source: request.source.as_bytes(),
        detect_docstrings: request.detect_docstrings,
        detect_types: request.detect_types,
    };
    extractor.program(tree.root_node(), &mut record);
    Ok(record)
}

struct Extractor<'a> {
    source: &'a [u8],
    detect_docstrings: bool,
    detect_types: bool,
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

    fn program(&self, root: Node, record: &mut FileRecord) {
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_statement" => self.import(child, record),
                "export_statement" => {
                    // Re-export (`export … from './x'`) still depends on x.
                    if let Some(source) = child.child_by_field_name("source") {
                        record.imports.push(Import {
                            shape: ImportShape::Plain,
                            module: strip_quotes(&self.text(source)),
                            names: Vec::new(),
                            relative_depth: 0,
                            line: self.line(child),
                            resolved: None,
                        });
                        continue;
                    }
                    if let Some(declaration) = child.child_by_field_name("declaration") {
                        self.declaration(declaration, true, self.doc_for(child), record);
                    }
                }
                _ => self.declaration(child, false, self.doc_for(child), record),
            }
        }
    }

    fn declaration(&self, node: Node, exported: bool, doc: Option<DocBlock>, record: &mut FileRecord) {
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" => {
                self.class(node, exported, doc, record)
            }
            "function_declaration" | "generator_function_declaration" => {
                let mut routine = self.function_like(node, self.name_of(node), exported);
                routine.is_generator = node.kind() == "generator_function_declaration";
                routine.doc = doc;
                record.routines.push(routine);
            }
            "lexical_declaration" | "variable_declaration" => {
                self.variable_declaration(node, exported, doc, record)
            }
            "interface_declaration" => self.interface(node, exported, doc, record),
            "enum_declaration" => self.enum_decl(node, exported, doc, record),
            "type_alias_declaration" => {
                let name = self.name_of(node);
                if name.is_empty() {
                    return;
                }
                record.types.push(TypeRecord {
                    kind: TypeKind::Alias,
                    name: name.clone(),
                    qualified: name,
                    bases: Vec::new(),
                    interfaces: Vec::new(),
                    traits_used: Vec::new(),
                    methods: Vec::new(),
                    attributes: Vec::new(),
                    span: self.span(node),
                    doc,
                    visibility: top_level_visibility(exported),
                    is_abstract: false,
                    is_final: false,
                    decorators: Vec::new(),
                    best_effort: false,
                });
            }
            _ => {}
        }
    }

    fn name_of(&self, node: Node) -> String {
        node.child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default()
    }

    /// JSDoc block immediately preceding the statement.
    fn doc_for(&self, node: Node) -> Option<DocBlock> {
        if !self.detect_docstrings {
            return None;
        }
        let prev = node.prev_named_sibling()?;
        if prev.kind() != "comment" {
            return None;
        }
        let text = self.text(prev);
        text.starts_with("/**").then(|| docparse::parse_jsdoc(&text))
    }

    fn import(&self, node: Node, record: &mut FileRecord) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let module = strip_quotes(&self.text(source));
        let mut names = Vec::new();
        let mut shape = ImportShape::Plain;

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut inner = child.walk();
            for clause in child.named_children(&mut inner) {
                match clause.kind() {
                    "identifier" => {
                        shape = ImportShape::Named;
                        names.push(ImportedName {
                            name: "default".to_string(),
                            alias: Some(self.text(clause)),
                        });
                    }
                    "named_imports" => {
                        shape = ImportShape::Named;
                        let mut specs = clause.walk();
                        for spec in clause.named_children(&mut specs) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            names.push(ImportedName {
                                name: spec
                                    .child_by_field_name("name")
                                    .map(|n| self.text(n))
                                    .unwrap_or_default(),
                                alias: spec
                                    .child_by_field_name("alias")
                                    .map(|n| self.text(n)),
                            });
                        }
                    }
                    "namespace_import" => {
                        shape = ImportShape::Named;
                        names.push(ImportedName {
                            name: "*".to_string(),
                            alias: clause.named_child(0).map(|n| self.text(n)),
                        });
                    }
                    _ => {}
                }
            }
        }

        record.imports.push(Import {
            shape,
            module,
            names,
            relative_depth: 0,
            line: self.line(node),
            resolved: None,
        });
    }

    /// `const f = () => {}` routines and UPPER_CASE constants.
    fn variable_declaration(
        &self,
        node: Node,
        exported: bool,
        doc: Option<DocBlock>,
        record: &mut FileRecord,
    ) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name = self.name_of(declarator);
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };
            match value.kind() {
                "arrow_function" | "function_expression" | "function" | "generator_function" => {
                    let mut routine = self.function_like(value, name, exported);
                    routine.is_lambda = value.kind() == "arrow_function";
                    routine.is_generator = value.kind() == "generator_function";
                    routine.doc = doc.clone();
                    routine.span = self.span(declarator);
                    record.routines.push(routine);
                }
                _ => {
                    if is_constant_name(&name) {
                        record.constants.push(ModuleConstant {
                            name,
                            value: self.text(value),
                            line: self.line(declarator),
                        });
                    }
                }
            }
        }
    }

    fn class(&self, node: Node, exported: bool, doc: Option<DocBlock>, record: &mut FileRecord) {
        let name = self.name_of(node);
        if name.is_empty() {
            return;
        }

        let mut type_record = TypeRecord {
            kind: TypeKind::Class,
            name: name.clone(),
            qualified: name,
            bases: Vec::new(),
            interfaces: Vec::new(),
            traits_used: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            span: self.span(node),
            doc,
            visibility: top_level_visibility(exported),
            is_abstract: node.kind() == "abstract_class_declaration",
            is_final: false,
            decorators: self.decorators(node),
            best_effort: false,
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "class_heritage" {
                continue;
            }
            let mut found_clause = false;
            let mut inner = child.walk();
            for clause in child.named_children(&mut inner) {
                match clause.kind() {
                    "extends_clause" => {
                        found_clause = true;
                        let mut values = clause.walk();
                        for value in clause.named_children(&mut values) {
                            if value.kind() == "type_arguments" {
                                continue;
                            }
                            type_record.bases.push(self.text(value));
                        }
                    }
                    "implements_clause" => {
                        found_clause = true;
                        let mut values = clause.walk();
                        for value in clause.named_children(&mut values) {
                            type_record.interfaces.push(self.text(value));
                        }
                    }
                    _ => {}
                }
            }
            // The JS grammar puts the extended expression directly under
            // class_heritage.
            if !found_clause {
                let mut values = child.walk();
                for value in child.named_children(&mut values) {
                    type_record.bases.push(self.text(value));
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut members = body.walk();
            for member in body.named_children(&mut members) {
                match member.kind() {
                    "method_definition" => self.method(member, &mut type_record),
                    "abstract_method_signature" => {
                        let name = self.name_of(member);
                        let mut routine = self.function_like(member, name, true);
                        routine.is_abstract = true;
                        routine.doc = self.doc_for(member);
                        type_record.methods.push(routine);
                    }
                    "public_field_definition" | "field_definition" => {
                        self.field(member, &mut type_record)
                    }
                    _ => {}
                }
            }
        }

        record.types.push(type_record);
    }

    fn decorators(&self, node: Node) -> Vec<Decorator> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "decorator" {
                continue;
            }
            let Some(expr) = child.named_child(0) else {
                continue;
            };
            if expr.kind() == "call_expression" {
                out.push(Decorator {
                    name: expr
                        .child_by_field_name("function")
                        .map(|n| self.text(n))
                        .unwrap_or_default(),
                    args: expr.child_by_field_name("arguments").map(|n| self.text(n)),
                });
            } else {
                out.push(Decorator {
                    name: self.text(expr),
                    args: None,
                });
            }
        }
        out
    }

    fn method(&self, node: Node, type_record: &mut TypeRecord) {
        let name_node = node.child_by_field_name("name");
        let Some(name_node) = name_node else { return };
        let name = self.text(name_node).trim_matches('"').trim_matches('\'').to_string();

        let mut routine = self.function_like(node, name.clone(), true);
        routine.receiver = Receiver::Instance;
        routine.doc = self.doc_for(node);
        routine.decorators = self.decorators(node);

        let mut visibility = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static" => routine.is_static = true,
                "async" => routine.is_async = true,
                "*" => routine.is_generator = true,
                "accessibility_modifier" => {
                    visibility = Some(match self.text(child).as_str() {
                        "private" => Visibility::Private,
                        "protected" => Visibility::Protected,
                        _ => Visibility::Public,
                    });
                }
                "abstract" => routine.is_abstract = true,
                _ => {}
            }
        }
        routine.visibility = visibility.unwrap_or(member_visibility(&name));
        if name_node.kind() == "private_property_identifier" {
            routine.visibility = Visibility::Private;
        }

        if name == "constructor" {
            self.constructor_attributes(node, &routine, type_record);
        }
        type_record.methods.push(routine);
    }

    fn field(&self, node: Node, type_record: &mut TypeRecord) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node);
        // The constructor scan may have seen this field first.
        if let Some(existing) = type_record.attributes.iter_mut().find(|a| a.name == name) {
            if self.detect_types && existing.declared_type.is_none() {
                existing.declared_type = self.annotation(node);
            }
            return;
        }
        let mut attr = AttributeRecord::named(name.clone(), AttributeKind::Instance, self.line(node));
        if self.detect_types {
            attr.declared_type = self.annotation(node);
        }
        if let Some(value) = node.child_by_field_name("value") {
            attr.default_expr = Some(self.text(value));
            if value.kind() == "new_expression" {
                if let Some(ctor) = value.child_by_field_name("constructor") {
                    attr.origin = AttrOrigin::Constructed(self.text(ctor));
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static" => attr.is_static = true,
                "accessibility_modifier" => {
                    attr.visibility = match self.text(child).as_str() {
                        "private" => Visibility::Private,
                        "protected" => Visibility::Protected,
                        _ => Visibility::Public,
                    };
                }
                _ => {}
            }
        }
        if name_node.kind() == "private_property_identifier" {
            attr.visibility = Visibility::Private;
        } else if attr.visibility == Visibility::Public {
            attr.visibility = member_visibility(&name);
        }
        type_record.attributes.push(attr);
    }

    /// `this.x = …` inside the constructor body.
    fn constructor_attributes(
        &self,
        method: Node,
        routine: &RoutineRecord,
        type_record: &mut TypeRecord,
    ) {
        let Some(body) = method.child_by_field_name("body") else {
            return;
        };
        let param_names: Vec<&str> = routine.params.iter().map(|p| p.name.as_str()).collect();
        self.collect_this_assignments(body, &param_names, type_record);
    }

    fn collect_this_assignments(
        &self,
        node: Node,
        param_names: &[&str],
        type_record: &mut TypeRecord,
    ) {
        if node.kind() == "assignment_expression" {
            self.this_assignment(node, param_names, type_record);
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if matches!(child.kind(), "function_declaration" | "class_declaration") {
                continue;
            }
            self.collect_this_assignments(child, param_names, type_record);
        }
    }

    fn this_assignment(&self, node: Node, param_names: &[&str], type_record: &mut TypeRecord) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "member_expression" {
            return;
        }
        if !left
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "this")
        {
            return;
        }
        let Some(property) = left.child_by_field_name("property") else {
            return;
        };
        let name = self.text(property);

        let origin = node
            .child_by_field_name("right")
            .map(|right| match right.kind() {
                "new_expression" => right
                    .child_by_field_name("constructor")
                    .map(|c| AttrOrigin::Constructed(self.text(c)))
                    .unwrap_or(AttrOrigin::Other),
                "identifier" => {
                    let text = self.text(right);
                    if param_names.contains(&text.as_str()) {
                        AttrOrigin::Parameter(text)
                    } else {
                        AttrOrigin::Other
                    }
                }
                _ => AttrOrigin::Other,
            })
            .unwrap_or(AttrOrigin::Unknown);

        if let Some(existing) = type_record.attributes.iter_mut().find(|a| a.name == name) {
            if origin_rank(&origin) > origin_rank(&existing.origin) {
                existing.origin = origin;
            }
            return;
        }
        let mut attr = AttributeRecord::named(name.clone(), AttributeKind::Instance, self.line(node));
        attr.origin = origin;
        attr.visibility = member_visibility(&name);
        type_record.attributes.push(attr);
    }

    fn interface(&self, node: Node, exported: bool, doc: Option<DocBlock>, record: &mut FileRecord) {
        let name = self.name_of(node);
        if name.is_empty() {
            return;
        }

        let mut type_record = TypeRecord {
            kind: TypeKind::Interface,
            name: name.clone(),
            qualified: name,
            bases: Vec::new(),
            interfaces: Vec::new(),
            traits_used: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            span: self.span(node),
            doc,
            visibility: top_level_visibility(exported),
            is_abstract: true,
            is_final: false,
            decorators: Vec::new(),
            best_effort: false,
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind().contains("extends") {
                let mut inner = child.walk();
                for value in child.named_children(&mut inner) {
                    type_record.interfaces.push(self.text(value));
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut members = body.walk();
            for member in body.named_children(&mut members) {
                match member.kind() {
                    "property_signature" => {
                        let name = self.name_of(member);
                        let mut attr = AttributeRecord::named(
                            name,
                            AttributeKind::Instance,
                            self.line(member),
                        );
                        if self.detect_types {
                            attr.declared_type = self.annotation(member);
                        }
                        type_record.attributes.push(attr);
                    }
                    "method_signature" => {
                        let name = self.name_of(member);
                        let mut routine = self.function_like(member, name, true);
                        routine.is_abstract = true;
                        routine.receiver = Receiver::Instance;
                        type_record.methods.push(routine);
                    }
                    _ => {}
                }
            }
        }

        record.types.push(type_record);
    }

    fn enum_decl(&self, node: Node, exported: bool, doc: Option<DocBlock>, record: &mut FileRecord) {
        let name = self.name_of(node);
        if name.is_empty() {
            return;
        }
        let mut type_record = TypeRecord {
            kind: TypeKind::Enum,
            name: name.clone(),
            qualified: name,
            bases: Vec::new(),
            interfaces: Vec::new(),
            traits_used: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            span: self.span(node),
            doc,
            visibility: top_level_visibility(exported),
            is_abstract: false,
            is_final: false,
            decorators: Vec::new(),
            best_effort: false,
        };

        if let Some(body) = node.child_by_field_name("body") {
            let mut members = body.walk();
            for member in body.named_children(&mut members) {
                match member.kind() {
                    "property_identifier" => {
                        let mut attr = AttributeRecord::named(
                            self.text(member),
                            AttributeKind::Constant,
                            self.line(member),
                        );
                        attr.is_static = true;
                        type_record.attributes.push(attr);
                    }
                    "enum_assignment" => {
                        let name = self.name_of(member);
                        let mut attr = AttributeRecord::named(
                            name,
                            AttributeKind::Constant,
                            self.line(member),
                        );
                        attr.default_expr =
                            member.child_by_field_name("value").map(|n| self.text(n));
                        attr.is_static = true;
                        type_record.attributes.push(attr);
                    }
                    _ => {}
                }
            }
        }

        record.types.push(type_record);
    }

    fn function_like(&self, node: Node, name: String, exported: bool) -> RoutineRecord {
        let mut routine = RoutineRecord::named(name);
        routine.span = self.span(node);
        routine.visibility = top_level_visibility(exported);
        routine.is_async = {
            let mut cursor = node.walk();
            node.children(&mut cursor).any(|c| c.kind() == "async")
        };
        if self.detect_types {
            routine.return_annotation = node
                .child_by_field_name("return_type")
                .map(|n| annotation_text(&self.text(n)));
        }

        if let Some(parameters) = node.child_by_field_name("parameters") {
            routine.params = self.parameters(parameters);
        } else if let Some(single) = node.child_by_field_name("parameter") {
            routine.params = vec![Parameter {
                name: self.text(single),
                annotation: None,
                has_default: false,
                variadic: Variadic::No,
            }];
        }

        if let Some(body) = node.child_by_field_name("body") {
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
                "assignment_pattern" => {
                    let name = param
                        .child_by_field_name("left")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    out.push(Parameter {
                        name,
                        annotation: None,
                        has_default: true,
                        variadic: Variadic::No,
                    });
                }
                "rest_pattern" => out.push(Parameter {
                    name: param
                        .named_child(0)
                        .map(|n| self.text(n))
                        .unwrap_or_default(),
                    annotation: None,
                    has_default: false,
                    variadic: Variadic::Args,
                }),
                "required_parameter" | "optional_parameter" => {
                    let pattern = param
                        .child_by_field_name("pattern")
                        .or_else(|| param.named_child(0));
                    let (name, variadic) = match pattern {
                        Some(p) if p.kind() == "rest_pattern" => (
                            p.named_child(0).map(|n| self.text(n)).unwrap_or_default(),
                            Variadic::Args,
                        ),
                        Some(p) => (self.text(p), Variadic::No),
                        None => (String::new(), Variadic::No),
                    };
                    out.push(Parameter {
                        name,
                        annotation: self
                            .detect_types
                            .then(|| self.annotation(param))
                            .flatten(),
                        has_default: param.kind() == "optional_parameter"
                            || param.child_by_field_name("value").is_some(),
                        variadic,
                    });
                }
                _ => {}
            }
        }
        out
    }

    /// Type annotation attached to a parameter, field, or signature.
    fn annotation(&self, node: Node) -> Option<String> {
        if let Some(t) = node.child_by_field_name("type") {
            return Some(annotation_text(&self.text(t)));
        }
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "type_annotation");
        found.map(|t| annotation_text(&self.text(t)))
    }

    fn collect_calls(&self, node: Node, out: &mut Vec<CallSite>) {
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    match function.kind() {
                        "identifier" => out.push(CallSite {
                            callee: self.text(function),
                            receiver: None,
                            name: self.text(function),
                            line: self.line(node),
                        }),
                        "member_expression" => {
                            let receiver =
                                function.child_by_field_name("object").map(|n| self.text(n));
                            let name = function
                                .child_by_field_name("property")
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
            "new_expression" => {
                if let Some(ctor) = node.child_by_field_name("constructor") {
                    let text = self.text(ctor);
                    out.push(CallSite {
                        callee: format!("new {text}"),
                        receiver: None,
                        name: text.rsplit('.').next().unwrap_or(&text).to_string(),
                        line: self.line(node),
                    });
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if matches!(child.kind(), "function_declaration" | "class_declaration") {
                continue;
            }
            self.collect_calls(child, out);
        }
    }

    fn collect_locals(&self, node: Node, out: &mut Vec<LocalBinding>) {
        if node.kind() == "variable_declarator" {
            let name_node = node.child_by_field_name("name");
            if let Some(name_node) = name_node {
                if name_node.kind() == "identifier" {
                    let name = self.text(name_node);
                    let annotation = self.detect_types.then(|| self.annotation(node)).flatten();
                    let constructed = node.child_by_field_name("value").and_then(|value| {
                        if value.kind() != "new_expression" {
                            return None;
                        }
                        value
                            .child_by_field_name("constructor")
                            .map(|c| self.text(c))
                    });
                    match (annotation, constructed) {
                        (Some(type_text), _) => out.push(LocalBinding {
                            name,
                            type_text,
                            constructed: false,
                            line: self.line(node),
                        }),
                        (None, Some(type_text)) => out.push(LocalBinding {
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
            if matches!(child.kind(), "function_declaration" | "class_declaration") {
                continue;
            }
            self.collect_locals(child, out);
        }
    }
}

/// Serve the helper protocol over stdin/stdout: a hello frame, then one
/// response per request line. The process body of `lattice-jshelper`.
pub fn serve() {
    use std::io::{BufRead, Write};

    use crate::jsproto::{HelperHello, HelperResponse};

    fn write_frame<W: Write, T: serde::Serialize>(out: &mut W, frame: &T) -> std::io::Result<()> {
        let encoded = serde_json::to_string(frame).map_err(std::io::Error::other)?;
        writeln!(out, "{encoded}")?;
        out.flush()
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if write_frame(&mut out, &HelperHello::current()).is_err() {
        return;
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "stdin read failed, exiting");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<HelperRequest>(&line) {
            Ok(request) => {
                tracing::debug!(path = %request.rel_path, "parsing");
                match extract(&request) {
                    Ok(record) => HelperResponse::success(request.id, record),
                    Err(err) => HelperResponse::failure(request.id, err.stage, err.message),
                }
            }
            Err(err) => HelperResponse::failure(
                0,
                lattice_core::diagnostics::ParseStage::Tokenize,
                format!("request frame not understood: {err}"),
            ),
        };

        if write_frame(&mut out, &response).is_err() {
            break;
        }
    }
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

fn annotation_text(text: &str) -> String {
    text.trim_start_matches(':').trim().to_string()
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn top_level_visibility(exported: bool) -> Visibility {
    if exported {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

fn member_visibility(name: &str) -> Visibility {
    if name.starts_with('_') || name.starts_with('#') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(rel_path: &str, dialect: Dialect, source: &str) -> HelperRequest {
        HelperRequest {
            id: 1,
            rel_path: rel_path.to_string(),
            dialect,
            detect_docstrings: true,
            detect_types: true,
            source: source.to_string(),
        }
    }

    #[test]
    fn extracts_ts_class_with_heritage() {
        let record = extract(&request(
            "src/car.ts",
            Dialect::TypeScript,
            "export class Car extends Vehicle implements Drivable {\n  wheels: number = 4;\n  drive(speed: number): boolean { return true; }\n}\n",
        ))
        .unwrap();
        let car = &record.types[0];
        assert_eq!(car.name, "Car");
        assert_eq!(car.bases, vec!["Vehicle"]);
        assert_eq!(car.interfaces, vec!["Drivable"]);
        assert_eq!(car.visibility, Visibility::Public);

        assert_eq!(car.attributes[0].name, "wheels");
        assert_eq!(car.attributes[0].declared_type.as_deref(), Some("number"));

        let drive = &car.methods[0];
        assert_eq!(drive.params[0].name, "speed");
        assert_eq!(drive.params[0].annotation.as_deref(), Some("number"));
        assert_eq!(drive.return_annotation.as_deref(), Some("boolean"));
    }

    #[test]
    fn extracts_js_class_and_constructor_origins() {
        let record = extract(&request(
            "src/car.js",
            Dialect::JavaScript,
            "class Car extends Vehicle {\n  constructor(driver) {\n    super(driver);\n    this.engine = new Engine();\n    this.driver = driver;\n  }\n}\n",
        ))
        .unwrap();
        let car = &record.types[0];
        assert_eq!(car.bases, vec!["Vehicle"]);
        let engine = car.attributes.iter().find(|a| a.name == "engine").unwrap();
        assert_eq!(engine.origin, AttrOrigin::Constructed("Engine".to_string()));
        let driver = car.attributes.iter().find(|a| a.name == "driver").unwrap();
        assert_eq!(driver.origin, AttrOrigin::Parameter("driver".to_string()));
    }

    #[test]
    fn extracts_interfaces_enums_aliases() {
        let record = extract(&request(
            "src/types.ts",
            Dialect::TypeScript,
            "export interface Drivable extends Movable {\n  speed: number;\n  drive(to: string): void;\n}\nexport enum Gear { Park, Drive = 2 }\nexport type Row = string[];\n",
        ))
        .unwrap();
        assert_eq!(record.types.len(), 3);
        let drivable = &record.types[0];
        assert_eq!(drivable.kind, TypeKind::Interface);
        assert_eq!(drivable.interfaces, vec!["Movable"]);
        assert_eq!(drivable.attributes[0].name, "speed");
        assert!(drivable.methods[0].is_abstract);

        let gear = &record.types[1];
        assert_eq!(gear.kind, TypeKind::Enum);
        assert_eq!(gear.attributes.len(), 2);
        assert_eq!(gear.attributes[1].default_expr.as_deref(), Some("2"));

        assert_eq!(record.types[2].kind, TypeKind::Alias);
    }

    #[test]
    fn arrow_functions_and_constants() {
        let record = extract(&request(
            "src/util.ts",
            Dialect::TypeScript,
            "export const MAX_RETRIES = 3;\nexport const retry = async (fn: Task) => fn();\nfunction helper() { return 1; }\n",
        ))
        .unwrap();
        assert_eq!(record.constants.len(), 1);
        assert_eq!(record.constants[0].name, "MAX_RETRIES");

        let retry = record.routines.iter().find(|r| r.name == "retry").unwrap();
        assert!(retry.is_lambda);
        assert!(retry.is_async);
        assert_eq!(retry.visibility, Visibility::Public);

        let helper = record.routines.iter().find(|r| r.name == "helper").unwrap();
        assert_eq!(helper.visibility, Visibility::Private);
    }

    #[test]
    fn imports_record_bindings() {
        let record = extract(&request(
            "src/app.ts",
            Dialect::TypeScript,
            "import Engine from './engine';\nimport { Car, Driver as Pilot } from './car';\nimport * as util from './util';\nimport './side-effect';\n",
        ))
        .unwrap();
        assert_eq!(record.imports.len(), 4);
        assert_eq!(record.imports[0].module, "./engine");
        assert_eq!(record.imports[0].names[0].alias.as_deref(), Some("Engine"));
        assert_eq!(record.imports[1].names[0].name, "Car");
        assert_eq!(record.imports[1].names[1].alias.as_deref(), Some("Pilot"));
        assert_eq!(record.imports[2].names[0].name, "*");
        assert_eq!(record.imports[3].shape, ImportShape::Plain);
    }

    #[test]
    fn call_sites_and_locals() {
        let record = extract(&request(
            "src/go.js",
            Dialect::JavaScript,
            "export function go() {\n  const engine = new Engine();\n  engine.start();\n  helper();\n}\n",
        ))
        .unwrap();
        let go = &record.routines[0];
        assert!(go.locals.iter().any(|l| l.name == "engine" && l.constructed));
        let names: Vec<&str> = go.call_sites.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"start"));
        assert!(names.contains(&"helper"));
        assert!(names.contains(&"Engine"));
    }

    #[test]
    fn jsdoc_attaches_to_exported_declarations() {
        let record = extract(&request(
            "src/doc.ts",
            Dialect::TypeScript,
            "/**\n * Render a row.\n * @param {Row} row - the row\n */\nexport function render(row) {}\n",
        ))
        .unwrap();
        let doc = record.routines[0].doc.as_ref().unwrap();
        assert_eq!(doc.params[0].name, "row");
    }
}
