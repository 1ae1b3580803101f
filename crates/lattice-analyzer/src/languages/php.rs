//! PHP front-end
//!
//! Parses with tree-sitter-php when the `php-ast` feature is compiled in;
//! otherwise (or when forced by configuration) the regex fallback reader in
//! [`super::php_fallback`] produces a strict subset marked best-effort.

use lattice_core::model::Language;

use crate::extractor::{ExtractOptions, FrontEnd, FrontEndError, SourceFile};
use crate::parser_pool::ParserPool;
use crate::records::FileRecord;

pub struct PhpFrontEnd {
    #[cfg_attr(not(feature = "php-ast"), allow(dead_code))]
    pool: Option<ParserPool>,
    force_fallback: bool,
}

impl PhpFrontEnd {
    pub fn new(pool: Option<ParserPool>, force_fallback: bool) -> Self {
        Self {
            pool,
            force_fallback,
        }
    }
}

impl FrontEnd for PhpFrontEnd {
    fn name(&self) -> &'static str {
        "php"
    }

    fn parse_file(
        &self,
        file: &SourceFile,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<FileRecord, FrontEndError> {
        debug_assert_eq!(file.language, Language::Php);
        #[cfg(feature = "php-ast")]
        if !self.force_fallback {
            if let Some(pool) = &self.pool {
                return ast::parse(pool, file, source, options);
            }
        }
        super::php_fallback::parse(file, source, options)
    }
}

#[cfg(feature = "php-ast")]
mod ast {
    use tree_sitter::Node;

    use lattice_core::model::{
        AttrOrigin, AttributeKind, CallSite, DocBlock, Import, ImportShape, ImportedName,
        LocalBinding, Parameter, Receiver, Span, TypeKind, Variadic, Visibility,
    };

    use crate::docparse;
    use crate::extractor::{ExtractOptions, FrontEndError, SourceFile, count_lines};
    use crate::parser_pool::{Grammar, ParserPool};
    use crate::records::{AttributeRecord, FileRecord, RoutineRecord, TypeRecord};

    pub fn parse(
        pool: &ParserPool,
        file: &SourceFile,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<FileRecord, FrontEndError> {
        let tree = pool
            .parse_blocking(Grammar::Php, source)
            .map_err(|e| FrontEndError::parse(e.to_string()))?;
        let root = tree.root_node();
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
        extractor.scope(root, &mut record);
        Ok(record)
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

        /// Top-level statements, including bodies of braced namespaces.
        fn scope(&self, node: Node, record: &mut FileRecord) {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "namespace_definition" => {
                        if let Some(name) = child.child_by_field_name("name") {
                            record.namespace = self
                                .text(name)
                                .split('\\')
                                .map(|s| s.to_string())
                                .collect();
                        }
                        if let Some(body) = child.child_by_field_name("body") {
                            self.scope(body, record);
                        }
                    }
                    "namespace_use_declaration" => self.use_imports(child, record),
                    "class_declaration" => self.class_like(child, TypeKind::Class, record),
                    "interface_declaration" => {
                        self.class_like(child, TypeKind::Interface, record)
                    }
                    "trait_declaration" => self.class_like(child, TypeKind::Trait, record),
                    "enum_declaration" => self.class_like(child, TypeKind::Enum, record),
                    "function_definition" => {
                        let routine = self.routine(child, Visibility::Public, false);
                        record.routines.push(routine);
                    }
                    "const_declaration" => self.module_constants(child, record),
                    _ => {}
                }
            }
        }

        /// `use A\B\C;`, `use A\B as C;`, and grouped forms.
        fn use_imports(&self, node: Node, record: &mut FileRecord) {
            let mut cursor = node.walk();
            for clause in node.named_children(&mut cursor) {
                match clause.kind() {
                    "namespace_use_clause" => {
                        let mut path = String::new();
                        let mut alias = None;
                        let mut inner = clause.walk();
                        for part in clause.named_children(&mut inner) {
                            match part.kind() {
                                "name" | "qualified_name" => path = self.text(part),
                                "namespace_aliasing_clause" => {
                                    alias = part.named_child(0).map(|n| self.text(n));
                                }
                                _ => {}
                            }
                        }
                        if path.is_empty() {
                            continue;
                        }
                        let short = path.rsplit('\\').next().unwrap_or(&path).to_string();
                        record.imports.push(Import {
                            shape: ImportShape::Named,
                            module: path,
                            names: vec![ImportedName { name: short, alias }],
                            relative_depth: 0,
                            line: self.line(node),
                            resolved: None,
                        });
                    }
                    "namespace_use_group" => {
                        // `use App\{A, B};` has the prefix as a sibling name.
                        let prefix = node
                            .named_children(&mut node.walk())
                            .find(|n| {
                                matches!(n.kind(), "name" | "qualified_name" | "namespace_name")
                            })
                            .map(|n| self.text(n))
                            .unwrap_or_default();
                        let mut inner = clause.walk();
                        for entry in clause.named_children(&mut inner) {
                            if entry.kind() != "namespace_use_group_clause"
                                && entry.kind() != "namespace_use_clause"
                            {
                                continue;
                            }
                            let name = entry
                                .named_child(0)
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            if name.is_empty() {
                                continue;
                            }
                            let full = format!("{prefix}\\{name}");
                            let short = name.rsplit('\\').next().unwrap_or(&name).to_string();
                            record.imports.push(Import {
                                shape: ImportShape::Named,
                                module: full,
                                names: vec![ImportedName {
                                    name: short,
                                    alias: None,
                                }],
                                relative_depth: 0,
                                line: self.line(node),
                                resolved: None,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        fn module_constants(&self, node: Node, record: &mut FileRecord) {
            let mut cursor = node.walk();
            for element in node.named_children(&mut cursor) {
                if element.kind() != "const_element" {
                    continue;
                }
                let name = element
                    .named_child(0)
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let value = element
                    .named_child(element.named_child_count().saturating_sub(1))
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                record.constants.push(lattice_core::model::ModuleConstant {
                    name,
                    value,
                    line: self.line(element),
                });
            }
        }

        fn class_like(&self, node: Node, kind: TypeKind, record: &mut FileRecord) {
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = self.text(name_node);

            let mut type_record = TypeRecord {
                kind,
                name: name.clone(),
                qualified: name.clone(),
                bases: Vec::new(),
                interfaces: Vec::new(),
                traits_used: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
                span: self.span(node),
                doc: self.doc_comment(node),
                visibility: Visibility::Public,
                is_abstract: false,
                is_final: false,
                decorators: Vec::new(),
                best_effort: false,
            };

            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "abstract_modifier" => type_record.is_abstract = true,
                    "final_modifier" => type_record.is_final = true,
                    "base_clause" => {
                        let mut inner = child.walk();
                        for base in child.named_children(&mut inner) {
                            if matches!(base.kind(), "name" | "qualified_name") {
                                type_record.bases.push(self.text(base));
                            }
                        }
                    }
                    "class_interface_clause" => {
                        let mut inner = child.walk();
                        for interface in child.named_children(&mut inner) {
                            if matches!(interface.kind(), "name" | "qualified_name") {
                                type_record.interfaces.push(self.text(interface));
                            }
                        }
                    }
                    _ => {}
                }
            }

            // Interfaces extend interfaces; keep those on the interface list.
            if kind == TypeKind::Interface && !type_record.bases.is_empty() {
                let bases = std::mem::take(&mut type_record.bases);
                type_record.interfaces.extend(bases);
            }

            if let Some(body) = node.child_by_field_name("body") {
                self.class_body(body, &mut type_record);
            }

            record.types.push(type_record);
        }

        fn class_body(&self, body: Node, type_record: &mut TypeRecord) {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "method_declaration" => {
                        let (visibility, is_static, is_abstract) = self.member_modifiers(member);
                        let mut routine = self.routine(member, visibility, true);
                        routine.is_static = is_static;
                        routine.is_abstract = is_abstract || member.child_by_field_name("body").is_none();
                        if routine.name == "__construct" {
                            self.constructor_attributes(member, &routine, type_record);
                        }
                        type_record.methods.push(routine);
                    }
                    "property_declaration" => self.property(member, type_record),
                    "const_declaration" => {
                        let (visibility, _, _) = self.member_modifiers(member);
                        let mut inner = member.walk();
                        for element in member.named_children(&mut inner) {
                            if element.kind() != "const_element" {
                                continue;
                            }
                            let name = element
                                .named_child(0)
                                .map(|n| self.text(n))
                                .unwrap_or_default();
                            let mut attr = AttributeRecord::named(
                                name,
                                AttributeKind::Constant,
                                self.line(element),
                            );
                            attr.default_expr = element
                                .named_child(element.named_child_count().saturating_sub(1))
                                .map(|n| self.text(n));
                            attr.visibility = visibility;
                            attr.is_static = true;
                            type_record.attributes.push(attr);
                        }
                    }
                    "use_declaration" => {
                        let mut inner = member.walk();
                        for used in member.named_children(&mut inner) {
                            if matches!(used.kind(), "name" | "qualified_name") {
                                type_record.traits_used.push(self.text(used));
                            }
                        }
                    }
                    "enum_case" => {
                        let name = member
                            .child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or_default();
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

        fn member_modifiers(&self, node: Node) -> (Visibility, bool, bool) {
            let mut visibility = Visibility::Public;
            let mut is_static = false;
            let mut is_abstract = false;
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                match child.kind() {
                    "visibility_modifier" => {
                        visibility = match self.text(child).as_str() {
                            "private" => Visibility::Private,
                            "protected" => Visibility::Protected,
                            _ => Visibility::Public,
                        }
                    }
                    "static_modifier" => is_static = true,
                    "abstract_modifier" => is_abstract = true,
                    _ => {}
                }
            }
            (visibility, is_static, is_abstract)
        }

        fn property(&self, node: Node, type_record: &mut TypeRecord) {
            let (visibility, is_static, _) = self.member_modifiers(node);
            let declared_type = if self.options.detect_types {
                node.child_by_field_name("type").map(|n| self.text(n))
            } else {
                None
            };
            let mut cursor = node.walk();
            for element in node.named_children(&mut cursor) {
                if element.kind() != "property_element" {
                    continue;
                }
                let name = element
                    .named_child(0)
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                let name = name.trim_start_matches('$').to_string();
                let default_expr = if element.named_child_count() > 1 {
                    element
                        .named_child(element.named_child_count() - 1)
                        .map(|n| self.text(n))
                } else {
                    None
                };
                // The constructor scan may have seen the field first.
                if let Some(existing) =
                    type_record.attributes.iter_mut().find(|a| a.name == name)
                {
                    existing.declared_type = declared_type.clone();
                    existing.visibility = visibility;
                    existing.is_static = is_static;
                    existing.default_expr = default_expr;
                    continue;
                }
                let mut attr =
                    AttributeRecord::named(name, AttributeKind::Instance, self.line(element));
                attr.declared_type = declared_type.clone();
                attr.visibility = visibility;
                attr.is_static = is_static;
                attr.default_expr = default_expr;
                type_record.attributes.push(attr);
            }
        }

        /// `$this->x = …` inside `__construct`, plus promoted parameters.
        fn constructor_attributes(
            &self,
            method: Node,
            routine: &RoutineRecord,
            type_record: &mut TypeRecord,
        ) {
            // Promoted constructor parameters declare properties.
            if let Some(parameters) = method.child_by_field_name("parameters") {
                let mut cursor = parameters.walk();
                for param in parameters.named_children(&mut cursor) {
                    if param.kind() != "property_promotion_parameter" {
                        continue;
                    }
                    let name = param
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default()
                        .trim_start_matches('$')
                        .to_string();
                    let mut attr =
                        AttributeRecord::named(name.clone(), AttributeKind::Instance, self.line(param));
                    attr.declared_type = param.child_by_field_name("type").map(|n| self.text(n));
                    attr.origin = AttrOrigin::Parameter(name);
                    type_record.attributes.push(attr);
                }
            }

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
                if matches!(child.kind(), "anonymous_function" | "arrow_function") {
                    continue;
                }
                self.collect_this_assignments(child, param_names, type_record);
            }
        }

        fn this_assignment(&self, node: Node, param_names: &[&str], type_record: &mut TypeRecord) {
            let Some(left) = node.child_by_field_name("left") else {
                return;
            };
            if left.kind() != "member_access_expression" {
                return;
            }
            if !left
                .child_by_field_name("object")
                .is_some_and(|o| self.text(o) == "$this")
            {
                return;
            }
            let Some(name_node) = left.child_by_field_name("name") else {
                return;
            };
            let name = self.text(name_node);

            let origin = node
                .child_by_field_name("right")
                .map(|right| match right.kind() {
                    "object_creation_expression" => {
                        match self.creation_class(right) {
                            Some(class) => AttrOrigin::Constructed(class),
                            None => AttrOrigin::Other,
                        }
                    }
                    "variable_name" => {
                        let text = self.text(right);
                        let bare = text.trim_start_matches('$');
                        if param_names.contains(&bare) {
                            AttrOrigin::Parameter(bare.to_string())
                        } else {
                            AttrOrigin::Other
                        }
                    }
                    _ => AttrOrigin::Other,
                })
                .unwrap_or(AttrOrigin::Unknown);

            if let Some(existing) = type_record.attributes.iter_mut().find(|a| a.name == name) {
                if crate::records::origin_rank(&origin)
                    > crate::records::origin_rank(&existing.origin)
                {
                    existing.origin = origin;
                }
                return;
            }
            let mut attr = AttributeRecord::named(name, AttributeKind::Instance, self.line(node));
            attr.origin = origin;
            type_record.attributes.push(attr);
        }

        fn creation_class(&self, node: Node) -> Option<String> {
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .find(|n| matches!(n.kind(), "name" | "qualified_name"))
                .map(|n| self.text(n))
        }

        fn routine(&self, node: Node, visibility: Visibility, in_class: bool) -> RoutineRecord {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.text(n))
                .unwrap_or_default();

            let mut routine = RoutineRecord::named(name);
            routine.span = self.span(node);
            routine.visibility = visibility;
            routine.receiver = if in_class {
                Receiver::Instance
            } else {
                Receiver::None
            };
            routine.doc = self.doc_comment(node);
            if self.options.detect_types {
                routine.return_annotation =
                    node.child_by_field_name("return_type").map(|n| self.text(n));
            }
            if let Some(parameters) = node.child_by_field_name("parameters") {
                routine.params = self.parameters(parameters);
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
                    "simple_parameter" | "property_promotion_parameter" => {
                        let name = param
                            .child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or_default()
                            .trim_start_matches('$')
                            .to_string();
                        out.push(Parameter {
                            name,
                            annotation: self
                                .options
                                .detect_types
                                .then(|| param.child_by_field_name("type").map(|n| self.text(n)))
                                .flatten(),
                            has_default: param.child_by_field_name("default_value").is_some(),
                            variadic: Variadic::No,
                        });
                    }
                    "variadic_parameter" => {
                        let name = param
                            .child_by_field_name("name")
                            .map(|n| self.text(n))
                            .unwrap_or_else(|| self.text(param))
                            .trim_start_matches('$')
                            .to_string();
                        out.push(Parameter {
                            name,
                            annotation: self
                                .options
                                .detect_types
                                .then(|| param.child_by_field_name("type").map(|n| self.text(n)))
                                .flatten(),
                            has_default: false,
                            variadic: Variadic::Args,
                        });
                    }
                    _ => {}
                }
            }
            out
        }

        fn collect_calls(&self, node: Node, out: &mut Vec<CallSite>) {
            match node.kind() {
                "function_call_expression" => {
                    if let Some(function) = node.child_by_field_name("function") {
                        if matches!(function.kind(), "name" | "qualified_name") {
                            let text = self.text(function);
                            let name =
                                text.rsplit('\\').next().unwrap_or(&text).to_string();
                            out.push(CallSite {
                                callee: text,
                                receiver: None,
                                name,
                                line: self.line(node),
                            });
                        }
                    }
                }
                "member_call_expression" => {
                    let receiver = node.child_by_field_name("object").map(|n| self.text(n));
                    let name = node
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let callee = match &receiver {
                        Some(r) => format!("{r}->{name}"),
                        None => name.clone(),
                    };
                    out.push(CallSite {
                        callee,
                        receiver,
                        name,
                        line: self.line(node),
                    });
                }
                "scoped_call_expression" => {
                    let receiver = node.child_by_field_name("scope").map(|n| self.text(n));
                    let name = node
                        .child_by_field_name("name")
                        .map(|n| self.text(n))
                        .unwrap_or_default();
                    let callee = match &receiver {
                        Some(r) => format!("{r}::{name}"),
                        None => name.clone(),
                    };
                    out.push(CallSite {
                        callee,
                        receiver,
                        name,
                        line: self.line(node),
                    });
                }
                "object_creation_expression" => {
                    if let Some(class) = self.creation_class(node) {
                        out.push(CallSite {
                            callee: format!("new {class}"),
                            receiver: None,
                            name: class.rsplit('\\').next().unwrap_or(&class).to_string(),
                            line: self.line(node),
                        });
                    }
                }
                _ => {}
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if matches!(child.kind(), "anonymous_function" | "arrow_function") {
                    continue;
                }
                self.collect_calls(child, out);
            }
        }

        fn collect_locals(&self, node: Node, out: &mut Vec<LocalBinding>) {
            if node.kind() == "assignment_expression" {
                let left = node.child_by_field_name("left");
                let right = node.child_by_field_name("right");
                if let (Some(left), Some(right)) = (left, right) {
                    if left.kind() == "variable_name"
                        && right.kind() == "object_creation_expression"
                    {
                        if let Some(class) = self.creation_class(right) {
                            out.push(LocalBinding {
                                name: self.text(left),
                                type_text: class,
                                constructed: true,
                                line: self.line(node),
                            });
                        }
                    }
                }
            }
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if matches!(child.kind(), "anonymous_function" | "arrow_function") {
                    continue;
                }
                self.collect_locals(child, out);
            }
        }

        /// The doc-block comment immediately preceding a declaration.
        fn doc_comment(&self, node: Node) -> Option<DocBlock> {
            if !self.options.detect_docstrings {
                return None;
            }
            let mut prev = node.prev_named_sibling();
            while let Some(p) = prev {
                match p.kind() {
                    "comment" => {
                        let text = self.text(p);
                        if text.starts_with("/**") {
                            return Some(docparse::parse_phpdoc(&text));
                        }
                        return None;
                    }
                    "attribute_list" => prev = p.prev_named_sibling(),
                    _ => return None,
                }
            }
            None
        }
    }
}

#[cfg(all(test, feature = "php-ast"))]
mod tests {
    use super::*;
    use lattice_core::model::{AttrOrigin, AttributeKind, TypeKind, Visibility};
    use std::path::PathBuf;

    fn parse(source: &str) -> FileRecord {
        let front_end = PhpFrontEnd::new(Some(ParserPool::new(1)), false);
        let file = SourceFile {
            abs_path: PathBuf::from("/project/Car.php"),
            rel_path: "Car.php".to_string(),
            language: Language::Php,
        };
        let options = ExtractOptions {
            detect_docstrings: true,
            detect_types: true,
        };
        front_end.parse_file(&file, source, &options).unwrap()
    }

    #[test]
    fn extracts_namespace_and_uses() {
        let record = parse(
            "<?php\nnamespace App\\Models;\n\nuse App\\Contracts\\Engine;\n\nclass Car {}\n",
        );
        assert_eq!(record.namespace, vec!["App", "Models"]);
        assert_eq!(record.imports.len(), 1);
        assert_eq!(record.imports[0].module, "App\\Contracts\\Engine");
        assert_eq!(record.imports[0].names[0].name, "Engine");
        assert_eq!(record.types[0].name, "Car");
        assert!(!record.types[0].best_effort);
    }

    #[test]
    fn extracts_inheritance_and_traits() {
        let record = parse(
            "<?php\nclass Car extends Vehicle implements Drivable {\n    use Honks;\n}\ninterface Drivable extends Movable {}\ntrait Honks {}\n",
        );
        let car = &record.types[0];
        assert_eq!(car.bases, vec!["Vehicle"]);
        assert_eq!(car.interfaces, vec!["Drivable"]);
        assert_eq!(car.traits_used, vec!["Honks"]);

        let drivable = &record.types[1];
        assert_eq!(drivable.kind, TypeKind::Interface);
        assert_eq!(drivable.interfaces, vec!["Movable"]);
        assert!(drivable.bases.is_empty());

        assert_eq!(record.types[2].kind, TypeKind::Trait);
    }

    #[test]
    fn member_modifiers_and_types() {
        let record = parse(
            "<?php\nclass Car {\n    private Engine $engine;\n    public const WHEELS = 4;\n    protected static function boot(): void {}\n}\n",
        );
        let car = &record.types[0];
        assert_eq!(car.attributes.len(), 2);
        assert_eq!(car.attributes[0].name, "engine");
        assert_eq!(car.attributes[0].declared_type.as_deref(), Some("Engine"));
        assert_eq!(car.attributes[0].visibility, Visibility::Private);
        assert_eq!(car.attributes[1].kind, AttributeKind::Constant);
        assert_eq!(car.attributes[1].default_expr.as_deref(), Some("4"));

        let boot = &car.methods[0];
        assert_eq!(boot.visibility, Visibility::Protected);
        assert!(boot.is_static);
        assert_eq!(boot.return_annotation.as_deref(), Some("void"));
    }

    #[test]
    fn constructor_origins() {
        let record = parse(
            "<?php\nclass Car {\n    public function __construct(Driver $driver) {\n        $this->engine = new Engine();\n        $this->driver = $driver;\n    }\n}\n",
        );
        let attrs = &record.types[0].attributes;
        let engine = attrs.iter().find(|a| a.name == "engine").unwrap();
        assert_eq!(engine.origin, AttrOrigin::Constructed("Engine".to_string()));
        let driver = attrs.iter().find(|a| a.name == "driver").unwrap();
        assert_eq!(driver.origin, AttrOrigin::Parameter("driver".to_string()));
    }

    #[test]
    fn doc_blocks_attach() {
        let record = parse(
            "<?php\nclass Car {\n    /**\n     * Start the engine.\n     * @param int $retries\n     * @return bool\n     */\n    public function start(int $retries): bool { return true; }\n}\n",
        );
        let start = &record.types[0].methods[0];
        let doc = start.doc.as_ref().unwrap();
        assert_eq!(doc.params.len(), 1);
        assert_eq!(doc.params[0].name, "retries");
        assert_eq!(doc.returns.as_deref(), Some("bool"));
    }

    #[test]
    fn collects_member_calls() {
        let record = parse(
            "<?php\nclass Car {\n    public function drive() {\n        $this->engine->warm();\n        $this->start();\n        helper();\n    }\n}\n",
        );
        let drive = &record.types[0].methods[0];
        let names: Vec<&str> = drive.call_sites.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"warm"));
        assert!(names.contains(&"start"));
        assert!(names.contains(&"helper"));
        let start = drive.call_sites.iter().find(|c| c.name == "start").unwrap();
        assert_eq!(start.receiver.as_deref(), Some("$this"));
    }
}
