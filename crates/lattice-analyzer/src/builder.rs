//! Model builder — merges per-file records into the semantic model
//!
//! Four passes over the path-sorted records: namespace assembly, identifier
//! assignment, import binding, and reference sealing. Resolution failure is
//! never fatal; unresolved references bind to External so the downstream
//! graph stays consistent.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use lattice_core::diagnostics::Diagnostic;
use lattice_core::error::AnalysisError;
use lattice_core::graph::{Provenance, RelationEdge, RelationGraph, RelationKind};
use lattice_core::model::{
    AttrOrigin, Attribute, EntityId, EntityKind, Import, ImportShape, Language, Module, Owner,
    Routine, RoutineKind, SemanticModel, TypeDecl, TypeRef, Visibility,
};

use crate::builtins::is_builtin;
use crate::records::{AttributeRecord, FileRecord, RoutineRecord, TypeRecord};
use crate::typeexpr::parse_type_expr;

/// What a locally-visible name stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Type(EntityId),
    Routine(EntityId),
    Module(EntityId),
}

/// Name-resolution state shared with the relationship detector and the
/// flow analyzer after the build completes.
/// Resolution never crosses language boundaries; JS and TS count as one
/// family since they import each other freely.
fn language_family(language: Language) -> u8 {
    match language {
        Language::Python => 0,
        Language::Php => 1,
        Language::JavaScript | Language::TypeScript => 2,
    }
}

#[derive(Debug, Default)]
pub struct Resolver {
    /// Normalised fully-qualified type path → id.
    type_keys: HashMap<String, EntityId>,
    /// Simple type name → all ids carrying it.
    simple_types: HashMap<String, Vec<EntityId>>,
    /// Module → its type-key prefix (dotted module path, or PHP namespace).
    module_prefix: HashMap<EntityId, String>,
    /// Module → (in-module qualified, simple name, id) per declared type.
    module_types: HashMap<EntityId, Vec<(String, String, EntityId)>>,
    /// Module → (name, id) per module-level routine.
    module_routines: HashMap<EntityId, Vec<(String, EntityId)>>,
    /// Module → local name → binding, from resolved imports.
    bindings: HashMap<EntityId, HashMap<String, Binding>>,
    /// Language per module and per type, for the family fence.
    module_language: HashMap<EntityId, Language>,
    type_language: HashMap<EntityId, Language>,
}

impl Resolver {
    /// Resolve a textual type reference against (a) the file's imports,
    /// (b) the current namespace, (c) the project-wide tree. `None` means
    /// the reference leaves the project.
    pub fn resolve_type(&self, module: &EntityId, text: &str) -> Option<EntityId> {
        let key = normalize_path(text);
        if key.is_empty() {
            return None;
        }
        let segments: Vec<&str> = key.split('.').collect();
        let family = self.module_language.get(module).map(|l| language_family(*l));

        if let Some(bindings) = self.bindings.get(module) {
            if segments.len() == 1 {
                if let Some(Binding::Type(id)) = bindings.get(segments[0]) {
                    return Some(id.clone());
                }
            } else if let Some(Binding::Module(mid)) = bindings.get(segments[0]) {
                if let Some(prefix) = self.module_prefix.get(mid) {
                    let rebuilt = join_key(prefix, &segments[1..].join("."));
                    if let Some(id) = self.type_keys.get(&rebuilt) {
                        return Some(id.clone());
                    }
                }
            }
        }

        if let Some(types) = self.module_types.get(module) {
            if let Some((_, _, id)) = types.iter().find(|(q, n, _)| q == &key || n == &key) {
                return Some(id.clone());
            }
        }
        if let Some(prefix) = self.module_prefix.get(module) {
            if !prefix.is_empty() {
                if let Some(id) = self.type_keys.get(&join_key(prefix, &key)) {
                    if self.same_family(family, id) {
                        return Some(id.clone());
                    }
                }
            }
        }

        if let Some(id) = self.type_keys.get(&key) {
            if self.same_family(family, id) {
                return Some(id.clone());
            }
        }
        if segments.len() == 1 {
            if let Some(candidates) = self.simple_types.get(segments[0]) {
                let distinct: HashSet<&EntityId> = candidates
                    .iter()
                    .filter(|id| self.same_family(family, id))
                    .collect();
                if distinct.len() == 1 {
                    return distinct.into_iter().next().cloned();
                }
            }
        }
        None
    }

    fn same_family(&self, family: Option<u8>, type_id: &EntityId) -> bool {
        match (family, self.type_language.get(type_id)) {
            (Some(a), Some(b)) => a == language_family(*b),
            _ => true,
        }
    }

    /// Language of a module, for the cross-language fence in the binders.
    fn language_of_module(&self, module: &EntityId) -> Option<Language> {
        self.module_language.get(module).copied()
    }

    /// Import binding for a bare name in a module.
    pub fn binding(&self, module: &EntityId, name: &str) -> Option<&Binding> {
        self.bindings.get(module)?.get(name)
    }

    /// Module-level routine by name.
    pub fn module_routine(&self, module: &EntityId, name: &str) -> Option<EntityId> {
        self.module_routines
            .get(module)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone())
    }
}

pub struct BuildOutput {
    pub model: SemanticModel,
    pub resolver: Resolver,
}

/// Per-record derived naming facts.
struct ModuleInfo {
    id: EntityId,
    language: Language,
    /// Key prefix for the module's types.
    prefix: String,
    /// Python dotted path (`m.a`, package name for `__init__`).
    dotted: String,
    /// Directory components of the file.
    dirs: Vec<String>,
}

pub fn build(
    all_records: &[FileRecord],
    graph: &mut RelationGraph,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<BuildOutput, AnalysisError> {
    let mut model = SemanticModel::default();
    let mut resolver = Resolver::default();
    let mut id_owners: HashMap<EntityId, String> = HashMap::new();

    // Records without a language tag never leave a front-end; guard anyway
    // so the info/record pairing below stays aligned.
    let records: Vec<&FileRecord> = all_records
        .iter()
        .filter(|r| r.language.is_some())
        .collect();

    // ── Namespace tree assembly ─────────────────────────────
    let mut infos: Vec<ModuleInfo> = Vec::with_capacity(records.len());
    let mut module_by_dotted: HashMap<String, EntityId> = HashMap::new();
    let mut module_by_stem: HashMap<String, EntityId> = HashMap::new();

    for record in &records {
        let Some(language) = record.language else {
            continue;
        };
        let (dirs, stem) = split_path(&record.rel_path);
        let path_dotted = if dirs.is_empty() {
            stem.clone()
        } else {
            format!("{}.{}", dirs.join("."), stem)
        };
        let dotted = match language {
            Language::Python if stem == "__init__" && !dirs.is_empty() => dirs.join("."),
            _ => path_dotted.clone(),
        };
        let prefix = match language {
            Language::Php => record.namespace.join("."),
            _ => dotted.clone(),
        };

        let id = EntityId::new(EntityKind::Module, &record.rel_path, &path_dotted);
        if let Some(first) = id_owners.insert(id.clone(), record.rel_path.clone()) {
            return Err(AnalysisError::IdentifierCollision {
                id: id.as_str().to_string(),
                first,
                second: record.rel_path.clone(),
            });
        }

        module_by_dotted.entry(dotted.clone()).or_insert_with(|| id.clone());
        let stem_key = strip_extension(&record.rel_path);
        module_by_stem.entry(stem_key.clone()).or_insert_with(|| id.clone());
        if stem == "index" {
            module_by_stem
                .entry(dirs.join("/"))
                .or_insert_with(|| id.clone());
        }

        let package = match language {
            Language::Php => record.namespace.clone(),
            Language::Python => python_package(&dirs, all_records),
            _ => {
                let mut p = dirs.clone();
                p.push(stem.clone());
                p
            }
        };

        model.modules.insert(
            id.clone(),
            Module {
                id: id.clone(),
                path: record.rel_path.clone(),
                language,
                package,
                imports: record.imports.clone(),
                constants: record.constants.clone(),
                routines: Vec::new(),
                types: Vec::new(),
                loc: record.loc,
            },
        );
        resolver.module_prefix.insert(id.clone(), prefix.clone());
        resolver.module_language.insert(id.clone(), language);
        infos.push(ModuleInfo {
            id,
            language,
            prefix,
            dotted,
            dirs,
        });
    }

    // ── Identifier assignment ───────────────────────────────
    for (record, info) in records.iter().zip(infos.iter()) {
        let mut seen: HashMap<String, u32> = HashMap::new();
        let mut assign = |kind: EntityKind,
                          qualified: &str,
                          diagnostics: &mut Vec<Diagnostic>|
         -> EntityId {
            let base = EntityId::new(kind, &record.rel_path, qualified);
            let count = seen.entry(base.as_str().to_string()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                let id = base.with_ordinal(*count - 1);
                warn!(id = %id, "identifier disambiguated");
                diagnostics.push(Diagnostic {
                    kind: lattice_core::diagnostics::DiagnosticKind::IdentifierDisambiguated,
                    path: record.rel_path.clone(),
                    line: None,
                    front_end: None,
                    stage: None,
                    message: format!("`{qualified}` declared more than once, ordinal appended"),
                });
                id
            }
        };

        for type_record in &record.types {
            let type_id = assign(EntityKind::Type, &type_record.qualified, diagnostics);
            guard_id(&mut id_owners, &type_id, &record.rel_path)?;

            let mut decl = make_type_decl(type_record, &type_id, info);
            for method in &type_record.methods {
                let qualified = format!("{}.{}", type_record.qualified, method.name);
                let routine_id = assign(EntityKind::Routine, &qualified, diagnostics);
                guard_id(&mut id_owners, &routine_id, &record.rel_path)?;
                let routine = make_routine(
                    method,
                    &routine_id,
                    RoutineKind::Method,
                    Owner::Type(type_id.clone()),
                    &format!("{}.{}", decl.qualified_name, method.name),
                );
                decl.methods.push(routine_id.clone());
                model.routines.insert(routine_id, routine);
            }
            for attribute in &type_record.attributes {
                let qualified = format!("{}.{}", type_record.qualified, attribute.name);
                let attr_id = assign(EntityKind::Attribute, &qualified, diagnostics);
                guard_id(&mut id_owners, &attr_id, &record.rel_path)?;
                let attr = make_attribute(attribute, &attr_id, &type_id);
                decl.attributes.push(attr_id.clone());
                model.attributes.insert(attr_id, attr);
            }

            let type_key = join_key(&info.prefix, &type_record.qualified);
            resolver.type_keys.entry(type_key).or_insert_with(|| type_id.clone());
            resolver.type_language.insert(type_id.clone(), info.language);
            resolver
                .simple_types
                .entry(type_record.name.clone())
                .or_default()
                .push(type_id.clone());
            resolver
                .module_types
                .entry(info.id.clone())
                .or_default()
                .push((
                    type_record.qualified.clone(),
                    type_record.name.clone(),
                    type_id.clone(),
                ));

            if let Some(module) = model.modules.get_mut(&info.id) {
                module.types.push(type_id.clone());
            }
            model.types.insert(type_id, decl);
        }

        for routine_record in &record.routines {
            let routine_id = assign(EntityKind::Routine, &routine_record.name, diagnostics);
            guard_id(&mut id_owners, &routine_id, &record.rel_path)?;
            let kind = if routine_record.is_lambda {
                RoutineKind::Lambda
            } else {
                RoutineKind::Function
            };
            let routine = make_routine(
                routine_record,
                &routine_id,
                kind,
                Owner::Module(info.id.clone()),
                &join_display(&info.dotted, &routine_record.name),
            );
            resolver
                .module_routines
                .entry(info.id.clone())
                .or_default()
                .push((routine_record.name.clone(), routine_id.clone()));
            if let Some(module) = model.modules.get_mut(&info.id) {
                module.routines.push(routine_id.clone());
            }
            model.routines.insert(routine_id, routine);
        }
    }

    // ── Import binding ──────────────────────────────────────
    for info in &infos {
        let imports = model
            .modules
            .get(&info.id)
            .map(|m| m.imports.clone())
            .unwrap_or_default();
        let mut bound: HashMap<String, Binding> = HashMap::new();
        let mut resolved_imports = Vec::with_capacity(imports.len());

        for mut import in imports {
            match info.language {
                Language::Python => bind_python_import(
                    &mut import,
                    info,
                    &module_by_dotted,
                    &resolver,
                    &mut bound,
                ),
                Language::Php => bind_php_import(&mut import, &model, &resolver, &mut bound),
                Language::JavaScript | Language::TypeScript => bind_js_import(
                    &mut import,
                    info,
                    &module_by_stem,
                    &resolver,
                    &mut bound,
                ),
            }
            resolved_imports.push(import);
        }

        if let Some(module) = model.modules.get_mut(&info.id) {
            module.imports = resolved_imports;
        }
        if !bound.is_empty() {
            resolver.bindings.insert(info.id.clone(), bound);
        }
    }

    // ── Cross-file link sealing ─────────────────────────────
    for (record, info) in records.iter().zip(infos.iter()) {
        for type_record in &record.types {
            let Some(type_id) = resolver
                .module_types
                .get(&info.id)
                .and_then(|types| {
                    types
                        .iter()
                        .find(|(q, _, _)| q == &type_record.qualified)
                        .map(|(_, _, id)| id.clone())
                })
            else {
                continue;
            };
            let span_line = type_record.span.start;

            let seal = |texts: &[String],
                        kind: RelationKind,
                        graph: &mut RelationGraph,
                        diagnostics: &mut Vec<Diagnostic>|
             -> Vec<TypeRef> {
                let mut refs: Vec<TypeRef> = Vec::new();
                for text in texts {
                    let normalized = normalize_ref(text);
                    if refs.iter().any(|r| r.normalized == normalized) {
                        continue;
                    }
                    let mut type_ref = TypeRef::new(text.clone());
                    type_ref.normalized = normalized;

                    let resolved = resolver.resolve_type(&info.id, &type_ref.normalized);
                    let target = match resolved {
                        Some(target)
                            if matches!(kind, RelationKind::Inherits | RelationKind::Implements)
                                && reaches(graph, &target, &type_id) =>
                        {
                            diagnostics.push(Diagnostic::resolution_miss(
                                record.rel_path.clone(),
                                Some(span_line),
                                format!(
                                    "`{}` would close an inheritance cycle with `{}`, bound to External",
                                    text, type_record.name
                                ),
                            ));
                            EntityId::external()
                        }
                        Some(target) => target,
                        None => {
                            if !is_builtin(info.language, &type_ref.normalized) {
                                diagnostics.push(Diagnostic::resolution_miss(
                                    record.rel_path.clone(),
                                    Some(span_line),
                                    format!(
                                        "could not resolve `{}` referenced by `{}`",
                                        text, type_record.name
                                    ),
                                ));
                            }
                            EntityId::external()
                        }
                    };

                    graph.add_edge(RelationEdge {
                        source: type_id.clone(),
                        target: target.clone(),
                        kind,
                        cardinality: None,
                        optional: false,
                        provenance: Provenance {
                            file: record.rel_path.clone(),
                            line: span_line,
                        },
                    });
                    type_ref.target = Some(target);
                    refs.push(type_ref);
                }
                refs
            };

            let bases = seal(&type_record.bases, RelationKind::Inherits, graph, diagnostics);
            let interfaces = seal(
                &type_record.interfaces,
                RelationKind::Implements,
                graph,
                diagnostics,
            );
            let traits_used = seal(
                &type_record.traits_used,
                RelationKind::UsesTrait,
                graph,
                diagnostics,
            );
            if let Some(decl) = model.types.get_mut(&type_id) {
                decl.bases = bases;
                decl.interfaces = interfaces;
                decl.traits_used = traits_used;
            }
        }
    }

    // Attribute declared types, sealed the same way.
    let attribute_ids: Vec<EntityId> = model.attributes.keys().cloned().collect();
    for attr_id in attribute_ids {
        let Some(attr) = model.attributes.get(&attr_id) else {
            continue;
        };
        let Some(owner_module) = model.owning_module(&attr.owner) else {
            continue;
        };
        let Some(evident) = attribute_evident_type(attr) else {
            continue;
        };
        let core = parse_type_expr(&evident).core;
        if core.is_empty() {
            continue;
        }
        let language = model.modules.get(&owner_module).map(|m| m.language);
        if language.is_some_and(|l| is_builtin(l, &core)) {
            continue;
        }
        let resolved = resolver
            .resolve_type(&owner_module, &core)
            .unwrap_or_else(EntityId::external);
        if let Some(attr) = model.attributes.get_mut(&attr_id) {
            attr.type_ref = Some(resolved);
        }
    }

    Ok(BuildOutput { model, resolver })
}

fn guard_id(
    id_owners: &mut HashMap<EntityId, String>,
    id: &EntityId,
    path: &str,
) -> Result<(), AnalysisError> {
    if let Some(first) = id_owners.insert(id.clone(), path.to_string()) {
        return Err(AnalysisError::IdentifierCollision {
            id: id.as_str().to_string(),
            first,
            second: path.to_string(),
        });
    }
    Ok(())
}

fn make_type_decl(record: &TypeRecord, id: &EntityId, info: &ModuleInfo) -> TypeDecl {
    let qualified_name = match info.language {
        Language::Php if !info.prefix.is_empty() => format!(
            "{}\\{}",
            info.prefix.replace('.', "\\"),
            record.qualified
        ),
        _ => join_display(&info.dotted, &record.qualified),
    };
    TypeDecl {
        id: id.clone(),
        kind: record.kind,
        name: record.name.clone(),
        qualified_name,
        module: info.id.clone(),
        bases: record.bases.iter().map(|b| TypeRef::new(b.clone())).collect(),
        interfaces: record
            .interfaces
            .iter()
            .map(|i| TypeRef::new(i.clone()))
            .collect(),
        traits_used: record
            .traits_used
            .iter()
            .map(|t| TypeRef::new(t.clone()))
            .collect(),
        methods: Vec::new(),
        attributes: Vec::new(),
        span: record.span,
        doc: record.doc.clone(),
        visibility: record.visibility,
        is_abstract: record.is_abstract,
        is_final: record.is_final,
        decorators: record.decorators.clone(),
        best_effort: record.best_effort,
    }
}

fn make_routine(
    record: &RoutineRecord,
    id: &EntityId,
    kind: RoutineKind,
    owner: Owner,
    qualified_name: &str,
) -> Routine {
    Routine {
        id: id.clone(),
        kind,
        name: record.name.clone(),
        qualified_name: qualified_name.to_string(),
        owner,
        params: record.params.clone(),
        return_annotation: record.return_annotation.clone(),
        receiver: record.receiver,
        is_static: record.is_static,
        is_abstract: record.is_abstract,
        is_async: record.is_async,
        is_generator: record.is_generator,
        span: record.span,
        doc: record.doc.clone(),
        visibility: record.visibility,
        decorators: record.decorators.clone(),
        call_sites: record.call_sites.clone(),
        locals: record.locals.clone(),
        best_effort: record.best_effort,
    }
}

fn make_attribute(record: &AttributeRecord, id: &EntityId, owner: &EntityId) -> Attribute {
    Attribute {
        id: id.clone(),
        name: record.name.clone(),
        owner: owner.clone(),
        kind: record.kind,
        declared_type: record.declared_type.clone(),
        type_ref: None,
        default_expr: record.default_expr.clone(),
        origin: record.origin.clone(),
        line: record.line,
        visibility: record.visibility,
        is_static: record.is_static,
    }
}

/// Declared type, or the constructed type from the initialiser.
pub fn attribute_evident_type(attr: &Attribute) -> Option<String> {
    if let Some(t) = &attr.declared_type {
        return Some(t.clone());
    }
    match &attr.origin {
        AttrOrigin::Constructed(t) => Some(t.clone()),
        _ => None,
    }
}

fn bind_python_import(
    import: &mut Import,
    info: &ModuleInfo,
    module_by_dotted: &HashMap<String, EntityId>,
    resolver: &Resolver,
    bound: &mut HashMap<String, Binding>,
) {
    let base_dotted = match import.shape {
        ImportShape::Relative => {
            let depth = import.relative_depth as usize;
            if depth == 0 || depth - 1 > info.dirs.len() {
                return;
            }
            let keep = info.dirs.len() - (depth - 1);
            let mut parts: Vec<String> = info.dirs[..keep].to_vec();
            if !import.module.is_empty() {
                parts.extend(import.module.split('.').map(|s| s.to_string()));
            }
            parts.join(".")
        }
        _ => import.module.clone(),
    };

    let target = module_by_dotted
        .get(&base_dotted)
        .filter(|id| resolver.language_of_module(id) == Some(Language::Python))
        .cloned();
    if let Some(target) = &target {
        if target != &info.id {
            import.resolved = Some(target.clone());
        }
    }

    match import.shape {
        ImportShape::Plain => {
            // `import m.a as ma` binds the alias to the module.
            for name in &import.names {
                if let (Some(alias), Some(target)) = (&name.alias, &target) {
                    bound.insert(alias.clone(), Binding::Module(target.clone()));
                }
            }
        }
        ImportShape::Named | ImportShape::Relative => {
            for name in &import.names {
                if name.name == "*" {
                    continue;
                }
                let local = name.alias.clone().unwrap_or_else(|| name.name.clone());
                // A submodule import wins over a symbol of the package.
                let submodule = module_by_dotted
                    .get(&join_key(&base_dotted, &name.name))
                    .filter(|id| resolver.language_of_module(id) == Some(Language::Python));
                if let Some(submodule) = submodule {
                    bound.insert(local, Binding::Module(submodule.clone()));
                    continue;
                }
                let Some(target) = &target else { continue };
                if let Some(binding) = symbol_in_module(resolver, target, &name.name) {
                    bound.insert(local, binding);
                }
            }
        }
    }
}

fn bind_php_import(
    import: &mut Import,
    model: &SemanticModel,
    resolver: &Resolver,
    bound: &mut HashMap<String, Binding>,
) {
    let key = normalize_path(&import.module);
    let Some(type_id) = resolver
        .type_keys
        .get(&key)
        .filter(|id| resolver.type_language.get(*id) == Some(&Language::Php))
    else {
        return;
    };
    import.resolved = model.owning_module(type_id);
    for name in &import.names {
        let local = name.alias.clone().unwrap_or_else(|| name.name.clone());
        bound.insert(local, Binding::Type(type_id.clone()));
    }
}

fn bind_js_import(
    import: &mut Import,
    info: &ModuleInfo,
    module_by_stem: &HashMap<String, EntityId>,
    resolver: &Resolver,
    bound: &mut HashMap<String, Binding>,
) {
    if !import.module.starts_with('.') {
        return;
    }
    let Some(target) = resolve_js_path(&info.dirs, &import.module, module_by_stem)
        .filter(|id| {
            resolver
                .language_of_module(id)
                .is_some_and(|l| matches!(l, Language::JavaScript | Language::TypeScript))
        })
    else {
        return;
    };
    if target != info.id {
        import.resolved = Some(target.clone());
    }

    for name in &import.names {
        match name.name.as_str() {
            "default" | "*" => {
                if let Some(alias) = &name.alias {
                    bound.insert(alias.clone(), Binding::Module(target.clone()));
                }
            }
            symbol => {
                let local = name.alias.clone().unwrap_or_else(|| symbol.to_string());
                if let Some(binding) = symbol_in_module(resolver, &target, symbol) {
                    bound.insert(local, binding);
                }
            }
        }
    }
}

fn symbol_in_module(resolver: &Resolver, module: &EntityId, name: &str) -> Option<Binding> {
    if let Some(types) = resolver.module_types.get(module) {
        if let Some((_, _, id)) = types.iter().find(|(_, n, _)| n == name) {
            return Some(Binding::Type(id.clone()));
        }
    }
    resolver
        .module_routine(module, name)
        .map(Binding::Routine)
}

fn resolve_js_path(
    dirs: &[String],
    specifier: &str,
    module_by_stem: &HashMap<String, EntityId>,
) -> Option<EntityId> {
    let mut parts: Vec<String> = dirs.to_vec();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other.to_string()),
        }
    }
    let joined = parts.join("/");
    let stem = strip_known_extension(&joined);
    module_by_stem
        .get(&stem)
        .or_else(|| module_by_stem.get(&joined))
        .cloned()
}

/// True when `needle` is reachable from `start` over inheritance edges.
fn reaches(graph: &RelationGraph, start: &EntityId, needle: &EntityId) -> bool {
    if start == needle {
        return true;
    }
    let mut stack = vec![start.clone()];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        for edge in graph.edges_from(&current) {
            if !matches!(edge.kind, RelationKind::Inherits | RelationKind::Implements) {
                continue;
            }
            if &edge.target == needle {
                return true;
            }
            if !edge.target.is_external() {
                stack.push(edge.target.clone());
            }
        }
    }
    false
}

fn python_package(dirs: &[String], records: &[FileRecord]) -> Vec<String> {
    // A directory is a package when it carries an __init__ module; the
    // chain stops at the first gap (namespace packages are tolerated by
    // resolution, which keys on paths).
    let mut package = Vec::new();
    let mut prefix = String::new();
    for dir in dirs {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(dir);
        let has_init = records.iter().any(|r| {
            r.language == Some(Language::Python)
                && (r.rel_path == format!("{prefix}/__init__.py")
                    || r.rel_path == format!("{prefix}/__init__.pyi"))
        });
        if !has_init {
            break;
        }
        package.push(dir.clone());
    }
    package
}

fn split_path(rel_path: &str) -> (Vec<String>, String) {
    let mut parts: Vec<String> = rel_path.split('/').map(|s| s.to_string()).collect();
    let file = parts.pop().unwrap_or_default();
    let stem = file.rsplit_once('.').map(|(s, _)| s.to_string()).unwrap_or(file);
    (parts, stem)
}

fn strip_extension(rel_path: &str) -> String {
    match rel_path.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => rel_path.to_string(),
    }
}

fn strip_known_extension(path: &str) -> String {
    for ext in [
        ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts", ".py", ".pyi", ".php",
    ] {
        if let Some(stripped) = path.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    path.to_string()
}

/// Backslashes and leading separators normalised to the dotted form used
/// by the resolution index.
fn normalize_path(text: &str) -> String {
    text.trim()
        .trim_start_matches('\\')
        .replace('\\', ".")
        .trim_start_matches('.')
        .to_string()
}

/// Dotted normalisation of a reference when it is a simple name or
/// attribute chain; generic arguments are dropped, anything else passes
/// through.
fn normalize_ref(text: &str) -> String {
    let trimmed = text.trim();
    let head = match trimmed.find(['[', '<', '(']) {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };
    normalize_path(head)
}

fn join_key(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}.{rest}")
    }
}

fn join_display(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Routines visible as flow entry points by default.
pub fn is_public_routine(routine: &Routine) -> bool {
    routine.visibility == Visibility::Public && !routine.name.starts_with('_')
}
