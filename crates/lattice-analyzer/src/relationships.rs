//! Relationship detector — composition, aggregation, association, imports
//!
//! Runs over the sealed model. Each rule fires at most once per
//! (source, target) pair; rule order is priority order, so a pair claimed
//! by composition never re-surfaces as aggregation or association. Only
//! declared or syntactically-evident types are consulted; when the type is
//! unknown the edge is simply absent.

use std::collections::HashSet;

use lattice_core::cancel::CancelToken;
use lattice_core::config::AnalysisConfig;
use lattice_core::error::{AnalysisError, Phase};
use lattice_core::graph::{Cardinality, Provenance, RelationEdge, RelationGraph, RelationKind};
use lattice_core::model::{AttrOrigin, Attribute, EntityId, SemanticModel, TypeDecl};

use crate::builder::{Resolver, attribute_evident_type};
use crate::builtins::is_builtin;
use crate::typeexpr::{TypeExpr, parse_type_expr};

pub fn detect(
    model: &SemanticModel,
    resolver: &Resolver,
    config: &AnalysisConfig,
    graph: &mut RelationGraph,
    cancel: &CancelToken,
) -> Result<(), AnalysisError> {
    let detect = &config.relationships.detect;
    let mut claimed: HashSet<(EntityId, EntityId)> = HashSet::new();

    if detect.contains(&RelationKind::Imports) {
        for module in model.modules.values() {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    phase: Phase::Detect,
                });
            }
            for import in &module.imports {
                let Some(target) = &import.resolved else {
                    continue;
                };
                if target == &module.id {
                    continue;
                }
                graph.add_edge(RelationEdge {
                    source: module.id.clone(),
                    target: target.clone(),
                    kind: RelationKind::Imports,
                    cardinality: None,
                    optional: false,
                    provenance: Provenance {
                        file: module.path.clone(),
                        line: import.line,
                    },
                });
            }
        }
    }

    // Rule 2, composition: a typed attribute constructed in the owner's
    // constructor.
    if detect.contains(&RelationKind::Composes) {
        for decl in model.types.values() {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    phase: Phase::Detect,
                });
            }
            for attr_id in &decl.attributes {
                let Some(attr) = model.attributes.get(attr_id) else {
                    continue;
                };
                if !matches!(attr.origin, AttrOrigin::Constructed(_)) {
                    continue;
                }
                let Some((target, expr)) = attribute_target(attr) else {
                    continue;
                };
                emit(
                    graph,
                    &mut claimed,
                    model,
                    decl,
                    target,
                    RelationKind::Composes,
                    &expr,
                    attr.line,
                );
            }
        }
    }

    // Rule 3, aggregation: the attribute holds an externally-supplied
    // instance handed in through a constructor parameter.
    if detect.contains(&RelationKind::Aggregates) {
        for decl in model.types.values() {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    phase: Phase::Detect,
                });
            }
            for attr_id in &decl.attributes {
                let Some(attr) = model.attributes.get(attr_id) else {
                    continue;
                };
                let AttrOrigin::Parameter(param_name) = &attr.origin else {
                    continue;
                };
                let resolved = attribute_target(attr)
                    .or_else(|| constructor_param_type(model, resolver, decl, param_name));
                let Some((target, expr)) = resolved else {
                    continue;
                };
                emit(
                    graph,
                    &mut claimed,
                    model,
                    decl,
                    target,
                    RelationKind::Aggregates,
                    &expr,
                    attr.line,
                );
            }
        }
    }

    // Rule 4, association: a method signature or local annotation
    // references a type the owner holds no field of.
    if detect.contains(&RelationKind::Associates) {
        for decl in model.types.values() {
            if cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    phase: Phase::Detect,
                });
            }
            let field_types = field_type_set(model, resolver, decl);
            for method_id in &decl.methods {
                let Some(routine) = model.routines.get(method_id) else {
                    continue;
                };
                let mut candidates: Vec<(String, u32)> = Vec::new();
                for param in &routine.params {
                    if let Some(annotation) = &param.annotation {
                        candidates.push((annotation.clone(), routine.span.start));
                    }
                }
                if let Some(returns) = &routine.return_annotation {
                    candidates.push((returns.clone(), routine.span.start));
                }
                for local in &routine.locals {
                    if !local.constructed {
                        candidates.push((local.type_text.clone(), local.line));
                    }
                }

                for (text, line) in candidates {
                    let expr = parse_type_expr(&text);
                    if expr.core.is_empty() {
                        continue;
                    }
                    let Some(module) = model.modules.get(&decl.module) else {
                        continue;
                    };
                    if is_builtin(module.language, &expr.core) {
                        continue;
                    }
                    let Some(target) = resolver.resolve_type(&decl.module, &expr.core) else {
                        continue;
                    };
                    if target == decl.id || field_types.contains(&target) {
                        continue;
                    }
                    emit(
                        graph,
                        &mut claimed,
                        model,
                        decl,
                        target,
                        RelationKind::Associates,
                        &expr,
                        line,
                    );
                }
            }
        }
    }

    Ok(())
}

/// The attribute's sealed project target plus the parsed declared shape.
fn attribute_target(attr: &Attribute) -> Option<(EntityId, TypeExpr)> {
    let target = attr.type_ref.clone()?;
    if target.is_external() {
        return None;
    }
    let expr = attribute_evident_type(attr)
        .map(|t| parse_type_expr(&t))
        .unwrap_or(TypeExpr {
            core: String::new(),
            many: false,
            optional: false,
        });
    Some((target, expr))
}

/// Fall back to the constructor parameter's annotation when the attribute
/// itself is untyped.
fn constructor_param_type(
    model: &SemanticModel,
    resolver: &Resolver,
    decl: &TypeDecl,
    param_name: &str,
) -> Option<(EntityId, TypeExpr)> {
    let ctor_id = decl.methods.iter().find(|id| {
        model
            .routines
            .get(id)
            .is_some_and(|r| is_constructor_name(&r.name))
    })?;
    let ctor = model.routines.get(ctor_id)?;
    let annotation = ctor
        .params
        .iter()
        .find(|p| p.name == param_name)?
        .annotation
        .clone()?;
    let expr = parse_type_expr(&annotation);
    if expr.core.is_empty() {
        return None;
    }
    let module = model.modules.get(&decl.module)?;
    if is_builtin(module.language, &expr.core) {
        return None;
    }
    let target = resolver.resolve_type(&decl.module, &expr.core)?;
    Some((target, expr))
}

/// Types the owner evidently holds a field of, including fields typed only
/// through the constructor parameter that supplies them.
fn field_type_set(model: &SemanticModel, resolver: &Resolver, decl: &TypeDecl) -> HashSet<EntityId> {
    let mut out: HashSet<EntityId> = HashSet::new();
    for attr in decl.attributes.iter().filter_map(|id| model.attributes.get(id)) {
        if let Some(target) = &attr.type_ref {
            if !target.is_external() {
                out.insert(target.clone());
            }
            continue;
        }
        if let AttrOrigin::Parameter(param_name) = &attr.origin {
            if let Some((target, _)) = constructor_param_type(model, resolver, decl, param_name) {
                out.insert(target);
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn emit(
    graph: &mut RelationGraph,
    claimed: &mut HashSet<(EntityId, EntityId)>,
    model: &SemanticModel,
    source: &TypeDecl,
    target: EntityId,
    kind: RelationKind,
    expr: &TypeExpr,
    line: u32,
) {
    let pair = (source.id.clone(), target.clone());
    if claimed.contains(&pair) {
        return;
    }
    claimed.insert(pair);

    let provenance_file = model
        .modules
        .get(&source.module)
        .map(|m| m.path.clone())
        .unwrap_or_default();
    graph.add_edge(RelationEdge {
        source: source.id.clone(),
        target,
        kind,
        cardinality: Some(if expr.many {
            Cardinality::Many
        } else {
            Cardinality::One
        }),
        optional: expr.optional,
        provenance: Provenance {
            file: provenance_file,
            line,
        },
    });
}

pub(crate) fn is_constructor_name(name: &str) -> bool {
    matches!(name, "__init__" | "__construct" | "constructor")
}
