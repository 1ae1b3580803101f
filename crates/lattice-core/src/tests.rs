//! Unit tests for lattice-core

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::diagnostics::Diagnostic;
use crate::flow::{FlowHop, FlowTrace, Terminal};
use crate::graph::{Provenance, RelationEdge, RelationGraph, RelationKind};
use crate::model::*;
use crate::result::{AnalysisResult, Summary};

fn edge(source: &EntityId, target: &EntityId, kind: RelationKind) -> RelationEdge {
    RelationEdge {
        source: source.clone(),
        target: target.clone(),
        kind,
        cardinality: None,
        optional: false,
        provenance: Provenance {
            file: "m/a.py".to_string(),
            line: 1,
        },
    }
}

fn module(path: &str) -> Module {
    Module {
        id: EntityId::new(EntityKind::Module, path, path),
        path: path.to_string(),
        language: Language::Python,
        package: Vec::new(),
        imports: Vec::new(),
        constants: Vec::new(),
        routines: Vec::new(),
        types: Vec::new(),
        loc: 10,
    }
}

fn type_decl(path: &str, name: &str, module: &EntityId) -> TypeDecl {
    TypeDecl {
        id: EntityId::new(EntityKind::Type, path, name),
        kind: TypeKind::Class,
        name: name.to_string(),
        qualified_name: name.to_string(),
        module: module.clone(),
        bases: Vec::new(),
        interfaces: Vec::new(),
        traits_used: Vec::new(),
        methods: Vec::new(),
        attributes: Vec::new(),
        span: Span::new(1, 5),
        doc: None,
        visibility: Visibility::Public,
        is_abstract: false,
        is_final: false,
        decorators: Vec::new(),
        best_effort: false,
    }
}

#[test]
fn entity_id_is_deterministic() {
    let a = EntityId::new(EntityKind::Type, "src/car.py", "Car");
    let b = EntityId::new(EntityKind::Type, "src/car.py", "Car");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "type:src/car.py:Car");

    let c = EntityId::new(EntityKind::Type, "src/car.py", "Engine");
    assert_ne!(a, c);

    assert_eq!(a.with_ordinal(1).as_str(), "type:src/car.py:Car:1");
}

#[test]
fn external_sentinel() {
    let ext = EntityId::external();
    assert!(ext.is_external());
    assert!(!EntityId::new(EntityKind::Module, "a.py", "a").is_external());
}

#[test]
fn graph_coalesces_duplicate_edges() {
    let mut graph = RelationGraph::new();
    let a = EntityId::new(EntityKind::Type, "a.py", "A");
    let b = EntityId::new(EntityKind::Type, "a.py", "B");

    assert!(graph.add_edge(edge(&b, &a, RelationKind::Inherits)));
    assert!(!graph.add_edge(edge(&b, &a, RelationKind::Inherits)));
    // Same pair, different kind is a distinct edge in the multigraph.
    assert!(graph.add_edge(edge(&b, &a, RelationKind::Associates)));

    assert_eq!(graph.edge_count(), 2);
    assert!(graph.has_edge(&b, &a, RelationKind::Inherits));
    assert!(!graph.has_edge(&a, &b, RelationKind::Inherits));
}

#[test]
fn graph_iteration_is_insertion_ordered() {
    let mut graph = RelationGraph::new();
    let a = EntityId::new(EntityKind::Type, "a.py", "A");
    let b = EntityId::new(EntityKind::Type, "a.py", "B");
    let c = EntityId::new(EntityKind::Type, "a.py", "C");

    graph.add_edge(edge(&a, &b, RelationKind::Associates));
    graph.add_edge(edge(&a, &c, RelationKind::Associates));
    graph.add_edge(edge(&b, &c, RelationKind::Imports));

    let targets: Vec<String> = graph
        .all_edges()
        .map(|e| e.target.as_str().to_string())
        .collect();
    assert_eq!(targets.len(), 3);
    assert!(targets[0].ends_with(":B"));
    assert!(targets[1].ends_with(":C"));
}

#[test]
fn bases_preserve_declaration_order() {
    let mut graph = RelationGraph::new();
    let d = EntityId::new(EntityKind::Type, "a.py", "D");
    let left = EntityId::new(EntityKind::Type, "a.py", "Left");
    let right = EntityId::new(EntityKind::Type, "a.py", "Right");

    graph.add_edge(edge(&d, &left, RelationKind::Inherits));
    graph.add_edge(edge(&d, &right, RelationKind::Inherits));

    assert_eq!(graph.bases_of(&d), vec![left, right]);
}

#[test]
fn owning_module_walks_ownership() {
    let mut model = SemanticModel::default();
    let m = module("m/a.py");
    let module_id = m.id.clone();
    let t = type_decl("m/a.py", "A", &module_id);
    let type_id = t.id.clone();

    let routine = Routine {
        id: EntityId::new(EntityKind::Routine, "m/a.py", "A.run"),
        kind: RoutineKind::Method,
        name: "run".to_string(),
        qualified_name: "A.run".to_string(),
        owner: Owner::Type(type_id.clone()),
        params: Vec::new(),
        return_annotation: None,
        receiver: Receiver::Instance,
        is_static: false,
        is_abstract: false,
        is_async: false,
        is_generator: false,
        span: Span::new(2, 3),
        doc: None,
        visibility: Visibility::Public,
        decorators: Vec::new(),
        call_sites: Vec::new(),
        locals: Vec::new(),
        best_effort: false,
    };
    let routine_id = routine.id.clone();

    model.modules.insert(module_id.clone(), m);
    model.types.insert(type_id.clone(), t);
    model.routines.insert(routine_id.clone(), routine);

    assert_eq!(model.owning_module(&routine_id), Some(module_id.clone()));
    assert_eq!(model.owning_module(&type_id), Some(module_id));
    assert_eq!(model.owning_module(&EntityId::external()), None);
}

#[test]
fn config_rejects_zero_depth() {
    let mut config = AnalysisConfig::default();
    config.flow.max_depth = 0;
    assert!(config.validate().is_err());
}

#[test]
fn config_rejects_extension_claimed_twice() {
    let mut config = AnalysisConfig::default();
    config.languages.python.extensions.push("php".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn config_rejects_enabled_language_without_extensions() {
    let mut config = AnalysisConfig::default();
    config.languages.php.extensions.clear();
    assert!(config.validate().is_err());

    // Disabled languages may have empty extension sets.
    config.languages.php.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn default_config_validates() {
    assert!(AnalysisConfig::default().validate().is_ok());
}

#[test]
fn summary_counts_edges_and_terminals() {
    let mut model = SemanticModel::default();
    let m = module("m/a.py");
    let module_id = m.id.clone();
    model.modules.insert(module_id.clone(), m);

    let mut graph = RelationGraph::new();
    let a = EntityId::new(EntityKind::Type, "m/a.py", "A");
    let b = EntityId::new(EntityKind::Type, "m/a.py", "B");
    graph.add_edge(edge(&b, &a, RelationKind::Inherits));

    let entry = EntityId::new(EntityKind::Routine, "m/a.py", "run");
    let mut flows = BTreeMap::new();
    flows.insert(
        entry.clone(),
        vec![FlowTrace {
            entry: entry.clone(),
            hops: vec![FlowHop {
                caller: entry.clone(),
                callee: EntityId::external(),
                call_text: "helper()".to_string(),
                line: 3,
                note: None,
            }],
            depth: 1,
            terminal: Terminal::Unresolved,
        }],
    );

    let diagnostics = vec![Diagnostic::walk_failure("m/locked.py", "permission denied")];
    let summary = Summary::compute(&model, &graph, &flows, &diagnostics);

    assert_eq!(summary.modules, 1);
    assert_eq!(summary.edges.get("inherits"), Some(&1));
    assert_eq!(summary.terminals.get("unresolved"), Some(&1));
    assert_eq!(summary.diagnostics, 1);
    assert_eq!(summary.total_loc, 10);
}

#[test]
fn result_json_has_stable_sections() {
    let mut model = SemanticModel::default();
    let m = module("m/a.py");
    let module_id = m.id.clone();
    let t = type_decl("m/a.py", "A", &module_id);
    model.types.insert(t.id.clone(), t);
    model.modules.insert(module_id, m);

    let graph = RelationGraph::new();
    let flows = BTreeMap::new();
    let diagnostics = Vec::new();
    let summary = Summary::compute(&model, &graph, &flows, &diagnostics);

    let result = AnalysisResult {
        model,
        graph,
        flows,
        diagnostics,
        summary,
    };

    let first = result.to_json_string();
    let second = result.to_json_string();
    assert_eq!(first, second);

    let value = result.to_json();
    for section in [
        "modules",
        "types",
        "routines",
        "attributes",
        "relationships",
        "flows",
        "diagnostics",
        "summary",
    ] {
        assert!(value.get(section).is_some(), "missing section {section}");
    }
    assert_eq!(
        value["summary"]["types"],
        serde_json::Value::from(1),
        "summary should count the single type"
    );
}

#[test]
fn module_rollup_skips_intra_module_edges() {
    use crate::aggregation::aggregate_module_edges;

    let mut model = SemanticModel::default();
    let ma = module("m/a.py");
    let mb = module("m/b.py");
    let ma_id = ma.id.clone();
    let mb_id = mb.id.clone();

    let a = type_decl("m/a.py", "A", &ma_id);
    let b = type_decl("m/b.py", "B", &mb_id);
    let a2 = type_decl("m/a.py", "A2", &ma_id);
    let a_id = a.id.clone();
    let b_id = b.id.clone();
    let a2_id = a2.id.clone();

    model.modules.insert(ma_id.clone(), ma);
    model.modules.insert(mb_id.clone(), mb);
    model.types.insert(a_id.clone(), a);
    model.types.insert(b_id.clone(), b);
    model.types.insert(a2_id.clone(), a2);

    let mut graph = RelationGraph::new();
    graph.add_edge(edge(&b_id, &a_id, RelationKind::Inherits));
    graph.add_edge(edge(&b_id, &a_id, RelationKind::Associates));
    // Intra-module: dropped by the rollup.
    graph.add_edge(edge(&a2_id, &a_id, RelationKind::Inherits));

    let rollup = aggregate_module_edges(&model, &graph);
    assert_eq!(rollup.len(), 1);
    assert_eq!(rollup[0].source, mb_id);
    assert_eq!(rollup[0].target, ma_id);
    assert_eq!(rollup[0].count, 2);
    assert_eq!(rollup[0].kind_counts.get("inherits"), Some(&1));
}
