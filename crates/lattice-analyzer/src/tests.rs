//! Crate-level tests driving the full pipeline over scratch projects

use std::fs;
use std::path::Path;

use lattice_core::cancel::CancelToken;
use lattice_core::config::AnalysisConfig;
use lattice_core::diagnostics::DiagnosticKind;
use lattice_core::error::AnalysisError;
use lattice_core::flow::Terminal;
use lattice_core::graph::RelationKind;
use lattice_core::model::{EntityId, EntityKind};

use crate::pipeline::{analyze, analyze_with_cancel};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Python-only configuration so unit tests never depend on the helper
/// binary being built.
fn python_config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.languages.javascript.enabled = false;
    config.languages.typescript.enabled = false;
    config.languages.php.enabled = false;
    config
}

#[test]
fn cross_file_resolution_binds_to_project_ids() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "m/__init__.py", "");
    write(dir.path(), "m/a.py", "class A:\n    pass\n");
    write(
        dir.path(),
        "m/b.py",
        "from .a import A\n\nclass B(A):\n    pass\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();

    let a_id = EntityId::new(EntityKind::Type, "m/a.py", "A");
    let b_id = EntityId::new(EntityKind::Type, "m/b.py", "B");
    let module_a = EntityId::new(EntityKind::Module, "m/a.py", "m.a");
    let module_b = EntityId::new(EntityKind::Module, "m/b.py", "m.b");

    assert!(result.graph.has_edge(&b_id, &a_id, RelationKind::Inherits));
    assert!(
        result
            .graph
            .has_edge(&module_b, &module_a, RelationKind::Imports)
    );

    let b = result.model.types.get(&b_id).unwrap();
    assert_eq!(b.bases[0].target.as_ref(), Some(&a_id));
    assert!(!b.bases[0].target.as_ref().unwrap().is_external());
}

#[test]
fn composition_vs_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "car.py",
        "class Engine:\n    pass\n\nclass Driver:\n    pass\n\nclass Car:\n    def __init__(self, driver: Driver):\n        self.engine = Engine()\n        self.driver = driver\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();

    let car = EntityId::new(EntityKind::Type, "car.py", "Car");
    let engine = EntityId::new(EntityKind::Type, "car.py", "Engine");
    let driver = EntityId::new(EntityKind::Type, "car.py", "Driver");

    assert!(result.graph.has_edge(&car, &engine, RelationKind::Composes));
    assert!(result.graph.has_edge(&car, &driver, RelationKind::Aggregates));

    // No other relationship kinds between the three types.
    for kind in [
        RelationKind::Associates,
        RelationKind::Inherits,
        RelationKind::Implements,
    ] {
        assert!(!result.graph.has_edge(&car, &engine, kind));
        assert!(!result.graph.has_edge(&car, &driver, kind));
        assert!(!result.graph.has_edge(&engine, &driver, kind));
    }
}

#[test]
fn composition_wins_over_aggregation_for_one_attribute() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "car.py",
        "class Engine:\n    pass\n\nclass Car:\n    def __init__(self, engine: Engine):\n        self.engine = Engine()\n        self.engine = engine\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();

    let car = EntityId::new(EntityKind::Type, "car.py", "Car");
    let engine = EntityId::new(EntityKind::Type, "car.py", "Engine");
    assert!(result.graph.has_edge(&car, &engine, RelationKind::Composes));
    assert!(!result.graph.has_edge(&car, &engine, RelationKind::Aggregates));
}

#[test]
fn flow_respects_depth_bound() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "chain.py",
        "def a():\n    b()\n\ndef b():\n    c()\n\ndef c():\n    d()\n\ndef d():\n    e()\n\ndef e():\n    f()\n\ndef f():\n    pass\n",
    );

    let mut config = python_config();
    config.flow.max_depth = 3;
    let result = analyze(dir.path(), &config).unwrap();

    let entry = EntityId::new(EntityKind::Routine, "chain.py", "a");
    let traces = result.traces_for(&entry);
    assert_eq!(traces.len(), 1);
    let trace = &traces[0];
    assert_eq!(trace.hops.len(), 3);
    assert_eq!(trace.terminal, Terminal::DepthLimit);
    assert_eq!(trace.depth, 3);

    let callee_names: Vec<&str> = trace
        .hops
        .iter()
        .map(|h| h.callee.as_str().rsplit(':').next().unwrap())
        .collect();
    assert_eq!(callee_names, vec!["b", "c", "d"]);

    // A chain that runs out before the bound ends in a leaf.
    let entry_e = EntityId::new(EntityKind::Routine, "chain.py", "e");
    let traces_e = result.traces_for(&entry_e);
    assert_eq!(traces_e[0].terminal, Terminal::Leaf);
}

#[test]
fn flow_breaks_cycles() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "loop.py",
        "def ping():\n    pong()\n\ndef pong():\n    ping()\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();
    let entry = EntityId::new(EntityKind::Routine, "loop.py", "ping");
    let trace = &result.traces_for(&entry)[0];
    assert_eq!(trace.terminal, Terminal::CycleBreak);
    assert_eq!(trace.hops.len(), 2);
}

#[test]
fn unresolved_calls_become_external_terminals() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ext.py", "def go():\n    mystery()\n");

    let result = analyze(dir.path(), &python_config()).unwrap();
    let entry = EntityId::new(EntityKind::Routine, "ext.py", "go");
    let trace = &result.traces_for(&entry)[0];
    assert_eq!(trace.terminal, Terminal::Unresolved);
    assert!(trace.hops[0].callee.is_external());
    assert_eq!(trace.hops[0].call_text, "mystery");
}

#[test]
fn method_calls_resolve_through_inheritance() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "vehicles.py",
        "class Base:\n    def start(self):\n        pass\n\nclass Car(Base):\n    def drive(self):\n        self.start()\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();
    let entry = EntityId::new(EntityKind::Routine, "vehicles.py", "Car.drive");
    let trace = &result.traces_for(&entry)[0];
    let expected = EntityId::new(EntityKind::Routine, "vehicles.py", "Base.start");
    assert_eq!(trace.hops[0].callee, expected);
    assert_eq!(trace.terminal, Terminal::Leaf);
}

#[test]
fn receiver_typed_by_attribute_resolves() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "garage.py",
        "class Engine:\n    def start(self):\n        pass\n\nclass Car:\n    def __init__(self):\n        self.engine = Engine()\n    def drive(self):\n        self.engine.start()\n",
    );

    let result = analyze(dir.path(), &python_config()).unwrap();
    let entry = EntityId::new(EntityKind::Routine, "garage.py", "Car.drive");
    let trace = &result.traces_for(&entry)[0];
    let expected = EntityId::new(EntityKind::Routine, "garage.py", "Engine.start");
    assert_eq!(trace.hops[0].callee, expected);
}

#[test]
fn runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "m/__init__.py", "");
    write(
        dir.path(),
        "m/a.py",
        "class A:\n    def run(self):\n        helper()\n\ndef helper():\n    pass\n",
    );
    write(
        dir.path(),
        "m/b.py",
        "from .a import A\n\nclass B(A):\n    pass\n",
    );

    let config = python_config();
    let first = analyze(dir.path(), &config).unwrap().to_json_string();
    let second = analyze(dir.path(), &config).unwrap().to_json_string();
    assert_eq!(first, second);
}

#[test]
fn one_broken_file_costs_exactly_its_entities() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "good.py", "class Fine:\n    pass\n");
    write(dir.path(), "bad.py", "def broken(:\n    pass\n");

    let result = analyze(dir.path(), &python_config()).unwrap();

    assert!(result.find_type("Fine").is_some());
    assert!(
        !result
            .model
            .modules
            .keys()
            .any(|id| id.as_str().contains("bad.py"))
    );
    let parse_failures: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ParseFailure)
        .collect();
    assert_eq!(parse_failures.len(), 1);
    assert_eq!(parse_failures[0].path, "bad.py");
}

#[test]
fn cancellation_reports_the_phase() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "class A:\n    pass\n");

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = analyze_with_cancel(dir.path(), &python_config(), cancel).unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled { .. }));
}

#[test]
fn helper_unavailability_degrades_but_completes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.py", "class App:\n    pass\n");
    write(dir.path(), "web.ts", "export class Web {}\n");

    let mut config = AnalysisConfig::default();
    config.languages.php.enabled = false;
    config.js_helper.command = Some(vec!["/definitely/not/a/helper".to_string()]);

    let result = analyze(dir.path(), &config).unwrap();

    assert!(result.find_type("App").is_some());
    assert!(result.find_type("Web").is_none());
    let unavailable: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::HelperUnavailable)
        .collect();
    assert_eq!(unavailable.len(), 1);
}

#[cfg(feature = "php-ast")]
#[test]
fn php_participates_in_the_model() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/Car.php",
        "<?php\nnamespace App;\n\nclass Car extends Vehicle {\n    private Engine $engine;\n    public function __construct() {\n        $this->engine = new Engine();\n    }\n}\nclass Engine {\n    public function start(): void {}\n}\nclass Vehicle {}\n",
    );

    let mut config = AnalysisConfig::default();
    config.languages.python.enabled = false;
    config.languages.javascript.enabled = false;
    config.languages.typescript.enabled = false;

    let result = analyze(dir.path(), &config).unwrap();

    let car = EntityId::new(EntityKind::Type, "src/Car.php", "Car");
    let engine = EntityId::new(EntityKind::Type, "src/Car.php", "Engine");
    let vehicle = EntityId::new(EntityKind::Type, "src/Car.php", "Vehicle");
    assert!(result.graph.has_edge(&car, &vehicle, RelationKind::Inherits));
    assert!(result.graph.has_edge(&car, &engine, RelationKind::Composes));
}

#[test]
fn php_fallback_marks_records_best_effort() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/Car.php",
        "<?php\nnamespace App;\n\nclass Car extends Vehicle\n{\n    public function drive(int $speed): bool\n    {\n        return true;\n    }\n}\n",
    );

    let mut config = AnalysisConfig::default();
    config.languages.python.enabled = false;
    config.languages.javascript.enabled = false;
    config.languages.typescript.enabled = false;
    config.php_use_fallback = true;

    let result = analyze(dir.path(), &config).unwrap();
    let car = result.find_type("Car").unwrap();
    assert!(car.best_effort);
    assert_eq!(car.bases[0].text, "Vehicle");
}

#[test]
fn invalid_configuration_is_fatal_before_io() {
    let mut config = python_config();
    config.flow.max_depth = 0;
    let err = analyze(Path::new("/nonexistent-root"), &config).unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));
}

#[test]
fn explicit_entry_points_limit_flows() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app.py",
        "def main():\n    helper()\n\ndef helper():\n    other()\n\ndef other():\n    pass\n",
    );

    let mut config = python_config();
    config.flow.entry_points = Some(vec![lattice_core::config::EntryPoint::Function {
        module: "app.py".to_string(),
        function: "main".to_string(),
    }]);
    let result = analyze(dir.path(), &config).unwrap();

    assert_eq!(result.flows.len(), 1);
    let entry = EntityId::new(EntityKind::Routine, "app.py", "main");
    assert!(result.flows.contains_key(&entry));
}

#[test]
fn summary_counts_terminals() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "s.py", "def go():\n    missing()\n");

    let result = analyze(dir.path(), &python_config()).unwrap();
    assert_eq!(result.summary.terminals.get("unresolved"), Some(&1));
    assert_eq!(result.summary.modules, 1);
}
