//! End-to-end scenarios over scratch projects
//!
//! These drive the public `analyze` operation the way a renderer would,
//! including the real out-of-process JS/TS helper binary.

use std::fs;
use std::path::Path;

use lattice::model::{EntityId, EntityKind};
use lattice::{AnalysisConfig, DiagnosticKind, RelationKind, Terminal, aggregate_module_edges};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Point the analyzer at the freshly-built helper binary so the tests do
/// not depend on install layout.
fn config_with_helper() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.js_helper.command = Some(vec![env!("CARGO_BIN_EXE_lattice-jshelper").to_string()]);
    config
}

#[test]
fn single_language_inheritance() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shapes.py", "class A:\n    pass\n\nclass B(A):\n    pass\n");

    let mut config = config_with_helper();
    config.languages.javascript.enabled = false;
    config.languages.typescript.enabled = false;
    config.languages.php.enabled = false;
    let result = lattice::analyze(dir.path(), &config).unwrap();

    assert_eq!(result.summary.types, 2);
    let a = EntityId::new(EntityKind::Type, "shapes.py", "A");
    let b = EntityId::new(EntityKind::Type, "shapes.py", "B");
    assert!(result.graph.has_edge(&b, &a, RelationKind::Inherits));
    assert_eq!(result.graph.edge_count(), 1);

    let b_decl = result.model.types.get(&b).unwrap();
    assert!(b_decl.methods.is_empty());
    assert!(result.flows.is_empty());
}

#[test]
fn composition_and_aggregation_coexist() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "car.py",
        "class Engine:\n    pass\n\nclass Driver:\n    pass\n\nclass Car:\n    def __init__(self, driver: Driver):\n        self.engine = Engine()\n        self.driver = driver\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();

    let car = EntityId::new(EntityKind::Type, "car.py", "Car");
    let engine = EntityId::new(EntityKind::Type, "car.py", "Engine");
    let driver = EntityId::new(EntityKind::Type, "car.py", "Driver");
    assert!(result.graph.has_edge(&car, &engine, RelationKind::Composes));
    assert!(result.graph.has_edge(&car, &driver, RelationKind::Aggregates));
    assert_eq!(result.summary.edges.get("composes"), Some(&1));
    assert_eq!(result.summary.edges.get("aggregates"), Some(&1));
    assert_eq!(result.summary.edges.get("associates"), None);
}

#[test]
fn multi_language_projects_share_one_result() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api/models.py",
        "class Invoice:\n    def total(self):\n        return 0\n",
    );
    write(
        dir.path(),
        "web/invoice.ts",
        "export class InvoiceView {\n  render(): string { return ''; }\n}\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();

    let invoice = result.find_type("Invoice").unwrap();
    let view = result.find_type("InvoiceView").unwrap();
    assert_eq!(invoice.id.as_str(), "type:api/models.py:Invoice");
    assert_eq!(view.id.as_str(), "type:web/invoice.ts:InvoiceView");

    // No cross-language edges are ever inferred.
    assert!(
        !result
            .graph
            .all_edges()
            .any(|e| e.source.as_str().contains("models.py")
                && e.target.as_str().contains("invoice.ts"))
    );
    assert_eq!(result.summary.modules, 2);
}

#[test]
fn typescript_pipeline_through_helper() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/engine.ts",
        "export class Engine {\n  start(): boolean { return true; }\n}\n",
    );
    write(
        dir.path(),
        "src/car.ts",
        "import { Engine } from './engine';\n\nexport class Car {\n  private engine: Engine;\n  constructor() {\n    this.engine = new Engine();\n  }\n  drive(): void {\n    this.engine.start();\n  }\n}\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();

    let car = EntityId::new(EntityKind::Type, "src/car.ts", "Car");
    let engine = EntityId::new(EntityKind::Type, "src/engine.ts", "Engine");
    let car_module = EntityId::new(EntityKind::Module, "src/car.ts", "src.car");
    let engine_module = EntityId::new(EntityKind::Module, "src/engine.ts", "src.engine");

    assert!(result.graph.has_edge(&car, &engine, RelationKind::Composes));
    assert!(
        result
            .graph
            .has_edge(&car_module, &engine_module, RelationKind::Imports)
    );

    let drive = EntityId::new(EntityKind::Routine, "src/car.ts", "Car.drive");
    let start = EntityId::new(EntityKind::Routine, "src/engine.ts", "Engine.start");
    let traces = result.traces_for(&drive);
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].hops[0].callee, start);
    assert_eq!(traces[0].terminal, Terminal::Leaf);
}

#[test]
fn php_and_python_analyse_together() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "backend/app.py",
        "class Exporter:\n    def run(self):\n        self.publish()\n    def publish(self):\n        pass\n",
    );
    write(
        dir.path(),
        "legacy/Order.php",
        "<?php\nnamespace Legacy;\n\ninterface Payable {\n    public function pay(): void;\n}\n\nclass Order implements Payable {\n    public function pay(): void {}\n}\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();

    let order = EntityId::new(EntityKind::Type, "legacy/Order.php", "Order");
    let payable = EntityId::new(EntityKind::Type, "legacy/Order.php", "Payable");
    assert!(result.graph.has_edge(&order, &payable, RelationKind::Implements));
    assert!(result.find_type("Exporter").is_some());
}

#[test]
fn degraded_js_run_completes() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.ts", "export class A {}\n");
    write(dir.path(), "b.ts", "export class B {}\n");
    write(dir.path(), "keep.py", "class Keep:\n    pass\n");

    let mut config = AnalysisConfig::default();
    config.js_helper.command = Some(vec!["/no/such/helper".to_string()]);
    let result = lattice::analyze(dir.path(), &config).unwrap();

    assert!(result.find_type("A").is_none());
    assert!(result.find_type("B").is_none());
    assert!(result.find_type("Keep").is_some());
    assert_eq!(
        result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::HelperUnavailable)
            .count(),
        1
    );
}

#[test]
fn serialised_results_are_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pkg/__init__.py", "");
    write(
        dir.path(),
        "pkg/service.py",
        "from .store import Store\n\nclass Service:\n    def __init__(self):\n        self.store = Store()\n    def handle(self):\n        self.store.save()\n",
    );
    write(
        dir.path(),
        "pkg/store.py",
        "class Store:\n    def save(self):\n        pass\n",
    );
    write(
        dir.path(),
        "ui/panel.ts",
        "export class Panel {\n  show(): void {}\n}\n",
    );

    let config = config_with_helper();
    let first = lattice::analyze(dir.path(), &config).unwrap().to_json_string();
    let second = lattice::analyze(dir.path(), &config).unwrap().to_json_string();
    assert_eq!(first, second);
}

#[test]
fn persistence_format_has_the_documented_sections() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.py",
        "class Widget:\n    def render(self):\n        helper()\n\ndef helper():\n    pass\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();
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
    let entries = value["flows"]["entries"].as_array().unwrap();
    assert!(!entries.is_empty());
    assert!(entries[0].get("routine_id").is_some());
    assert!(entries[0].get("traces").is_some());

    // Paths are forward-slash and relative; line numbers positive.
    for (_, module) in value["modules"].as_object().unwrap() {
        let path = module["path"].as_str().unwrap();
        assert!(!path.starts_with('/'));
        assert!(!path.contains('\\'));
    }
}

#[test]
fn persistence_covers_each_language_family() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api/report.py",
        "class Report:\n    def render(self):\n        return ''\n",
    );
    write(
        dir.path(),
        "legacy/Order.php",
        "<?php\nnamespace Legacy;\n\nclass Order {\n    public function pay(): void {}\n}\n",
    );
    write(
        dir.path(),
        "src/engine.ts",
        "export class Engine {\n  start(): boolean { return true; }\n}\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();
    let value = result.to_json();

    let modules = value["modules"].as_object().unwrap();
    for id in [
        "module:api/report.py:api.report",
        "module:legacy/Order.php:legacy.Order",
        "module:src/engine.ts:src.engine",
    ] {
        assert!(modules.contains_key(id), "missing module {id}");
    }
    let types = value["types"].as_object().unwrap();
    for id in [
        "type:api/report.py:Report",
        "type:legacy/Order.php:Order",
        "type:src/engine.ts:Engine",
    ] {
        assert!(types.contains_key(id), "missing type {id}");
    }

    // The promised qualified-name lookup reaches each family's routines.
    assert!(result.find_routine("api.report.Report.render").is_some());
    assert!(result.find_routine("Legacy\\Order.pay").is_some());
    assert!(result.find_routine("src.engine.Engine.start").is_some());
}

#[test]
fn module_rollup_collapses_member_edges() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "m/__init__.py", "");
    write(dir.path(), "m/base.py", "class Base:\n    pass\n");
    write(
        dir.path(),
        "m/impl.py",
        "from .base import Base\n\nclass One(Base):\n    pass\n\nclass Two(Base):\n    pass\n",
    );

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();
    let rollup = aggregate_module_edges(&result.model, &result.graph);

    let impl_to_base = rollup
        .iter()
        .find(|s| s.source.as_str().contains("impl.py") && s.target.as_str().contains("base.py"))
        .unwrap();
    // Two inherits edges plus the import collapse onto one arrow.
    assert_eq!(impl_to_base.count, 3);
    assert_eq!(impl_to_base.kind_counts.get("inherits"), Some(&2));
    assert_eq!(impl_to_base.kind_counts.get("imports"), Some(&1));
}

#[test]
fn excluded_directories_are_pruned() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src.py", "class Kept:\n    pass\n");
    write(dir.path(), "node_modules/dep.py", "class Dropped:\n    pass\n");

    let result = lattice::analyze(dir.path(), &config_with_helper()).unwrap();
    assert!(result.find_type("Kept").is_some());
    assert!(result.find_type("Dropped").is_none());
}
