//! Pipeline orchestration
//!
//! One logical pass with hard phase boundaries: Walk → Parse (per file,
//! parallel) → Build → Detect → Analyze. The builder never observes a
//! partial parse; parallel parse output is consumed in the walker's stable
//! path order, so identifiers never depend on task completion order.

use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use lattice_core::cancel::CancelToken;
use lattice_core::config::AnalysisConfig;
use lattice_core::diagnostics::Diagnostic;
use lattice_core::error::{AnalysisError, Phase};
use lattice_core::graph::RelationGraph;
use lattice_core::result::{AnalysisResult, Summary};

use crate::builder;
use crate::extractor::ExtractOptions;
use crate::flow;
use crate::languages::FrontEndSet;
use crate::records::FileRecord;
use crate::relationships;
use crate::walker::walk_project;

/// Analyse a project tree. The single public operation of the core.
pub fn analyze(root: &Path, config: &AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
    analyze_with_cancel(root, config, CancelToken::new())
}

pub fn analyze_with_cancel(
    root: &Path,
    config: &AnalysisConfig,
    cancel: CancelToken,
) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();

    // ── Walk ────────────────────────────────────────────────
    let files = walk_project(root, config, &mut diagnostics)?;
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled { phase: Phase::Walk });
    }

    // ── Parse ───────────────────────────────────────────────
    let front_ends = FrontEndSet::from_config(config, &mut diagnostics);
    let options = ExtractOptions {
        detect_docstrings: config.detect_docstrings,
        detect_types: config.detect_types,
    };

    enum Outcome {
        Record(Box<FileRecord>),
        Failed(Box<Diagnostic>),
        Skipped,
    }

    // Records are value-typed and independent; the fan-out is safe and the
    // ordered collect keeps the merge deterministic.
    let outcomes: Vec<Outcome> = files
        .par_iter()
        .map(|file| {
            if cancel.is_cancelled() {
                return Outcome::Skipped;
            }
            let Some(front_end) = front_ends.for_language(file.language) else {
                return Outcome::Skipped;
            };
            let source = match std::fs::read_to_string(&file.abs_path) {
                Ok(source) => source,
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    return Outcome::Failed(Box::new(Diagnostic::parse_failure(
                        file.rel_path.clone(),
                        front_end.name(),
                        lattice_core::diagnostics::ParseStage::Tokenize,
                        "source is not valid UTF-8",
                    )));
                }
                Err(err) => {
                    return Outcome::Failed(Box::new(Diagnostic::walk_failure(
                        file.rel_path.clone(),
                        err.to_string(),
                    )));
                }
            };
            match front_end.parse_file(file, &source, &options) {
                Ok(record) => Outcome::Record(Box::new(record)),
                Err(err) => Outcome::Failed(Box::new(Diagnostic::parse_failure(
                    file.rel_path.clone(),
                    front_end.name(),
                    err.stage,
                    err.message,
                ))),
            }
        })
        .collect();

    // The helper pool's lifetime is the parse phase.
    front_ends.shutdown();

    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled {
            phase: Phase::Parse,
        });
    }

    let mut records = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Record(record) => records.push(*record),
            Outcome::Failed(diagnostic) => diagnostics.push(*diagnostic),
            Outcome::Skipped => {}
        }
    }
    debug!(
        parsed = records.len(),
        skipped = files.len() - records.len(),
        "parse phase complete"
    );

    // ── Build ───────────────────────────────────────────────
    let mut graph = RelationGraph::new();
    let built = builder::build(&records, &mut graph, &mut diagnostics)?;
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled {
            phase: Phase::Build,
        });
    }

    // ── Detect ──────────────────────────────────────────────
    relationships::detect(&built.model, &built.resolver, config, &mut graph, &cancel)?;

    // ── Analyze ─────────────────────────────────────────────
    let flows = flow::analyze(
        &built.model,
        &built.resolver,
        config,
        &mut graph,
        &mut diagnostics,
        &cancel,
    )?;

    let summary = Summary::compute(&built.model, &graph, &flows, &diagnostics);
    info!(
        modules = summary.modules,
        types = summary.types,
        routines = summary.routines,
        edges = graph.edge_count(),
        "analysis complete"
    );

    Ok(AnalysisResult {
        model: built.model,
        graph,
        flows,
        diagnostics,
        summary,
    })
}
