//! Fatal error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline phase, used in cancellation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Walk,
    Parse,
    Build,
    Detect,
    Analyze,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Walk => "walk",
            Phase::Parse => "parse",
            Phase::Build => "build",
            Phase::Detect => "detect",
            Phase::Analyze => "analyze",
        }
    }
}

/// Errors that abort the pipeline. Everything recoverable is a
/// [`crate::diagnostics::Diagnostic`] instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid configuration, detected before any file is opened.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Two entities claim the same identifier even after disambiguation.
    #[error("identifier collision on `{id}` between {first} and {second}")]
    IdentifierCollision {
        id: String,
        first: String,
        second: String,
    },

    /// Cancellation observed between or within phases; the partial model
    /// is discarded and marked incomplete.
    #[error("analysis cancelled during {} phase", phase.name())]
    Cancelled { phase: Phase },
}
