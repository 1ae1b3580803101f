//! Non-fatal findings accumulated across a run

use serde::{Deserialize, Serialize};

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An entry could not be accessed during the walk.
    WalkFailure,
    /// A front-end could not build records for a file.
    ParseFailure,
    /// A reference bound to External.
    ResolutionMiss,
    /// The JS/TS helper could not be started; the front-end is disabled.
    HelperUnavailable,
    /// Two entities claimed one identifier; an ordinal was appended.
    IdentifierDisambiguated,
}

/// The front-end stage where a parse failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    Tokenize,
    Parse,
    Extract,
}

/// One diagnostic entry. Non-fatal by definition; fatal conditions are
/// [`crate::error::AnalysisError`] variants instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Forward-slash path relative to the project root; empty when the
    /// diagnostic is not tied to a file.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Reporting front-end, where applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ParseStage>,
    pub message: String,
}

impl Diagnostic {
    pub fn walk_failure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::WalkFailure,
            path: path.into(),
            line: None,
            front_end: None,
            stage: None,
            message: message.into(),
        }
    }

    pub fn parse_failure(
        path: impl Into<String>,
        front_end: impl Into<String>,
        stage: ParseStage,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind: DiagnosticKind::ParseFailure,
            path: path.into(),
            line: None,
            front_end: Some(front_end.into()),
            stage: Some(stage),
            message: message.into(),
        }
    }

    pub fn resolution_miss(path: impl Into<String>, line: Option<u32>, message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::ResolutionMiss,
            path: path.into(),
            line,
            front_end: None,
            stage: None,
            message: message.into(),
        }
    }

    pub fn helper_unavailable(message: impl Into<String>) -> Self {
        Diagnostic {
            kind: DiagnosticKind::HelperUnavailable,
            path: String::new(),
            line: None,
            front_end: Some("javascript".to_string()),
            stage: None,
            message: message.into(),
        }
    }
}
