//! Wire protocol for the out-of-process JS/TS helper
//!
//! One JSON frame per line over stdin/stdout. The helper announces itself
//! with a hello frame, then answers one response per request. Source text
//! travels inside the request frame, so framing stays newline-delimited.

use serde::{Deserialize, Serialize};

use lattice_core::diagnostics::ParseStage;

use crate::records::FileRecord;

/// Grammar the helper should use for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl Dialect {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" => Some(Dialect::JavaScript),
            "jsx" => Some(Dialect::Jsx),
            "ts" | "mts" | "cts" => Some(Dialect::TypeScript),
            "tsx" => Some(Dialect::Tsx),
            _ => None,
        }
    }
}

/// Emitted once when the helper is ready to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperHello {
    pub ready: bool,
    pub version: String,
}

impl HelperHello {
    pub fn current() -> Self {
        HelperHello {
            ready: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One file to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperRequest {
    pub id: u64,
    /// Forward-slash path relative to the project root; lands in the record.
    pub rel_path: String,
    pub dialect: Dialect,
    pub detect_docstrings: bool,
    pub detect_types: bool,
    pub source: String,
}

/// The helper's answer: the normalised record, or a staged failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperResponse {
    pub id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ParseStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<FileRecord>,
}

impl HelperResponse {
    pub fn success(id: u64, record: FileRecord) -> Self {
        HelperResponse {
            id,
            ok: true,
            stage: None,
            error: None,
            record: Some(record),
        }
    }

    pub fn failure(id: u64, stage: ParseStage, error: impl Into<String>) -> Self {
        HelperResponse {
            id,
            ok: false,
            stage: Some(stage),
            error: Some(error.into()),
            record: None,
        }
    }
}
