//! Front-end capability contract

use std::path::PathBuf;

use lattice_core::diagnostics::ParseStage;
use lattice_core::model::Language;

use crate::records::FileRecord;

/// A file the walker routed to a front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub abs_path: PathBuf,
    /// Forward-slash path relative to the project root.
    pub rel_path: String,
    pub language: Language,
}

/// Extraction switches shared by every front-end.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub detect_docstrings: bool,
    pub detect_types: bool,
}

/// A per-file front-end failure. Never propagates beyond the file; the
/// pipeline turns it into one ParseFailure diagnostic.
#[derive(Debug, Clone)]
pub struct FrontEndError {
    pub stage: ParseStage,
    pub message: String,
}

impl FrontEndError {
    pub fn tokenize(message: impl Into<String>) -> Self {
        FrontEndError {
            stage: ParseStage::Tokenize,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        FrontEndError {
            stage: ParseStage::Parse,
            message: message.into(),
        }
    }

    pub fn extract(message: impl Into<String>) -> Self {
        FrontEndError {
            stage: ParseStage::Extract,
            message: message.into(),
        }
    }
}

/// One per language family. Implementations differ radically in how they
/// obtain the records (in-process grammar, regex fallback, out-of-process
/// helper); only the output schema is shared.
pub trait FrontEnd: Send + Sync {
    fn name(&self) -> &'static str;

    fn parse_file(
        &self,
        file: &SourceFile,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<FileRecord, FrontEndError>;
}

/// Line count used for module LOC accounting.
pub fn count_lines(source: &str) -> u32 {
    source.lines().count() as u32
}
