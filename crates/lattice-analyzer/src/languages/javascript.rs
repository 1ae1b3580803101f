//! JS/TS front-end — client side of the out-of-process helper
//!
//! Parsing happens in `lattice-jshelper`; this side frames requests,
//! enforces the per-request timeout through the pool, and hands back the
//! normalised records. If the helper cannot be launched the front-end is
//! absent for the run and the pipeline degrades per the error policy.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;

use lattice_core::config::HelperConfig;

use crate::extractor::{ExtractOptions, FrontEnd, FrontEndError, SourceFile};
use crate::helper_pool::JsHelperPool;
use crate::jsproto::{Dialect, HelperRequest};
use crate::records::FileRecord;

pub struct JsFrontEnd {
    pool: JsHelperPool,
    next_id: AtomicU64,
}

impl JsFrontEnd {
    pub fn start(config: &HelperConfig) -> Result<Self> {
        Ok(JsFrontEnd {
            pool: JsHelperPool::start(config)?,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

impl FrontEnd for JsFrontEnd {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn parse_file(
        &self,
        file: &SourceFile,
        source: &str,
        options: &ExtractOptions,
    ) -> Result<FileRecord, FrontEndError> {
        let ext = file
            .rel_path
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let dialect = Dialect::from_extension(&ext)
            .ok_or_else(|| FrontEndError::tokenize(format!("unrecognised extension `.{ext}`")))?;

        let request = HelperRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            rel_path: file.rel_path.clone(),
            dialect,
            detect_docstrings: options.detect_docstrings,
            detect_types: options.detect_types,
            source: source.to_string(),
        };
        self.pool.request(&request)
    }
}
