//! Language front-ends
//!
//! One module per supported family. Python and PHP parse in-process through
//! the shared tree-sitter pool; JS/TS delegates to the out-of-process
//! helper. Each front-end owns its syntax; only the record schema is shared.

pub mod javascript;
pub mod js_extract;
pub mod php;
pub mod php_fallback;
pub mod python;

use lattice_core::config::AnalysisConfig;
use lattice_core::diagnostics::Diagnostic;
use lattice_core::model::Language;

use crate::extractor::FrontEnd;
use crate::parser_pool::ParserPool;

/// The front-ends participating in one analysis pass.
pub struct FrontEndSet {
    python: Option<python::PythonFrontEnd>,
    php: Option<php::PhpFrontEnd>,
    js: Option<javascript::JsFrontEnd>,
}

impl FrontEndSet {
    /// Build the enabled front-ends. A JS/TS helper that cannot start
    /// disables that front-end and reports it; the pass continues.
    pub fn from_config(config: &AnalysisConfig, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let needs_pool =
            config.languages.python.enabled || (config.languages.php.enabled && !config.php_use_fallback);
        let pool = needs_pool.then(ParserPool::with_default_size);

        let python = match (config.languages.python.enabled, pool.clone()) {
            (true, Some(pool)) => Some(python::PythonFrontEnd::new(pool)),
            _ => None,
        };

        let php = config
            .languages
            .php
            .enabled
            .then(|| php::PhpFrontEnd::new(pool.clone(), config.php_use_fallback));

        let js = if config.languages.javascript.enabled || config.languages.typescript.enabled {
            match javascript::JsFrontEnd::start(&config.js_helper) {
                Ok(front_end) => Some(front_end),
                Err(err) => {
                    tracing::warn!(error = %err, "JS/TS helper unavailable, front-end disabled");
                    diagnostics.push(Diagnostic::helper_unavailable(err.to_string()));
                    None
                }
            }
        } else {
            None
        };

        FrontEndSet { python, php, js }
    }

    /// The front-end responsible for a language, if it is running.
    pub fn for_language(&self, language: Language) -> Option<&dyn FrontEnd> {
        match language {
            Language::Python => self.python.as_ref().map(|f| f as &dyn FrontEnd),
            Language::Php => self.php.as_ref().map(|f| f as &dyn FrontEnd),
            Language::JavaScript | Language::TypeScript => {
                self.js.as_ref().map(|f| f as &dyn FrontEnd)
            }
        }
    }

    /// Release the helper pool once the parse phase is over.
    pub fn shutdown(self) {
        if let Some(js) = self.js {
            js.shutdown();
        }
    }
}
