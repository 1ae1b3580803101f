//! Analysis configuration
//!
//! The core never reads configuration files; consumers construct these
//! structs (they derive serde both ways for that purpose) and validation
//! runs before any file is opened.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::graph::RelationKind;
use crate::model::Language;

/// Per-language front-end switch and extension set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub enabled: bool,
    /// Extensions (without the dot) the walker routes to this front-end.
    pub extensions: Vec<String>,
}

impl LanguageConfig {
    fn defaults_for(language: Language) -> Self {
        LanguageConfig {
            enabled: true,
            extensions: language
                .default_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Front-end switches, one per supported language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagesConfig {
    pub python: LanguageConfig,
    pub php: LanguageConfig,
    pub javascript: LanguageConfig,
    pub typescript: LanguageConfig,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        LanguagesConfig {
            python: LanguageConfig::defaults_for(Language::Python),
            php: LanguageConfig::defaults_for(Language::Php),
            javascript: LanguageConfig::defaults_for(Language::JavaScript),
            typescript: LanguageConfig::defaults_for(Language::TypeScript),
        }
    }
}

impl LanguagesConfig {
    pub fn get(&self, language: Language) -> &LanguageConfig {
        match language {
            Language::Python => &self.python,
            Language::Php => &self.php,
            Language::JavaScript => &self.javascript,
            Language::TypeScript => &self.typescript,
        }
    }

    /// Extension → language map over enabled front-ends.
    pub fn extension_map(&self) -> HashMap<String, Language> {
        let mut map = HashMap::new();
        for language in Language::all() {
            let cfg = self.get(language);
            if !cfg.enabled {
                continue;
            }
            for ext in &cfg.extensions {
                map.insert(ext.to_ascii_lowercase(), language);
            }
        }
        map
    }
}

/// An explicit flow entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// (class, method) pair.
    Method { type_name: String, method: String },
    /// (module, function) pair; the module is a project-relative path.
    Function { module: String, function: String },
}

/// Flow analyzer bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Call-chain recursion bound, ≥ 1.
    pub max_depth: u32,
    /// Explicit entries; when absent every public routine is an entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<Vec<EntryPoint>>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            max_depth: 5,
            entry_points: None,
        }
    }
}

/// Which non-inheritance edge kinds the detector computes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub detect: BTreeSet<RelationKind>,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        let mut detect = BTreeSet::new();
        detect.insert(RelationKind::Imports);
        detect.insert(RelationKind::Composes);
        detect.insert(RelationKind::Aggregates);
        detect.insert(RelationKind::Associates);
        RelationshipConfig { detect }
    }
}

/// Out-of-process JS/TS helper settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Command line to launch; when absent the bundled helper binary next
    /// to the current executable is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Bounded number of helper processes.
    pub pool_size: usize,
    /// Per-request timeout; expiry is a per-file parse failure.
    pub timeout_ms: u64,
}

impl Default for HelperConfig {
    fn default() -> Self {
        HelperConfig {
            command: None,
            pool_size: 2,
            timeout_ms: 10_000,
        }
    }
}

/// Top-level analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory names pruned during the walk, matched against every path
    /// component.
    pub exclude_dirs: Vec<String>,
    /// Filename globs skipped before inspection.
    pub exclude_files: Vec<String>,
    pub languages: LanguagesConfig,
    pub detect_docstrings: bool,
    pub detect_types: bool,
    pub flow: FlowConfig,
    pub relationships: RelationshipConfig,
    pub js_helper: HelperConfig,
    /// Force the degraded PHP reader even when the grammar is compiled in.
    pub php_use_fallback: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            exclude_dirs: [
                ".git",
                "__pycache__",
                "node_modules",
                "vendor",
                ".venv",
                "venv",
                "dist",
                "build",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_files: vec!["*.min.js".to_string(), "*.d.ts".to_string()],
            languages: LanguagesConfig::default(),
            detect_docstrings: true,
            detect_types: true,
            flow: FlowConfig::default(),
            relationships: RelationshipConfig::default(),
            js_helper: HelperConfig::default(),
            php_use_fallback: false,
        }
    }
}

impl AnalysisConfig {
    /// Validate before any I/O. Violations are fatal.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.flow.max_depth < 1 {
            return Err(AnalysisError::Config(format!(
                "flow.max_depth must be ≥ 1, got {}",
                self.flow.max_depth
            )));
        }
        if self.js_helper.pool_size < 1 {
            return Err(AnalysisError::Config(
                "js_helper.pool_size must be ≥ 1".to_string(),
            ));
        }
        if self.js_helper.timeout_ms == 0 {
            return Err(AnalysisError::Config(
                "js_helper.timeout_ms must be non-zero".to_string(),
            ));
        }

        let mut claimed: HashMap<String, Language> = HashMap::new();
        for language in Language::all() {
            let cfg = self.languages.get(language);
            if !cfg.enabled {
                continue;
            }
            if cfg.extensions.is_empty() {
                return Err(AnalysisError::Config(format!(
                    "language `{}` is enabled with an empty extension set",
                    language.name()
                )));
            }
            for ext in &cfg.extensions {
                let ext = ext.trim_start_matches('.').to_ascii_lowercase();
                if ext.is_empty() {
                    return Err(AnalysisError::Config(format!(
                        "language `{}` declares an empty extension",
                        language.name()
                    )));
                }
                if let Some(previous) = claimed.insert(ext.clone(), language) {
                    if previous != language {
                        return Err(AnalysisError::Config(format!(
                            "extension `{}` is claimed by both `{}` and `{}`",
                            ext,
                            previous.name(),
                            language.name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
