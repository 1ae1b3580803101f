//! Source walker — deterministic, exclusion-aware file enumeration

use std::collections::HashMap;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use lattice_core::config::AnalysisConfig;
use lattice_core::diagnostics::Diagnostic;
use lattice_core::error::AnalysisError;
use lattice_core::model::Language;

use crate::extractor::SourceFile;

/// Walk the project root and collect every regular file whose extension maps
/// to an enabled front-end. Output is sorted lexicographically by relative
/// path so downstream identifier assignment is deterministic. Unreadable
/// entries become diagnostics, never errors.
pub fn walk_project(
    root: &Path,
    config: &AnalysisConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<SourceFile>, AnalysisError> {
    let extensions: HashMap<String, Language> = config.languages.extension_map();
    let exclude_files = build_globset(&config.exclude_files)?;

    let mut walker = WalkBuilder::new(root);
    walker
        .follow_links(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .hidden(false)
        .sort_by_file_path(|a, b| a.cmp(b));

    let exclude_dirs = config.exclude_dirs.clone();
    walker.filter_entry(move |entry| {
        if entry.file_type().is_some_and(|t| t.is_dir()) {
            let name = entry.file_name().to_string_lossy();
            return !exclude_dirs.iter().any(|d| d.as_str() == name);
        }
        true
    });

    let mut files = Vec::new();
    for entry in walker.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // The error display names the offending path already.
                diagnostics.push(Diagnostic::walk_failure(String::new(), err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        if exclude_files.is_match(name.as_ref()) {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let Some(language) = extensions.get(&ext.to_ascii_lowercase()).copied() else {
            continue;
        };
        files.push(SourceFile {
            abs_path: path.to_path_buf(),
            rel_path: relative_display(root, path),
            language,
        });
    }

    // sort_by_file_path already orders the walk, but re-sorting on the
    // normalised relative path keeps the contract independent of platform
    // separators.
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!(count = files.len(), "walk complete");
    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| AnalysisError::Config(format!("bad exclude glob `{pattern}`: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::Config(format!("exclude glob set: {e}")))
}

/// Forward-slash path relative to the root.
fn relative_display(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut out = String::new();
    for component in rel.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    #[test]
    fn walk_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.py"));
        touch(&root.join("a.py"));
        touch(&root.join("sub/c.py"));
        touch(&root.join("node_modules/skip.py"));
        touch(&root.join("notes.txt"));

        let config = AnalysisConfig::default();
        let mut diagnostics = Vec::new();
        let files = walk_project(root, &config, &mut diagnostics).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "b.py", "sub/c.py"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn exclude_file_globs_apply() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("app.js"));
        touch(&root.join("app.min.js"));

        let config = AnalysisConfig::default();
        let mut diagnostics = Vec::new();
        let files = walk_project(root, &config, &mut diagnostics).unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["app.js"]);
    }

    #[test]
    fn bad_glob_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::default();
        config.exclude_files.push("[".to_string());
        let mut diagnostics = Vec::new();
        assert!(walk_project(dir.path(), &config, &mut diagnostics).is_err());
    }
}
