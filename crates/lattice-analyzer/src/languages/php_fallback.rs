//! Degraded PHP reader
//!
//! Used when the `php-ast` grammar is not compiled in, or when forced by
//! configuration. Extracts a strict subset (namespaces, `use` imports,
//! class/interface/trait names with their inheritance clauses, method
//! signatures, preceding doc-blocks) and marks every record best-effort
//! so downstream consumers can treat it cautiously.

use std::sync::OnceLock;

use regex::Regex;

use lattice_core::model::{
    Import, ImportShape, ImportedName, Parameter, Receiver, Span, TypeKind, Variadic, Visibility,
};

use crate::docparse;
use crate::extractor::{ExtractOptions, FrontEndError, SourceFile, count_lines};
use crate::records::{FileRecord, RoutineRecord, TypeRecord};

fn namespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*namespace\s+([\w\\]+)\s*[;{]").unwrap())
}

fn use_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*use\s+([\w\\]+)(?:\s+as\s+(\w+))?\s*;").unwrap()
    })
}

fn type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(abstract|final)\s+)?(class|interface|trait|enum)\s+(\w+)(?:\s+extends\s+([\w\\,\s]+?))?(?:\s+implements\s+([\w\\,\s]+?))?\s*\{?\s*$",
        )
        .unwrap()
    })
}

fn method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:(public|protected|private)\s+)?(?:(static)\s+)?(?:(abstract)\s+)?function\s+(\w+)\s*\(([^)]*)\)(?:\s*:\s*([\w\\?|]+))?",
        )
        .unwrap()
    })
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([\w\\?|]+)\s+)?(\.\.\.)?\$(\w+)\s*(=)?").unwrap()
    })
}

pub fn parse(
    file: &SourceFile,
    source: &str,
    options: &ExtractOptions,
) -> Result<FileRecord, FrontEndError> {
    if !source.contains("<?php") && !source.contains("<?=") {
        return Err(FrontEndError::tokenize("no PHP open tag found"));
    }

    let mut record = FileRecord {
        rel_path: file.rel_path.clone(),
        language: Some(file.language),
        loc: count_lines(source),
        best_effort: true,
        ..FileRecord::default()
    };

    let lines: Vec<&str> = source.lines().collect();
    let mut current_type: Option<usize> = None;
    let mut pending_doc: Option<String> = None;
    let mut doc_buffer: Option<String> = None;

    for (index, raw) in lines.iter().enumerate() {
        let line_no = index as u32 + 1;
        let trimmed = raw.trim();

        // Doc-block accumulation: `/** … */` directly above a declaration.
        if let Some(buffer) = doc_buffer.as_mut() {
            buffer.push('\n');
            buffer.push_str(trimmed);
            if trimmed.ends_with("*/") {
                pending_doc = doc_buffer.take();
            }
            continue;
        }
        if trimmed.starts_with("/**") {
            if trimmed.ends_with("*/") && trimmed.len() > 4 {
                pending_doc = Some(trimmed.to_string());
            } else {
                doc_buffer = Some(trimmed.to_string());
            }
            continue;
        }

        if let Some(caps) = namespace_re().captures(raw) {
            record.namespace = caps[1].split('\\').map(|s| s.to_string()).collect();
            pending_doc = None;
            continue;
        }
        if current_type.is_none() {
            if let Some(caps) = use_re().captures(raw) {
                let path = caps[1].to_string();
                let short = path.rsplit('\\').next().unwrap_or(&path).to_string();
                record.imports.push(Import {
                    shape: ImportShape::Named,
                    module: path,
                    names: vec![ImportedName {
                        name: short,
                        alias: caps.get(2).map(|a| a.as_str().to_string()),
                    }],
                    relative_depth: 0,
                    line: line_no,
                    resolved: None,
                });
                pending_doc = None;
                continue;
            }
        }
        if let Some(caps) = type_re().captures(raw) {
            let kind = match &caps[2] {
                "interface" => TypeKind::Interface,
                "trait" => TypeKind::Trait,
                "enum" => TypeKind::Enum,
                _ => TypeKind::Class,
            };
            let name = caps[3].to_string();
            let split_names = |text: &str| -> Vec<String> {
                text.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            };
            let mut bases = caps.get(4).map(|m| split_names(m.as_str())).unwrap_or_default();
            let mut interfaces = caps
                .get(5)
                .map(|m| split_names(m.as_str()))
                .unwrap_or_default();
            if kind == TypeKind::Interface {
                interfaces.append(&mut bases);
            }
            record.types.push(TypeRecord {
                kind,
                name: name.clone(),
                qualified: name,
                bases,
                interfaces,
                traits_used: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
                span: Span::new(line_no, line_no),
                doc: options
                    .detect_docstrings
                    .then(|| pending_doc.take().map(|d| docparse::parse_phpdoc(&d)))
                    .flatten(),
                visibility: Visibility::Public,
                is_abstract: caps.get(1).is_some_and(|m| m.as_str() == "abstract"),
                is_final: caps.get(1).is_some_and(|m| m.as_str() == "final"),
                decorators: Vec::new(),
                best_effort: true,
            });
            current_type = Some(record.types.len() - 1);
            pending_doc = None;
            continue;
        }
        if let Some(caps) = method_re().captures(raw) {
            let mut routine = RoutineRecord::named(caps[4].to_string());
            routine.visibility = match caps.get(1).map(|m| m.as_str()) {
                Some("private") => Visibility::Private,
                Some("protected") => Visibility::Protected,
                _ => Visibility::Public,
            };
            routine.is_static = caps.get(2).is_some();
            routine.is_abstract = caps.get(3).is_some();
            routine.span = Span::new(line_no, line_no);
            routine.params = parse_params(caps.get(5).map(|m| m.as_str()).unwrap_or(""), options);
            if options.detect_types {
                routine.return_annotation = caps.get(6).map(|m| m.as_str().to_string());
            }
            routine.doc = options
                .detect_docstrings
                .then(|| pending_doc.take().map(|d| docparse::parse_phpdoc(&d)))
                .flatten();
            routine.best_effort = true;

            match current_type {
                Some(index) => {
                    routine.receiver = Receiver::Instance;
                    record.types[index].methods.push(routine);
                }
                None => record.routines.push(routine),
            }
            pending_doc = None;
            continue;
        }
        if !trimmed.is_empty() && !trimmed.starts_with("//") && !trimmed.starts_with('*') {
            pending_doc = None;
        }
        // A closing brace in column zero ends the current type body.
        if raw.starts_with('}') {
            current_type = None;
        }
    }

    Ok(record)
}

fn parse_params(text: &str, options: &ExtractOptions) -> Vec<Parameter> {
    let mut out = Vec::new();
    for piece in text.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if let Some(caps) = param_re().captures(piece) {
            out.push(Parameter {
                name: caps[3].to_string(),
                annotation: if options.detect_types {
                    caps.get(1).map(|m| m.as_str().to_string())
                } else {
                    None
                },
                has_default: caps.get(4).is_some(),
                variadic: if caps.get(2).is_some() {
                    Variadic::Args
                } else {
                    Variadic::No
                },
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_core::model::Language;
    use std::path::PathBuf;

    fn parse_src(source: &str) -> FileRecord {
        let file = SourceFile {
            abs_path: PathBuf::from("/project/Car.php"),
            rel_path: "Car.php".to_string(),
            language: Language::Php,
        };
        let options = ExtractOptions {
            detect_docstrings: true,
            detect_types: true,
        };
        parse(&file, source, &options).unwrap()
    }

    #[test]
    fn reads_strict_subset() {
        let record = parse_src(
            "<?php\nnamespace App;\n\nuse App\\Engine;\n\nclass Car extends Vehicle implements Drivable\n{\n    /**\n     * @param int $speed\n     */\n    public function drive(int $speed, Driver $driver = null): bool\n    {\n        return true;\n    }\n}\n",
        );
        assert!(record.best_effort);
        assert_eq!(record.namespace, vec!["App"]);
        assert_eq!(record.imports[0].module, "App\\Engine");

        let car = &record.types[0];
        assert!(car.best_effort);
        assert_eq!(car.bases, vec!["Vehicle"]);
        assert_eq!(car.interfaces, vec!["Drivable"]);

        let drive = &car.methods[0];
        assert_eq!(drive.params.len(), 2);
        assert_eq!(drive.params[0].name, "speed");
        assert_eq!(drive.params[0].annotation.as_deref(), Some("int"));
        assert!(drive.params[1].has_default);
        assert_eq!(drive.return_annotation.as_deref(), Some("bool"));
        assert_eq!(drive.doc.as_ref().unwrap().params[0].name, "speed");
    }

    #[test]
    fn requires_open_tag() {
        let file = SourceFile {
            abs_path: PathBuf::from("/project/nope.php"),
            rel_path: "nope.php".to_string(),
            language: Language::Php,
        };
        let options = ExtractOptions {
            detect_docstrings: true,
            detect_types: true,
        };
        assert!(parse(&file, "plain text", &options).is_err());
    }
}
