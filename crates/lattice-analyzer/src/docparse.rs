//! Structured readers for documentation comments
//!
//! Three Python docstring conventions are supported: keyword-led
//! (`Args:` sections), colon-led (`:param name:` fields), and field-led
//! (underlined `Parameters` sections). PHP doc-blocks and JSDoc blocks are
//! tag-based. Tag parsing is order-insensitive; section headers are
//! style-specific.

use std::sync::OnceLock;

use regex::Regex;

use lattice_core::model::{DocBlock, DocParam};

fn sphinx_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:param\s+(?:(?P<type>[^:]+)\s+)?(?P<name>[\w*]+):\s*(?P<desc>.*)$").unwrap())
}

fn sphinx_returns_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:returns?:\s*(?P<desc>.*)$").unwrap())
}

fn sphinx_raises_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^:raises?\s+(?P<name>[\w.]+):").unwrap())
}

fn keyword_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[\w*]+)\s*(?:\((?P<type>[^)]*)\))?\s*:\s*(?P<desc>.*)$").unwrap()
    })
}

fn phpdoc_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@param\s+(?:(?P<type>[^$\s]+)\s+)?\$(?P<name>\w+)\s*(?P<desc>.*)$").unwrap()
    })
}

fn jsdoc_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@param\s+(?:\{(?P<type>[^}]*)\}\s+)?(?P<name>[\w.$\[\]]+)\s*-?\s*(?P<desc>.*)$")
            .unwrap()
    })
}

fn tag_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{(?P<type>[^}]*)\}\s*(?P<rest>.*)$").unwrap())
}

/// Parse a Python docstring. The raw text is kept verbatim; parameter
/// sections from any of the three conventions populate the structured map.
pub fn parse_python_docstring(text: &str) -> DocBlock {
    let mut block = DocBlock {
        text: text.to_string(),
        ..DocBlock::default()
    };

    let lines: Vec<&str> = text.lines().collect();

    // Colon-led fields can appear anywhere in the body.
    for line in &lines {
        let line = line.trim();
        if let Some(caps) = sphinx_param_re().captures(line) {
            block.params.push(DocParam {
                name: caps["name"].to_string(),
                type_text: caps.name("type").map(|t| t.as_str().trim().to_string()),
                description: caps["desc"].trim().to_string(),
            });
        } else if let Some(caps) = sphinx_returns_re().captures(line) {
            block.returns = Some(caps["desc"].trim().to_string());
        } else if let Some(caps) = sphinx_raises_re().captures(line) {
            block.raises.push(caps["name"].to_string());
        }
    }
    if !block.params.is_empty() || block.returns.is_some() || !block.raises.is_empty() {
        return block;
    }

    // Keyword-led (`Args:`) and field-led (underlined `Parameters`) sections.
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        let lower = line.trim_end_matches(':').to_ascii_lowercase();
        let underlined = i + 1 < lines.len()
            && !lines[i + 1].trim().is_empty()
            && lines[i + 1].trim().chars().all(|c| c == '-');

        match lower.as_str() {
            "args" | "arguments" | "parameters" | "params"
                if line.ends_with(':') || underlined =>
            {
                i += if underlined { 2 } else { 1 };
                i = read_param_section(&lines, i, &mut block);
                continue;
            }
            "returns" | "return" if line.ends_with(':') || underlined => {
                i += if underlined { 2 } else { 1 };
                let mut desc = String::new();
                while i < lines.len() && !lines[i].trim().is_empty() && !is_section_header(&lines, i)
                {
                    if !desc.is_empty() {
                        desc.push(' ');
                    }
                    desc.push_str(lines[i].trim());
                    i += 1;
                }
                if !desc.is_empty() {
                    block.returns = Some(desc);
                }
                continue;
            }
            "raises" | "throws" if line.ends_with(':') || underlined => {
                i += if underlined { 2 } else { 1 };
                while i < lines.len() && !lines[i].trim().is_empty() && !is_section_header(&lines, i)
                {
                    let entry = lines[i].trim();
                    let name = entry
                        .split([':', ' '])
                        .next()
                        .unwrap_or("")
                        .trim();
                    if !name.is_empty() {
                        block.raises.push(name.to_string());
                    }
                    i += 1;
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    block
}

fn is_section_header(lines: &[&str], i: usize) -> bool {
    let line = lines[i].trim();
    let lower = line.trim_end_matches(':').to_ascii_lowercase();
    let known = matches!(
        lower.as_str(),
        "args" | "arguments" | "parameters" | "params" | "returns" | "return" | "raises"
            | "throws" | "yields" | "examples" | "example" | "notes" | "attributes"
    );
    if !known {
        return false;
    }
    let underlined = lines
        .get(i + 1)
        .map(|l| !l.trim().is_empty() && l.trim().chars().all(|c| c == '-'))
        .unwrap_or(false);
    line.ends_with(':') || underlined
}

/// Read `name → description` pairs until a blank line or the next header.
fn read_param_section(lines: &[&str], mut i: usize, block: &mut DocBlock) -> usize {
    while i < lines.len() {
        let raw = lines[i];
        let line = raw.trim();
        if line.is_empty() || is_section_header(lines, i) {
            break;
        }
        // Field-led entries look like `name : type`; keyword-led entries
        // look like `name (type): desc`. Continuation lines are indented
        // deeper and extend the previous description.
        if let Some(caps) = keyword_param_re().captures(line) {
            let name = caps["name"].trim_matches('*').to_string();
            if !name.is_empty() {
                block.params.push(DocParam {
                    name,
                    type_text: caps.name("type").map(|t| t.as_str().trim().to_string()),
                    description: caps["desc"].trim().to_string(),
                });
            }
        } else if let Some(last) = block.params.last_mut() {
            if !last.description.is_empty() {
                last.description.push(' ');
            }
            last.description.push_str(line);
        }
        i += 1;
    }
    i
}

/// Strip `/** … */` framing and leading asterisks.
fn clean_doc_comment(comment: &str) -> String {
    let trimmed = comment
        .trim()
        .trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_end_matches("*/");
    trimmed
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Parse a PHP doc-block comment (`@param`, `@return`, `@throws`).
pub fn parse_phpdoc(comment: &str) -> DocBlock {
    let text = clean_doc_comment(comment);
    let mut block = DocBlock {
        text: text.clone(),
        ..DocBlock::default()
    };

    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = phpdoc_param_re().captures(line) {
            block.params.push(DocParam {
                name: caps["name"].to_string(),
                type_text: caps.name("type").map(|t| t.as_str().to_string()),
                description: caps["desc"].trim().to_string(),
            });
        } else if let Some(rest) = line.strip_prefix("@return") {
            let rest = rest.trim_start_matches("s").trim();
            if !rest.is_empty() {
                block.returns = Some(rest.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("@throws") {
            if let Some(name) = rest.trim().split_whitespace().next() {
                block.raises.push(name.to_string());
            }
        }
    }
    block
}

/// Parse a JSDoc block (`@param {type} name - desc`, `@returns`, `@throws`).
pub fn parse_jsdoc(comment: &str) -> DocBlock {
    let text = clean_doc_comment(comment);
    let mut block = DocBlock {
        text: text.clone(),
        ..DocBlock::default()
    };

    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = jsdoc_param_re().captures(line) {
            block.params.push(DocParam {
                name: caps["name"].to_string(),
                type_text: caps.name("type").map(|t| t.as_str().to_string()),
                description: caps["desc"].trim().to_string(),
            });
        } else if let Some(rest) = line
            .strip_prefix("@returns")
            .or_else(|| line.strip_prefix("@return"))
        {
            let rest = rest.trim();
            let desc = match tag_type_re().captures(rest) {
                Some(caps) => {
                    let t = caps["type"].trim();
                    let d = caps["rest"].trim();
                    if d.is_empty() {
                        t.to_string()
                    } else {
                        format!("{t}: {d}")
                    }
                }
                None => rest.to_string(),
            };
            if !desc.is_empty() {
                block.returns = Some(desc);
            }
        } else if let Some(rest) = line.strip_prefix("@throws") {
            let rest = rest.trim();
            let name = match tag_type_re().captures(rest) {
                Some(caps) => caps["type"].trim().to_string(),
                None => rest.split_whitespace().next().unwrap_or("").to_string(),
            };
            if !name.is_empty() {
                block.raises.push(name);
            }
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_led_sections() {
        let doc = "Drive the car.\n\nArgs:\n    speed (int): target speed\n    road: surface to use\n\nReturns:\n    bool: made it\n\nRaises:\n    ValueError: bad speed\n";
        let block = parse_python_docstring(doc);
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].name, "speed");
        assert_eq!(block.params[0].type_text.as_deref(), Some("int"));
        assert_eq!(block.params[1].name, "road");
        assert_eq!(block.returns.as_deref(), Some("bool: made it"));
        assert_eq!(block.raises, vec!["ValueError"]);
    }

    #[test]
    fn colon_led_fields() {
        let doc = "Start.\n\n:param speed: how fast\n:param int gear: which gear\n:returns: nothing\n:raises RuntimeError: on stall\n";
        let block = parse_python_docstring(doc);
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].name, "speed");
        assert_eq!(block.params[1].name, "gear");
        assert_eq!(block.params[1].type_text.as_deref(), Some("int"));
        assert_eq!(block.returns.as_deref(), Some("nothing"));
        assert_eq!(block.raises, vec!["RuntimeError"]);
    }

    #[test]
    fn field_led_sections() {
        let doc = "Sum.\n\nParameters\n----------\nleft : int\n    first operand\nright : int\n    second operand\n";
        let block = parse_python_docstring(doc);
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].name, "left");
        assert!(block.params[0].description.contains("first operand"));
    }

    #[test]
    fn param_section_stops_at_blank_line() {
        let doc = "Args:\n    a: first\n\n    not_a_param: body text\n";
        let block = parse_python_docstring(doc);
        assert_eq!(block.params.len(), 1);
        assert_eq!(block.params[0].name, "a");
    }

    #[test]
    fn phpdoc_tags() {
        let doc = "/**\n * Start the engine.\n * @param Engine $engine the engine\n * @param int $retries\n * @return bool\n * @throws EngineStalled\n */";
        let block = parse_phpdoc(doc);
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].name, "engine");
        assert_eq!(block.params[0].type_text.as_deref(), Some("Engine"));
        assert_eq!(block.returns.as_deref(), Some("bool"));
        assert_eq!(block.raises, vec!["EngineStalled"]);
    }

    #[test]
    fn jsdoc_tags() {
        let doc = "/**\n * Render a row.\n * @param {Row} row - the row\n * @param index position\n * @returns {string} html\n * @throws {RangeError}\n */";
        let block = parse_jsdoc(doc);
        assert_eq!(block.params.len(), 2);
        assert_eq!(block.params[0].name, "row");
        assert_eq!(block.params[0].type_text.as_deref(), Some("Row"));
        assert_eq!(block.params[1].name, "index");
        assert_eq!(block.returns.as_deref(), Some("string: html"));
        assert_eq!(block.raises, vec!["RangeError"]);
    }
}
