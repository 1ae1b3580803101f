//! Reader for declared type expressions
//!
//! Reduces an annotation to its core type name plus container/optional
//! markers, across the three language families: `List[Engine]`,
//! `Optional[Engine]`, `Engine | None`, `Engine[]`, `Array<Engine>`,
//! `Map<string, Engine>`, `?Engine`. Only syntactically-evident structure
//! is read; anything else passes through as the core text.

/// A reduced type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    /// The element type name; empty when the expression names no type
    /// (bare `array`, `list`, `dict` with no arguments).
    pub core: String,
    /// The declared type is a container of the core type.
    pub many: bool,
    /// The declared type is optional/nullable.
    pub optional: bool,
}

const SEQUENCE_CONTAINERS: &[&str] = &[
    "list",
    "List",
    "set",
    "Set",
    "frozenset",
    "FrozenSet",
    "tuple",
    "Tuple",
    "Sequence",
    "Iterable",
    "Iterator",
    "Collection",
    "Array",
    "ReadonlyArray",
];

const MAP_CONTAINERS: &[&str] = &["dict", "Dict", "Mapping", "MutableMapping", "Map", "Record"];

const NONE_LIKE: &[&str] = &["None", "null", "undefined", "void"];

pub fn parse_type_expr(text: &str) -> TypeExpr {
    let mut expr = TypeExpr {
        core: String::new(),
        many: false,
        optional: false,
    };
    reduce(text.trim(), &mut expr);
    expr
}

fn reduce(text: &str, expr: &mut TypeExpr) {
    let text = text.trim().trim_start_matches('\\');
    if text.is_empty() {
        return;
    }

    // PHP nullable marker.
    if let Some(rest) = text.strip_prefix('?') {
        expr.optional = true;
        reduce(rest, expr);
        return;
    }

    // TS/PHP array suffix.
    if let Some(rest) = text.strip_suffix("[]") {
        expr.many = true;
        reduce(rest, expr);
        return;
    }

    // Union with a none-like arm means optional; other unions keep the
    // first arm as the evident type.
    if let Some(parts) = split_top_level(text, '|') {
        let none_arm = parts.iter().any(|p| NONE_LIKE.contains(&p.trim()));
        if none_arm {
            expr.optional = true;
        }
        if let Some(first) = parts.iter().find(|p| !NONE_LIKE.contains(&p.trim())) {
            reduce(first, expr);
        }
        return;
    }

    // Generic application: `Name[...]` or `Name<...>`.
    if let Some((head, args)) = split_generic(text) {
        let head_simple = head.rsplit(['.', '\\']).next().unwrap_or(head);
        match head_simple {
            "Optional" => {
                expr.optional = true;
                reduce(&args[0], expr);
            }
            "Union" => {
                let none_arm = args.iter().any(|a| NONE_LIKE.contains(&a.trim()));
                if none_arm {
                    expr.optional = true;
                }
                if let Some(first) = args.iter().find(|a| !NONE_LIKE.contains(&a.trim())) {
                    reduce(first, expr);
                }
            }
            _ if SEQUENCE_CONTAINERS.contains(&head_simple) => {
                expr.many = true;
                if let Some(last) = args.last() {
                    reduce(last, expr);
                }
            }
            _ if MAP_CONTAINERS.contains(&head_simple) => {
                expr.many = true;
                if let Some(value) = args.last() {
                    reduce(value, expr);
                }
            }
            // A generic type that is not a known container: the head is
            // the evident type.
            _ => expr.core = head.to_string(),
        }
        return;
    }

    // Bare container names carry no element type.
    if text == "array" || SEQUENCE_CONTAINERS.contains(&text) || MAP_CONTAINERS.contains(&text) {
        expr.many = true;
        return;
    }

    expr.core = text.to_string();
}

/// Split on a separator that sits outside any brackets; None when the
/// separator does not occur at the top level.
fn split_top_level(text: &str, separator: char) -> Option<Vec<String>> {
    let mut depth = 0i32;
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut found = false;
    for c in text.chars() {
        match c {
            '[' | '<' | '(' | '{' => depth += 1,
            ']' | '>' | ')' | '}' => depth -= 1,
            _ if c == separator && depth == 0 => {
                found = true;
                parts.push(current.trim().to_string());
                current = String::new();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !found {
        return None;
    }
    parts.push(current.trim().to_string());
    Some(parts)
}

/// `Name[A, B]` / `Name<A, B>` → (`Name`, [`A`, `B`]).
fn split_generic(text: &str) -> Option<(&str, Vec<String>)> {
    let open = text.find(['[', '<'])?;
    let close_char = if text.as_bytes()[open] == b'[' { ']' } else { '>' };
    if !text.ends_with(close_char) {
        return None;
    }
    let head = &text[..open];
    let inner = &text[open + 1..text.len() - 1];
    let args = split_top_level(inner, ',')
        .unwrap_or_else(|| vec![inner.trim().to_string()]);
    if head.is_empty() {
        return None;
    }
    Some((head, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(text: &str) -> (String, bool, bool) {
        let e = parse_type_expr(text);
        (e.core, e.many, e.optional)
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(expr("Engine"), ("Engine".to_string(), false, false));
        assert_eq!(expr("App\\Engine"), ("App\\Engine".to_string(), false, false));
    }

    #[test]
    fn containers_set_many() {
        assert_eq!(expr("List[Engine]"), ("Engine".to_string(), true, false));
        assert_eq!(expr("Engine[]"), ("Engine".to_string(), true, false));
        assert_eq!(expr("Array<Engine>"), ("Engine".to_string(), true, false));
        assert_eq!(
            expr("Dict[str, Engine]"),
            ("Engine".to_string(), true, false)
        );
        assert_eq!(
            expr("Map<string, Engine>"),
            ("Engine".to_string(), true, false)
        );
        assert_eq!(expr("array"), (String::new(), true, false));
    }

    #[test]
    fn optional_markers() {
        assert_eq!(expr("Optional[Engine]"), ("Engine".to_string(), false, true));
        assert_eq!(expr("?Engine"), ("Engine".to_string(), false, true));
        assert_eq!(expr("Engine | None"), ("Engine".to_string(), false, true));
        assert_eq!(
            expr("Engine | undefined"),
            ("Engine".to_string(), false, true)
        );
        assert_eq!(
            expr("Union[Engine, None]"),
            ("Engine".to_string(), false, true)
        );
    }

    #[test]
    fn nesting_composes() {
        assert_eq!(
            expr("Optional[List[Engine]]"),
            ("Engine".to_string(), true, true)
        );
        assert_eq!(expr("List[Engine] | None"), ("Engine".to_string(), true, true));
    }

    #[test]
    fn unknown_generics_keep_head() {
        assert_eq!(expr("Repo<Engine>"), ("Repo".to_string(), false, false));
    }
}
