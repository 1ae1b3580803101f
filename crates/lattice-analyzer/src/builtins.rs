//! Names that resolve to the language rather than the project
//!
//! References to these are neither project entities nor resolution misses;
//! they are skipped quietly so diagnostics stay about the project's own
//! symbols.

use lattice_core::model::Language;

const PYTHON: &[&str] = &[
    "object", "str", "int", "float", "complex", "bool", "bytes", "bytearray", "list", "dict",
    "set", "frozenset", "tuple", "type", "None", "NoneType", "Any", "Callable", "Iterable",
    "Iterator", "Sequence", "Mapping", "Optional", "Union", "Self", "Exception", "BaseException",
    "ValueError", "TypeError", "KeyError", "IndexError", "RuntimeError", "StopIteration",
    "NotImplementedError", "AttributeError", "OSError", "IOError", "ABC", "ABCMeta", "Enum",
    "IntEnum", "StrEnum", "NamedTuple", "TypedDict", "Protocol", "Generic", "dataclass",
];

const PHP: &[&str] = &[
    "int", "float", "string", "bool", "array", "object", "mixed", "void", "null", "never",
    "callable", "iterable", "self", "static", "parent", "true", "false", "stdClass", "Closure",
    "Generator", "Throwable", "Exception", "Error", "TypeError", "ValueError", "RuntimeException",
    "InvalidArgumentException", "LogicException", "ArrayAccess", "Countable", "Iterator",
    "IteratorAggregate", "Traversable", "Stringable", "JsonSerializable", "DateTime",
    "DateTimeImmutable", "DateTimeInterface",
];

const JS: &[&str] = &[
    "string", "number", "boolean", "bigint", "symbol", "undefined", "null", "void", "any",
    "unknown", "never", "object", "this", "Object", "Array", "Map", "Set", "WeakMap", "WeakSet",
    "Promise", "Date", "RegExp", "Error", "TypeError", "RangeError", "SyntaxError", "Function",
    "Symbol", "Number", "String", "Boolean", "JSON", "Math", "console", "Record", "Partial",
    "Readonly", "Required", "Pick", "Omit", "Exclude", "Extract", "ReturnType", "Awaited",
];

/// True when a name belongs to the language/runtime, so failing to resolve
/// it inside the project is expected.
pub fn is_builtin(language: Language, name: &str) -> bool {
    let simple = name
        .rsplit(['.', '\\'])
        .next()
        .unwrap_or(name);
    match language {
        Language::Python => PYTHON.contains(&simple),
        Language::Php => PHP.contains(&simple),
        Language::JavaScript | Language::TypeScript => JS.contains(&simple),
    }
}
