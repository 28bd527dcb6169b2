//! Internal field name → wire (JSON) property name.

/// Strict, reserved, and edition keywords. A field that wants one of these as
/// its wire name is spelled with a trailing underscore (`type_`) or as a raw
/// identifier (`r#type`).
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Python keywords. Declarations shared with Python models spell these with a
/// trailing underscore too (`from_`, `class_`).
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(s: &str) -> bool {
    RUST_KEYWORDS.contains(&s) || PYTHON_KEYWORDS.contains(&s)
}

/// Derives the wire name of a field. An explicit alias wins outright.
pub fn wire_name(internal_name: &str, alias: Option<&str>) -> String {
    if let Some(alias) = alias {
        return alias.to_owned();
    }
    if let Some(raw) = internal_name.strip_prefix("r#") {
        return raw.to_owned();
    }
    if let Some(stem) = internal_name.strip_suffix('_') {
        if is_keyword(stem) {
            return stem.to_owned();
        }
    }
    internal_name.to_owned()
}
