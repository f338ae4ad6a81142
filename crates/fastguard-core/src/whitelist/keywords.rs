//! Language-level reserved names.

/// Reserved words of the JS/TS family. Never usable as generated names.
pub const LANGUAGE_KEYWORDS: &[&str] = &[
    "abstract", "any", "arguments", "as", "async", "await", "boolean", "break", "case", "catch",
    "class", "const", "constructor", "continue", "debugger", "declare", "default", "delete", "do",
    "else", "enum", "eval", "export", "extends", "false", "finally", "for", "from", "function",
    "get", "if", "implements", "import", "in", "instanceof", "interface", "is", "keyof", "let",
    "module", "namespace", "never", "new", "null", "number", "object", "of", "package", "private",
    "protected", "public", "readonly", "require", "return", "set", "static", "string", "struct",
    "super", "switch", "symbol", "this", "throw", "true", "try", "type", "typeof", "undefined",
    "unique", "unknown", "var", "void", "while", "with", "yield",
];

/// Members of the standard library that must keep their names for runtime
/// lookups to work. Part of the full preset only.
const STANDARD_LIBRARY_NAMES: &[&str] = &[
    // globals
    "Array", "ArrayBuffer", "BigInt", "Boolean", "DataView", "Date", "Error", "EvalError",
    "Float32Array", "Float64Array", "Function", "Infinity", "Int16Array", "Int32Array",
    "Int8Array", "Intl", "JSON", "Map", "Math", "NaN", "Number", "Object", "Promise", "Proxy",
    "RangeError", "ReferenceError", "Reflect", "RegExp", "Set", "String", "Symbol", "SyntaxError",
    "TypeError", "URIError", "Uint16Array", "Uint32Array", "Uint8Array", "Uint8ClampedArray",
    "WeakMap", "WeakRef", "WeakSet", "console", "globalThis", "isFinite", "isNaN", "parseFloat",
    "parseInt", "decodeURI", "decodeURIComponent", "encodeURI", "encodeURIComponent",
    "setTimeout", "clearTimeout", "setInterval", "clearInterval",
    // common members
    "apply", "bind", "call", "catch", "concat", "done", "entries", "every", "filter", "finally",
    "find", "findIndex", "flat", "flatMap", "forEach", "from", "has", "hasOwnProperty", "includes",
    "indexOf", "join", "keys", "lastIndexOf", "length", "log", "map", "message", "name", "next",
    "pop", "push", "reduce", "reject", "resolve", "return", "reverse", "shift", "slice", "some",
    "sort", "splice", "split", "stack", "then", "toJSON", "toString", "unshift", "value",
    "valueOf", "values", "debug", "info", "warn", "error", "get", "set", "delete", "add", "clear",
    "size", "assign", "create", "defineProperty", "freeze", "getPrototypeOf", "parse",
    "stringify", "iterator", "asyncIterator", "toPrimitive", "prototype", "__proto__",
];

/// Members that the reduced preset still keeps.
const OPTIMIZED_NAMES: &[&str] = &[
    "prototype", "__proto__", "length", "name", "toString", "valueOf", "toJSON", "then",
    "iterator", "asyncIterator", "toPrimitive", "next", "done", "value", "globalThis", "console",
];

/// Which language preset reserves names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguagePreset {
    /// Keywords plus the standard library surface.
    #[default]
    Full,
    /// Keywords plus a handful of protocol members (`-extra-options strip-language-default`).
    Optimized,
}

impl LanguagePreset {
    /// Every name this preset reserves.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        let extra: &'static [&'static str] = match self {
            Self::Full => STANDARD_LIBRARY_NAMES,
            Self::Optimized => OPTIMIZED_NAMES,
        };
        LANGUAGE_KEYWORDS.iter().chain(extra.iter()).copied()
    }
}

/// Whether `name` is a language reserved word.
#[must_use]
pub fn is_language_keyword(name: &str) -> bool {
    LANGUAGE_KEYWORDS.binary_search(&name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_sorted_for_binary_search() {
        let mut sorted = LANGUAGE_KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, LANGUAGE_KEYWORDS);
    }

    #[test]
    fn test_is_language_keyword() {
        assert!(is_language_keyword("do"));
        assert!(is_language_keyword("instanceof"));
        assert!(!is_language_keyword("a"));
    }

    #[test]
    fn test_optimized_preset_is_smaller() {
        let full = LanguagePreset::Full.names().count();
        let optimized = LanguagePreset::Optimized.names().count();
        assert!(optimized < full);
        assert!(LanguagePreset::Optimized.names().any(|n| n == "prototype"));
        assert!(!LanguagePreset::Optimized.names().any(|n| n == "forEach"));
    }
}
