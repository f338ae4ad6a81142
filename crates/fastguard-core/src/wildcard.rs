//! Glob-like reserved-name patterns.
//!
//! Reserved names and keep paths may contain `*` (any run of characters) and
//! `?` (a single character). Names without either go into an exact hash set;
//! the rest compile into anchored regular expressions which are only scanned
//! when the exact lookup misses.

use regex_lite::Regex;
use std::collections::{HashMap, HashSet};

/// How wildcards are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardMode {
    /// `*` matches any run of characters, `?` any single character.
    Name,
    /// `**` crosses directory separators, `*` and `?` do not.
    Path,
}

/// Whether `s` contains a wildcard character.
#[must_use]
pub fn contains_wildcard(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

/// Translate a wildcard literal into anchored regex source.
#[must_use]
pub fn wildcard_to_regex_source(pattern: &str, mode: WildcardMode) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else if mode == WildcardMode::Path {
                    out.push_str("[^/]*");
                } else {
                    out.push_str(".*");
                }
            }
            '?' => match mode {
                WildcardMode::Name => out.push('.'),
                WildcardMode::Path => out.push_str("[^/]"),
            },
            '\\' | '.' | '+' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('$');
    out
}

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    regex: Regex,
    literal: String,
}

impl WildcardPattern {
    /// Compile `literal` in the given mode.
    ///
    /// Returns `None` only if the generated expression is rejected by the
    /// regex engine, which cannot happen for escaped input.
    #[must_use]
    pub fn compile(literal: &str, mode: WildcardMode) -> Option<Self> {
        let source = wildcard_to_regex_source(literal, mode);
        Regex::new(&source).ok().map(|regex| Self {
            regex,
            literal: literal.to_string(),
        })
    }

    #[must_use]
    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    /// The literal this pattern was compiled from.
    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// The anchored regex source.
    #[must_use]
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }
}

/// Exact names plus wildcard patterns, queried together.
#[derive(Debug, Clone)]
pub struct WildcardSet {
    mode: WildcardMode,
    exact: HashSet<String>,
    patterns: Vec<WildcardPattern>,
    /// Regex source -> original literal, for diagnostics.
    origins: HashMap<String, String>,
}

impl Default for WildcardSet {
    fn default() -> Self {
        Self::new(WildcardMode::Name)
    }
}

impl WildcardSet {
    #[must_use]
    pub fn new(mode: WildcardMode) -> Self {
        Self {
            mode,
            exact: HashSet::new(),
            patterns: Vec::new(),
            origins: HashMap::new(),
        }
    }

    /// Build a set from a list of literals, routing each by wildcard presence.
    pub fn from_literals<'a>(mode: WildcardMode, literals: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::new(mode);
        for literal in literals {
            set.insert(literal);
        }
        set
    }

    pub fn insert(&mut self, literal: &str) {
        if !contains_wildcard(literal) {
            self.exact.insert(literal.to_string());
            return;
        }
        if self.patterns.iter().any(|p| p.literal == literal) {
            return;
        }
        match WildcardPattern::compile(literal, self.mode) {
            Some(pattern) => {
                self.origins
                    .insert(pattern.source().to_string(), literal.to_string());
                self.patterns.push(pattern);
            }
            None => tracing::warn!(pattern = literal, "ignoring uncompilable wildcard pattern"),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.exact.contains(name) || self.patterns.iter().any(|p| p.is_match(name))
    }

    /// The literal that caused `name` to match, exact entries first.
    #[must_use]
    pub fn matching_literal(&self, name: &str) -> Option<&str> {
        if let Some(exact) = self.exact.get(name) {
            return Some(exact);
        }
        self.patterns
            .iter()
            .find(|p| p.is_match(name))
            .map(WildcardPattern::literal)
    }

    /// Map a compiled regex source back to the literal it came from.
    #[must_use]
    pub fn literal_for_source(&self, source: &str) -> Option<&str> {
        self.origins.get(source).map(String::as_str)
    }

    #[must_use]
    pub fn exact(&self) -> &HashSet<String> {
        &self.exact
    }

    #[must_use]
    pub fn patterns(&self) -> &[WildcardPattern] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.patterns.clear();
        self.origins.clear();
    }
}
