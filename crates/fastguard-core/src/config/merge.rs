//! Resolved configuration for one compilation unit.

use super::rules::{ObfuscationOptions, RuleSet};
use crate::wildcard::{WildcardMode, WildcardSet};

/// Printer switches. Local to the module; never propagated to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterOptions {
    pub compact: bool,
    pub remove_log: bool,
    pub remove_comments: bool,
    /// Comments on these names survive `remove_comments`.
    pub keep_comments: Vec<String>,
}

/// `-keep` paths: included files are left as they are, `!` entries carve
/// exceptions out of the included set.
#[derive(Debug, Clone)]
pub struct KeepPathSet {
    include: WildcardSet,
    exclude: WildcardSet,
}

impl Default for KeepPathSet {
    fn default() -> Self {
        Self {
            include: WildcardSet::new(WildcardMode::Path),
            exclude: WildcardSet::new(WildcardMode::Path),
        }
    }
}

impl KeepPathSet {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a String>) -> Self {
        let mut set = Self::default();
        for entry in entries {
            match entry.strip_prefix('!') {
                Some(rest) => set.exclude.insert(&normalize_path(rest)),
                None => set.include.insert(&normalize_path(entry)),
            }
        }
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Whether `path`, or a directory containing it, is kept and not excluded.
    #[must_use]
    pub fn is_kept(&self, path: &str) -> bool {
        if self.include.is_empty() {
            return false;
        }
        let path = normalize_path(path);
        matches_self_or_ancestor(&self.include, &path) && !matches_self_or_ancestor(&self.exclude, &path)
    }
}

fn matches_self_or_ancestor(set: &WildcardSet, path: &str) -> bool {
    if set.contains(path) {
        return true;
    }
    let mut end = path.len();
    while let Some(idx) = path[..end].rfind('/') {
        let dir = &path[..idx];
        if !dir.is_empty() && set.contains(dir) {
            return true;
        }
        end = idx;
    }
    false
}

/// Lexically drop `.` segments and fold `..`; separators become `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(&last) if last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// A module's rules folded with everything its dependencies demand, with
/// reserved names split into exact and wildcard sets once.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub rules: RuleSet,
    pub reserved_global_names: WildcardSet,
    pub reserved_property_names: WildcardSet,
    pub reserved_file_names: WildcardSet,
    pub keep_paths: KeepPathSet,
    pub printer: PrinterOptions,
}

impl Default for MergedConfig {
    fn default() -> Self {
        Self::from_rules(RuleSet::default())
    }
}

impl MergedConfig {
    /// Normalize `rules` and split its lists.
    #[must_use]
    pub fn from_rules(rules: RuleSet) -> Self {
        let rules = rules.normalized();
        let names = |list: &[String]| {
            WildcardSet::from_literals(WildcardMode::Name, list.iter().map(String::as_str))
        };
        Self {
            reserved_global_names: names(&rules.lists.global_names),
            reserved_property_names: names(&rules.lists.property_names),
            reserved_file_names: names(&rules.lists.file_names),
            keep_paths: KeepPathSet::from_entries(&rules.lists.keep_paths),
            printer: PrinterOptions {
                compact: rules.options.compact,
                remove_log: rules.options.remove_log,
                remove_comments: rules.options.remove_comments,
                keep_comments: rules.lists.comments.clone(),
            },
            rules,
        }
    }

    #[must_use]
    pub fn options(&self) -> ObfuscationOptions {
        self.rules.options
    }

    #[must_use]
    pub fn obfuscation_enabled(&self) -> bool {
        !self.rules.options.disable_obfuscation
    }

    /// Property renaming, or top-level renaming of exports, has to stay clear
    /// of the SDK surface.
    #[must_use]
    pub fn needs_sdk_surface(&self) -> bool {
        let o = self.rules.options;
        o.enable_property_obfuscation || (o.enable_export_obfuscation && o.enable_toplevel_obfuscation)
    }
}
