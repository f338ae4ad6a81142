//! Obfuscation rule files.
//!
//! Whitespace-separated tokens; `#` runs to end of line. Flag tokens switch a
//! boolean on. List tokens select a list that the following plain tokens are
//! appended to, until the next flag or list token.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Boolean switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagToken {
    DisableObfuscation,
    EnablePropertyObfuscation,
    EnableStringPropertyObfuscation,
    EnableToplevelObfuscation,
    EnableFilenameObfuscation,
    EnableExportObfuscation,
    EnableLibObfuscationOptions,
    Compact,
    RemoveLog,
    RemoveComments,
}

/// Tokens that take the values following them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListToken {
    Keep,
    KeepDts,
    KeepGlobalName,
    KeepPropertyName,
    KeepFileName,
    KeepComments,
    PrintNameCache,
    ApplyNameCache,
    /// Switches the flag on; an optional value names the report path.
    PrintKeptNames,
    ExtraOptions,
}

/// One classified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleToken {
    Flag(FlagToken),
    List(ListToken),
    Value(String),
    Unrecognized(String),
}

impl RuleToken {
    #[must_use]
    pub fn classify(token: &str) -> Self {
        match token {
            "-disable-obfuscation" => Self::Flag(FlagToken::DisableObfuscation),
            "-enable-property-obfuscation" => Self::Flag(FlagToken::EnablePropertyObfuscation),
            "-enable-string-property-obfuscation" => {
                Self::Flag(FlagToken::EnableStringPropertyObfuscation)
            }
            "-enable-toplevel-obfuscation" => Self::Flag(FlagToken::EnableToplevelObfuscation),
            "-enable-filename-obfuscation" => Self::Flag(FlagToken::EnableFilenameObfuscation),
            "-enable-export-obfuscation" => Self::Flag(FlagToken::EnableExportObfuscation),
            "-enable-lib-obfuscation-options" => Self::Flag(FlagToken::EnableLibObfuscationOptions),
            "-compact" => Self::Flag(FlagToken::Compact),
            "-remove-log" => Self::Flag(FlagToken::RemoveLog),
            "-remove-comments" => Self::Flag(FlagToken::RemoveComments),
            "-keep" => Self::List(ListToken::Keep),
            "-keep-dts" => Self::List(ListToken::KeepDts),
            "-keep-global-name" => Self::List(ListToken::KeepGlobalName),
            "-keep-property-name" => Self::List(ListToken::KeepPropertyName),
            "-keep-file-name" => Self::List(ListToken::KeepFileName),
            "-keep-comments" => Self::List(ListToken::KeepComments),
            "-print-namecache" => Self::List(ListToken::PrintNameCache),
            "-apply-namecache" => Self::List(ListToken::ApplyNameCache),
            "-print-kept-names" => Self::List(ListToken::PrintKeptNames),
            "-extra-options" => Self::List(ListToken::ExtraOptions),
            t if t.starts_with('-') => Self::Unrecognized(t.to_string()),
            t => Self::Value(t.to_string()),
        }
    }
}

impl FlagToken {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DisableObfuscation => "-disable-obfuscation",
            Self::EnablePropertyObfuscation => "-enable-property-obfuscation",
            Self::EnableStringPropertyObfuscation => "-enable-string-property-obfuscation",
            Self::EnableToplevelObfuscation => "-enable-toplevel-obfuscation",
            Self::EnableFilenameObfuscation => "-enable-filename-obfuscation",
            Self::EnableExportObfuscation => "-enable-export-obfuscation",
            Self::EnableLibObfuscationOptions => "-enable-lib-obfuscation-options",
            Self::Compact => "-compact",
            Self::RemoveLog => "-remove-log",
            Self::RemoveComments => "-remove-comments",
        }
    }
}

/// Names accepted by `-extra-options`.
pub const STRIP_LANGUAGE_DEFAULT: &str = "strip-language-default";
pub const STRIP_SYSTEM_API_ARGS: &str = "strip-system-api-args";

/// Boolean switches of a rule set. Every field merges by OR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct ObfuscationOptions {
    pub disable_obfuscation: bool,
    pub enable_property_obfuscation: bool,
    pub enable_string_property_obfuscation: bool,
    pub enable_toplevel_obfuscation: bool,
    pub enable_filename_obfuscation: bool,
    pub enable_export_obfuscation: bool,
    pub enable_lib_obfuscation_options: bool,
    pub compact: bool,
    pub remove_log: bool,
    pub remove_comments: bool,
    pub print_kept_names: bool,
    pub strip_language_default: bool,
    pub strip_system_api_args: bool,
}

impl ObfuscationOptions {
    pub fn set(&mut self, flag: FlagToken) {
        match flag {
            FlagToken::DisableObfuscation => self.disable_obfuscation = true,
            FlagToken::EnablePropertyObfuscation => self.enable_property_obfuscation = true,
            FlagToken::EnableStringPropertyObfuscation => {
                self.enable_string_property_obfuscation = true;
            }
            FlagToken::EnableToplevelObfuscation => self.enable_toplevel_obfuscation = true,
            FlagToken::EnableFilenameObfuscation => self.enable_filename_obfuscation = true,
            FlagToken::EnableExportObfuscation => self.enable_export_obfuscation = true,
            FlagToken::EnableLibObfuscationOptions => self.enable_lib_obfuscation_options = true,
            FlagToken::Compact => self.compact = true,
            FlagToken::RemoveLog => self.remove_log = true,
            FlagToken::RemoveComments => self.remove_comments = true,
        }
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            disable_obfuscation: self.disable_obfuscation || other.disable_obfuscation,
            enable_property_obfuscation: self.enable_property_obfuscation
                || other.enable_property_obfuscation,
            enable_string_property_obfuscation: self.enable_string_property_obfuscation
                || other.enable_string_property_obfuscation,
            enable_toplevel_obfuscation: self.enable_toplevel_obfuscation
                || other.enable_toplevel_obfuscation,
            enable_filename_obfuscation: self.enable_filename_obfuscation
                || other.enable_filename_obfuscation,
            enable_export_obfuscation: self.enable_export_obfuscation
                || other.enable_export_obfuscation,
            enable_lib_obfuscation_options: self.enable_lib_obfuscation_options
                || other.enable_lib_obfuscation_options,
            compact: self.compact || other.compact,
            remove_log: self.remove_log || other.remove_log,
            remove_comments: self.remove_comments || other.remove_comments,
            print_kept_names: self.print_kept_names || other.print_kept_names,
            strip_language_default: self.strip_language_default || other.strip_language_default,
            strip_system_api_args: self.strip_system_api_args || other.strip_system_api_args,
        }
    }

    /// Only the switches that change what consumers must rename.
    #[must_use]
    pub fn strength_only(self) -> Self {
        Self {
            enable_property_obfuscation: self.enable_property_obfuscation,
            enable_string_property_obfuscation: self.enable_string_property_obfuscation,
            enable_toplevel_obfuscation: self.enable_toplevel_obfuscation,
            enable_filename_obfuscation: self.enable_filename_obfuscation,
            enable_export_obfuscation: self.enable_export_obfuscation,
            ..Self::default()
        }
    }

    fn enabled_flags(self) -> Vec<FlagToken> {
        let table = [
            (self.disable_obfuscation, FlagToken::DisableObfuscation),
            (self.enable_property_obfuscation, FlagToken::EnablePropertyObfuscation),
            (
                self.enable_string_property_obfuscation,
                FlagToken::EnableStringPropertyObfuscation,
            ),
            (self.enable_toplevel_obfuscation, FlagToken::EnableToplevelObfuscation),
            (self.enable_filename_obfuscation, FlagToken::EnableFilenameObfuscation),
            (self.enable_export_obfuscation, FlagToken::EnableExportObfuscation),
            (self.enable_lib_obfuscation_options, FlagToken::EnableLibObfuscationOptions),
            (self.compact, FlagToken::Compact),
            (self.remove_log, FlagToken::RemoveLog),
            (self.remove_comments, FlagToken::RemoveComments),
        ];
        table
            .into_iter()
            .filter_map(|(on, flag)| on.then_some(flag))
            .collect()
    }
}

/// Name and path lists of a rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepLists {
    /// Keep paths; entries starting with `!` exclude.
    pub keep_paths: Vec<String>,
    pub keep_dts: Vec<String>,
    pub global_names: Vec<String>,
    pub property_names: Vec<String>,
    pub file_names: Vec<String>,
    pub comments: Vec<String>,
}

impl KeepLists {
    pub fn extend(&mut self, other: &Self) {
        self.keep_paths.extend(other.keep_paths.iter().cloned());
        self.keep_dts.extend(other.keep_dts.iter().cloned());
        self.global_names.extend(other.global_names.iter().cloned());
        self.property_names.extend(other.property_names.iter().cloned());
        self.file_names.extend(other.file_names.iter().cloned());
        self.comments.extend(other.comments.iter().cloned());
    }

    /// Sort and deduplicate every list.
    pub fn normalize(&mut self) {
        for list in [
            &mut self.keep_paths,
            &mut self.keep_dts,
            &mut self.global_names,
            &mut self.property_names,
            &mut self.file_names,
            &mut self.comments,
        ] {
            list.sort();
            list.dedup();
        }
    }
}

/// A parsed rule file, or the merge of several.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub options: ObfuscationOptions,
    pub lists: KeepLists,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_name_cache: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_name_cache: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_kept_names_path: Option<PathBuf>,
}

impl RuleSet {
    /// Read and parse a rule file. Relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::RuleRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::parse(&text, base, path))
    }

    /// Load and merge several rule files in order.
    pub fn load_all(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = Self::default();
        for path in paths {
            merged.merge(&Self::load(path)?);
        }
        Ok(merged)
    }

    /// Parse rule text. `origin` only labels warnings.
    #[must_use]
    pub fn parse(text: &str, base_dir: &Path, origin: &Path) -> Self {
        let mut rules = Self::default();
        let mut current: Option<ListToken> = None;

        for line in text.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            for token in line.split_whitespace() {
                match RuleToken::classify(token) {
                    RuleToken::Flag(flag) => {
                        rules.options.set(flag);
                        current = None;
                    }
                    RuleToken::List(list) => {
                        if list == ListToken::PrintKeptNames {
                            rules.options.print_kept_names = true;
                        }
                        current = Some(list);
                    }
                    RuleToken::Unrecognized(token) => {
                        tracing::warn!(file = %origin.display(), token = %token, "unrecognized obfuscation rule");
                        current = None;
                    }
                    RuleToken::Value(value) => match current {
                        Some(list) => rules.push_value(list, &value, base_dir),
                        None => {
                            tracing::warn!(file = %origin.display(), token = %value, "value outside of any rule list");
                        }
                    },
                }
            }
        }
        rules
    }

    fn push_value(&mut self, list: ListToken, value: &str, base_dir: &Path) {
        match list {
            ListToken::Keep => self.lists.keep_paths.push(resolve_keep_path(value, base_dir)),
            ListToken::KeepDts => self.lists.keep_dts.push(resolve_path(value, base_dir)),
            ListToken::KeepGlobalName => self.lists.global_names.push(value.to_string()),
            ListToken::KeepPropertyName => self.lists.property_names.push(value.to_string()),
            ListToken::KeepFileName => self.lists.file_names.push(value.to_string()),
            ListToken::KeepComments => self.lists.comments.push(value.to_string()),
            ListToken::PrintNameCache => {
                self.print_name_cache = Some(PathBuf::from(resolve_path(value, base_dir)));
            }
            ListToken::ApplyNameCache => {
                self.apply_name_cache = Some(PathBuf::from(resolve_path(value, base_dir)));
            }
            ListToken::PrintKeptNames => {
                self.print_kept_names_path = Some(PathBuf::from(resolve_path(value, base_dir)));
            }
            ListToken::ExtraOptions => {
                for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    match name {
                        STRIP_LANGUAGE_DEFAULT => self.options.strip_language_default = true,
                        STRIP_SYSTEM_API_ARGS => self.options.strip_system_api_args = true,
                        other => tracing::warn!(option = other, "unknown extra option"),
                    }
                }
            }
        }
    }

    /// Fold `other` into `self`: options OR, lists concatenate, output paths
    /// already set on `self` win.
    pub fn merge(&mut self, other: &Self) {
        self.options = self.options.merge(other.options);
        self.lists.extend(&other.lists);
        if self.print_name_cache.is_none() {
            self.print_name_cache.clone_from(&other.print_name_cache);
        }
        if self.apply_name_cache.is_none() {
            self.apply_name_cache.clone_from(&other.apply_name_cache);
        }
        if self.print_kept_names_path.is_none() {
            self.print_kept_names_path.clone_from(&other.print_kept_names_path);
        }
    }

    /// Sort and deduplicate every list.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.lists.normalize();
        self
    }

    /// The part of this rule set that consumers must honour: strength
    /// switches and kept names. Never printer toggles, paths or caches.
    #[must_use]
    pub fn consumer_subset(&self) -> Self {
        let mut lists = KeepLists {
            global_names: self.lists.global_names.clone(),
            property_names: self.lists.property_names.clone(),
            file_names: self.lists.file_names.clone(),
            ..KeepLists::default()
        };
        lists.normalize();
        Self {
            options: self.options.strength_only(),
            lists,
            ..Self::default()
        }
    }

    /// Render in rule-file syntax; parsing the result yields the same set.
    #[must_use]
    pub fn to_rule_text(&self) -> String {
        let mut out = String::new();
        for flag in self.options.enabled_flags() {
            out.push_str(flag.as_str());
            out.push('\n');
        }
        let mut extras = Vec::new();
        if self.options.strip_language_default {
            extras.push(STRIP_LANGUAGE_DEFAULT);
        }
        if self.options.strip_system_api_args {
            extras.push(STRIP_SYSTEM_API_ARGS);
        }
        if !extras.is_empty() {
            let _ = writeln!(out, "-extra-options {}", extras.join(","));
        }
        if self.options.print_kept_names && self.print_kept_names_path.is_none() {
            out.push_str("-print-kept-names\n");
        }

        let sections: [(&str, &[String]); 6] = [
            ("-keep", &self.lists.keep_paths),
            ("-keep-dts", &self.lists.keep_dts),
            ("-keep-global-name", &self.lists.global_names),
            ("-keep-property-name", &self.lists.property_names),
            ("-keep-file-name", &self.lists.file_names),
            ("-keep-comments", &self.lists.comments),
        ];
        for (token, values) in sections {
            if values.is_empty() {
                continue;
            }
            out.push_str(token);
            out.push('\n');
            for value in values {
                out.push_str(value);
                out.push('\n');
            }
        }

        let paths = [
            ("-print-namecache", &self.print_name_cache),
            ("-apply-namecache", &self.apply_name_cache),
            ("-print-kept-names", &self.print_kept_names_path),
        ];
        for (token, path) in paths {
            if let Some(path) = path {
                let _ = writeln!(out, "{token}\n{}", path.display());
            }
        }
        out
    }
}

fn resolve_path(value: &str, base_dir: &Path) -> String {
    let path = Path::new(value);
    if path.is_absolute() {
        value.to_string()
    } else {
        base_dir.join(path).to_string_lossy().replace('\\', "/")
    }
}

fn resolve_keep_path(value: &str, base_dir: &Path) -> String {
    match value.strip_prefix('!') {
        Some(rest) => format!("!{}", resolve_path(rest, base_dir)),
        None => resolve_path(value, base_dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RuleSet {
        RuleSet::parse(text, Path::new("/proj"), Path::new("/proj/obfuscation-rules.txt"))
    }

    #[test]
    fn test_lists_switch_on_list_tokens() {
        let rules = parse("-keep-global-name\nfunc2\na*\n-keep-property-name\nprop\nprop?");
        assert_eq!(rules.lists.global_names, vec!["func2", "a*"]);
        assert_eq!(rules.lists.property_names, vec!["prop", "prop?"]);
    }

    #[test]
    fn test_flags_and_comments() {
        let rules = parse(
            "# release rules\n-enable-property-obfuscation # props too\n-compact\n-keep-global-name Foo # keep\nBar",
        );
        assert!(rules.options.enable_property_obfuscation);
        assert!(rules.options.compact);
        assert!(!rules.options.enable_toplevel_obfuscation);
        assert_eq!(rules.lists.global_names, vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_flag_closes_current_list() {
        let rules = parse("-keep-global-name A -remove-log B");
        assert_eq!(rules.lists.global_names, vec!["A"]);
        assert!(rules.options.remove_log);
    }

    #[test]
    fn test_unrecognized_token_is_dropped() {
        let rules = parse("-keep-global-name A -enable-propety-obfuscation B");
        assert_eq!(rules.lists.global_names, vec!["A"]);
        assert_eq!(rules.options, ObfuscationOptions::default());
    }

    #[test]
    fn test_paths_resolve_against_rule_dir() {
        let rules = parse("-keep\n./src/kept\n!./src/kept/gen\n-print-namecache out/nameCache.json");
        assert_eq!(rules.lists.keep_paths, vec!["/proj/./src/kept", "!/proj/./src/kept/gen"]);
        assert_eq!(rules.print_name_cache, Some(PathBuf::from("/proj/out/nameCache.json")));
    }

    #[test]
    fn test_last_namecache_path_wins() {
        let rules = parse("-apply-namecache /a.json /b.json");
        assert_eq!(rules.apply_name_cache, Some(PathBuf::from("/b.json")));
    }

    #[test]
    fn test_extra_options() {
        let rules = parse("-extra-options strip-language-default,strip-system-api-args,bogus");
        assert!(rules.options.strip_language_default);
        assert!(rules.options.strip_system_api_args);
    }

    #[test]
    fn test_print_kept_names_with_and_without_path() {
        assert!(parse("-print-kept-names").options.print_kept_names);
        let with_path = parse("-print-kept-names kept.json");
        assert_eq!(with_path.print_kept_names_path, Some(PathBuf::from("/proj/kept.json")));
    }

    #[test]
    fn test_merge_ors_options_and_concatenates() {
        let mut a = parse("-enable-property-obfuscation -keep-global-name b a");
        let b = parse("-enable-toplevel-obfuscation -keep-global-name a c");
        a.merge(&b);
        let merged = a.normalized();
        assert!(merged.options.enable_property_obfuscation);
        assert!(merged.options.enable_toplevel_obfuscation);
        assert_eq!(merged.lists.global_names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_consumer_subset_drops_local_toggles() {
        let rules = parse(
            "-enable-property-obfuscation -compact -remove-log -keep ./x -keep-global-name Keep -print-namecache n.json",
        );
        let consumer = rules.consumer_subset();
        assert!(consumer.options.enable_property_obfuscation);
        assert!(!consumer.options.compact && !consumer.options.remove_log);
        assert!(consumer.lists.keep_paths.is_empty());
        assert!(consumer.print_name_cache.is_none());
        assert_eq!(consumer.lists.global_names, vec!["Keep"]);
    }

    #[test]
    fn test_rule_text_reparses_to_same_set() {
        let rules = parse(
            "-enable-export-obfuscation -remove-comments -extra-options strip-system-api-args -keep-global-name LocalHspClass -keep-file-name index",
        );
        let text = rules.to_rule_text();
        let reparsed = parse(&text);
        assert_eq!(reparsed, rules);
    }

    #[test]
    fn test_missing_rule_file_is_fatal() {
        let err = RuleSet::load(Path::new("/definitely/not/here/rules.txt")).unwrap_err();
        assert!(matches!(err, Error::RuleRead { .. }));
    }
}
