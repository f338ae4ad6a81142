//! Compilation-wide state.
//!
//! Every table the renaming engine reads or mutates lives here and is passed
//! by reference; nothing is process-global. [`ObfuscationContext::reset`]
//! returns the context to its freshly configured state so one process can run
//! several independent compilations.

use crate::config::{KeepPathSet, MergedConfig, Resolution};
use crate::name_cache::{FileCache, NameCache};
use crate::namegen::NameStrategy;
use crate::rename::tables::MangledTable;
use crate::report::KeptNames;
use crate::whitelist::keywords::LanguagePreset;
use crate::whitelist::sdk::ApiSurface;
use crate::whitelist::{ConfiguredNames, Whitelist, WhitelistMode};
use std::collections::{BTreeMap, HashSet};

/// Switches the engine consults per binding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RenameSettings {
    pub enabled: bool,
    pub mode: WhitelistMode,
    pub filename: bool,
    pub record_kept: bool,
    pub strategy: NameStrategy,
}

impl RenameSettings {
    #[must_use]
    pub fn from_config(config: &MergedConfig, strategy: NameStrategy) -> Self {
        let o = config.options();
        Self {
            enabled: config.obfuscation_enabled(),
            mode: WhitelistMode {
                property: o.enable_property_obfuscation,
                toplevel: o.enable_toplevel_obfuscation,
                export: o.enable_export_obfuscation,
                string_property: o.enable_string_property_obfuscation,
            },
            filename: o.enable_filename_obfuscation,
            record_kept: o.print_kept_names,
            strategy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObfuscationContext {
    pub settings: RenameSettings,
    pub whitelist: Whitelist,
    pub keep_paths: KeepPathSet,
    /// Properties and exported top-level names.
    pub properties: MangledTable,
    pub file_names: MangledTable,
    /// Per-file identifier and member names from the applied cache.
    pub file_history: BTreeMap<String, FileCache>,
    /// Per-file names produced in this compilation.
    pub file_results: BTreeMap<String, FileCache>,
    pub kept: KeptNames,
    /// Identifiers referenced somewhere in the program but declared nowhere.
    pub free_names: HashSet<String>,
    /// Top-level identifiers left unrenamed in some file.
    pub pinned_names: HashSet<String>,
}

impl ObfuscationContext {
    #[must_use]
    pub fn new(config: &MergedConfig, sdk: Option<ApiSurface>, strategy: NameStrategy) -> Self {
        let settings = RenameSettings::from_config(config, strategy);
        let preset = if config.options().strip_language_default {
            LanguagePreset::Optimized
        } else {
            LanguagePreset::Full
        };
        let configured = ConfiguredNames {
            globals: config.reserved_global_names.clone(),
            properties: config.reserved_property_names.clone(),
            file_names: config.reserved_file_names.clone(),
        };
        let whitelist = Whitelist::new(settings.mode, preset, configured).with_sdk(sdk.unwrap_or_default());

        Self {
            properties: MangledTable::new(settings.strategy.clone()),
            file_names: MangledTable::new(settings.strategy.clone()),
            settings,
            whitelist,
            keep_paths: config.keep_paths.clone(),
            file_history: BTreeMap::new(),
            file_results: BTreeMap::new(),
            kept: KeptNames::default(),
            free_names: HashSet::new(),
            pinned_names: HashSet::new(),
        }
    }

    /// Context for a resolved module; `-keep-dts` names join the configured
    /// reserved names.
    #[must_use]
    pub fn from_resolution(resolution: &Resolution, strategy: NameStrategy) -> Self {
        let mut config = resolution.merged.clone();
        for name in &resolution.keep_dts.globals {
            config.reserved_global_names.insert(name);
        }
        for name in resolution.keep_dts.properties.iter().chain(&resolution.keep_dts.locals) {
            config.reserved_property_names.insert(name);
        }
        Self::new(&config, resolution.sdk.clone(), strategy)
    }

    /// Seed the tables from a previous build.
    pub fn apply_history(&mut self, cache: &NameCache) {
        self.properties.seed_history(cache.properties.clone());
        self.file_names.seed_history(cache.file_names.clone());
        self.file_history = cache.files.clone();
    }

    /// Whether `path` is excluded from renaming by `-keep`.
    #[must_use]
    pub fn is_kept_path(&self, path: &str) -> bool {
        self.keep_paths.is_kept(path)
    }

    /// Clear every table, history and collected set; configuration stays.
    pub fn reset(&mut self) {
        self.whitelist.clear_project_sets();
        self.properties.reset();
        self.file_names.reset();
        self.file_history.clear();
        self.file_results.clear();
        self.kept.clear();
        self.free_names.clear();
        self.pinned_names.clear();
    }
}
