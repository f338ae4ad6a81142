//! Compilation driver.
//!
//! Phases, in order:
//!
//! 1. [`Obfuscator::apply_name_cache`] loads the previous build's names,
//!    drops what the SDK or entry package invalidated and moves line-keyed
//!    entries through the previous stage's source maps.
//! 2. [`Obfuscator::prepare`] walks every file once to collect the export
//!    surface, framework members, enum members, string-literal properties and
//!    free globals.
//! 3. [`Obfuscator::obfuscate_file`] renames files one by one.
//! 4. [`Obfuscator::finish`] writes the name cache and the unobfuscation
//!    report.

use crate::config::merge::normalize_path;
use crate::config::Resolution;
use crate::context::ObfuscationContext;
use crate::error::Result;
use crate::name_cache::NameCache;
use crate::namegen::NameStrategy;
use crate::rename::{self, FileContext, FileOutcome};
use crate::report::UnobfuscationReport;
use crate::scope;
use crate::source_map::SourceMap;
use crate::tree::document::SourceDocument;
use crate::tree::SyntaxTree;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Totals over one [`Obfuscator::obfuscate_documents`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub renamed: usize,
    pub kept: usize,
    /// Original path -> obfuscated path, when file names are renamed.
    pub moved: BTreeMap<String, String>,
}

pub struct Obfuscator {
    ctx: ObfuscationContext,
    sdk_version: Option<String>,
    entry_package: Option<String>,
    project_root: Option<PathBuf>,
    apply_name_cache: Option<PathBuf>,
    print_name_cache: Option<PathBuf>,
    print_kept_names: Option<PathBuf>,
    cache: NameCache,
}

impl Obfuscator {
    #[must_use]
    pub fn new(resolution: &Resolution, strategy: NameStrategy) -> Self {
        let rules = &resolution.merged.rules;
        Self {
            ctx: ObfuscationContext::from_resolution(resolution, strategy),
            sdk_version: resolution.sdk_version.clone(),
            entry_package: Some(resolution.module.clone()),
            project_root: None,
            apply_name_cache: rules.apply_name_cache.clone(),
            print_name_cache: rules.print_name_cache.clone(),
            print_kept_names: rules.print_kept_names_path.clone(),
            cache: NameCache::default(),
        }
    }

    /// Identity of the entry package, e.g. `entry|1.0.0`.
    pub fn with_entry_package(mut self, info: impl Into<String>) -> Self {
        self.entry_package = Some(info.into());
        self
    }

    /// Directory file paths are relative to, for `-keep` matching.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn context(&self) -> &ObfuscationContext {
        &self.ctx
    }

    /// Load the `-apply-namecache` file, if configured. `source_maps` holds
    /// the previous stage's map per file path.
    pub fn apply_name_cache(&mut self, source_maps: &BTreeMap<String, SourceMap>) -> Result<()> {
        let Some(path) = self.apply_name_cache.clone() else {
            return Ok(());
        };
        let mut cache = NameCache::load(&path)?;
        cache.reconcile(self.sdk_version.as_deref(), self.entry_package.as_deref());
        for (file, map) in source_maps {
            cache.translate_file(file, map);
        }
        tracing::info!(
            path = %path.display(),
            files = cache.files.len(),
            properties = cache.properties.len(),
            "applied name cache"
        );
        self.ctx.apply_history(&cache);
        self.cache = cache;
        Ok(())
    }

    fn is_kept(&self, path: &str) -> bool {
        match &self.project_root {
            Some(root) => self.ctx.is_kept_path(&root.join(path).to_string_lossy()),
            None => self.ctx.is_kept_path(path),
        }
    }

    /// Collect whitelist entries from every file before any is renamed.
    pub fn prepare<'t>(&mut self, files: impl IntoIterator<Item = (&'t str, &'t dyn SyntaxTree)>) {
        let mut count = 0usize;
        for (path, tree) in files {
            let file = FileContext {
                path,
                kept: self.is_kept(path),
            };
            rename::register_file(&mut self.ctx, &file, &scope::collect(tree));
            count += 1;
        }
        tracing::debug!(files = count, free = self.ctx.free_names.len(), "prepared whitelist");
    }

    pub fn obfuscate_file(&mut self, path: &str, tree: &mut dyn SyntaxTree) -> FileOutcome {
        let path = normalize_path(path);
        let file = FileContext {
            path: &path,
            kept: self.is_kept(&path),
        };
        rename::rename_file(&mut self.ctx, &file, tree)
    }

    /// Fold this run into the name cache and write the configured outputs.
    pub fn finish(&mut self) -> Result<NameCache> {
        let mut cache = std::mem::take(&mut self.cache);
        cache.compile_sdk_version.clone_from(&self.sdk_version);
        cache.entry_package_info.clone_from(&self.entry_package);
        cache.update(
            std::mem::take(&mut self.ctx.file_results),
            self.ctx.properties.merged_for_save(),
            self.ctx.file_names.merged_for_save(),
        );

        if let Some(path) = &self.print_name_cache {
            cache.save(path)?;
            tracing::info!(path = %path.display(), "wrote name cache");
        }
        if self.ctx.settings.record_kept {
            if let Some(path) = &self.print_kept_names {
                UnobfuscationReport::new(self.ctx.kept.clone()).write(path)?;
                tracing::info!(path = %path.display(), "wrote unobfuscation report");
            }
        }
        Ok(cache)
    }

    /// Every phase over in-memory documents.
    pub fn obfuscate_documents(
        &mut self,
        documents: &mut [SourceDocument],
        source_maps: &BTreeMap<String, SourceMap>,
    ) -> Result<(RunSummary, NameCache)> {
        self.apply_name_cache(source_maps)?;
        self.prepare(
            documents
                .iter()
                .map(|d| (d.path.as_str(), d as &dyn SyntaxTree)),
        );

        let mut summary = RunSummary::default();
        for doc in documents.iter_mut() {
            let path = doc.path.clone();
            let outcome = self.obfuscate_file(&path, doc);
            summary.files += 1;
            summary.renamed += outcome.renamed;
            summary.kept += outcome.kept;
            if let Some(obf) = outcome.obf_path {
                summary.moved.insert(path, obf);
            }
        }
        let cache = self.finish()?;
        Ok((summary, cache))
    }

    /// Start over for another compilation in the same process.
    pub fn reset(&mut self) {
        self.ctx.reset();
        self.cache = NameCache::default();
    }
}
