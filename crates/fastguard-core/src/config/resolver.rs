//! Folding a module's rules with what its dependencies demand.
//!
//! Every dependency contributes rules to its dependents:
//! - a library compiled from source contributes its consumer rules (its own
//!   and, transitively, those of its dependencies) plus its kept names; its
//!   strength switches only count when the dependent enables
//!   `-enable-lib-obfuscation-options`;
//! - a prebuilt archive or shared package contributes the consumer file it
//!   shipped with. Depending on a shared package turns export obfuscation on.
//!
//! Contributions are folded in declaration order and the result is sorted and
//! deduplicated once, so resolution is reproducible byte for byte.

use super::merge::MergedConfig;
use super::project::{ModuleEntry, ModuleKind, ProjectFile};
use super::rules::RuleSet;
use crate::error::{Error, Result};
use crate::whitelist::sdk::{ApiScanner, ApiSurface};
use fastguard_util::fs::write_artifact;
use fastguard_util::hash::fingerprint_files;
use std::collections::HashMap;
use std::path::PathBuf;

/// Everything resolved for one module.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub module: String,
    pub merged: MergedConfig,
    /// Rules this module hands to its consumers, when it declares any.
    pub consumer_export: Option<RuleSet>,
    /// SDK surface, when the merged switches need it.
    pub sdk: Option<ApiSurface>,
    pub sdk_version: Option<String>,
    /// Names declared in `-keep-dts` files.
    pub keep_dts: ApiSurface,
    /// Fingerprint of every rule file read.
    pub fingerprint: String,
}

pub struct Resolver<'a> {
    project: &'a ProjectFile,
    scanner: &'a dyn ApiScanner,
    exports: HashMap<String, RuleSet>,
    rule_files: Vec<PathBuf>,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(project: &'a ProjectFile, scanner: &'a dyn ApiScanner) -> Self {
        Self {
            project,
            scanner,
            exports: HashMap::new(),
            rule_files: Vec::new(),
        }
    }

    /// Resolve the project's entry module.
    pub fn resolve_entry(&mut self) -> Result<Resolution> {
        let entry = self.project.entry.clone();
        self.resolve(&entry)
    }

    pub fn resolve(&mut self, name: &str) -> Result<Resolution> {
        let project = self.project;
        let module = project.module(name)?;
        tracing::debug!(module = name, kind = ?module.kind, "resolving obfuscation rules");

        let self_rules = self.load(&module.self_rules)?;
        let lib_options = self_rules.options.enable_lib_obfuscation_options;
        let mut rules = self_rules;

        for dep in &module.dependencies {
            let contribution = self.contribution(dep, lib_options, &mut vec![name.to_string()])?;
            rules.merge(&contribution);
        }

        let consumer_export = if module.consumer_rules.is_empty() && module.kind == ModuleKind::Application {
            None
        } else {
            Some(self.export_of(name, &mut Vec::new())?)
        };

        if rules.options.disable_obfuscation {
            tracing::debug!(module = name, "obfuscation disabled for module");
        }

        let merged = MergedConfig::from_rules(rules);

        let sdk = match (&project.sdk, merged.needs_sdk_surface() && merged.obfuscation_enabled()) {
            (Some(sdk), true) => Some(ApiSurface::load_or_scan(
                &sdk.cache_path,
                &sdk.version,
                &sdk.api_paths,
                self.scanner,
                merged.options().strip_system_api_args,
            )?),
            _ => None,
        };

        let keep_dts = if merged.rules.lists.keep_dts.is_empty() {
            ApiSurface::default()
        } else {
            let paths: Vec<PathBuf> = merged.rules.lists.keep_dts.iter().map(PathBuf::from).collect();
            ApiSurface::scan(&paths, self.scanner, false)?
        };

        let fingerprint = fingerprint_files(&self.rule_files)?;

        Ok(Resolution {
            module: name.to_string(),
            merged,
            consumer_export,
            sdk,
            sdk_version: project.sdk.as_ref().map(|s| s.version.clone()),
            keep_dts,
            fingerprint,
        })
    }

    /// Write the module's consumer rules to its `consumerOutput`, if both exist.
    pub fn emit_consumer_file(&self, resolution: &Resolution) -> Result<Option<PathBuf>> {
        let module = self.project.module(&resolution.module)?;
        let (Some(export), Some(output)) = (&resolution.consumer_export, &module.consumer_output) else {
            return Ok(None);
        };
        write_artifact(output, export.to_rule_text().as_bytes())?;
        tracing::debug!(module = %module.name, path = %output.display(), "wrote consumer rules");
        Ok(Some(output.clone()))
    }

    /// What `name` adds to a dependent's rules.
    fn contribution(&mut self, name: &str, lib_options: bool, stack: &mut Vec<String>) -> Result<RuleSet> {
        let project = self.project;
        let module = project.module(name)?;
        check_cycle(name, stack)?;

        let mut contribution = self.export_of(name, stack)?;
        match module.kind {
            ModuleKind::Library | ModuleKind::Application => {
                let own = self.load(&module.self_rules)?;
                contribution.lists.global_names.extend(own.lists.global_names);
                contribution.lists.property_names.extend(own.lists.property_names);
                contribution.lists.file_names.extend(own.lists.file_names);
                if lib_options {
                    contribution.options = contribution.options.merge(own.options.strength_only());
                }
            }
            ModuleKind::SharedPackage => contribution.options.enable_export_obfuscation = true,
            ModuleKind::Archive => {}
        }
        Ok(contribution)
    }

    /// Consumer rules of `name`: its own merged with its dependencies',
    /// reduced to the consumer subset. Memoized per module.
    fn export_of(&mut self, name: &str, stack: &mut Vec<String>) -> Result<RuleSet> {
        if let Some(cached) = self.exports.get(name) {
            return Ok(cached.clone());
        }
        let project = self.project;
        let module: &ModuleEntry = project.module(name)?;

        let export = match (&module.exported_consumer_file, module.kind.is_prebuilt()) {
            (Some(file), true) => self.load(std::slice::from_ref(file))?.consumer_subset(),
            _ => {
                stack.push(name.to_string());
                let mut rules = self.load(&module.consumer_rules)?;
                for dep in &module.dependencies {
                    check_cycle(dep, stack)?;
                    let dep_export = self.export_of(dep, stack)?;
                    rules.merge(&dep_export);
                }
                stack.pop();
                rules.consumer_subset()
            }
        };

        self.exports.insert(name.to_string(), export.clone());
        Ok(export)
    }

    fn load(&mut self, paths: &[PathBuf]) -> Result<RuleSet> {
        self.rule_files.extend(paths.iter().cloned());
        RuleSet::load_all(paths)
    }
}

fn check_cycle(name: &str, stack: &[String]) -> Result<()> {
    if let Some(pos) = stack.iter().position(|m| m == name) {
        let mut chain: Vec<String> = stack[pos..].to_vec();
        chain.push(name.to_string());
        return Err(Error::DependencyCycle { chain });
    }
    Ok(())
}
