use super::{load_project, print_json, resolve_module};
use fastguard_core::config::{KeepLists, ObfuscationOptions, PrinterOptions};
use fastguard_core::{Config, DeclarationScanner};
use miette::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport<'a> {
    module: &'a str,
    options: ObfuscationOptions,
    lists: &'a KeepLists,
    printer: PrinterView<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    print_name_cache: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apply_name_cache: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sdk_version: Option<&'a str>,
    sdk_surface_loaded: bool,
    keep_dts_names: usize,
    fingerprint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    consumer_rules: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrinterView<'a> {
    compact: bool,
    remove_log: bool,
    remove_comments: bool,
    keep_comments: &'a [String],
}

impl<'a> From<&'a PrinterOptions> for PrinterView<'a> {
    fn from(p: &'a PrinterOptions) -> Self {
        Self {
            compact: p.compact,
            remove_log: p.remove_log,
            remove_comments: p.remove_comments,
            keep_comments: &p.keep_comments,
        }
    }
}

pub fn run(config: &Config, project: &Path, module: Option<&str>, json: bool) -> Result<()> {
    let project = load_project(config, project)?;
    let scanner = DeclarationScanner::new();
    let (_, resolution) = resolve_module(&project, &scanner, module)?;
    let rules = &resolution.merged.rules;

    if json {
        let keep_dts = &resolution.keep_dts;
        return print_json(&ResolveReport {
            module: &resolution.module,
            options: resolution.merged.options(),
            lists: &rules.lists,
            printer: (&resolution.merged.printer).into(),
            print_name_cache: rules.print_name_cache.as_deref(),
            apply_name_cache: rules.apply_name_cache.as_deref(),
            sdk_version: resolution.sdk_version.as_deref(),
            sdk_surface_loaded: resolution.sdk.is_some(),
            keep_dts_names: keep_dts.globals.len() + keep_dts.properties.len() + keep_dts.locals.len(),
            fingerprint: &resolution.fingerprint,
            consumer_rules: resolution.consumer_export.as_ref().map(|r| r.to_rule_text()),
        });
    }

    println!("# module: {}", resolution.module);
    if !resolution.merged.obfuscation_enabled() {
        println!("# obfuscation disabled");
    }
    print!("{}", rules.to_rule_text());
    Ok(())
}
