use super::{load_project, print_json, resolve_module};
use fastguard_core::{Config, DeclarationScanner};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsumerReport {
    module: String,
    written: Option<PathBuf>,
    rules: Option<String>,
}

pub fn run(config: &Config, project: &Path, module: Option<&str>, json: bool) -> Result<()> {
    let project = load_project(config, project)?;
    let scanner = DeclarationScanner::new();
    let (resolver, resolution) = resolve_module(&project, &scanner, module)?;
    let written = resolver.emit_consumer_file(&resolution).into_diagnostic()?;

    if written.is_none() {
        tracing::warn!(module = %resolution.module, "module has no consumer rules or no consumerOutput");
    }

    if json {
        return print_json(&ConsumerReport {
            module: resolution.module.clone(),
            written,
            rules: resolution.consumer_export.as_ref().map(|r| r.to_rule_text()),
        });
    }

    match written {
        Some(path) => println!("wrote {}", path.display()),
        None => println!("nothing to write for {}", resolution.module),
    }
    Ok(())
}
