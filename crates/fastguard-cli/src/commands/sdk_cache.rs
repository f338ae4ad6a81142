use super::{load_project, print_json};
use fastguard_core::{ApiSurface, Config, DeclarationScanner};
use miette::{miette, IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SdkCacheReport<'a> {
    path: &'a Path,
    sdk_version: &'a str,
    globals: usize,
    properties: usize,
    locals: usize,
}

pub fn run(config: &Config, project: &Path, strip_args: bool, force: bool, json: bool) -> Result<()> {
    let project = load_project(config, project)?;
    let sdk = project
        .sdk
        .as_ref()
        .ok_or_else(|| miette!("project file has no `sdk` section"))?;

    if force && sdk.cache_path.exists() {
        std::fs::remove_file(&sdk.cache_path).into_diagnostic()?;
        tracing::debug!(path = %sdk.cache_path.display(), "removed SDK surface cache");
    }

    let scanner = DeclarationScanner::new();
    let surface = ApiSurface::load_or_scan(&sdk.cache_path, &sdk.version, &sdk.api_paths, &scanner, strip_args)
        .into_diagnostic()?;

    let report = SdkCacheReport {
        path: &sdk.cache_path,
        sdk_version: &sdk.version,
        globals: surface.globals.len(),
        properties: surface.properties.len(),
        locals: surface.locals.len(),
    };
    if json {
        return print_json(&report);
    }
    println!(
        "{}: {} globals, {} properties, {} locals (sdk {})",
        report.path.display(),
        report.globals,
        report.properties,
        report.locals,
        report.sdk_version
    );
    Ok(())
}
