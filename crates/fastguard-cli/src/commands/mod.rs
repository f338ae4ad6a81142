pub mod consumer;
pub mod obfuscate;
pub mod resolve;
pub mod sdk_cache;
pub mod version;

use fastguard_core::{Config, DeclarationScanner, ProjectFile, Resolution, Resolver};
use miette::{IntoDiagnostic, Result};
use std::path::Path;

pub fn load_project(config: &Config, path: &Path) -> Result<ProjectFile> {
    ProjectFile::load(&config.resolve_path(path)).into_diagnostic()
}

/// Resolve `module`, or the entry module when none is named.
pub fn resolve_module<'a>(
    project: &'a ProjectFile,
    scanner: &'a DeclarationScanner,
    module: Option<&str>,
) -> Result<(Resolver<'a>, Resolution)> {
    let mut resolver = Resolver::new(project, scanner);
    let resolution = match module {
        Some(name) => resolver.resolve(name),
        None => resolver.resolve_entry(),
    }
    .into_diagnostic()?;
    Ok((resolver, resolution))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
