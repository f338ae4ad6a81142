use super::{load_project, print_json, resolve_module};
use fastguard_core::{Config, DeclarationScanner, NameStrategy, Obfuscator, RunSummary, SourceDocument, SourceMap};
use fastguard_util::fs::{read_text_lossy, write_artifact};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ObfuscateAction {
    pub project: PathBuf,
    pub module: Option<String>,
    pub out: PathBuf,
    pub source_maps: Vec<String>,
    pub dictionary: Option<PathBuf>,
    pub entry_package: Option<String>,
    pub documents: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ObfuscateReport<'a> {
    module: &'a str,
    files: usize,
    renamed: usize,
    kept: usize,
    moved: &'a BTreeMap<String, String>,
    written: Vec<PathBuf>,
}

pub fn run(config: &Config, action: ObfuscateAction, json: bool) -> Result<()> {
    let project = load_project(config, &action.project)?;
    let scanner = DeclarationScanner::new();
    let (_, resolution) = resolve_module(&project, &scanner, action.module.as_deref())?;

    let strategy = match &action.dictionary {
        Some(path) => load_dictionary(&config.resolve_path(path))?,
        None => NameStrategy::Ordered,
    };
    let source_maps = load_source_maps(config, &action.source_maps)?;

    let mut documents = Vec::with_capacity(action.documents.len());
    for path in &action.documents {
        let path = config.resolve_path(path);
        let text = read_text_lossy(&path).into_diagnostic()?;
        let doc = SourceDocument::from_json(&text)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        documents.push(doc);
    }

    let mut obfuscator = Obfuscator::new(&resolution, strategy).with_project_root(&config.cwd);
    if let Some(info) = &action.entry_package {
        obfuscator = obfuscator.with_entry_package(info.clone());
    }
    let (summary, _) = obfuscator
        .obfuscate_documents(&mut documents, &source_maps)
        .into_diagnostic()?;

    let out_dir = config.resolve_path(&action.out);
    let mut written = Vec::with_capacity(documents.len());
    for doc in &documents {
        let relative = summary.moved.get(&doc.path).unwrap_or(&doc.path);
        let target = out_dir.join(format!("{relative}.json"));
        write_artifact(&target, doc.to_json().into_diagnostic()?.as_bytes()).into_diagnostic()?;
        written.push(target);
    }

    if json {
        return print_json(&ObfuscateReport {
            module: &resolution.module,
            files: summary.files,
            renamed: summary.renamed,
            kept: summary.kept,
            moved: &summary.moved,
            written,
        });
    }
    print_summary(&resolution.module, &summary, &out_dir);
    Ok(())
}

fn print_summary(module: &str, summary: &RunSummary, out_dir: &Path) {
    println!(
        "{module}: {} files, {} names renamed, {} kept -> {}",
        summary.files,
        summary.renamed,
        summary.kept,
        out_dir.display()
    );
    for (from, to) in &summary.moved {
        println!("  {from} -> {to}");
    }
}

fn load_dictionary(path: &Path) -> Result<NameStrategy> {
    let text = read_text_lossy(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading dictionary {}", path.display()))?;
    let words = text
        .lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .map(str::to_string)
        .collect();
    Ok(NameStrategy::Dictionary(words))
}

/// `<document path>=<map file>` pairs.
fn load_source_maps(config: &Config, pairs: &[String]) -> Result<BTreeMap<String, SourceMap>> {
    let mut maps = BTreeMap::new();
    for pair in pairs {
        let (file, map_path) = pair
            .split_once('=')
            .ok_or_else(|| miette!("expected <document path>=<map file>, got `{pair}`"))?;
        let map_path = config.resolve_path(Path::new(map_path));
        let text = read_text_lossy(&map_path).into_diagnostic()?;
        let map = SourceMap::from_json(&text)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading source map {}", map_path.display()))?;
        maps.insert(file.to_string(), map);
    }
    Ok(maps)
}
