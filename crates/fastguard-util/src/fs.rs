use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File suffixes recognised as declaration files when scanning an API surface.
pub const DECLARATION_SUFFIXES: &[&str] = &[".d.ts", ".d.ets"];

/// Read a text file, replacing invalid UTF-8 sequences with the replacement character.
///
/// Rule files and caches are produced by many tools; a stray byte must not
/// abort the whole compilation.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_text_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write an output artifact atomically, creating missing parent directories.
///
/// The content goes to a sibling temp file first and is then renamed over the
/// target, so readers observe either the previous artifact or the new one.
///
/// # Errors
/// Returns an error if the directory cannot be created or the write/rename fails.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact");
    let temp_path = parent.join(format!(".{file_name}.{}.partial", std::process::id()));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        if cfg!(windows) && path.exists() {
            fs::copy(&temp_path, path)?;
            let _ = fs::remove_file(&temp_path);
            return Ok(());
        }
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

/// Whether `path` names a declaration file (`.d.ts` / `.d.ets`).
#[must_use]
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| DECLARATION_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Collect declaration files below each root, in a deterministic order.
///
/// A root that is itself a declaration file is returned as-is; missing roots
/// are skipped. Results are sorted and de-duplicated.
#[must_use]
pub fn collect_declaration_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if root.is_file() {
            if is_declaration_file(root) {
                files.push(root.clone());
            }
            continue;
        }
        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.file_type().is_file() && is_declaration_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}
