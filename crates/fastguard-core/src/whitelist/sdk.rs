//! SDK/system API surface.
//!
//! Names exposed by the platform's declaration files must survive renaming.
//! The surface is scanned once per compilation and cached in a JSON side file
//! keyed by SDK version and a hash of the declaration files' contents; a
//! cache hit skips the scan.

use crate::error::{Error, Result};
use fastguard_util::fs::{collect_declaration_files, read_text_lossy, write_artifact};
use fastguard_util::hash::{fingerprint_files, fingerprint_str};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Names one declaration file contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiScan {
    /// Top-level declarations.
    pub globals: BTreeSet<String>,
    /// Members of top-level declarations.
    pub properties: BTreeSet<String>,
    /// Parameter names and members of nested object types.
    pub nested: BTreeSet<String>,
    /// Names that must not be used for locals.
    pub locals: BTreeSet<String>,
}

/// External declaration-file scanner.
pub trait ApiScanner {
    fn scan(&self, path: &Path, source: &str) -> ApiScan;
}

/// Aggregated surface, as stored in the cache file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSurface {
    #[serde(rename = "compileSdkVersion", default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    #[serde(rename = "apiFingerprint", default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(rename = "ReservedPropertyNames", default)]
    pub properties: BTreeSet<String>,
    #[serde(rename = "ReservedGlobalNames", default)]
    pub globals: BTreeSet<String>,
    #[serde(rename = "ReservedLocalNames", default)]
    pub locals: BTreeSet<String>,
}

impl ApiSurface {
    /// Union of per-file scans. With `strip_args`, nested parameter and member
    /// names are dropped and only top-level members are kept.
    pub fn aggregate<'a>(scans: impl IntoIterator<Item = &'a ApiScan>, strip_args: bool) -> Self {
        let mut surface = Self::default();
        for scan in scans {
            surface.globals.extend(scan.globals.iter().cloned());
            surface.properties.extend(scan.properties.iter().cloned());
            surface.locals.extend(scan.locals.iter().cloned());
            if !strip_args {
                surface.properties.extend(scan.nested.iter().cloned());
            }
        }
        surface
    }

    /// Scan every declaration file under `api_paths`.
    pub fn scan(api_paths: &[PathBuf], scanner: &dyn ApiScanner, strip_args: bool) -> Result<Self> {
        Self::scan_files(&collect_declaration_files(api_paths), scanner, strip_args)
    }

    fn scan_files(files: &[PathBuf], scanner: &dyn ApiScanner, strip_args: bool) -> Result<Self> {
        tracing::debug!(files = files.len(), "scanning SDK declaration files");
        let mut scans = Vec::with_capacity(files.len());
        for file in files {
            let source = read_text_lossy(file)?;
            scans.push(scanner.scan(file, &source));
        }
        Ok(Self::aggregate(&scans, strip_args))
    }

    /// Read the cache at `cache_path` when it matches `sdk_version` and the
    /// scan inputs, otherwise scan and rewrite it.
    pub fn load_or_scan(
        cache_path: &Path,
        sdk_version: &str,
        api_paths: &[PathBuf],
        scanner: &dyn ApiScanner,
        strip_args: bool,
    ) -> Result<Self> {
        let files = collect_declaration_files(api_paths);
        let fingerprint = scan_fingerprint(&files, strip_args)?;

        if cache_path.exists() {
            let cached = Self::read(cache_path)?;
            if cached.sdk_version.as_deref() == Some(sdk_version)
                && cached.fingerprint.as_deref() == Some(fingerprint.as_str())
            {
                tracing::debug!(path = %cache_path.display(), "SDK surface cache hit");
                return Ok(cached);
            }
            tracing::debug!(path = %cache_path.display(), "SDK surface cache is stale");
        }

        let mut surface = Self::scan_files(&files, scanner, strip_args)?;
        surface.sdk_version = Some(sdk_version.to_string());
        surface.fingerprint = Some(fingerprint);
        surface.write(cache_path)?;
        Ok(surface)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = read_text_lossy(path)?;
        serde_json::from_str(&text).map_err(|source| Error::SdkCacheParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| Error::SdkCacheParse {
            path: path.to_path_buf(),
            source,
        })?;
        write_artifact(path, json.as_bytes())?;
        Ok(())
    }
}

/// Content hash of the declaration files, combined with the strip mode.
fn scan_fingerprint(files: &[PathBuf], strip_args: bool) -> Result<String> {
    let contents = fingerprint_files(files)?;
    let mode = if strip_args { "strip" } else { "full" };
    Ok(fingerprint_str(&format!("{contents}\n{mode}")))
}

/// Line-oriented scanner for `.d.ts`/`.d.ets` files.
///
/// Tracks brace depth: declarations at depth 0 are globals, names declared
/// one level in are members, anything deeper and every parameter name is
/// nested.
#[derive(Debug)]
pub struct DeclarationScanner {
    top_level: Option<Regex>,
    member: Option<Regex>,
    param: Option<Regex>,
}

impl Default for DeclarationScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationScanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            top_level: Regex::new(
                r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:function|class|interface|enum|namespace|module|type|const|let|var|struct)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
            )
            .ok(),
            member: Regex::new(
                r"^\s*(?:(?:readonly|static|public|protected|private|abstract|declare|get|set|async|function|const|let|var|class|interface|enum|type|namespace|export)\s+)*([A-Za-z_$][A-Za-z0-9_$]*)\??\s*[:(<=;,{]",
            )
            .ok(),
            param: Regex::new(r"[(,]\s*(?:\.\.\.)?([A-Za-z_$][A-Za-z0-9_$]*)\??\s*:").ok(),
        }
    }
}

impl ApiScanner for DeclarationScanner {
    fn scan(&self, _path: &Path, source: &str) -> ApiScan {
        let mut scan = ApiScan::default();
        let mut depth = 0usize;
        let mut in_block_comment = false;

        for raw in source.lines() {
            let line = strip_comments(raw, &mut in_block_comment);
            if line.trim().is_empty() {
                continue;
            }

            if depth == 0 {
                if let Some(caps) = self.top_level.as_ref().and_then(|re| re.captures(&line)) {
                    scan.globals.insert(caps[1].to_string());
                }
            } else if let Some(caps) = self.member.as_ref().and_then(|re| re.captures(&line)) {
                let target = if depth == 1 {
                    &mut scan.properties
                } else {
                    &mut scan.nested
                };
                target.insert(caps[1].to_string());
            }
            if let Some(re) = &self.param {
                for caps in re.captures_iter(&line) {
                    scan.nested.insert(caps[1].to_string());
                }
            }

            for c in line.chars() {
                match c {
                    '{' => depth += 1,
                    '}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
        scan
    }
}

fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        if *in_block {
            match rest.find("*/") {
                Some(end) => {
                    *in_block = false;
                    rest = &rest[end + 2..];
                }
                None => return out,
            }
        }
        let line_comment = rest.find("//");
        let block_comment = rest.find("/*");
        match (line_comment, block_comment) {
            (Some(l), Some(b)) if l < b => {
                out.push_str(&rest[..l]);
                return out;
            }
            (Some(l), None) => {
                out.push_str(&rest[..l]);
                return out;
            }
            (_, Some(b)) => {
                out.push_str(&rest[..b]);
                *in_block = true;
                rest = &rest[b + 2..];
            }
            (None, None) => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    const DECL: &str = r"
/** Window manager. */
declare namespace window {
  function getLastWindow(ctx: Context, callback?: Callback): void;
  interface Size {
    width: number; // px
    height: number;
  }
}
export default window;
export declare class Preferences {
  static getPreferences(context: Context, name: string): Preferences;
  readonly flushSync: () => void;
}
";

    struct CountingScanner {
        inner: DeclarationScanner,
        calls: Cell<usize>,
    }

    impl ApiScanner for CountingScanner {
        fn scan(&self, path: &Path, source: &str) -> ApiScan {
            self.calls.set(self.calls.get() + 1);
            self.inner.scan(path, source)
        }
    }

    #[test]
    fn test_scanner_levels() {
        let scan = DeclarationScanner::new().scan(Path::new("w.d.ts"), DECL);
        assert!(scan.globals.contains("window"));
        assert!(scan.globals.contains("Preferences"));
        assert!(scan.properties.contains("getLastWindow"));
        assert!(scan.properties.contains("Size"));
        assert!(scan.properties.contains("getPreferences"));
        assert!(scan.properties.contains("flushSync"));
        assert!(scan.nested.contains("width"));
        assert!(scan.nested.contains("ctx"));
        assert!(scan.nested.contains("callback"));
        assert!(!scan.globals.contains("px"));
    }

    #[test]
    fn test_strip_args_drops_nested_names() {
        let scan = DeclarationScanner::new().scan(Path::new("w.d.ts"), DECL);
        let full = ApiSurface::aggregate([&scan], false);
        let stripped = ApiSurface::aggregate([&scan], true);
        assert!(full.properties.contains("ctx"));
        assert!(!stripped.properties.contains("ctx"));
        assert!(stripped.properties.contains("getLastWindow"));
        assert_eq!(full.globals, stripped.globals);
    }

    #[test]
    fn test_cache_hit_skips_scan() {
        let dir = tempdir().unwrap();
        let api = dir.path().join("api");
        std::fs::create_dir_all(&api).unwrap();
        std::fs::write(api.join("@ohos.window.d.ts"), DECL).unwrap();
        let cache = dir.path().join("cache").join("sdk.json");
        let scanner = CountingScanner {
            inner: DeclarationScanner::new(),
            calls: Cell::new(0),
        };

        let first = ApiSurface::load_or_scan(&cache, "12", &[api.clone()], &scanner, false).unwrap();
        assert_eq!(scanner.calls.get(), 1);
        assert!(cache.exists());

        let second = ApiSurface::load_or_scan(&cache, "12", &[api.clone()], &scanner, false).unwrap();
        assert_eq!(scanner.calls.get(), 1);
        assert_eq!(first, second);

        ApiSurface::load_or_scan(&cache, "13", &[api], &scanner, false).unwrap();
        assert_eq!(scanner.calls.get(), 2);
    }

    #[test]
    fn test_edited_declaration_file_invalidates_cache() {
        let dir = tempdir().unwrap();
        let api = dir.path().join("api");
        std::fs::create_dir_all(&api).unwrap();
        let decl = api.join("@ohos.window.d.ts");
        std::fs::write(&decl, DECL).unwrap();
        let cache = dir.path().join("sdk.json");
        let scanner = CountingScanner {
            inner: DeclarationScanner::new(),
            calls: Cell::new(0),
        };

        let first = ApiSurface::load_or_scan(&cache, "12", &[api.clone()], &scanner, false).unwrap();
        assert!(!first.globals.contains("display"));

        std::fs::write(&decl, format!("{DECL}declare namespace display {{}}\n")).unwrap();
        let second = ApiSurface::load_or_scan(&cache, "12", &[api.clone()], &scanner, false).unwrap();
        assert_eq!(scanner.calls.get(), 2);
        assert!(second.globals.contains("display"));
        assert_ne!(first.fingerprint, second.fingerprint);

        ApiSurface::load_or_scan(&cache, "12", &[api.clone()], &scanner, true).unwrap();
        assert_eq!(scanner.calls.get(), 3);
    }

    #[test]
    fn test_cache_file_shape() {
        let surface = ApiSurface {
            sdk_version: Some("12".into()),
            globals: ["window".to_string()].into_iter().collect(),
            ..ApiSurface::default()
        };
        let value: serde_json::Value = serde_json::to_value(&surface).unwrap();
        assert_eq!(value["ReservedGlobalNames"][0], "window");
        assert!(value["ReservedPropertyNames"].as_array().unwrap().is_empty());
        assert_eq!(value["compileSdkVersion"], "12");
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("sdk.json");
        std::fs::write(&cache, "{ not json").unwrap();
        let err = ApiSurface::read(&cache).unwrap_err();
        assert!(matches!(err, Error::SdkCacheParse { .. }));
    }
}
