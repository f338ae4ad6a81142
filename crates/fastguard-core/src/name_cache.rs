//! Incremental name cache.
//!
//! Persists original -> mangled names between builds so unchanged code keeps
//! its names. Keys of function-like declarations embed line numbers
//! (`name:startLine:endLine`); when an earlier pipeline stage moved lines, the
//! stage's source map translates keys into current coordinates and entries
//! that no longer resolve are dropped.
//!
//! File shape:
//!
//! ```json
//! {
//!   "compileSdkVersion": "12",
//!   "entryPackageInfo": "entry|1.0.0",
//!   "src/Demo.ts": {
//!     "IdentifierCache": { "Demo:1:9": "a", "count": "b" },
//!     "MemberMethodCache": { "render:3:8": "c" },
//!     "obfName": "src/d.ts"
//!   },
//!   "PropertyCache": { "title": "e" },
//!   "FileNameCache": { "Demo": "d" }
//! }
//! ```

use crate::error::{Error, Result};
use crate::source_map::SourceMap;
use fastguard_util::fs::write_artifact;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const COMPILE_SDK_VERSION: &str = "compileSdkVersion";
pub const ENTRY_PACKAGE_INFO: &str = "entryPackageInfo";
pub const PROPERTY_CACHE: &str = "PropertyCache";
pub const FILE_NAME_CACHE: &str = "FileNameCache";

/// Names recorded for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCache {
    #[serde(rename = "IdentifierCache", default)]
    pub identifiers: BTreeMap<String, String>,
    #[serde(rename = "MemberMethodCache", default)]
    pub members: BTreeMap<String, String>,
    #[serde(rename = "obfName", default, skip_serializing_if = "Option::is_none")]
    pub obf_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NameCache {
    pub compile_sdk_version: Option<String>,
    pub entry_package_info: Option<String>,
    pub files: BTreeMap<String, FileCache>,
    pub properties: BTreeMap<String, String>,
    pub file_names: BTreeMap<String, String>,
    /// Keys this version does not understand, written back untouched.
    pub extra: BTreeMap<String, Value>,
}

impl NameCache {
    /// Load the history file named by `-apply-namecache`. A missing file is
    /// fatal: continuing would silently produce unstable names.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NameCacheMissing {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|source| Error::NameCacheParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        let root: Map<String, Value> = serde_json::from_str(text)?;
        let mut cache = Self::default();
        for (key, value) in root {
            match key.as_str() {
                COMPILE_SDK_VERSION => cache.compile_sdk_version = value.as_str().map(str::to_string),
                ENTRY_PACKAGE_INFO => cache.entry_package_info = value.as_str().map(str::to_string),
                PROPERTY_CACHE => cache.properties = serde_json::from_value(value)?,
                FILE_NAME_CACHE => cache.file_names = serde_json::from_value(value)?,
                _ if is_file_entry(&value) => {
                    let entry: FileCache = serde_json::from_value(value)?;
                    cache.files.insert(key, entry);
                }
                _ => {
                    cache.extra.insert(key, value);
                }
            }
        }
        Ok(cache)
    }

    #[must_use]
    pub fn to_json(&self) -> String {
        let mut root = Map::new();
        for (key, value) in &self.extra {
            root.insert(key.clone(), value.clone());
        }
        if let Some(version) = &self.compile_sdk_version {
            root.insert(COMPILE_SDK_VERSION.into(), Value::String(version.clone()));
        }
        if let Some(info) = &self.entry_package_info {
            root.insert(ENTRY_PACKAGE_INFO.into(), Value::String(info.clone()));
        }
        for (file, entry) in &self.files {
            root.insert(file.clone(), file_entry_value(entry));
        }
        root.insert(PROPERTY_CACHE.into(), string_map_value(&self.properties));
        root.insert(FILE_NAME_CACHE.into(), string_map_value(&self.file_names));
        // Serializing an in-memory `Value` tree cannot fail.
        serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = self.to_json();
        text.push('\n');
        write_artifact(path, text.as_bytes())?;
        tracing::debug!(path = %path.display(), files = self.files.len(), "wrote name cache");
        Ok(())
    }

    /// Drop what no longer applies: everything when the SDK version changed,
    /// per-file entries when the entry package changed.
    pub fn reconcile(&mut self, sdk_version: Option<&str>, entry_package: Option<&str>) {
        if let (Some(cached), Some(current)) = (self.compile_sdk_version.as_deref(), sdk_version) {
            if cached != current {
                tracing::warn!(cached, current, "SDK version changed, discarding name cache");
                *self = Self::default();
                return;
            }
        }
        if let (Some(cached), Some(current)) = (self.entry_package_info.as_deref(), entry_package) {
            if cached != current {
                tracing::warn!(cached, current, "entry package changed, discarding per-file names");
                self.files.clear();
            }
        }
    }

    /// Move `file`'s line-keyed entries through the previous stage's map.
    pub fn translate_file(&mut self, file: &str, map: &SourceMap) {
        if let Some(entry) = self.files.get_mut(file) {
            let before = entry.identifiers.len() + entry.members.len();
            let source = map.source_index(file);
            if source.is_none() {
                tracing::debug!(file, sources = map.sources.len(), "file not found among the map's sources");
            }
            entry.identifiers = translate_keys(&entry.identifiers, map, source);
            entry.members = translate_keys(&entry.members, map, source);
            let dropped = before - entry.identifiers.len() - entry.members.len();
            if dropped > 0 {
                tracing::debug!(file, dropped, "dropped name cache entries without a source position");
            }
        }
    }

    /// Fold one run's results in. Processed files replace their entries;
    /// other entries and unknown keys carry over.
    pub fn update(
        &mut self,
        files: BTreeMap<String, FileCache>,
        properties: BTreeMap<String, String>,
        file_names: BTreeMap<String, String>,
    ) {
        self.files.extend(files);
        self.properties = properties;
        self.file_names = file_names;
    }
}

fn is_file_entry(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.contains_key("IdentifierCache") || o.contains_key("MemberMethodCache"))
}

fn string_map_value(map: &BTreeMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn file_entry_value(entry: &FileCache) -> Value {
    let mut obj = Map::new();
    obj.insert("IdentifierCache".into(), string_map_value(&entry.identifiers));
    obj.insert("MemberMethodCache".into(), string_map_value(&entry.members));
    if let Some(name) = &entry.obf_name {
        obj.insert("obfName".into(), Value::String(name.clone()));
    }
    Value::Object(obj)
}

/// Split `name:startLine:endLine`. Bare names return `None`.
#[must_use]
pub fn split_line_key(key: &str) -> Option<(&str, u32, u32)> {
    let mut parts = key.rsplitn(3, ':');
    let end = parts.next()?.parse().ok()?;
    let start = parts.next()?.parse().ok()?;
    let name = parts.next()?;
    Some((name, start, end))
}

/// Re-express one key in the map's generated coordinates, reading only
/// segments that came from `source`. Lines are 1-based.
#[must_use]
pub fn translate_key(key: &str, map: &SourceMap, source: u32) -> Option<String> {
    let Some((name, start, end)) = split_line_key(key) else {
        return Some(key.to_string());
    };
    let start = map.generated_line_for(source, start.checked_sub(1)?)? + 1;
    let end = map.generated_line_for(source, end.checked_sub(1)?)? + 1;
    Some(format!("{name}:{start}:{end}"))
}

/// Without a source index only bare keys survive.
fn translate_keys(
    entries: &BTreeMap<String, String>,
    map: &SourceMap,
    source: Option<u32>,
) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|(key, value)| {
            let key = match source {
                Some(source) => translate_key(key, map, source),
                None => split_line_key(key).is_none().then(|| key.clone()),
            };
            key.map(|k| (k, value.clone()))
        })
        .collect()
}
