//! Project description: the module graph and where the SDK lives.
//!
//! ```json
//! {
//!   "entry": "entry",
//!   "modules": [
//!     { "name": "entry", "kind": "application",
//!       "selfRules": ["obfuscation-rules.txt"], "dependencies": ["hsp"] },
//!     { "name": "hsp", "kind": "shared-package",
//!       "selfRules": ["hsp/obfuscation-rules.txt"],
//!       "consumerRules": ["hsp/consumer-rules.txt"] }
//!   ],
//!   "sdk": { "version": "12", "apiPaths": ["sdk/api"], "cachePath": "build/sdk.json" }
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How a module takes part in the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    Application,
    /// Compiled from source together with its dependents.
    Library,
    /// Prebuilt; only its exported consumer file is visible.
    Archive,
    /// Prebuilt and loaded at runtime by several applications.
    SharedPackage,
}

impl ModuleKind {
    #[must_use]
    pub fn is_prebuilt(self) -> bool {
        matches!(self, Self::Archive | Self::SharedPackage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleEntry {
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub self_rules: Vec<PathBuf>,
    #[serde(default)]
    pub consumer_rules: Vec<PathBuf>,
    /// Consumer file a prebuilt module shipped with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_consumer_file: Option<PathBuf>,
    /// Where this module's merged consumer rules are written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_output: Option<PathBuf>,
    /// Module names, in resolution order.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkEntry {
    pub version: String,
    #[serde(default)]
    pub api_paths: Vec<PathBuf>,
    pub cache_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub entry: String,
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk: Option<SdkEntry>,
}

impl ProjectFile {
    /// Load a project file; relative paths become relative to its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ProjectRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut project: Self = serde_json::from_str(&text).map_err(|source| Error::ProjectParse {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        project.resolve_paths(base);
        Ok(project)
    }

    /// Anchor every relative path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for module in &mut self.modules {
            module.self_rules.iter_mut().for_each(anchor);
            module.consumer_rules.iter_mut().for_each(anchor);
            module.exported_consumer_file.iter_mut().for_each(anchor);
            module.consumer_output.iter_mut().for_each(anchor);
        }
        if let Some(sdk) = &mut self.sdk {
            sdk.api_paths.iter_mut().for_each(anchor);
            anchor(&mut sdk.cache_path);
        }
    }

    pub fn module(&self, name: &str) -> Result<&ModuleEntry> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::UnknownModule {
                name: name.to_string(),
            })
    }

    pub fn entry_module(&self) -> Result<&ModuleEntry> {
        self.module(&self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(
            &path,
            r#"{
                "entry": "entry",
                "modules": [
                    { "name": "entry", "kind": "application", "selfRules": ["rules.txt"],
                      "dependencies": ["hsp"] },
                    { "name": "hsp", "kind": "shared-package",
                      "consumerRules": ["/abs/consumer.txt"] }
                ],
                "sdk": { "version": "12", "apiPaths": ["sdk"], "cachePath": "build/sdk.json" }
            }"#,
        )
        .unwrap();
        let project = ProjectFile::load(&path).unwrap();
        let entry = project.entry_module().unwrap();
        assert_eq!(entry.self_rules[0], dir.path().join("rules.txt"));
        let hsp = project.module("hsp").unwrap();
        assert_eq!(hsp.kind, ModuleKind::SharedPackage);
        assert!(hsp.kind.is_prebuilt());
        assert_eq!(hsp.consumer_rules[0], PathBuf::from("/abs/consumer.txt"));
        assert_eq!(project.sdk.unwrap().cache_path, dir.path().join("build/sdk.json"));
    }

    #[test]
    fn test_unknown_module() {
        let project = ProjectFile {
            entry: "missing".into(),
            modules: Vec::new(),
            sdk: None,
        };
        assert!(matches!(project.entry_module(), Err(Error::UnknownModule { .. })));
    }

    #[test]
    fn test_parse_errors_carry_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("project.json");
        std::fs::write(&path, r#"{ "entry": 1 }"#).unwrap();
        let err = ProjectFile::load(&path).unwrap_err();
        assert!(matches!(err, Error::ProjectParse { .. }));
        assert!(matches!(
            ProjectFile::load(&dir.path().join("nope.json")),
            Err(Error::ProjectRead { .. })
        ));
    }
}
