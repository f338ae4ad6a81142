//! Configuration: runtime settings, rule files, the project module graph and
//! the resolver that folds them into a [`MergedConfig`].

pub mod merge;
pub mod project;
pub mod resolver;
pub mod rules;

pub use merge::{KeepPathSet, MergedConfig, PrinterOptions};
pub use project::{ModuleEntry, ModuleKind, ProjectFile, SdkEntry};
pub use resolver::{Resolution, Resolver};
pub use rules::{KeepLists, ObfuscationOptions, RuleSet, RuleToken};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the fastguard CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Resolve `path` against the working directory.
    #[must_use]
    pub fn resolve_path(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
