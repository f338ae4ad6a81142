use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, SCREAMING_SNAKE_CASE and stable across versions.
pub mod codes {
    pub const OBF_IO_ERROR: &str = "OBF_IO_ERROR";
    pub const OBF_RULE_READ_FAILED: &str = "OBF_RULE_READ_FAILED";
    pub const OBF_NAMECACHE_MISSING: &str = "OBF_NAMECACHE_MISSING";
    pub const OBF_NAMECACHE_INVALID: &str = "OBF_NAMECACHE_INVALID";
    pub const OBF_SDK_CACHE_INVALID: &str = "OBF_SDK_CACHE_INVALID";
    pub const OBF_PROJECT_READ_FAILED: &str = "OBF_PROJECT_READ_FAILED";
    pub const OBF_PROJECT_INVALID: &str = "OBF_PROJECT_INVALID";
    pub const OBF_SOURCEMAP_INVALID: &str = "OBF_SOURCEMAP_INVALID";
    pub const OBF_DEPENDENCY_CYCLE: &str = "OBF_DEPENDENCY_CYCLE";
    pub const OBF_UNKNOWN_MODULE: &str = "OBF_UNKNOWN_MODULE";
    pub const OBF_INTERNAL: &str = "OBF_INTERNAL";
}

/// Core error type for fastguard operations.
///
/// Everything that can fail lives at an I/O or configuration boundary; the
/// per-binding reservation and renaming logic is total.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read obfuscation rules at {path}: {source}")]
    RuleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Name cache to apply does not exist: {path}")]
    NameCacheMissing { path: PathBuf },

    #[error("Failed to parse name cache at {path}: {source}")]
    NameCacheParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse SDK surface cache at {path}: {source}")]
    SdkCacheParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read project description at {path}: {source}")]
    ProjectRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse project description at {path}: {source}")]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse source map: {source}")]
    SourceMapParse {
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid source map mappings segment: {segment:?}")]
    SourceMapDecode { segment: String },

    #[error("Dependency cycle between modules: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    #[error("Module not found in project: {name}")]
    UnknownModule { name: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Stable code for this error, suitable for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => codes::OBF_IO_ERROR,
            Self::RuleRead { .. } => codes::OBF_RULE_READ_FAILED,
            Self::NameCacheMissing { .. } => codes::OBF_NAMECACHE_MISSING,
            Self::NameCacheParse { .. } => codes::OBF_NAMECACHE_INVALID,
            Self::SdkCacheParse { .. } => codes::OBF_SDK_CACHE_INVALID,
            Self::ProjectRead { .. } => codes::OBF_PROJECT_READ_FAILED,
            Self::ProjectParse { .. } => codes::OBF_PROJECT_INVALID,
            Self::SourceMapParse { .. } | Self::SourceMapDecode { .. } => {
                codes::OBF_SOURCEMAP_INVALID
            }
            Self::DependencyCycle { .. } => codes::OBF_DEPENDENCY_CYCLE,
            Self::UnknownModule { .. } => codes::OBF_UNKNOWN_MODULE,
            Self::Other(_) => codes::OBF_INTERNAL,
        }
    }
}

/// Result alias used throughout the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codes_are_screaming_snake_case() {
        let codes = [
            codes::OBF_IO_ERROR,
            codes::OBF_RULE_READ_FAILED,
            codes::OBF_NAMECACHE_MISSING,
            codes::OBF_NAMECACHE_INVALID,
            codes::OBF_SDK_CACHE_INVALID,
            codes::OBF_PROJECT_READ_FAILED,
            codes::OBF_PROJECT_INVALID,
            codes::OBF_SOURCEMAP_INVALID,
            codes::OBF_DEPENDENCY_CYCLE,
            codes::OBF_UNKNOWN_MODULE,
            codes::OBF_INTERNAL,
        ];

        for code in codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = Error::DependencyCycle {
            chain: vec!["app".into(), "lib".into(), "app".into()],
        };
        assert_eq!(err.code(), codes::OBF_DEPENDENCY_CYCLE);
        assert!(err.to_string().contains("app -> lib -> app"));
    }
}
