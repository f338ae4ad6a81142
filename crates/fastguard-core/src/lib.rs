#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod context;
pub mod error;
pub mod name_cache;
pub mod namegen;
pub mod obfuscator;
pub mod rename;
pub mod report;
pub mod scope;
pub mod source_map;
pub mod tree;
pub mod version;
pub mod whitelist;
pub mod wildcard;

pub use config::{Config, MergedConfig, ProjectFile, Resolution, Resolver, RuleSet};
pub use context::ObfuscationContext;
pub use error::{Error, Result};
pub use name_cache::NameCache;
pub use namegen::{NameGenerator, NameStrategy};
pub use obfuscator::{Obfuscator, RunSummary};
pub use rename::{FileContext, FileOutcome};
pub use source_map::SourceMap;
pub use tree::document::SourceDocument;
pub use tree::{SyntaxTree, SyntaxVisitor};
pub use version::VERSION;
pub use whitelist::sdk::{ApiScanner, ApiSurface, DeclarationScanner};
pub use whitelist::{KeepReason, ReservedKind, Whitelist};
