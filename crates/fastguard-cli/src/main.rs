#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use fastguard_core::Config;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fastguard")]
#[command(author, version, about = "Source-level name obfuscation for JS/TS build pipelines", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve the merged obfuscation rules of a module
    Resolve {
        /// Project description file
        #[arg(long, short = 'p', value_name = "FILE", default_value = "obfuscation-project.json")]
        project: PathBuf,

        /// Module to resolve (defaults to the project's entry module)
        #[arg(long, short = 'm')]
        module: Option<String>,
    },

    /// Write a module's consumer rule file to its configured output
    Consumer {
        #[arg(long, short = 'p', value_name = "FILE", default_value = "obfuscation-project.json")]
        project: PathBuf,

        #[arg(long, short = 'm')]
        module: Option<String>,
    },

    /// Build or refresh the SDK surface cache
    SdkCache {
        #[arg(long, short = 'p', value_name = "FILE", default_value = "obfuscation-project.json")]
        project: PathBuf,

        /// Drop nested parameter and member names from the surface
        #[arg(long)]
        strip_args: bool,

        /// Rescan even when the cache is current
        #[arg(long)]
        force: bool,
    },

    /// Rename the names in exported syntax documents
    Obfuscate {
        #[arg(long, short = 'p', value_name = "FILE", default_value = "obfuscation-project.json")]
        project: PathBuf,

        #[arg(long, short = 'm')]
        module: Option<String>,

        /// Directory the renamed documents are written to
        #[arg(long, short = 'o', value_name = "DIR")]
        out: PathBuf,

        /// Previous-stage source map for a document, as `<document path>=<map file>`
        #[arg(long = "source-map", value_name = "PATH=MAP")]
        source_maps: Vec<String>,

        /// Word list to draw new names from, one word per line
        #[arg(long, value_name = "FILE")]
        dictionary: Option<PathBuf>,

        /// Entry package identity recorded in the name cache (e.g. entry|1.0.0)
        #[arg(long)]
        entry_package: Option<String>,

        /// Syntax documents (JSON) to rename
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Resolve { project, module }) => {
            let span = tracing::info_span!("resolve", cmd = "resolve", cwd = %cwd.display());
            let _guard = span.enter();
            commands::resolve::run(&config, &project, module.as_deref(), cli.json)
        }
        Some(Commands::Consumer { project, module }) => {
            let span = tracing::info_span!("consumer", cmd = "consumer", cwd = %cwd.display());
            let _guard = span.enter();
            commands::consumer::run(&config, &project, module.as_deref(), cli.json)
        }
        Some(Commands::SdkCache {
            project,
            strip_args,
            force,
        }) => {
            let span = tracing::info_span!("sdk-cache", cmd = "sdk-cache", cwd = %cwd.display());
            let _guard = span.enter();
            commands::sdk_cache::run(&config, &project, strip_args, force, cli.json)
        }
        Some(Commands::Obfuscate {
            project,
            module,
            out,
            source_maps,
            dictionary,
            entry_package,
            documents,
        }) => {
            let span = tracing::info_span!("obfuscate", cmd = "obfuscate", cwd = %cwd.display());
            let _guard = span.enter();
            let action = commands::obfuscate::ObfuscateAction {
                project,
                module,
                out,
                source_maps,
                dictionary,
                entry_package,
                documents,
            };
            commands::obfuscate::run(&config, action, cli.json)
        }
    }
}
