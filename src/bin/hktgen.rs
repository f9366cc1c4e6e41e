//! hktgen: validate arity-encoded type constructors and generate their accessors
//!
//! Reads a JSON manifest of candidate declarations, checks each one against
//! the `__`/`__2`..`__9` encoding contract, and writes one `Hkt`-style class
//! per package holding the coercion and type-equality accessors.
//!
//! ## Features
//!
//! - **check**: Validate candidates and print diagnostics, write nothing
//! - **generate**: Validate, then merge accessors into the generated source tree
//! - **config**: Show how configuration resolves for one declaration
//!
//! ## Example Usage
//!
//! ```bash
//! # Validate a manifest
//! hktgen check candidates.json
//!
//! # Generate into ./src/generated/java
//! hktgen generate candidates.json --out-dir src/generated/java
//!
//! # Inspect the effective configuration
//! hktgen config candidates.json com.example.Pair --json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use hktgen_core::GenVisibility;
use tracing_subscriber::EnvFilter;

mod hkt_cli;

use hkt_cli::{check::CheckCmd, config::ConfigCmd, generate::GenerateCmd, GlobalOpts};

#[derive(Parser)]
#[command(
    name = "hktgen",
    author,
    version,
    about = "Validator and accessor generator for arity-encoded type constructors",
    long_about = "Checks declarations that encode themselves as type constructors through the \
                  __ wrapper family and generates their unchecked-cast accessors.\n\n\
                  Existing generated files are merged, never overwritten wholesale."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging, skipped declarations)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Accessor visibility when no scope configures one (Same, Package, Disabled)
    #[arg(long, global = true)]
    default_visibility: Option<GenVisibility>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate candidate declarations
    Check(CheckCmd),
    /// Validate and write accessor classes
    Generate(GenerateCmd),
    /// Show the effective configuration of a declaration
    Config(ConfigCmd),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Check(_) => "check",
            Commands::Generate(_) => "generate",
            Commands::Config(_) => "config",
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let Cli {
        command,
        json,
        verbose,
        default_visibility,
    } = Cli::parse();

    init_tracing(verbose);
    tracing::debug!(command = command.name(), "dispatching");

    let opts = GlobalOpts {
        json,
        verbose,
        default_visibility,
    };
    let result = match &command {
        Commands::Check(cmd) => cmd.execute(&opts),
        Commands::Generate(cmd) => cmd.execute(&opts),
        Commands::Config(cmd) => cmd.execute(&opts),
    };

    if let Err(err) = &result {
        eprint!("{}", hkt_cli::output::format_error(err, json));
        if json {
            eprintln!();
        }
        std::process::exit(1);
    }
    result
}
