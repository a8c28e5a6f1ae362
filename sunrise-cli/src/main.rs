//! Sunrise CLI - install and verify launcher content
//!
//! This binary drives the Sunrise download engine from the command line.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::install::InstallArgs;
use commands::verify::VerifyArgs;
use error::CliError;
use runner::GlobalOptions;

#[derive(Parser)]
#[command(name = "sunrise")]
#[command(version, about = "Install and verify launcher content", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/sunrise/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Manifest file to load; repeat to merge several
    #[arg(long = "manifest", global = true)]
    manifests: Vec<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a runtime or application (server ids install their application)
    Install {
        /// Runtime, application or server id
        id: String,

        /// Use this runtime instead of the one the application declares
        #[arg(long)]
        runtime: Option<String>,

        /// Hash every existing file instead of trusting unchanged ones
        #[arg(long)]
        full_verify: bool,
    },

    /// Verify an existing install
    Verify {
        /// Runtime, application or server id
        id: String,

        /// Hash every file
        #[arg(long)]
        full: bool,

        /// Accept files whose size matches without hashing them
        #[arg(long)]
        fast: bool,
    },

    /// List containers and whether updates are available
    Status,

    /// Content map maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = GlobalOptions {
        config: cli.config,
        manifests: cli.manifests,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Install {
            id,
            runtime,
            full_verify,
        } => commands::install::run(
            &options,
            InstallArgs {
                id,
                runtime,
                full_verify,
            },
        ),
        Commands::Verify { id, full, fast } => {
            commands::verify::run(&options, VerifyArgs { id, full, fast })
        }
        Commands::Status => commands::status::run(&options),
        Commands::Cache { action } => commands::cache::run(&options, action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install() {
        let cli = Cli::parse_from([
            "sunrise",
            "--manifest",
            "a.json",
            "--manifest",
            "b.json",
            "install",
            "game",
            "--runtime",
            "rt",
            "--full-verify",
        ]);

        assert_eq!(cli.manifests, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        match cli.command {
            Commands::Install {
                id,
                runtime,
                full_verify,
            } => {
                assert_eq!(id, "game");
                assert_eq!(runtime.as_deref(), Some("rt"));
                assert!(full_verify);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_parse_cache_prune() {
        let cli = Cli::parse_from(["sunrise", "cache", "prune", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Prune
            }
        ));
    }
}
