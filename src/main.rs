// src/main.rs

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pkgplan::{PackageDatabase, Resolver, ResolverConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pkgplan")]
#[command(author, version, about = "Package dependency resolution and job planning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve targets and print the decisions and job list as JSON
    Resolve {
        /// Package database (TOML)
        #[arg(short, long)]
        database: PathBuf,
        /// Resolver policy (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print compact JSON
        #[arg(long)]
        compact: bool,
        /// Package specs, `!spec` to uninstall, or `@set`
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Resolve {
            database,
            config,
            compact,
            targets,
        }) => {
            let env = PackageDatabase::load(&database)
                .with_context(|| format!("loading package database {}", database.display()))?;
            let config = match config {
                Some(path) => ResolverConfig::load(&path)
                    .with_context(|| format!("loading resolver policy {}", path.display()))?,
                None => ResolverConfig::default(),
            };

            let resolver = Resolver::from_config(&env, &config)?;
            let resolved = resolver.resolve(&targets)?;
            info!(
                "{} changes, {} jobs, {} restarts",
                resolved.taken_change_or_remove_decisions.len(),
                resolved.job_list.len(),
                resolved.restarts
            );

            let output = if compact {
                serde_json::to_string(&resolved)?
            } else {
                serde_json::to_string_pretty(&resolved)?
            };
            println!("{}", output);

            if !resolved.is_successful() {
                warn!(
                    "{} unable, {} unconfirmed, {} unorderable",
                    resolved.taken_unable_to_make_decisions.len(),
                    resolved.taken_unconfirmed_decisions.len(),
                    resolved.taken_unorderable_decisions.len()
                );
                anyhow::bail!("resolution needs attention before it can be carried out");
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "pkgplan", &mut std::io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("pkgplan v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'pkgplan --help' for usage information");
            Ok(())
        }
    }
}
