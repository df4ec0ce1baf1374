//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "litdomain")]
#[command(about = "Classify academic papers into their minimal subject domain with a local LLM")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Scan literature directories, classify each paper and record its domain
    Scan {
        /// Use keyword rules instead of the model (no network calls)
        #[arg(short, long)]
        mock: bool,
        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,
        /// Backend endpoint (overrides config)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// List all recorded domains
    Domains,

    /// List papers recorded under a domain (Chinese or English name)
    Filter {
        /// Domain name, e.g. 计算机科学 or "Computer Science"
        domain: String,
    },

    /// Rewrite the CSV export from the database
    Export {
        /// Output path (overrides output.csv_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check extraction tools and the model backend
    Check,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };

    match cli.command {
        // init writes the config, so it must not require one
        Commands::Init { force } => commands::cmd_init(&options.config_file(), force).await,
        command => {
            let (settings, config) = load_settings(&options).await?;
            match command {
                Commands::Scan {
                    mock,
                    model,
                    endpoint,
                } => commands::cmd_scan(&settings, config, mock, model, endpoint).await,
                Commands::Domains => commands::cmd_domains(&settings).await,
                Commands::Filter { domain } => commands::cmd_filter(&settings, &domain).await,
                Commands::Export { output } => commands::cmd_export(&settings, output).await,
                Commands::Check => commands::cmd_check(&config).await,
                Commands::Init { force } => {
                    commands::cmd_init(&options.config_file(), force).await
                }
            }
        }
    }
}
