//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Outbound campaign execution service
#[derive(Parser, Debug)]
#[command(name = "dialflow")]
#[command(about = "Outbound campaign execution service")]
#[command(long_about = "
dialflow runs the outbound campaign API and execution engine: paced
voice/SMS/email dispatch against per-campaign daily caps and calling
windows.

EXAMPLES:
    # Start the server with default configuration
    dialflow serve

    # Start the server on a custom host and port
    dialflow serve --host 0.0.0.0 --port 8080

    # Use a specific configuration file
    dialflow --config /etc/dialflow/production.toml serve

    # Validate configuration without starting anything
    dialflow serve --dry-run

    # Apply database migrations
    dialflow migrate

    # Preview pending migrations
    dialflow migrate --dry-run
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path (TOML); replaces the layered config directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override environment detection (development, test, staging, production)
    #[arg(short, long, value_name = "ENV")]
    pub env: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server and campaign engine
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured bind port
        #[arg(long)]
        port: Option<u16>,

        /// Validate configuration and exit without starting the server
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply database migrations
    Migrate {
        /// Show pending migrations without applying them
        #[arg(long)]
        dry_run: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            host: None,
            port: None,
            dry_run: false,
        }
    }
}
