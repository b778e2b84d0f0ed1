//! Command-line interface: argument parsing and command handlers.

pub mod handlers;
pub mod parser;

pub use parser::{Cli, Commands};

use crate::config::{ConfigLoader, Environment};

/// Parses configuration and dispatches the selected command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let environment = match &cli.env {
        Some(name) => name.parse::<Environment>()?,
        None => Environment::from_env(),
    };

    let mut loader = ConfigLoader::new(environment);
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut settings = loader.load()?;

    if cli.verbose {
        settings.logger.level = "debug".to_string();
    } else if cli.quiet {
        settings.logger.level = "error".to_string();
    }

    match cli.command.unwrap_or_default() {
        Commands::Serve {
            host,
            port,
            dry_run,
        } => handlers::serve::execute(settings, host, port, dry_run).await,
        Commands::Migrate { dry_run } => handlers::migrate::execute(settings, dry_run).await,
    }
}
