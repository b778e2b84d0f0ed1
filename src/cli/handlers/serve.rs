//! Serve command handler.

use crate::config::settings::Settings;
use crate::logger::init_logger;
use crate::server::Server;

/// Applies CLI overrides, validates configuration and runs the server.
///
/// With `dry_run`, the configuration is validated and printed without
/// binding a socket or touching the database.
pub async fn execute(
    mut settings: Settings,
    host: Option<String>,
    port: Option<u16>,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }

    settings.validate()?;

    if dry_run {
        println!("Configuration is valid");
        println!("Server would bind to: {}", settings.server.address());
        println!(
            "Engine: {} (tick every {}s)",
            if settings.engine.enabled { "enabled" } else { "disabled" },
            settings.engine.tick_seconds
        );
        return Ok(());
    }

    init_logger(&settings.logger)?;
    Server::new(settings).run().await
}
