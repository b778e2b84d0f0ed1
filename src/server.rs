//! Server module for managing HTTP server lifecycle.
//!
//! Handles startup wiring (pool, engine, router), the listening loop and
//! graceful shutdown of both the HTTP server and the campaign engine.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Environment, settings::Settings};
use crate::db::establish_async_connection_pool;
use crate::engine::{CampaignEngine, PgRecipientResolver};
use crate::repositories::Repositories;
use crate::services::senders::{
    ChannelSenders, SmsGatewaySender, SmtpEmailSender, VoiceGatewaySender,
};
use crate::state::AppState;

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    /// Create a new server with the given settings
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the server and run until shutdown signal.
    ///
    /// 1. Initializes the database connection pool
    /// 2. Builds the campaign engine (when enabled) and starts it
    /// 3. Binds the configured address and serves with graceful shutdown
    /// 4. Stops the engine after the HTTP server drains
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );
        tracing::info!(
            host = %self.settings.server.host,
            port = %self.settings.server.port,
            "Server configuration loaded"
        );

        tracing::info!("Initializing database connection pool...");
        let pool = establish_async_connection_pool(&self.settings.database).await?;
        tracing::info!("Database connection pool initialized");

        let repos = Repositories::new(pool.clone());

        let engine = if self.settings.engine.enabled {
            let resolver = Arc::new(PgRecipientResolver::new(
                repos.contacts.clone(),
                repos.attempts.clone(),
            ));
            let senders = ChannelSenders::new()
                .register(Arc::new(VoiceGatewaySender::new(
                    self.settings.providers.voice.clone(),
                    repos.integrations.clone(),
                )))
                .register(Arc::new(SmsGatewaySender::new(
                    self.settings.providers.sms.clone(),
                    repos.integrations.clone(),
                )))
                .register(Arc::new(SmtpEmailSender::new(
                    self.settings.providers.smtp.clone(),
                    repos.integrations.clone(),
                )));

            let engine = CampaignEngine::new(
                Arc::new(repos.campaigns.clone()),
                resolver,
                Arc::new(repos.attempts.clone()),
                senders,
                self.settings.engine.clone(),
            );
            engine.start().await?;
            Some(engine)
        } else {
            tracing::warn!("Campaign engine disabled; this process only serves the API");
            None
        };

        let mut state = AppState::new(pool, self.settings.jwt.clone());
        if let Some(engine) = &engine {
            state = state.with_engine(engine.clone());
        }

        let router = create_router(state);
        tracing::info!("Router configured");

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;
        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(engine) = engine {
            engine.stop().await?;
        }
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
