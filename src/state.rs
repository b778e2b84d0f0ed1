//! Application state for the Axum web framework.

use std::sync::Arc;

use crate::config::JwtConfig;
use crate::db::AsyncDbPool;
use crate::engine::CampaignEngine;
use crate::repositories::Repositories;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Used with Axum's State extractor. Cloning is cheap since services and
/// the pool use `Arc` internally.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// Direct access to the database connection pool
    pub db_pool: AsyncDbPool,
    /// JWT configuration for token validation
    pub jwt_config: JwtConfig,
    /// The campaign execution engine, when running in this process. The
    /// control surface works without it; dispatch then waits for the next
    /// process that runs one.
    pub engine: Option<Arc<CampaignEngine>>,
}

impl AppState {
    /// Creates a new AppState from a database connection pool and JWT config.
    pub fn new(pool: AsyncDbPool, jwt_config: JwtConfig) -> Self {
        let repos = Repositories::new(pool.clone());
        let services = Services::new(repos);
        Self {
            services,
            db_pool: pool,
            jwt_config,
            engine: None,
        }
    }

    /// Attaches the engine handle used for eager passes and pause signals.
    pub fn with_engine(mut self, engine: Arc<CampaignEngine>) -> Self {
        self.engine = Some(engine);
        self
    }
}
