//! Health check endpoint handlers.
//!
//! Health checks directly access the database connection pool for
//! connectivity testing; liveness is a pure in-process check.

use crate::api::doc::HEALTH_TAG;
use crate::state::AppState;
use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use utoipa::ToSchema;

/// Health check response structure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status
    pub status: HealthStatus,
    /// Application version
    pub version: String,
    /// Timestamp of the health check (ISO 8601 format)
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: String,
    /// Detailed checks for various components
    pub checks: HashMap<String, ComponentHealth>,
}

/// Health status enumeration.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some non-critical issues
    Degraded,
    /// Critical issues present
    Unhealthy,
}

/// Individual component health information.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

/// Creates health check routes.
///
/// # Routes
/// - `GET /health` - Basic health check
/// - `GET /health/ready` - Readiness probe
/// - `GET /health/live` - Liveness probe
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
}

/// Basic health check endpoint including database connectivity.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    ),
    tag = HEALTH_TAG
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let mut checks = HashMap::new();
    let db_check = check_database(&state).await;
    let overall_unhealthy = matches!(db_check.status, HealthStatus::Unhealthy);
    checks.insert("database".to_string(), db_check);

    let response = HealthResponse {
        status: if overall_unhealthy {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    };

    if overall_unhealthy {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    } else {
        Ok(Json(response))
    }
}

/// Readiness probe: ready to accept traffic when the database responds.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service is not ready")
    ),
    tag = HEALTH_TAG
)]
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match check_database(&state).await.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Liveness probe: if we can respond, we're alive.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = HEALTH_TAG
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Tests database connectivity with a trivial roundtrip.
async fn check_database(state: &AppState) -> ComponentHealth {
    let start = Instant::now();

    let result = async {
        let mut conn = state.db_pool.get().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok::<_, anyhow::Error>(())
    }
    .await;

    let response_time_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: Some("Connected".to_string()),
            response_time_ms: Some(response_time_ms),
        },
        Err(e) => ComponentHealth {
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
            response_time_ms: Some(response_time_ms),
        },
    }
}
