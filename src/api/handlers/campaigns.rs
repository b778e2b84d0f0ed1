//! Campaign lifecycle request handlers.
//!
//! The handlers delegate state changes to the campaign service and wire
//! the engine in afterwards: start/resume re-arm the pause signal and run
//! an eager dispatch pass in the background; pause flips the signal so
//! no further recipient is claimed mid-pass.

use crate::api::doc::CAMPAIGN_TAG;
use crate::api::dto::{
    AttemptResponse, CampaignDetailResponse, CampaignResponse, CreateCampaignRequest,
    PagedResponse, PaginationParams, UpdateCampaignRequest,
};
use crate::api::middleware::AuthUser;
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Creates campaign-related routes.
pub fn campaign_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_campaigns))
        .routes(routes!(create_campaign))
        .routes(routes!(get_campaign))
        .routes(routes!(update_campaign))
        .routes(routes!(delete_campaign))
        .routes(routes!(start_campaign))
        .routes(routes!(pause_campaign))
        .routes(routes!(resume_campaign))
        .routes(routes!(list_attempts))
}

/// GET /api/campaigns - List the caller's campaigns
#[utoipa::path(
    get,
    path = "/",
    tag = CAMPAIGN_TAG,
    responses(
        (status = 200, description = "List campaigns", body = Vec<CampaignResponse>)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn list_campaigns(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<CampaignResponse>>> {
    let campaigns = state.services.campaigns.list(user.user_id).await?;
    let responses = campaigns.into_iter().map(CampaignResponse::from).collect();
    Ok(Json(responses))
}

/// POST /api/campaigns - Create a new campaign draft
#[utoipa::path(
    post,
    path = "/",
    tag = CAMPAIGN_TAG,
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = CampaignResponse),
        (status = 400, description = "Invalid request")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn create_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreateCampaignRequest>,
) -> AppResult<(StatusCode, Json<CampaignResponse>)> {
    let campaign = state
        .services
        .campaigns
        .create(user.user_id, req.into_new_campaign())
        .await?;
    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// GET /api/campaigns/:id - Campaign with live queue statistics
#[utoipa::path(
    get,
    path = "/{id}",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign found", body = CampaignDetailResponse),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn get_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<CampaignDetailResponse>> {
    let detail = state.services.campaigns.get_detail(user.user_id, id).await?;
    Ok(Json(CampaignDetailResponse::from(detail)))
}

/// PUT /api/campaigns/:id - Edit configuration while not running
#[utoipa::path(
    put,
    path = "/{id}",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    request_body = UpdateCampaignRequest,
    responses(
        (status = 200, description = "Campaign updated", body = CampaignResponse),
        (status = 400, description = "Campaign is running"),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn update_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    ValidatedJson(req): ValidatedJson<UpdateCampaignRequest>,
) -> AppResult<Json<CampaignResponse>> {
    let campaign = state
        .services
        .campaigns
        .update(user.user_id, id, req.into_update())
        .await?;
    Ok(Json(CampaignResponse::from(campaign)))
}

/// DELETE /api/campaigns/:id - Delete a campaign and its attempts
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    responses(
        (status = 204, description = "Campaign deleted"),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn delete_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    // Stop claims first so an in-flight pass cannot race the cascade.
    if let Some(engine) = &state.engine {
        engine.pause(id);
    }
    state.services.campaigns.delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/campaigns/:id/start - Start a draft/stopped campaign
#[utoipa::path(
    post,
    path = "/{id}/start",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign started", body = CampaignResponse),
        (status = 400, description = "Already running or failed preflight"),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn start_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<CampaignResponse>> {
    let campaign = state.services.campaigns.start(user.user_id, id).await?;
    kick_engine(&state, id);
    Ok(Json(CampaignResponse::from(campaign)))
}

/// POST /api/campaigns/:id/pause - Pause dispatching
#[utoipa::path(
    post,
    path = "/{id}/pause",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign paused", body = CampaignResponse),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn pause_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<CampaignResponse>> {
    let campaign = state.services.campaigns.pause(user.user_id, id).await?;
    if let Some(engine) = &state.engine {
        engine.pause(id);
    }
    Ok(Json(CampaignResponse::from(campaign)))
}

/// POST /api/campaigns/:id/resume - Resume a paused or errored campaign
#[utoipa::path(
    post,
    path = "/{id}/resume",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign resumed", body = CampaignResponse),
        (status = 400, description = "Campaign cannot be resumed"),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn resume_campaign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<Json<CampaignResponse>> {
    let campaign = state.services.campaigns.resume(user.user_id, id).await?;
    kick_engine(&state, id);
    Ok(Json(CampaignResponse::from(campaign)))
}

/// GET /api/campaigns/:id/attempts - Paginated attempt history
#[utoipa::path(
    get,
    path = "/{id}/attempts",
    tag = CAMPAIGN_TAG,
    params(
        ("id" = i32, Path, description = "Campaign ID"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "List attempts", body = PagedResponse<AttemptResponse>),
        (status = 404, description = "Campaign not found")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn list_attempts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
) -> AppResult<Json<PagedResponse<AttemptResponse>>> {
    let (attempts, total) = state
        .services
        .campaigns
        .attempts(
            user.user_id,
            id,
            params.limit() as i64,
            params.offset() as i64,
        )
        .await?;

    let responses: Vec<AttemptResponse> = attempts.into_iter().map(AttemptResponse::from).collect();
    Ok(Json(PagedResponse::new(responses, &params, total as u64)))
}

/// Re-arms the pause signal and runs one eager pass in the background so
/// user-triggered starts dispatch immediately instead of waiting for the
/// next scheduled tick.
fn kick_engine(state: &AppState, campaign_id: i32) {
    if let Some(engine) = &state.engine {
        engine.resume(campaign_id);
        let engine = engine.clone();
        tokio::spawn(async move {
            engine.kick(campaign_id).await;
        });
    }
}
