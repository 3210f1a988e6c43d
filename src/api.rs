use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::commands::Command;
use crate::engine::{BrushEngine, CommandContext, Reply};
use crate::error::BrushError;
use crate::model::PoolStats;
use crate::pool::{CleanupReport, PoolManager, RefreshReport};
use crate::profile::UserProfile;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BrushEngine>,
    pub pool: Arc<PoolManager>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/command", post(command))
        .route("/pool", get(pool_status))
        .route("/pool/refresh", post(pool_refresh))
        .route("/pool/cleanup", post(pool_cleanup))
        .route("/debug/profile", get(debug_profile))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body with a status picked from the error kind.
pub struct ApiError(StatusCode, String);

impl From<BrushError> for ApiError {
    fn from(e: BrushError) -> Self {
        let status = match &e {
            BrushError::Busy(_) => StatusCode::CONFLICT,
            BrushError::Config(_) | BrushError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %e, "request failed");
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn bad_request(msg: &str) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, msg.to_string())
}

#[derive(Deserialize)]
struct CommandReq {
    user_id: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    context: CommandContext,
}

async fn command(State(state): State<AppState>, Json(body): Json<CommandReq>) -> Result<Json<Reply>, ApiError> {
    let user_id = body.user_id.trim();
    if user_id.is_empty() {
        return Err(bad_request("user_id is required"));
    }
    let cmd = Command::parse(&body.command, &body.args);
    let reply = state.engine.handle(user_id, cmd, &body.context).await?;
    Ok(Json(reply))
}

#[derive(Serialize)]
struct PoolView {
    pool_size: usize,
    min_threshold: usize,
    max_size: usize,
    pool_low: bool,
    pool_empty: bool,
    last_refresh: Option<DateTime<Utc>>,
    last_cleanup: Option<DateTime<Utc>>,
    stats: Option<PoolStats>,
    sample_titles: Vec<String>,
}

async fn pool_status(State(state): State<AppState>) -> Json<PoolView> {
    let pool = state.pool.snapshot();
    let low_water = state.engine.config().pool_low_water;
    Json(PoolView {
        pool_size: pool.effective_size(),
        min_threshold: pool.min_threshold,
        max_size: pool.max_size,
        pool_low: pool.is_low(low_water),
        pool_empty: pool.is_empty(),
        last_refresh: pool.last_refresh,
        last_cleanup: pool.last_cleanup,
        stats: pool.stats,
        sample_titles: pool.articles.iter().take(3).map(|a| a.title.clone()).collect(),
    })
}

async fn pool_refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
    Ok(Json(state.pool.refresh().await?))
}

#[derive(Deserialize)]
struct CleanupQuery {
    days: Option<i64>,
}

async fn pool_cleanup(
    State(state): State<AppState>,
    Query(q): Query<CleanupQuery>,
) -> Result<Json<CleanupReport>, ApiError> {
    let days = q.days.unwrap_or(state.engine.config().retention_days).max(1);
    Ok(Json(state.pool.cleanup(days).await?))
}

#[derive(Deserialize)]
struct ProfileQuery {
    user_id: String,
}

async fn debug_profile(
    State(state): State<AppState>,
    Query(q): Query<ProfileQuery>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = q.user_id.trim();
    if user_id.is_empty() {
        return Err(bad_request("user_id is required"));
    }
    Ok(Json(state.engine.profiles().load(user_id)))
}
