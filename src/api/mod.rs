//! HTTP query API
//!
//! Read-only view of the track state plus a trigger that asks REAPER to
//! re-send its track list. Writes never go through here.

use crate::osc::Notifier;
use crate::state::{StateError, StateStore, Track};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared state for API handlers
pub struct ApiState {
    pub state: StateStore,
    pub notifier: Arc<Notifier>,
}

/// Message response body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        let status = match e {
            StateError::TrackNotFound { .. } => StatusCode::NOT_FOUND,
            StateError::KindMismatch { .. } => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            error: e.to_string(),
        }
    }
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/tracks", get(list_tracks))
        .route("/tracks/:id", get(get_track))
        .route("/tracks/by-name/:name", get(get_track_by_name))
        .route("/refresh", get(refresh))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /tracks - All known tracks ordered by id
async fn list_tracks(State(state): State<Arc<ApiState>>) -> Json<Vec<Track>> {
    Json(state.state.list())
}

/// GET /tracks/:id
async fn get_track(
    Path(id): Path<u32>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Track>, ApiError> {
    state.state.get(id).map(Json).ok_or_else(|| ApiError {
        status: StatusCode::NOT_FOUND,
        error: format!("Track {} not found", id),
    })
}

/// GET /tracks/by-name/:name
async fn get_track_by_name(
    Path(name): Path<String>,
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Track>, ApiError> {
    Ok(Json(state.state.find_by_name(&name)?))
}

/// GET /refresh - Ask REAPER to re-send the track list
async fn refresh(State(state): State<Arc<ApiState>>) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = state.notifier.refresh_tracks().await {
        error!("Failed to refresh tracks: {:#}", e);
        return Err(ApiError {
            status: StatusCode::BAD_GATEWAY,
            error: format!("Failed to refresh tracks: {}", e),
        });
    }

    Ok(Json(MessageResponse {
        message: "Track list refreshed".to_string(),
    }))
}

/// GET /health
async fn health_check() -> &'static str {
    "ok"
}

/// Start the API server
pub async fn start_server(state: Arc<ApiState>, port: u16) -> Result<()> {
    let router = build_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting track API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
