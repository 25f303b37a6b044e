// src/api.rs
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::collections::BTreeMap;
use tower_http::cors::CorsLayer;

use crate::cache::CacheRecord;
use crate::trigger::{self, Request, TriggerSurface};

/// Router for the message surface and the cached read view.
pub fn router(surface: TriggerSurface) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/message", post(message))
        .route("/ranks", get(ranks))
        .layer(CorsLayer::very_permissive())
        .with_state(surface)
}

/// Internal failure (cache I/O); request-shape problems are rejected by the extractor.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(error = %format!("{:#}", self.0), "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn message(
    State(surface): State<TriggerSurface>,
    Json(req): Json<Request>,
) -> Result<Json<trigger::Response>, ApiError> {
    Ok(Json(surface.on_demand(req).await?))
}

async fn ranks(
    State(surface): State<TriggerSurface>,
) -> Result<Json<BTreeMap<String, CacheRecord>>, ApiError> {
    Ok(Json(surface.orchestrator().cached().await?))
}
