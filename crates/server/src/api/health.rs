use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub embedder: String,
    pub content_store: String,
    pub vector_index: String,
    pub llm_configured: bool,
    pub llm_provider: Option<String>,
}

/// Liveness and the backends this instance was wired with.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        embedder: pipeline.embedder.name().to_string(),
        content_store: pipeline.content.name().to_string(),
        vector_index: pipeline.index.name().to_string(),
        llm_configured: pipeline.answers.is_some(),
        llm_provider: pipeline.answers.as_ref().map(|a| a.provider_name().to_string()),
    })
}
