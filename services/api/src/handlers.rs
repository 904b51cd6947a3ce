//! Axum Handlers for the REST Surface
//!
//! The relay exposes a single read-only health endpoint. It reports process
//! readiness and the size of the grounding material loaded at startup; it has
//! no side effects.

use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub knowledge_entries: usize,
    pub instructions_length: usize,
}

/// Report service readiness and loaded knowledge statistics.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        knowledge_entries: state.knowledge_entries,
        instructions_length: state.instructions.chars().count(),
    })
}
