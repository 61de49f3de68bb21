use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    skill_count: usize,
}

/// Liveness only; a response means the runtime is serving requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub skills: usize,
    pub checked_at: String,
}

pub fn router(skill_count: usize) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { skill_count })
}

pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "erabee-server",
        skills: state.skill_count,
        checked_at: Utc::now().to_rfc3339(),
    })
}
