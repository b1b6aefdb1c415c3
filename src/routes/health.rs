use axum::extract::{Json, State};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
    pub store: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Suggestive Text API is running.",
        store: if state.suggestions.store_enabled() {
            "enabled"
        } else {
            "disabled"
        },
    })
}
