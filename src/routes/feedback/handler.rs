use axum::extract::{Json, State};

use super::model::{FeedbackRequest, FeedbackResponse};
use crate::AppState;
use crate::error::{AppError, AppResult};

#[axum::debug_handler]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    if req.user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id must not be empty".into()));
    }

    state
        .suggestions
        .record_feedback(&req.user_id, &req.context, &req.selected_text)
        .await?;

    Ok(Json(FeedbackResponse {
        status: "ok".into(),
    }))
}
