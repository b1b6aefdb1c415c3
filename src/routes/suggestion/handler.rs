use axum::extract::{Json, State};

use super::model::{SuggestionRequest, SuggestionResponse};
use crate::AppState;
use crate::error::AppResult;

#[axum::debug_handler]
pub async fn generate_suggestion(
    State(state): State<AppState>,
    Json(req): Json<SuggestionRequest>,
) -> AppResult<Json<SuggestionResponse>> {
    let user_id = req.user_id.as_deref().filter(|id| !id.is_empty());
    let suggestion = state
        .suggestions
        .suggest(&req.current_text, user_id)
        .await?;

    Ok(Json(suggestion.into()))
}
