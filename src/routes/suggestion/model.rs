use serde::{Deserialize, Serialize};

use crate::suggest::Suggestion;

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub current_text: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionResponse {
    pub suggestion: String,
    pub cached: bool,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(suggestion: Suggestion) -> Self {
        Self {
            suggestion: suggestion.text,
            cached: suggestion.cached,
        }
    }
}
