mod handler;
mod model;

pub use handler::generate_suggestion;
pub use model::{SuggestionRequest, SuggestionResponse};
