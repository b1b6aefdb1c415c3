mod handler;
mod model;

pub use handler::submit_feedback;
pub use model::{FeedbackRequest, FeedbackResponse};
