use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户的一次选择：输入上下文与采纳的建议
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub context: String,
    pub selection: String,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(context: impl Into<String>, selection: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            selection: selection.into(),
            timestamp: Utc::now(),
        }
    }
}
