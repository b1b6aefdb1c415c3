// 建议生成模块
// 先查缓存，未命中再调用模型，并把结果写回缓存

pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::{FeedbackRecord, SuggestionCache};
use crate::error::{AppError, AppResult};

pub use gemini::GeminiGenerator;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to build generation client: {0}")]
    Client(String),
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation service returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("unexpected generation response: {0}")]
    Malformed(String),
}

/// 生成服务端口
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        history: Option<&[FeedbackRecord]>,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub cached: bool,
}

/// 建议服务
///
/// `cache` 为 `None` 表示没有配置存储，此时每次都直接调用模型，也不能记录反馈。
#[derive(Clone)]
pub struct SuggestionService {
    cache: Option<SuggestionCache>,
    generator: Arc<dyn SuggestionGenerator>,
    history_limit: usize,
}

impl SuggestionService {
    pub fn new(
        cache: Option<SuggestionCache>,
        generator: Arc<dyn SuggestionGenerator>,
        history_limit: usize,
    ) -> Self {
        Self {
            cache,
            generator,
            history_limit,
        }
    }

    pub fn store_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn suggest(&self, text: &str, user_id: Option<&str>) -> AppResult<Suggestion> {
        if text.is_empty() {
            return Ok(Suggestion {
                text: String::new(),
                cached: false,
            });
        }

        let Some(cache) = &self.cache else {
            let text = self.generate(text, None).await?;
            return Ok(Suggestion {
                text,
                cached: false,
            });
        };

        if let Some(hit) = cache.lookup(text).await {
            return Ok(Suggestion {
                text: hit,
                cached: true,
            });
        }

        let history = match user_id {
            Some(user_id) if self.history_limit > 0 => {
                cache.recent_feedback(user_id, self.history_limit).await
            }
            _ => Vec::new(),
        };
        let history = (!history.is_empty()).then_some(history.as_slice());

        let generated = self.generate(text, history).await?;
        if !generated.is_empty() {
            cache.store(text, &generated).await;
        }

        Ok(Suggestion {
            text: generated,
            cached: false,
        })
    }

    pub async fn record_feedback(
        &self,
        user_id: &str,
        context: &str,
        selection: &str,
    ) -> AppResult<()> {
        let cache = self.cache.as_ref().ok_or(AppError::StoreUnavailable)?;
        if cache.record_feedback(user_id, context, selection).await {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable)
        }
    }

    async fn generate(&self, text: &str, history: Option<&[FeedbackRecord]>) -> AppResult<String> {
        self.generator.generate(text, history).await.map_err(|e| {
            tracing::error!(error = %e, "suggestion generation failed");
            AppError::Generation(e.to_string())
        })
    }
}
