use crate::cache::keys::{feedback_key, suggestion_key};
use crate::cache::models::feedback::FeedbackRecord;
use crate::store::{StoreClient, StoreRead};

/// 建议缓存的默认过期时间（秒）
pub const DEFAULT_SUGGESTION_TTL: u64 = 60 * 60 * 24 * 30; // 30天

/// 反馈历史的过期时间（秒）
pub const FEEDBACK_TTL: u64 = 60 * 60 * 24 * 30; // 30天

/// 每个用户最多保留的反馈条数
pub const FEEDBACK_CAP: usize = 100;

/// 建议缓存与用户反馈历史
///
/// 所有存储错误都会被吸收：读取失败视为未命中，写入失败返回 `false`。
#[derive(Clone)]
pub struct SuggestionCache {
    store: StoreClient,
    ttl_secs: u64,
}

impl SuggestionCache {
    pub fn new(store: StoreClient) -> Self {
        Self::with_ttl(store, DEFAULT_SUGGESTION_TTL)
    }

    pub fn with_ttl(store: StoreClient, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// 按原文查找缓存的建议，空值按未命中处理
    pub async fn lookup(&self, text: &str) -> Option<String> {
        self.store
            .get(&suggestion_key(text))
            .await
            .into_option()
            .filter(|suggestion| !suggestion.is_empty())
    }

    /// 缓存建议，整体覆盖旧值
    pub async fn store(&self, text: &str, suggestion: &str) -> bool {
        self.store_with_ttl(text, suggestion, self.ttl_secs).await
    }

    pub async fn store_with_ttl(&self, text: &str, suggestion: &str, ttl_secs: u64) -> bool {
        let stored = self
            .store
            .set(&suggestion_key(text), suggestion, ttl_secs)
            .await;
        if !stored {
            tracing::warn!(text_len = text.len(), "failed to cache suggestion");
        }
        stored
    }

    /// 删除某段文本的缓存建议
    pub async fn forget(&self, text: &str) -> bool {
        self.store.delete(&suggestion_key(text)).await
    }

    /// 追加一条反馈并截断到最近的 `FEEDBACK_CAP` 条。
    ///
    /// 读-改-写没有事务保护，同一用户的并发提交可能丢失其中一条。
    pub async fn record_feedback(&self, user_id: &str, context: &str, selection: &str) -> bool {
        let key = feedback_key(user_id);
        let mut history = match self.store.get(&key).await {
            StoreRead::Hit(json) => parse_history(user_id, &json),
            StoreRead::Miss => Vec::new(),
            // 存储不可用时不写，避免用单条记录覆盖已有历史
            StoreRead::Unavailable => return false,
        };

        history.push(FeedbackRecord::new(context, selection));
        if history.len() > FEEDBACK_CAP {
            let overflow = history.len() - FEEDBACK_CAP;
            history.drain(..overflow);
        }

        let json = match serde_json::to_string(&history) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(user_id, error = %e, "failed to serialize feedback history");
                return false;
            }
        };
        self.store.set(&key, &json, FEEDBACK_TTL).await
    }

    /// 最近的 `limit` 条反馈，按时间先后排列
    pub async fn recent_feedback(&self, user_id: &str, limit: usize) -> Vec<FeedbackRecord> {
        let mut history = match self.store.get(&feedback_key(user_id)).await {
            StoreRead::Hit(json) => parse_history(user_id, &json),
            StoreRead::Miss | StoreRead::Unavailable => return Vec::new(),
        };

        let skip = history.len().saturating_sub(limit);
        history.split_off(skip)
    }
}

fn parse_history(user_id: &str, json: &str) -> Vec<FeedbackRecord> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        tracing::warn!(user_id, error = %e, "discarding unreadable feedback history");
        Vec::new()
    })
}
