use std::time::Duration;

use uuid::Uuid;

/// 限流策略：每个键在 `window_secs` 秒内最多 `max_requests` 次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_secs: 60,
        }
    }
}

/// 建立连接时的重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// 窗口中的一次请求，写入有序集合后不再修改
#[derive(Debug, Clone)]
pub struct RateWindowEntry {
    pub key: String,
    pub timestamp: f64, // Unix 秒，带小数
    nonce: Uuid,
}

impl RateWindowEntry {
    pub fn new(key: impl Into<String>, timestamp: f64) -> Self {
        Self {
            key: key.into(),
            timestamp,
            nonce: Uuid::new_v4(),
        }
    }

    /// 有序集合中的成员名，同一时间戳的两次请求也不会合并
    pub fn member(&self) -> String {
        format!("{}-{}", self.timestamp, self.nonce)
    }
}

/// 一次限流检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    pub reset_at: i64, // Unix timestamp
}
