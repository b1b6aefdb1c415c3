use std::sync::Arc;

use crate::cache::models::rate_limit::{
    RateDecision, RateLimitPolicy, RateWindowEntry, ReconnectPolicy,
};
use crate::store::{KeyValueStore, StoreError};

/// 滑动窗口限流器
///
/// 每个键对应一个以时间戳为分数的有序集合。窗口数据完全保存在存储中，
/// 进程内不加锁，正确性依赖存储端批处理的原子性。
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    policy: RateLimitPolicy,
    reconnect: ReconnectPolicy,
}

impl RateLimiter {
    /// 建立到存储的连接，按重试策略多次尝试。
    /// 全部失败时返回最后一次的错误，这是限流器唯一的致命错误。
    pub async fn connect(
        store: Arc<dyn KeyValueStore>,
        policy: RateLimitPolicy,
        reconnect: ReconnectPolicy,
    ) -> Result<Self, StoreError> {
        let limiter = Self {
            store,
            policy,
            reconnect,
        };
        limiter.connect_with_retry().await?;
        Ok(limiter)
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    async fn connect_with_retry(&self) -> Result<(), StoreError> {
        let attempts = self.reconnect.attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match self.store.reconnect().await {
                Ok(()) => self.store.ping().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    tracing::info!(attempt, "connected to store");
                    return Ok(());
                }
                Err(e) if attempt >= attempts => {
                    tracing::error!(attempts, error = %e, "failed to connect to store");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "store connection attempt failed, retrying");
                    tokio::time::sleep(self.reconnect.delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// 以当前时间检查 `key`
    pub async fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, now_secs()).await
    }

    /// 以给定的 Unix 时间（秒）检查 `key`。
    ///
    /// 存储不可用时放行，并报告完整的剩余额度。
    pub async fn check_at(&self, key: &str, now: f64) -> RateDecision {
        match self.record(key, now).await {
            Ok(count) => self.decide(count, now),
            Err(e) => {
                tracing::error!(key, error = %e, "rate limit check failed, allowing request");
                RateDecision {
                    allowed: true,
                    remaining: self.policy.max_requests,
                    limit: self.policy.max_requests,
                    reset_at: self.reset_at(now),
                }
            }
        }
    }

    async fn record(&self, key: &str, now: f64) -> Result<u64, StoreError> {
        if let Err(e) = self.store.ping().await {
            tracing::warn!(error = %e, "store connection lost, attempting to reconnect");
            self.connect_with_retry().await?;
        }

        let entry = RateWindowEntry::new(key, now);
        self.store
            .record_hit(
                &entry.key,
                &entry.member(),
                entry.timestamp,
                self.policy.window_secs,
            )
            .await
    }

    // 当前请求自身也计入额度：插入前的计数加一后再与上限比较
    fn decide(&self, count_before: u64, now: f64) -> RateDecision {
        let limit = self.policy.max_requests;
        let used = count_before.saturating_add(1);
        let remaining = u64::from(limit).saturating_sub(used) as u32;

        RateDecision {
            allowed: used <= u64::from(limit),
            remaining,
            limit,
            reset_at: self.reset_at(now),
        }
    }

    fn reset_at(&self, now: f64) -> i64 {
        now as i64 + self.policy.window_secs as i64
    }
}

fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
