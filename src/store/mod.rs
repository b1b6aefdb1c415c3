// 键值存储模块
// 提供存储端口、Redis 适配器、内存适配器以及吞掉传输错误的客户端

pub mod memory;
pub mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// 存储传输层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("store operation timed out after {0} ms")]
    Timeout(u64),
    #[error("unexpected store reply: {0}")]
    Reply(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Transport(error.to_string())
    }
}

/// 存储端口，由 Redis 和内存实现
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 检查连接是否存活
    async fn ping(&self) -> Result<(), StoreError>;

    /// 丢弃当前连接并重新建立
    async fn reconnect(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;

    /// 返回是否真的删除了键
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// 滑动窗口的原子批处理：
    /// 删除分数 <= `now - window_secs` 的成员，统计剩余成员数，
    /// 以 `now` 为分数插入 `member`，并把键的过期时间刷新为 `window_secs`。
    ///
    /// 返回插入前观察到的成员数。
    async fn record_hit(
        &self,
        key: &str,
        member: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError>;
}

/// 单次读取的结果，传输失败与未命中分开表示
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRead {
    Hit(String),
    Miss,
    Unavailable,
}

impl StoreRead {
    /// 调用方只关心值时使用，失败按未命中处理
    pub fn into_option(self) -> Option<String> {
        match self {
            StoreRead::Hit(value) => Some(value),
            StoreRead::Miss | StoreRead::Unavailable => None,
        }
    }
}

/// 存储客户端
///
/// 所有传输错误都在这里记录日志并转换为 `StoreRead::Unavailable` 或 `false`，
/// 不会向上传播。这一层不做重试。
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn KeyValueStore>,
}

impl StoreClient {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub async fn get(&self, key: &str) -> StoreRead {
        match self.inner.get(key).await {
            Ok(Some(value)) => StoreRead::Hit(value),
            Ok(None) => StoreRead::Miss,
            Err(e) => {
                tracing::error!(key, error = %e, "store get failed");
                StoreRead::Unavailable
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        match self.inner.set_ex(key, value, ttl_secs).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "store set failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.inner.del(key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::error!(key, error = %e, "store delete failed");
                false
            }
        }
    }
}
