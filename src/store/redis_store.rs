use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError};

/// Redis 适配器
///
/// 持有一个共享的多路复用连接，`reconnect` 会替换它。
/// 每个操作都带有超时，挂起的 Redis 不会卡住请求。
/// 建立连接时不持有锁，写锁只用于换入新连接。
pub struct RedisStore {
    client: RedisClient,
    conn: RwLock<Option<MultiplexedConnection>>,
    op_timeout: Duration,
}

impl RedisStore {
    /// 只解析 URL，不建立连接
    pub fn open(redis_url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| StoreError::Transport(format!("invalid REDIS_URL: {e}")))?;
        Ok(Self {
            client,
            conn: RwLock::new(None),
            op_timeout,
        })
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.op_timeout.as_millis() as u64)),
        }
    }

    async fn connect(&self) -> Result<MultiplexedConnection, StoreError> {
        self.timed(self.client.get_multiplexed_async_connection())
            .await
    }

    /// 取得当前连接，还没有连接时懒建立
    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let fresh = self.connect().await?;
        let mut slot = self.conn.write().await;
        // 并发建立时保留先换入的那个
        Ok(slot.get_or_insert(fresh).clone())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let reply: String = self
            .timed(redis::cmd("PING").query_async(&mut conn))
            .await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Reply(format!("PING answered {reply}")))
        }
    }

    async fn reconnect(&self) -> Result<(), StoreError> {
        // 失败时旧连接保持不变
        let fresh = self.connect().await?;
        *self.conn.write().await = Some(fresh);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        self.timed(conn.get::<_, Option<String>>(key)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.timed(conn.set_ex::<_, _, ()>(key, value, ttl_secs))
            .await
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let removed: usize = self.timed(conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn record_hit(
        &self,
        key: &str,
        member: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let window_start = now - window_secs as f64;

        // MULTI/EXEC，四条命令整体执行，只保留 ZCARD 的结果
        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrembyscore(key, "-inf", window_start)
            .ignore()
            .zcard(key)
            .zadd(key, member, now)
            .ignore()
            .expire(key, window_secs as i64)
            .ignore();

        let (count,): (u64,) = self.timed(pipe.query_async(&mut conn)).await?;
        Ok(count)
    }
}
