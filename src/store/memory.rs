use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    // (score, member)
    Sorted(Vec<(f64, String)>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// 进程内存储，语义与 Redis 适配器一致
///
/// 整个表由一把锁保护，所以 `record_hit` 和 Redis 的 MULTI/EXEC 一样是原子的。
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 有序集合当前的成员数，键不存在时为 0
    pub async fn sorted_len(&self, key: &str) -> usize {
        let now = Instant::now();
        match self.entries.lock().await.get(key) {
            Some(Entry {
                value: Value::Sorted(members),
                expires_at,
            }) if expires_at.is_none_or(|at| at > now) => members.len(),
            _ => 0,
        }
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Reply(format!(
        "WRONGTYPE operation against key '{key}' holding the wrong kind of value"
    ))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
            return Ok(None);
        }

        match entries.get(key) {
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError> {
        if ttl_secs == 0 {
            return Err(StoreError::Reply("invalid expire time in 'set' command".into()));
        }
        let expires_at = Instant::now().checked_add(Duration::from_secs(ttl_secs));
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn record_hit(
        &self,
        key: &str,
        member: &str,
        now: f64,
        window_secs: u64,
    ) -> Result<u64, StoreError> {
        let instant = Instant::now();
        let mut entries = self.entries.lock().await;

        if entries.get(key).is_some_and(|entry| !entry.is_live(instant)) {
            entries.remove(key);
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Sorted(Vec::new()),
            expires_at: None,
        });
        let Value::Sorted(members) = &mut entry.value else {
            return Err(wrong_type(key));
        };

        let cutoff = now - window_secs as f64;
        members.retain(|(score, _)| *score > cutoff);
        let count = members.len() as u64;

        match members.iter_mut().find(|(_, name)| name == member) {
            Some(existing) => existing.0 = now,
            None => members.push((now, member.to_string())),
        }
        members.sort_by(|a, b| a.0.total_cmp(&b.0));
        entry.expires_at = instant.checked_add(Duration::from_secs(window_secs));

        Ok(count)
    }
}
