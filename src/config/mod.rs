use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::cache::operations::DEFAULT_SUGGESTION_TTL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub cache_ttl_secs: u64,
    pub store_timeout_ms: u64,
    pub generation_timeout_secs: u64,
    pub history_limit: usize,
    pub static_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Config {
            gemini_api_key: required("GEMINI_API_KEY")?,
            gemini_model: optional("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            gemini_api_base: optional("GEMINI_API_BASE")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".into()),
            redis_url: optional("REDIS_URL"),
            server_host: optional("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parsed("SERVER_PORT", 8000),
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS", 20),
            cache_ttl_secs: parsed("CACHE_TTL", DEFAULT_SUGGESTION_TTL),
            store_timeout_ms: parsed("STORE_TIMEOUT_MS", 2000),
            generation_timeout_secs: parsed("GENERATION_TIMEOUT_SECS", 30),
            history_limit: parsed("HISTORY_LIMIT", 5),
            static_dir: optional("STATIC_DIR"),
        })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Err(ConfigError::Missing(name)),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

// 未设置或为空都视为缺省
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    optional(name)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
