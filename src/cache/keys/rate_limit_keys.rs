/// 限流有序集合键前缀
pub const RATE_LIMIT_PREFIX: &str = "rate_limit";

/// 生成客户端的限流键，例如 `rate_limit:10.0.0.1`
pub fn rate_limit_key(prefix: &str, client_id: &str) -> String {
    format!("{}:{}", prefix, client_id)
}
