/// 缓存键模块
/// 提供各种缓存键生成函数

// 限流键
pub mod rate_limit_keys;

// 建议与反馈键
pub mod suggestion_keys;

pub use rate_limit_keys::{RATE_LIMIT_PREFIX, rate_limit_key};
pub use suggestion_keys::{feedback_key, suggestion_key};
