/// 缓存操作
/// 提供缓存操作的功能实现

// 滑动窗口限流
pub mod rate_limit;

// 建议缓存与反馈历史
pub mod suggestion;

// 重新导出常用操作
pub use rate_limit::RateLimiter;
pub use suggestion::{
    DEFAULT_SUGGESTION_TTL, FEEDBACK_CAP, FEEDBACK_TTL, SuggestionCache,
};
