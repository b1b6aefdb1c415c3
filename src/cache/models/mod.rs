/// 缓存数据模型
/// 定义缓存数据的结构体

// 限流窗口与判定结果
pub mod rate_limit;

// 用户反馈记录
pub mod feedback;

// 重新导出常用类型
pub use feedback::FeedbackRecord;
pub use rate_limit::{RateDecision, RateLimitPolicy, RateWindowEntry, ReconnectPolicy};
