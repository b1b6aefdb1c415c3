/// 建议缓存键前缀
const SUGGESTION_PREFIX: &str = "suggestion:";

/// 用户反馈历史键前缀
const FEEDBACK_PREFIX: &str = "feedback:";

/// 生成建议缓存键，原文逐字拼接，不做任何规范化
pub fn suggestion_key(text: &str) -> String {
    format!("{}{}", SUGGESTION_PREFIX, text)
}

/// 生成用户反馈历史键
pub fn feedback_key(user_id: &str) -> String {
    format!("{}{}", FEEDBACK_PREFIX, user_id)
}
