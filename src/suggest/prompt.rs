use crate::cache::FeedbackRecord;

const INSTRUCTIONS: &str = "\
You complete sentences for staff of a public-sector organisation who are writing \
forms, letters and emails. Continue the user's text with exactly one suggestion.
Rules:
- formal, clear and neutral wording suitable for official correspondence;
- fewer than 15 words;
- match the tone and intent of the text so far;
- never invent confidential or sensitive details;
- if the text is ambiguous, prefer a safe, generic continuation.
Reply with the continuation only, without quotes or commentary.";

/// 拼出发给模型的提示词，有历史时附上用户过去的选择作为风格参考
pub fn build_prompt(text: &str, history: &[FeedbackRecord]) -> String {
    let mut prompt = String::from(INSTRUCTIONS);

    if !history.is_empty() {
        prompt.push_str("\n\nContinuations this user accepted before:\n");
        for record in history {
            prompt.push_str(&format!(
                "- \"{}\" -> \"{}\"\n",
                record.context, record.selection
            ));
        }
    }

    prompt.push_str(&format!("\n\nUser's text: \"{text}\"\n\nCompletion:"));
    prompt
}
