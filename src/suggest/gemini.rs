use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompt::build_prompt;
use super::{GenerationError, SuggestionGenerator};
use crate::cache::FeedbackRecord;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` 客户端
///
/// API key 放在请求头里，不出现在 URL 中。
pub struct GeminiGenerator {
    http_client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiGenerator {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl SuggestionGenerator for GeminiGenerator {
    async fn generate(
        &self,
        text: &str,
        history: Option<&[FeedbackRecord]>,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(text, history.unwrap_or_default());
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body_str = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body: body_str,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body_str)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        extract_text(parsed)
    }
}

// 错误信息会返回给调用方并写入日志，去掉 URL
fn request_error(error: reqwest::Error) -> GenerationError {
    GenerationError::Request(error.without_url().to_string())
}

fn extract_text(response: GenerateResponse) -> Result<String, GenerationError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .ok_or_else(|| GenerationError::Malformed("response has no candidates".into()))?;

    let text: String = content.parts.into_iter().map(|part| part.text).collect();
    Ok(text.trim().to_string())
}
