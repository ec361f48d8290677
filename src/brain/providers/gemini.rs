use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::http::{ErrorResponse, HttpBase, parse_retry_hint};
use crate::brain::VisionProvider;
use crate::config::ProviderSettings;
use crate::error::ProviderError;

const PROVIDER: &str = "gemini";
/// Gemini 429s are frequent and usually say "retry in ~50s", so it gets two extra attempts.
const MAX_ATTEMPTS: u32 = 5;
const QUOTA_GUIDANCE: &str =
    "Gemini API error. Check API key and billing: https://aistudio.google.com/apikey";

/// Google Gemini via `generateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base: HttpBase,
}

impl GeminiClient {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base: HttpBase::new(PROVIDER, settings),
        }
    }

    pub fn model(&self) -> &str {
        &self.base.model
    }

    fn model_url(&self) -> String {
        self.base
            .url(&format!("v1beta/models/{}:generateContent", self.base.model))
    }
}

fn classify(err: ErrorResponse) -> ProviderError {
    if err.status == 429 || err.status == 503 {
        let retry_after = err.retry_after.or_else(|| parse_retry_hint(&err.message));
        return ProviderError::RateLimited {
            provider: PROVIDER,
            message: err.message,
            retry_after,
        };
    }
    if matches!(err.status, 400 | 403) && err.mentions(&["billing"]) {
        return ProviderError::QuotaExhausted {
            provider: PROVIDER,
            message: err.message,
            guidance: QUOTA_GUIDANCE,
        };
    }
    ProviderError::Api {
        provider: PROVIDER,
        status: err.status,
        message: err.message,
    }
}

#[async_trait]
impl VisionProvider for GeminiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn max_attempts(&self) -> u32 {
        MAX_ATTEMPTS
    }

    async fn complete(&self, image_b64: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inline_data": { "mime_type": "image/png", "data": image_b64 } },
                    { "text": prompt }
                ]
            }],
            "generationConfig": { "maxOutputTokens": 1024 }
        });

        info!(provider = PROVIDER, model = self.base.model.as_str(), "sending screenshot");
        let request = self
            .base
            .http
            .post(self.model_url())
            .header("x-goog-api-key", &self.base.api_key)
            .json(&body);
        let response: GenerateResponse = self.base.send(request, classify).await?;

        response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}
