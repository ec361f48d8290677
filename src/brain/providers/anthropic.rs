use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::http::{ErrorResponse, HttpBase};
use crate::brain::VisionProvider;
use crate::config::ProviderSettings;
use crate::error::ProviderError;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_ATTEMPTS: u32 = 3;
const QUOTA_GUIDANCE: &str =
    "Anthropic credit balance too low. Add credits: https://console.anthropic.com/settings/plans";

/// Claude via the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    base: HttpBase,
}

impl AnthropicClient {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base: HttpBase::new(PROVIDER, settings),
        }
    }

    pub fn model(&self) -> &str {
        &self.base.model
    }
}

fn classify(err: ErrorResponse) -> ProviderError {
    if err.status == 429 || err.status == 529 {
        return ProviderError::RateLimited {
            provider: PROVIDER,
            message: err.message,
            retry_after: err.retry_after,
        };
    }
    if err.mentions(&["credit balance", "too low", "billing"]) {
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
impl VisionProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn max_attempts(&self) -> u32 {
        MAX_ATTEMPTS
    }

    async fn complete(&self, image_b64: &str, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.base.model,
            "max_tokens": 1024,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/png",
                            "data": image_b64,
                        }
                    },
                    { "type": "text", "text": prompt }
                ]
            }]
        });

        info!(provider = PROVIDER, model = self.base.model.as_str(), "sending screenshot");
        let request = self
            .base
            .http
            .post(self.base.url("v1/messages"))
            .header("x-api-key", &self.base.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: MessagesResponse = self.base.send(request, classify).await?;

        response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse { provider: PROVIDER })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
