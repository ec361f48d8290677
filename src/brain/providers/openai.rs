use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::http::{ErrorResponse, HttpBase};
use crate::brain::VisionProvider;
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::ProviderError;

const MAX_ATTEMPTS: u32 = 3;
const OPENAI_GUIDANCE: &str =
    "OpenAI returned insufficient_quota (billing/quota). Check usage: https://platform.openai.com/usage";
const OPENROUTER_GUIDANCE: &str =
    "OpenRouter credits exhausted. Check your balance: https://openrouter.ai/settings/credits";

/// Any OpenAI-compatible chat completions endpoint (OpenAI itself or OpenRouter).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base: HttpBase,
    guidance: &'static str,
}

impl OpenAiClient {
    pub fn new(settings: &ProviderSettings) -> Self {
        let (name, guidance) = match settings.kind {
            ProviderKind::Openrouter => ("openrouter", OPENROUTER_GUIDANCE),
            _ => ("openai", OPENAI_GUIDANCE),
        };
        Self {
            base: HttpBase::new(name, settings),
            guidance,
        }
    }

    pub fn model(&self) -> &str {
        &self.base.model
    }

    fn classify(&self, err: ErrorResponse) -> ProviderError {
        let provider = self.base.provider;
        if err.mentions(&["insufficient_quota"]) || err.status == 402 {
            return ProviderError::QuotaExhausted {
                provider,
                message: err.message,
                guidance: self.guidance,
            };
        }
        if err.status == 429 {
            return ProviderError::RateLimited {
                provider,
                message: err.message,
                retry_after: err.retry_after,
            };
        }
        ProviderError::Api {
            provider,
            status: err.status,
            message: err.message,
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        self.base.provider
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
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{image_b64}") }
                    }
                ]
            }]
        });

        info!(provider = self.base.provider, model = self.base.model.as_str(), "sending screenshot");
        let request = self
            .base
            .http
            .post(self.base.url("chat/completions"))
            .bearer_auth(&self.base.api_key)
            .json(&body);
        let response: ChatResponse = self.base.send(request, |err| self.classify(err)).await?;

        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse {
                provider: self.base.provider,
            })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, kind: ProviderKind) -> OpenAiClient {
        OpenAiClient::new(&ProviderSettings {
            kind,
            api_key: "sk-test".into(),
            model: "gpt-4o".into(),
            base_url: server.uri(),
        })
    }

    #[tokio::test]
    async fn returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"action_type\": \"done\"}"}}]
            })))
            .mount(&server)
            .await;

        let text = client(&server, ProviderKind::Gpt4v)
            .complete("aGVsbG8=", "p")
            .await
            .unwrap();
        assert_eq!(text, "{\"action_type\": \"done\"}");
    }

    #[tokio::test]
    async fn insufficient_quota_is_not_a_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "You exceeded your current quota, please check your plan and billing details.",
                    "type": "insufficient_quota",
                    "code": "insufficient_quota"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server, ProviderKind::Gpt4v)
            .complete("aGVsbG8=", "p")
            .await
            .unwrap_err();
        match err {
            ProviderError::QuotaExhausted { guidance, .. } => {
                assert!(guidance.contains("platform.openai.com/usage"));
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "Rate limit reached for gpt-4o", "code": "rate_limit_exceeded"}
            })))
            .mount(&server)
            .await;

        let err = client(&server, ProviderKind::Openrouter)
            .complete("aGVsbG8=", "p")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                provider: "openrouter",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let err = client(&server, ProviderKind::Gpt4v)
            .complete("aGVsbG8=", "p")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }
}
