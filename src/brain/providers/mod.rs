//! The three interchangeable vision backends.

mod anthropic;
mod gemini;
mod http;
mod openai;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;

use super::VisionProvider;
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::ProviderError;

/// Closed set of providers; which one is used is decided once, at construction.
#[derive(Debug, Clone)]
pub enum VisionBackend {
    Anthropic(AnthropicClient),
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl VisionBackend {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        match settings.kind {
            ProviderKind::Claude => Self::Anthropic(AnthropicClient::new(settings)),
            ProviderKind::Gpt4v | ProviderKind::Openrouter => {
                Self::OpenAi(OpenAiClient::new(settings))
            }
            ProviderKind::Gemini => Self::Gemini(GeminiClient::new(settings)),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            VisionBackend::Anthropic(client) => client.model(),
            VisionBackend::OpenAi(client) => client.model(),
            VisionBackend::Gemini(client) => client.model(),
        }
    }
}

#[async_trait]
impl VisionProvider for VisionBackend {
    fn name(&self) -> &'static str {
        match self {
            VisionBackend::Anthropic(client) => client.name(),
            VisionBackend::OpenAi(client) => client.name(),
            VisionBackend::Gemini(client) => client.name(),
        }
    }

    fn max_attempts(&self) -> u32 {
        match self {
            VisionBackend::Anthropic(client) => client.max_attempts(),
            VisionBackend::OpenAi(client) => client.max_attempts(),
            VisionBackend::Gemini(client) => client.max_attempts(),
        }
    }

    async fn complete(&self, image_b64: &str, prompt: &str) -> Result<String, ProviderError> {
        match self {
            VisionBackend::Anthropic(client) => client.complete(image_b64, prompt).await,
            VisionBackend::OpenAi(client) => client.complete(image_b64, prompt).await,
            VisionBackend::Gemini(client) => client.complete(image_b64, prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: ProviderKind) -> ProviderSettings {
        ProviderSettings {
            kind,
            api_key: "k".into(),
            model: "m".into(),
            base_url: "http://localhost".into(),
        }
    }

    #[test]
    fn retry_caps_follow_the_provider() {
        let claude = VisionBackend::from_settings(&settings(ProviderKind::Claude));
        let openai = VisionBackend::from_settings(&settings(ProviderKind::Gpt4v));
        let router = VisionBackend::from_settings(&settings(ProviderKind::Openrouter));
        let gemini = VisionBackend::from_settings(&settings(ProviderKind::Gemini));

        assert_eq!(claude.max_attempts(), 3);
        assert_eq!(openai.max_attempts(), 3);
        assert_eq!(router.max_attempts(), 3);
        assert_eq!(gemini.max_attempts(), 5);
        assert_eq!(router.name(), "openrouter");
        assert_eq!(gemini.name(), "gemini");
    }
}
