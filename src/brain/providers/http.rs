//! Shared HTTP plumbing for the provider backends.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::ProviderError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A non-2xx reply, before the backend classifies it.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub status: u16,
    /// `error.message` when the body is the usual JSON envelope, else the raw body.
    pub message: String,
    pub body: String,
    pub retry_after: Option<Duration>,
}

impl ErrorResponse {
    pub fn mentions(&self, needles: &[&str]) -> bool {
        let body = self.body.to_ascii_lowercase();
        let message = self.message.to_ascii_lowercase();
        needles
            .iter()
            .any(|needle| body.contains(needle) || message.contains(needle))
    }
}

#[derive(Debug, Clone)]
pub struct HttpBase {
    pub provider: &'static str,
    pub http: Client,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl HttpBase {
    pub fn new(provider: &'static str, settings: &ProviderSettings) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            provider,
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Sends the request and decodes a 2xx body; other statuses go through `classify`.
    pub async fn send<Res>(
        &self,
        request: RequestBuilder,
        classify: impl FnOnce(ErrorResponse) -> ProviderError,
    ) -> Result<Res, ProviderError>
    where
        Res: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::network(self.provider, e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ProviderError::network(self.provider, e));
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.clone());

        debug!(provider = self.provider, status = status.as_u16(), %message, "provider returned an error");
        Err(classify(ErrorResponse {
            status: status.as_u16(),
            message,
            body,
            retry_after,
        }))
    }
}

/// Parses hints like "Please retry in 51.5s" out of an error message.
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    let start = lower.find("retry in ")? + "retry in ".len();
    let rest = &lower[start..];
    let number: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let unit = rest[number.len()..].trim_start();
    if !unit.starts_with('s') {
        return None;
    }
    let secs = number.parse::<f64>().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
