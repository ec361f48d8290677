use std::time::Duration;

use thiserror::Error;

/// Raw provider failures, classified by each backend from the HTTP response.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} rate limited the request: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("{provider} quota exhausted: {message}. {guidance}")]
    QuotaExhausted {
        provider: &'static str,
        message: String,
        guidance: &'static str,
    },
    #[error("{provider} request failed with status {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("network error calling {provider}: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned no text")]
    EmptyResponse { provider: &'static str },
    #[error("{provider} requires {var} to be set")]
    MissingApiKey {
        provider: &'static str,
        var: &'static str,
    },
}

impl ProviderError {
    pub fn network(provider: &'static str, source: reqwest::Error) -> Self {
        Self::Network { provider, source }
    }
}

/// Everything that can go wrong inside one navigation step.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("provider still rate limited after {attempts} attempts: {source}")]
    ProviderTransient {
        attempts: u32,
        #[source]
        source: ProviderError,
    },
    #[error(transparent)]
    ProviderQuota(ProviderError),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("could not decode model response: {0}")]
    Decode(String),
    #[error("click ({x}, {y}) lies outside the {width}x{height} viewport")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("browser action failed: {0}")]
    BrowserAction(String),
    #[error("step budget of {0} exhausted")]
    StepBudgetExceeded(u32),
    #[error("navigation cancelled")]
    Cancelled,
}

impl NavError {
    pub fn browser(err: impl std::fmt::Display) -> Self {
        Self::BrowserAction(err.to_string())
    }

    /// Errors that consume a slot of the per-step retry counter.
    pub fn is_retryable_step_error(&self) -> bool {
        matches!(
            self,
            NavError::Decode(_)
                | NavError::OutOfBounds { .. }
                | NavError::InvalidAction(_)
                | NavError::BrowserAction(_)
        )
    }

    /// Model replies that could not become a valid Action.
    pub fn is_invalid_proposal(&self) -> bool {
        matches!(
            self,
            NavError::Decode(_) | NavError::OutOfBounds { .. } | NavError::InvalidAction(_)
        )
    }
}
