use std::time::Duration;

use tracing::{error, warn};

use super::VisionProvider;
use crate::error::{NavError, ProviderError};

/// Exponential backoff for rate-limited provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(120),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (0-based). A server hint wins, padded by a second.
    pub fn delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.saturating_add(Duration::from_secs(1)).min(self.max);
        }
        self.base
            .saturating_mul(2u32.saturating_pow(retry))
            .min(self.max)
    }
}

/// Calls the provider, retrying only rate-limit errors, at most `max_attempts()` times.
pub(crate) async fn complete_with_backoff<P: VisionProvider + ?Sized>(
    provider: &P,
    backoff: &BackoffPolicy,
    image_b64: &str,
    prompt: &str,
) -> Result<String, NavError> {
    let max_attempts = provider.max_attempts().max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match provider.complete(image_b64, prompt).await {
            Ok(text) => return Ok(text),
            Err(err @ ProviderError::QuotaExhausted { .. }) => {
                error!(provider = provider.name(), "{err}");
                return Err(NavError::ProviderQuota(err));
            }
            Err(ProviderError::RateLimited {
                provider: name,
                message,
                retry_after,
            }) => {
                if attempt >= max_attempts {
                    return Err(NavError::ProviderTransient {
                        attempts: attempt,
                        source: ProviderError::RateLimited {
                            provider: name,
                            message,
                            retry_after,
                        },
                    });
                }
                let delay = backoff.delay(attempt - 1, retry_after);
                warn!(
                    provider = name,
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(NavError::Provider(err)),
        }
    }
}
