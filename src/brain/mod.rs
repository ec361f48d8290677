//! The decision side of the loop: screenshot + goal + history in, one action out.

mod parse;
mod prompt;
pub mod providers;
mod retry;

pub use parse::{planned_action, release_info, strip_fences};
pub use retry::BackoffPolicy;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::NavigatorConfig;
use crate::error::{NavError, ProviderError};
use crate::history::History;
use crate::result::ReleaseInfo;
use crate::types::{Goal, PlannedAction, Screenshot, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// Pick the next browser action.
    Navigate,
    /// Read the release metadata off the current page.
    Extract,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Act(PlannedAction),
    Extracted(ReleaseInfo),
}

/// Anything that can look at a screenshot and decide what happens next.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    async fn decide(
        &self,
        screenshot: &Screenshot,
        goal: &Goal,
        history: &History,
        mode: DecisionMode,
    ) -> Result<Decision, NavError>;
}

/// A hosted model that accepts an image plus a prompt and answers with text.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Total attempts allowed when the provider keeps rate limiting.
    fn max_attempts(&self) -> u32;

    async fn complete(&self, image_b64: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// [`DecisionClient`] backed by a vision model.
pub struct VisionBrain<P> {
    provider: P,
    viewport: Viewport,
    rate_limit_delay: Duration,
    backoff: BackoffPolicy,
}

impl<P: VisionProvider> VisionBrain<P> {
    pub fn new(provider: P, config: &NavigatorConfig) -> Self {
        Self {
            provider,
            viewport: config.viewport,
            rate_limit_delay: config.rate_limit_delay,
            backoff: config.backoff,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: VisionProvider> DecisionClient for VisionBrain<P> {
    async fn decide(
        &self,
        screenshot: &Screenshot,
        goal: &Goal,
        history: &History,
        mode: DecisionMode,
    ) -> Result<Decision, NavError> {
        let prompt = match mode {
            DecisionMode::Navigate => prompt::navigation(goal, history, self.viewport),
            DecisionMode::Extract => prompt::extraction(goal),
        };
        debug!(step = %screenshot.step(), ?mode, %prompt, "prompt");

        // Throttle every call to stay under provider RPM limits.
        tokio::time::sleep(self.rate_limit_delay).await;

        let reply = retry::complete_with_backoff(
            &self.provider,
            &self.backoff,
            &screenshot.to_base64(),
            &prompt,
        )
        .await?;
        debug!(step = %screenshot.step(), provider = self.provider.name(), %reply, "model reply");

        match mode {
            DecisionMode::Navigate => {
                let planned = parse::planned_action(&reply, self.viewport)?;
                info!(
                    step = %screenshot.step(),
                    action = %planned.action,
                    target = planned.target.as_deref().unwrap_or("-"),
                    confidence = planned.confidence,
                    reasoning = planned.reasoning.as_str(),
                    "model decided"
                );
                Ok(Decision::Act(planned))
            }
            DecisionMode::Extract => parse::release_info(&reply).map(Decision::Extracted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, StepIndex};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Replays canned provider results in order.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
        max_attempts: u32,
    }

    impl Scripted {
        fn new(max_attempts: u32, replies: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                max_attempts,
            }
        }
    }

    #[async_trait]
    impl VisionProvider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn max_attempts(&self) -> u32 {
            self.max_attempts
        }

        async fn complete(&self, _image: &str, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::EmptyResponse { provider: "scripted" }))
        }
    }

    fn rate_limited() -> Result<String, ProviderError> {
        Err(ProviderError::RateLimited {
            provider: "scripted",
            message: "429".into(),
            retry_after: None,
        })
    }

    fn brain(provider: Scripted) -> VisionBrain<Scripted> {
        VisionBrain::new(provider, &NavigatorConfig::default())
    }

    async fn navigate(brain: &VisionBrain<Scripted>) -> Result<Decision, NavError> {
        let goal = Goal::for_repository("openclaw/openclaw", "https://github.com");
        let shot = Screenshot::new(StepIndex(0), vec![0x89, b'P', b'N', b'G']);
        brain
            .decide(&shot, &goal, &History::default(), DecisionMode::Navigate)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_rate_limit_delay_before_calling() {
        let brain = brain(Scripted::new(3, vec![Ok(r#"{"action_type": "wait"}"#.into())]));
        let started = Instant::now();
        let decision = navigate(&brain).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(
            decision,
            Decision::Act(PlannedAction {
                action: Action::Wait,
                target: None,
                reasoning: String::new(),
                confidence: 0.5,
                payload: None,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn quota_is_not_retried() {
        let brain = brain(Scripted::new(
            3,
            vec![Err(ProviderError::QuotaExhausted {
                provider: "scripted",
                message: "insufficient_quota".into(),
                guidance: "add credits",
            })],
        ));
        let err = navigate(&brain).await.unwrap_err();
        assert!(matches!(err, NavError::ProviderQuota(_)));
        assert_eq!(brain.provider().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_with_backoff_then_succeeds() {
        let brain = brain(Scripted::new(
            3,
            vec![rate_limited(), rate_limited(), Ok(r#"{"action_type": "extract"}"#.into())],
        ));
        let started = Instant::now();
        let decision = navigate(&brain).await.unwrap();
        assert!(matches!(decision, Decision::Act(p) if p.action == Action::Extract));
        assert_eq!(brain.provider().calls.load(Ordering::SeqCst), 3);
        // 2s throttle + 5s + 10s backoff
        assert_eq!(started.elapsed(), Duration::from_secs(17));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_gives_up_at_provider_cap() {
        let brain = brain(Scripted::new(5, (0..6).map(|_| rate_limited()).collect()));
        let err = navigate(&brain).await.unwrap_err();
        assert!(matches!(err, NavError::ProviderTransient { attempts: 5, .. }));
        assert_eq!(brain.provider().calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn other_provider_errors_propagate_unretried() {
        let brain = brain(Scripted::new(
            3,
            vec![Err(ProviderError::Api {
                provider: "scripted",
                status: 500,
                message: "boom".into(),
            })],
        ));
        let err = navigate(&brain).await.unwrap_err();
        assert!(matches!(err, NavError::Provider(_)));
        assert_eq!(brain.provider().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_bounds_click_never_becomes_an_action() {
        let brain = brain(Scripted::new(
            3,
            vec![Ok(r#"{"action_type": "click", "coordinates": [640, 2400]}"#.into())],
        ));
        let err = navigate(&brain).await.unwrap_err();
        assert!(matches!(err, NavError::OutOfBounds { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn extract_mode_returns_release() {
        let brain = brain(Scripted::new(
            3,
            vec![Ok("```json\n{\"version\": \"v2026.1.29\", \"tag\": \"77e703c\", \"author\": \"steipete\", \"found\": true}\n```".into())],
        ));
        let goal = Goal::for_repository("openclaw/openclaw", "https://github.com");
        let shot = Screenshot::new(StepIndex(4), vec![1, 2, 3]);
        let decision = brain
            .decide(&shot, &goal, &History::default(), DecisionMode::Extract)
            .await
            .unwrap();
        match decision {
            Decision::Extracted(info) => assert_eq!(info.tag, "77e703c"),
            other => panic!("expected extraction, got {other:?}"),
        }
    }
}
