//! The decide / execute / record loop.

use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::brain::{Decision, DecisionClient, DecisionMode};
use crate::config::NavigatorConfig;
use crate::error::NavError;
use crate::executor::{Executor, INVALID_ACTION};
use crate::guardrail;
use crate::hands::{Browser, Session};
use crate::history::History;
use crate::result::{FailureReason, NavigationResult, ReleaseInfo, ReleaseReport};
use crate::types::{Action, ActionRecord, Goal, Outcome, PlannedAction, Screenshot, StepIndex};

/// Outcome reason for clicks the model aimed at a sign-in control.
pub const BLOCKED_AUTH_TARGET: &str = "blocked-auth-target";

const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// What a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct NavigationRun {
    pub result: NavigationResult,
    /// Step indices consumed, retries and extraction included.
    pub steps: u32,
    /// Every record appended during the run, oldest first.
    pub records: Vec<ActionRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Extracting,
}

/// Mutable bookkeeping for a single run.
struct Progress {
    next: StepIndex,
    history: History,
    records: Vec<ActionRecord>,
    /// Failed attempts since the last successful action.
    retries: u32,
}

impl Progress {
    fn new(history_size: usize) -> Self {
        Self {
            next: StepIndex(0),
            history: History::new(history_size),
            records: Vec::new(),
            retries: 0,
        }
    }

    fn claim_step(&mut self) -> StepIndex {
        let step = self.next;
        self.next = step.next();
        step
    }

    fn steps(&self) -> u32 {
        self.next.0
    }

    fn record(&mut self, record: ActionRecord) {
        info!(step = %record.step, "{}", record.summary());
        self.records.push(record.clone());
        self.history.push(record);
    }

    /// Success marker for the current step; resets the retry counter.
    fn success(&mut self) -> Outcome {
        let outcome = match self.retries {
            0 => Outcome::Success,
            n => Outcome::Retried(n),
        };
        self.retries = 0;
        outcome
    }
}

/// Drives one browser session towards a [`Goal`] using a [`DecisionClient`].
pub struct Navigator<D> {
    brain: D,
    executor: Executor,
    config: NavigatorConfig,
}

impl<D: DecisionClient> Navigator<D> {
    pub fn new(brain: D, config: NavigatorConfig) -> Self {
        Self {
            brain,
            executor: Executor::new(&config),
            config,
        }
    }

    /// Runs to a terminal state. The browser is closed before this returns,
    /// whatever the outcome.
    pub async fn run<B: Browser>(
        &self,
        browser: B,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> NavigationRun {
        let session = Session::open(browser);
        let mut progress = Progress::new(self.config.history_size);

        let result = self.drive(&*session, goal, cancel, &mut progress).await;
        match &result {
            NavigationResult::Succeeded(report) => info!(
                steps = progress.steps(),
                repository = report.repository.as_str(),
                version = report.latest_release.version.as_str(),
                "navigation succeeded"
            ),
            NavigationResult::Failed(report) => error!(
                steps = progress.steps(),
                reason = %report.reason,
                detail = report.detail.as_deref().unwrap_or("-"),
                "navigation failed"
            ),
        }

        NavigationRun {
            result,
            steps: progress.steps(),
            records: progress.records,
        }
    }

    async fn drive<B: Browser + ?Sized>(
        &self,
        browser: &B,
        goal: &Goal,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> NavigationResult {
        info!(url = goal.start_url(), "opening start page");
        if let Err(err) = self.open(browser, goal.start_url()).await {
            return NavigationResult::failed(
                FailureReason::BrowserError,
                Some(err.to_string()),
                progress.steps(),
            );
        }

        let mut state = State::Running;
        loop {
            if cancel.is_cancelled() {
                return NavigationResult::failed(FailureReason::Cancelled, None, progress.steps());
            }
            if progress.next.0 >= self.config.max_steps {
                return NavigationResult::failed(
                    FailureReason::StepBudgetExhausted,
                    Some(NavError::StepBudgetExceeded(self.config.max_steps).to_string()),
                    progress.steps(),
                );
            }

            let step = progress.claim_step();
            debug!(%step, ?state, "step");
            let flow = match state {
                State::Running => self.navigate_step(step, browser, goal, progress).await,
                State::Extracting => {
                    ControlFlow::Break(self.extract_step(step, browser, goal, progress).await)
                }
            };
            match flow {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(result) => return result,
            }
        }
    }

    async fn navigate_step<B: Browser + ?Sized>(
        &self,
        step: StepIndex,
        browser: &B,
        goal: &Goal,
        progress: &mut Progress,
    ) -> ControlFlow<NavigationResult, State> {
        if !self.config.allow_auth && self.on_auth_page(browser).await {
            let url = goal.recovery_url();
            warn!(%step, url = url.as_str(), "auth page detected, navigating away");
            return match self.open(browser, &url).await {
                Ok(()) => {
                    let outcome = progress.success();
                    progress.record(ActionRecord::new(
                        step,
                        None,
                        Some(format!("auth page detected; returned to {url}")),
                        outcome,
                    ));
                    ControlFlow::Continue(State::Running)
                }
                Err(err) => self.failed_attempt(step, None, None, browser_reason(&err), progress),
            };
        }

        let shot = match self.capture(step, browser).await {
            Ok(shot) => shot,
            Err(err) => return self.failed_attempt(step, None, None, browser_reason(&err), progress),
        };

        let planned = match self
            .brain
            .decide(&shot, goal, &progress.history, DecisionMode::Navigate)
            .await
        {
            Ok(Decision::Act(planned)) => planned,
            Ok(Decision::Extracted(info)) => {
                let outcome = progress.success();
                progress.record(ActionRecord::new(step, Some(Action::Extract), None, outcome));
                return ControlFlow::Break(succeed(goal, info, progress));
            }
            Err(err) if err.is_invalid_proposal() => {
                warn!(%step, error = %err, "unusable model reply");
                return self.failed_attempt(step, None, None, INVALID_ACTION.into(), progress);
            }
            Err(err) => return ControlFlow::Break(fatal(err, progress)),
        };

        let PlannedAction {
            action,
            target,
            payload,
            ..
        } = planned;

        match action {
            Action::Done | Action::Extract => {
                let outcome = progress.success();
                progress.record(ActionRecord::new(step, Some(action.clone()), target, outcome));
                match (action, payload) {
                    (Action::Done, Some(info)) => ControlFlow::Break(succeed(goal, info, progress)),
                    _ => ControlFlow::Continue(State::Extracting),
                }
            }
            Action::Click { .. }
                if !self.config.allow_auth && guardrail::is_auth_target(target.as_deref()) =>
            {
                self.failed_attempt(step, Some(action), target, BLOCKED_AUTH_TARGET.into(), progress)
            }
            action => match self.executor.execute(&action, browser).await {
                Outcome::Failed(reason) => {
                    self.failed_attempt(step, Some(action), target, reason, progress)
                }
                _ => {
                    let outcome = progress.success();
                    progress.record(ActionRecord::new(step, Some(action), target, outcome));
                    ControlFlow::Continue(State::Running)
                }
            },
        }
    }

    async fn extract_step<B: Browser + ?Sized>(
        &self,
        step: StepIndex,
        browser: &B,
        goal: &Goal,
        progress: &mut Progress,
    ) -> NavigationResult {
        let shot = match self.capture(step, browser).await {
            Ok(shot) => shot,
            Err(err) => {
                return NavigationResult::failed(
                    FailureReason::BrowserError,
                    Some(err.to_string()),
                    progress.steps(),
                );
            }
        };

        let detail = match self
            .brain
            .decide(&shot, goal, &progress.history, DecisionMode::Extract)
            .await
        {
            Ok(Decision::Extracted(info)) => {
                let outcome = progress.success();
                progress.record(ActionRecord::new(step, Some(Action::Extract), None, outcome));
                return succeed(goal, info, progress);
            }
            Ok(Decision::Act(planned)) => {
                format!("expected release details, model proposed {}", planned.action)
            }
            Err(err) if err.is_invalid_proposal() => err.to_string(),
            Err(err) => return fatal(err, progress),
        };

        warn!(%step, detail = detail.as_str(), "extraction failed");
        progress.record(ActionRecord::new(
            step,
            Some(Action::Extract),
            None,
            Outcome::failed(FailureReason::ExtractionDecodeError.as_str()),
        ));
        NavigationResult::failed(
            FailureReason::ExtractionDecodeError,
            Some(detail),
            progress.steps(),
        )
    }

    /// Records a failed attempt and decides whether the run can keep going.
    fn failed_attempt(
        &self,
        step: StepIndex,
        action: Option<Action>,
        target: Option<String>,
        reason: String,
        progress: &mut Progress,
    ) -> ControlFlow<NavigationResult, State> {
        progress.retries += 1;
        warn!(%step, attempt = progress.retries, reason = reason.as_str(), "attempt failed");
        progress.record(ActionRecord::new(step, action, target, Outcome::Failed(reason.clone())));

        if progress.retries > self.config.retry_cap {
            return ControlFlow::Break(NavigationResult::failed(
                FailureReason::MaxRetriesExceeded,
                Some(format!(
                    "{} consecutive failed attempts, last: {reason}",
                    progress.retries
                )),
                progress.steps(),
            ));
        }
        ControlFlow::Continue(State::Running)
    }

    async fn open<B: Browser + ?Sized>(&self, browser: &B, url: &str) -> Result<(), NavError> {
        tokio::time::timeout(PAGE_LOAD_TIMEOUT, browser.navigate(url))
            .await
            .map_err(|_| NavError::browser(format!("loading {url} timed out")))?
    }

    async fn on_auth_page<B: Browser + ?Sized>(&self, browser: &B) -> bool {
        if let Ok(url) = browser.current_url().await {
            if guardrail::is_auth_url(&url) {
                return true;
            }
        }
        match browser.page_text().await {
            Ok(text) => guardrail::is_auth_page_text(&text),
            Err(_) => false,
        }
    }

    async fn capture<B: Browser + ?Sized>(
        &self,
        step: StepIndex,
        browser: &B,
    ) -> Result<Screenshot, NavError> {
        let png = tokio::time::timeout(self.config.settle_timeout, browser.screenshot())
            .await
            .map_err(|_| NavError::browser("screenshot timed out"))??;
        let shot = Screenshot::new(step, png);
        if let Some(dir) = &self.config.screenshot_dir {
            persist(dir, &shot).await;
        }
        Ok(shot)
    }
}

fn browser_reason(err: &NavError) -> String {
    match err {
        NavError::BrowserAction(detail) => format!("browser-action: {detail}"),
        other => format!("browser-action: {other}"),
    }
}

fn succeed(goal: &Goal, info: ReleaseInfo, progress: &Progress) -> NavigationResult {
    debug!(steps = progress.steps(), tag = info.tag.as_str(), "release extracted");
    NavigationResult::Succeeded(ReleaseReport {
        repository: goal.target().unwrap_or("unknown").to_string(),
        latest_release: info,
    })
}

/// Errors that end the run regardless of the retry budget.
fn fatal(err: NavError, progress: &Progress) -> NavigationResult {
    let reason = match &err {
        NavError::ProviderQuota(_) => FailureReason::ProviderQuota,
        NavError::Cancelled => FailureReason::Cancelled,
        NavError::StepBudgetExceeded(_) => FailureReason::StepBudgetExhausted,
        NavError::BrowserAction(_) => FailureReason::BrowserError,
        _ => FailureReason::ProviderError,
    };
    NavigationResult::failed(reason, Some(err.to_string()), progress.steps())
}

async fn persist(dir: &Path, shot: &Screenshot) {
    let path = dir.join(shot.step().screenshot_file_name());
    let written = match tokio::fs::create_dir_all(dir).await {
        Ok(()) => tokio::fs::write(&path, shot.png()).await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => debug!(path = %path.display(), "screenshot saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not save screenshot"),
    }
}
