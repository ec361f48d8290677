#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use vision_navigator::{
    Action, Browser, Decision, DecisionClient, DecisionMode, Direction, Goal, History, NavError,
    NavigatorConfig, PlannedAction, ProviderError, ReleaseInfo, Screenshot, StepIndex,
    VisionProvider,
};

/// What the fake browser saw, shared with the test after the browser is moved into a run.
#[derive(Default)]
pub struct BrowserLog {
    pub calls: Mutex<Vec<String>>,
    pub url: Mutex<String>,
    pub page_text: Mutex<String>,
    pub closed: AtomicBool,
    pub close_calls: AtomicU32,
    pub fail_screenshots: AtomicBool,
}

impl BrowserLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("click"))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeBrowser {
    log: Arc<BrowserLog>,
}

impl FakeBrowser {
    pub fn new() -> (Self, Arc<BrowserLog>) {
        let log = Arc::new(BrowserLog::default());
        (Self { log: Arc::clone(&log) }, log)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), NavError> {
        self.log.log(format!("navigate {url}"));
        *self.log.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, NavError> {
        if self.log.fail_screenshots.load(Ordering::SeqCst) {
            return Err(NavError::browser("target closed"));
        }
        Ok(vec![0x89, b'P', b'N', b'G', b'\r', b'\n'])
    }

    async fn click(&self, x: u32, y: u32) -> Result<(), NavError> {
        self.log.log(format!("click {x},{y}"));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), NavError> {
        self.log.log(format!("type {text}"));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), NavError> {
        self.log.log(format!("key {key}"));
        Ok(())
    }

    async fn scroll(&self, direction: Direction, pixels: u32) -> Result<(), NavError> {
        self.log.log(format!("scroll {direction} {pixels}"));
        Ok(())
    }

    async fn wait_for_settle(&self, _timeout: Duration) -> Result<(), NavError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, NavError> {
        Ok(self.log.url.lock().unwrap().clone())
    }

    async fn page_text(&self) -> Result<String, NavError> {
        Ok(self.log.page_text.lock().unwrap().clone())
    }

    fn close(&self) {
        self.log.close_calls.fetch_add(1, Ordering::SeqCst);
        self.log.closed.store(true, Ordering::SeqCst);
    }
}

/// One decision call as the client saw it.
#[derive(Debug, Clone)]
pub struct SeenCall {
    pub step: StepIndex,
    pub mode: DecisionMode,
    pub history_steps: Vec<StepIndex>,
}

/// Replays decisions in order, then repeats the fallback (or errors when there is none).
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<Decision, NavError>>>,
    fallback: Option<Decision>,
    seen: Arc<Mutex<Vec<SeenCall>>>,
    after_call: Option<Box<dyn Fn(usize) + Send + Sync>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<Decision, NavError>>) -> (Self, Arc<Mutex<Vec<SeenCall>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            seen: Arc::clone(&seen),
            after_call: None,
        };
        (client, seen)
    }

    pub fn repeating(decision: Decision) -> (Self, Arc<Mutex<Vec<SeenCall>>>) {
        let (mut client, seen) = Self::new(vec![]);
        client.fallback = Some(decision);
        (client, seen)
    }

    /// Runs `hook` with the 1-based call count before each decision is handed out.
    pub fn on_call(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.after_call = Some(Box::new(hook));
        self
    }

    /// Cancels `token` once `calls` decisions have been handed out.
    pub fn cancelling_after(self, calls: usize, token: CancellationToken) -> Self {
        self.on_call(move |seen| {
            if seen >= calls {
                token.cancel();
            }
        })
    }
}

#[async_trait]
impl DecisionClient for ScriptedClient {
    async fn decide(
        &self,
        screenshot: &Screenshot,
        _goal: &Goal,
        history: &History,
        mode: DecisionMode,
    ) -> Result<Decision, NavError> {
        let calls = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(SeenCall {
                step: screenshot.step(),
                mode,
                history_steps: history.iter().map(|r| r.step).collect(),
            });
            seen.len()
        };
        if let Some(hook) = &self.after_call {
            hook(calls);
        }

        let next = self.replies.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(reply), _) => reply,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(NavError::Decode("script exhausted".into())),
        }
    }
}

/// Raw provider text replayed in order; used to drive a real `VisionBrain`.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl VisionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn max_attempts(&self) -> u32 {
        3
    }

    async fn complete(&self, _image_b64: &str, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::EmptyResponse { provider: "scripted" }))
    }
}

pub fn act(action: Action) -> Result<Decision, NavError> {
    Ok(Decision::Act(PlannedAction::new(action)))
}

pub fn act_on(action: Action, target: &str) -> Result<Decision, NavError> {
    Ok(Decision::Act(PlannedAction::new(action).with_target(target)))
}

pub fn release() -> ReleaseInfo {
    ReleaseInfo {
        version: "v2026.1.29".into(),
        tag: "77e703c".into(),
        author: "steipete".into(),
        release_notes: None,
        publish_date: Some("2026-01-29".into()),
        download_links: None,
    }
}

pub fn openclaw_goal() -> Goal {
    Goal::for_repository("openclaw/openclaw", "https://github.com")
}

/// No pause between decisions; the scripted client never touches the network.
pub fn config() -> NavigatorConfig {
    NavigatorConfig {
        rate_limit_delay: Duration::ZERO,
        ..NavigatorConfig::default()
    }
}
