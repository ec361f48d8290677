use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::result::ReleaseInfo;

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 900;

/// Appended to every goal so the model stays on public pages.
pub const NO_SIGN_IN_SUFFIX: &str = " IMPORTANT: You can view public repositories without signing in. DO NOT click 'Sign in' or 'Create account' links.";

pub const DEFAULT_START_URL: &str = "https://github.com";

/// Fixed browser viewport. Click coordinates are validated against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Inclusive on both edges: `[0, width] x [0, height]`.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x.is_finite()
            && y.is_finite()
            && (0.0..=self.width as f64).contains(&x)
            && (0.0..=self.height as f64).contains(&y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
        }
    }
}

/// What the run is trying to achieve. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Goal {
    text: String,
    target: Option<String>,
    start_url: String,
}

impl Goal {
    pub fn new(text: impl Into<String>, target: Option<String>, start_url: impl Into<String>) -> Self {
        let mut text = text.into();
        text.push_str(NO_SIGN_IN_SUFFIX);
        Self {
            text,
            target,
            start_url: start_url.into(),
        }
    }

    /// Goal for "find the latest release of `owner/name`".
    pub fn for_repository(repo: &str, start_url: impl Into<String>) -> Self {
        Self::new(
            format!(
                "Search for '{repo}' repository, navigate to it, find the Releases section, and extract the latest release information including version, tag/commit hash, and author."
            ),
            Some(repo.to_string()),
            start_url,
        )
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Where to go when the browser lands on a sign-in wall.
    pub fn recovery_url(&self) -> String {
        match &self.target {
            Some(repo) => format!("https://github.com/{repo}"),
            None => self.start_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepIndex(pub u32);

impl StepIndex {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn screenshot_file_name(self) -> String {
        format!("step_{:03}.png", self.0)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PNG bytes captured for one decision call.
#[derive(Debug, Clone)]
pub struct Screenshot {
    step: StepIndex,
    png: Vec<u8>,
}

impl Screenshot {
    pub fn new(step: StepIndex, png: Vec<u8>) -> Self {
        Self { step, png }
    }

    pub fn step(&self) -> StepIndex {
        self.step
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// A single atomic step the model asks the browser to perform.
///
/// `Click` and `Type` can only be built through [`Action::click`] and
/// [`Action::type_text`], which enforce the viewport and non-empty text rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Click { x: u32, y: u32 },
    Type { text: String },
    Scroll { direction: Direction },
    Wait,
    Extract,
    Done,
}

impl Action {
    pub fn click(x: f64, y: f64, viewport: Viewport) -> Result<Self, NavError> {
        if !viewport.contains(x, y) {
            return Err(NavError::OutOfBounds {
                x,
                y,
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self::Click {
            x: x.round() as u32,
            y: y.round() as u32,
        })
    }

    pub fn type_text(text: impl Into<String>) -> Result<Self, NavError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NavError::InvalidAction("type action carries no text".into()));
        }
        Ok(Self::Type { text })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::Wait => "wait",
            Action::Extract => "extract",
            Action::Done => "done",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Click { x, y } => write!(f, "click ({x}, {y})"),
            Action::Type { text } => write!(f, "type '{text}'"),
            Action::Scroll { direction } => write!(f, "scroll {direction}"),
            other => f.write_str(other.kind()),
        }
    }
}

/// An action as proposed by the model, with the context it gave for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub action: Action,
    pub target: Option<String>,
    pub reasoning: String,
    pub confidence: f32,
    /// Release data some models attach directly to `done`/`extract`.
    pub payload: Option<ReleaseInfo>,
}

impl PlannedAction {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            target: None,
            reasoning: String::new(),
            confidence: 0.5,
            payload: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_payload(mut self, payload: ReleaseInfo) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    /// Succeeded after this many failed attempts within the same step.
    Retried(u32),
    Failed(String),
}

impl Outcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Retried(n) => write!(f, "success after {n} retries"),
            Outcome::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub step: StepIndex,
    pub action: Option<Action>,
    pub target: Option<String>,
    pub outcome: Outcome,
    pub at: DateTime<Utc>,
}

impl ActionRecord {
    pub fn new(step: StepIndex, action: Option<Action>, target: Option<String>, outcome: Outcome) -> Self {
        Self {
            step,
            action,
            target,
            outcome,
            at: Utc::now(),
        }
    }

    /// One prompt line, e.g. `Step 2: click (640, 40) on 'Search box' - success`.
    pub fn summary(&self) -> String {
        let what = match (&self.action, &self.target) {
            (Some(action), Some(target)) => format!("{action} on '{target}'"),
            (Some(action), None) => action.to_string(),
            (None, Some(note)) => note.clone(),
            (None, None) => "no usable action".to_string(),
        };
        format!("Step {}: {} - {}", self.step, what, self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_bounds_are_inclusive() {
        let vp = Viewport::default();
        assert!(vp.contains(0.0, 0.0));
        assert!(vp.contains(1280.0, 900.0));
        assert!(!vp.contains(1280.5, 10.0));
        assert!(!vp.contains(-1.0, 10.0));
        assert!(!vp.contains(10.0, f64::NAN));
    }

    #[test]
    fn click_outside_viewport_is_rejected() {
        let err = Action::click(1500.0, 40.0, Viewport::default()).unwrap_err();
        assert!(matches!(err, NavError::OutOfBounds { .. }));
        assert_eq!(
            Action::click(639.6, 40.2, Viewport::default()).unwrap(),
            Action::Click { x: 640, y: 40 }
        );
    }

    #[test]
    fn blank_type_text_is_rejected() {
        assert!(matches!(
            Action::type_text("   ").unwrap_err(),
            NavError::InvalidAction(_)
        ));
        assert!(Action::type_text("openclaw").is_ok());
    }

    #[test]
    fn goal_for_repository_recovers_to_repo_page() {
        let goal = Goal::for_repository("openclaw/openclaw", DEFAULT_START_URL);
        assert!(goal.text().contains("'openclaw/openclaw'"));
        assert!(goal.text().ends_with(NO_SIGN_IN_SUFFIX));
        assert_eq!(goal.recovery_url(), "https://github.com/openclaw/openclaw");

        let free = Goal::new("find the docs", None, "https://example.com");
        assert_eq!(free.recovery_url(), "https://example.com");
    }

    #[test]
    fn record_summary_reads_like_a_log_line() {
        let record = ActionRecord::new(
            StepIndex(2),
            Some(Action::Click { x: 640, y: 40 }),
            Some("Search box".into()),
            Outcome::Success,
        );
        assert_eq!(record.summary(), "Step 2: click (640, 40) on 'Search box' - success");

        let failed = ActionRecord::new(StepIndex(3), None, None, Outcome::failed("invalid-action"));
        assert_eq!(failed.summary(), "Step 3: no usable action - failed (invalid-action)");
    }

    #[test]
    fn screenshot_names_are_zero_padded() {
        assert_eq!(StepIndex(7).screenshot_file_name(), "step_007.png");
    }
}
