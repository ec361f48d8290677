use std::path::PathBuf;
use std::time::Duration;

use crate::brain::BackoffPolicy;
use crate::error::ProviderError;
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::types::Viewport;

pub const DEFAULT_MAX_STEPS: u32 = 20;
pub const DEFAULT_RETRY_CAP: u32 = 3;
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the loop needs to know, passed in at construction.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub max_steps: u32,
    pub history_size: usize,
    /// Failed attempts tolerated within one step before the run fails.
    pub retry_cap: u32,
    /// Fixed pause before every provider call.
    pub rate_limit_delay: Duration,
    pub viewport: Viewport,
    pub backoff: BackoffPolicy,
    pub settle_timeout: Duration,
    pub allow_auth: bool,
    /// When set, every screenshot is persisted as `step_<index>.png`.
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            history_size: DEFAULT_HISTORY_SIZE,
            retry_cap: DEFAULT_RETRY_CAP,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
            viewport: Viewport::default(),
            backoff: BackoffPolicy::default(),
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
            allow_auth: false,
            screenshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProviderKind {
    Claude,
    Gpt4v,
    Gemini,
    Openrouter,
}

impl ProviderKind {
    /// Picks whichever provider has a key configured: openrouter, claude, gpt4v, gemini.
    pub fn detect(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let has = |var: &str| lookup(var).is_some_and(|v| !v.trim().is_empty());
        if has("OPENROUTER_API_KEY") {
            ProviderKind::Openrouter
        } else if has("ANTHROPIC_API_KEY") {
            ProviderKind::Claude
        } else if has("OPENAI_API_KEY") {
            ProviderKind::Gpt4v
        } else if has("GOOGLE_API_KEY") || has("GEMINI_API_KEY") {
            ProviderKind::Gemini
        } else {
            ProviderKind::Claude
        }
    }

    pub fn key_vars(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Claude => &["ANTHROPIC_API_KEY"],
            ProviderKind::Gpt4v => &["OPENAI_API_KEY"],
            ProviderKind::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            ProviderKind::Openrouter => &["OPENROUTER_API_KEY"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "anthropic",
            ProviderKind::Gpt4v => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Openrouter => "openrouter",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "https://api.anthropic.com",
            ProviderKind::Gpt4v => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Openrouter => "https://openrouter.ai/api/v1",
        }
    }

    fn default_model(&self, lookup: &impl Fn(&str) -> Option<String>) -> String {
        match self {
            ProviderKind::Claude => "claude-sonnet-4-20250514".to_string(),
            ProviderKind::Gpt4v => "gpt-4o".to_string(),
            ProviderKind::Gemini => {
                lookup("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string())
            }
            ProviderKind::Openrouter => lookup("OPENROUTER_MODEL")
                .unwrap_or_else(|| "anthropic/claude-3.5-sonnet".to_string()),
        }
    }
}

/// Resolved connection details for one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl ProviderSettings {
    pub fn resolve(
        kind: ProviderKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        let vars = kind.key_vars();
        let api_key = vars
            .iter()
            .filter_map(|var| lookup(*var))
            .find(|key| !key.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey {
                provider: kind.name(),
                var: vars[0],
            })?;

        Ok(Self {
            kind,
            model: kind.default_model(&lookup),
            base_url: kind.default_base_url().to_string(),
            api_key,
        })
    }

    pub fn from_env(kind: ProviderKind) -> Result<Self, ProviderError> {
        Self::resolve(kind, |var| std::env::var(var).ok())
    }
}
