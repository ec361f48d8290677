use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{DEFAULT_MAX_STEPS, DEFAULT_RETRY_CAP, NavigatorConfig, ProviderKind};
use crate::history::DEFAULT_HISTORY_SIZE;
use crate::types::{DEFAULT_START_URL, Goal};

/// Repository used when neither `--repo` nor `--prompt` is given.
pub const DEFAULT_REPOSITORY: &str = "openclaw/openclaw";

/// Navigate a website with a vision model and extract the latest release of a repository.
#[derive(Debug, Parser)]
#[command(name = "vision-navigator", version)]
pub struct Cli {
    /// Starting URL
    #[arg(long, default_value = DEFAULT_START_URL)]
    pub url: String,

    /// Repository to find, e.g. `openclaw/openclaw`
    #[arg(long)]
    pub repo: Option<String>,

    /// Natural-language navigation goal; overrides the one built from `--repo`
    #[arg(long)]
    pub prompt: Option<String>,

    /// Vision model provider (defaults to whichever API key is set)
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    pub max_steps: u32,

    /// Number of recent actions shown to the model
    #[arg(long, default_value_t = DEFAULT_HISTORY_SIZE)]
    pub history_size: usize,

    /// Failed attempts tolerated per step
    #[arg(long, default_value_t = DEFAULT_RETRY_CAP)]
    pub retry_cap: u32,

    /// Seconds to pause before every vision API call
    #[arg(long, env = "VISION_API_DELAY_SEC", default_value = "2.0", value_parser = parse_seconds)]
    pub rate_limit_delay: Duration,

    /// Debug logging and one saved screenshot per step
    #[arg(long)]
    pub debug: bool,

    #[arg(long, default_value = "screenshots")]
    pub screenshot_dir: PathBuf,

    /// Show the browser window
    #[arg(long)]
    pub no_headless: bool,

    /// Allow GitHub sign-in and sign-up pages
    #[arg(long)]
    pub allow_auth: bool,

    #[arg(short, long, default_value = "output.json")]
    pub output: PathBuf,
}

impl Cli {
    pub fn goal(&self) -> Goal {
        match (&self.prompt, &self.repo) {
            (Some(prompt), repo) => Goal::new(prompt.clone(), repo.clone(), self.url.clone()),
            (None, Some(repo)) => Goal::for_repository(repo, self.url.clone()),
            (None, None) => Goal::for_repository(DEFAULT_REPOSITORY, self.url.clone()),
        }
    }

    pub fn provider_kind(&self, lookup: impl Fn(&str) -> Option<String>) -> ProviderKind {
        self.provider.unwrap_or_else(|| ProviderKind::detect(lookup))
    }

    pub fn headless(&self) -> bool {
        !self.no_headless
    }

    pub fn navigator_config(&self) -> NavigatorConfig {
        NavigatorConfig {
            max_steps: self.max_steps,
            history_size: self.history_size,
            retry_cap: self.retry_cap,
            rate_limit_delay: self.rate_limit_delay,
            allow_auth: self.allow_auth,
            screenshot_dir: self.debug.then(|| self.screenshot_dir.clone()),
            ..NavigatorConfig::default()
        }
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("`{raw}`: {e}"))
}
