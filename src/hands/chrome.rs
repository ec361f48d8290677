use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::browser::tab::point::Point;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{LaunchOptions, Tab};
use tracing::{debug, info, warn};

use super::blocking::{BlockingGate, off_async_worker};
use super::{Browser, dom};
use crate::error::NavError;
use crate::types::{Direction, Viewport};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_TAB_TIMEOUT: Duration = Duration::from_secs(30);

/// One Chrome process with a single tab, driven over CDP.
///
/// `headless_chrome` is blocking, so every call runs on the blocking pool
/// with its own clone of the tab handle. Calls go through a gate: a call the
/// caller gave up on still finishes before the next one touches the tab.
pub struct ChromeBrowser {
    browser: Mutex<Option<headless_chrome::Browser>>,
    tab: Arc<Tab>,
    gate: BlockingGate,
}

impl ChromeBrowser {
    /// Starts a fresh, profile-less browser. Blocking; call it from `spawn_blocking`.
    pub fn launch(headless: bool, viewport: Viewport) -> anyhow::Result<Self> {
        let options = LaunchOptions {
            headless,
            window_size: Some((viewport.width, viewport.height)),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                // Anti-bot flags
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-infobars"),
                OsStr::new("--disable-dev-shm-usage"),
            ],
            idle_browser_timeout: IDLE_BROWSER_TIMEOUT,
            ..Default::default()
        };

        info!(headless, width = viewport.width, height = viewport.height, "starting chrome");
        let browser = headless_chrome::Browser::new(options).context("browser launch failed")?;
        let tab = browser.new_tab().context("could not open a tab")?;
        tab.set_default_timeout(DEFAULT_TAB_TIMEOUT);
        tab.set_user_agent(USER_AGENT, Some("en-US,en"), None)?;
        tab.navigate_to("about:blank")?;
        info!("chrome ready");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            tab,
            gate: BlockingGate::default(),
        })
    }

    async fn with_tab<T, F>(&self, op: &'static str, f: F) -> Result<T, NavError>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> anyhow::Result<T> + Send + 'static,
    {
        if self.is_closed() {
            return Err(NavError::browser(format!("{op}: session already closed")));
        }
        let tab = Arc::clone(&self.tab);
        self.gate
            .run(move || f(&tab))
            .await
            .map_err(|e| NavError::browser(format!("{op}: {e}")))?
            .map_err(|e| NavError::browser(format!("{op}: {e:#}")))
    }

    fn is_closed(&self) -> bool {
        self.browser.lock().map(|b| b.is_none()).unwrap_or(true)
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), NavError> {
        debug!(url, "navigate");
        let url = url.to_string();
        self.with_tab("navigate", move |tab| {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, NavError> {
        self.with_tab("screenshot", |tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        })
        .await
    }

    async fn click(&self, x: u32, y: u32) -> Result<(), NavError> {
        self.with_tab("click", move |tab| {
            tab.click_point(Point {
                x: f64::from(x),
                y: f64::from(y),
            })?;
            Ok(())
        })
        .await
    }

    async fn type_text(&self, text: &str) -> Result<(), NavError> {
        let text = text.to_string();
        self.with_tab("type", move |tab| {
            tab.type_str(&text)?;
            Ok(())
        })
        .await
    }

    async fn press_key(&self, key: &str) -> Result<(), NavError> {
        let key = key.to_string();
        self.with_tab("press key", move |tab| {
            tab.press_key(&key)?;
            Ok(())
        })
        .await
    }

    async fn scroll(&self, direction: Direction, pixels: u32) -> Result<(), NavError> {
        self.with_tab("scroll", move |tab| dom::scroll_by(tab, direction, pixels))
            .await
    }

    async fn wait_for_settle(&self, timeout: Duration) -> Result<(), NavError> {
        self.with_tab("wait for load", move |tab| {
            tab.set_default_timeout(timeout);
            let settled = tab.wait_until_navigated().map(|_| ());
            tab.set_default_timeout(DEFAULT_TAB_TIMEOUT);
            settled
        })
        .await
    }

    async fn current_url(&self) -> Result<String, NavError> {
        self.with_tab("current url", |tab| Ok(tab.get_url())).await
    }

    async fn page_text(&self) -> Result<String, NavError> {
        self.with_tab("page text", dom::page_text).await
    }

    fn close(&self) {
        let Ok(mut guard) = self.browser.lock() else {
            return;
        };
        if let Some(browser) = guard.take() {
            off_async_worker(|| {
                if let Err(e) = self.tab.close(false) {
                    warn!(error = %e, "tab did not close cleanly");
                }
                drop(browser);
            });
            info!("chrome stopped");
        }
    }
}
