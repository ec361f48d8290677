use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::NavigatorConfig;
use crate::error::NavError;
use crate::hands::Browser;
use crate::types::{Action, Outcome, Viewport};

/// Outcome reason for proposals that fail local validation.
pub const INVALID_ACTION: &str = "invalid-action";

const SCROLL_STEP_PX: u32 = 500;
const INPUT_PAUSE: Duration = Duration::from_millis(500);
const WAIT_PAUSE: Duration = Duration::from_secs(2);

/// Turns one [`Action`] into browser calls. Always yields an [`Outcome`].
#[derive(Debug, Clone)]
pub struct Executor {
    viewport: Viewport,
    settle_timeout: Duration,
    scroll_step: u32,
    input_pause: Duration,
    wait_pause: Duration,
}

impl Executor {
    pub fn new(config: &NavigatorConfig) -> Self {
        Self {
            viewport: config.viewport,
            settle_timeout: config.settle_timeout,
            scroll_step: SCROLL_STEP_PX,
            input_pause: INPUT_PAUSE,
            wait_pause: WAIT_PAUSE,
        }
    }

    pub async fn execute<B: Browser + ?Sized>(&self, action: &Action, browser: &B) -> Outcome {
        debug!(%action, "executing");
        match self.perform(action, browser).await {
            Ok(()) => Outcome::Success,
            Err(err @ (NavError::OutOfBounds { .. } | NavError::InvalidAction(_))) => {
                warn!(%action, error = %err, "refusing action");
                Outcome::failed(INVALID_ACTION)
            }
            Err(NavError::BrowserAction(detail)) => {
                warn!(%action, %detail, "browser action failed");
                Outcome::failed(format!("browser-action: {detail}"))
            }
            Err(other) => {
                warn!(%action, error = %other, "browser action failed");
                Outcome::failed(format!("browser-action: {other}"))
            }
        }
    }

    async fn perform<B: Browser + ?Sized>(&self, action: &Action, browser: &B) -> Result<(), NavError> {
        match action {
            Action::Click { x, y } => {
                let (fx, fy) = (f64::from(*x), f64::from(*y));
                if !self.viewport.contains(fx, fy) {
                    return Err(NavError::OutOfBounds {
                        x: fx,
                        y: fy,
                        width: self.viewport.width,
                        height: self.viewport.height,
                    });
                }
                self.bounded("click", browser.click(*x, *y)).await?;
                self.settle(browser).await
            }
            Action::Type { text } => {
                self.bounded("type", browser.type_text(text)).await?;
                tokio::time::sleep(self.input_pause).await;
                self.bounded("press Enter", browser.press_key("Enter")).await?;
                self.settle(browser).await
            }
            Action::Scroll { direction } => {
                self.bounded("scroll", browser.scroll(*direction, self.scroll_step))
                    .await?;
                tokio::time::sleep(self.input_pause).await;
                Ok(())
            }
            Action::Wait => {
                self.settle(browser).await?;
                tokio::time::sleep(self.wait_pause).await;
                Ok(())
            }
            Action::Extract | Action::Done => Ok(()),
        }
    }

    async fn settle<B: Browser + ?Sized>(&self, browser: &B) -> Result<(), NavError> {
        self.bounded("wait for load", browser.wait_for_settle(self.settle_timeout))
            .await
    }

    async fn bounded<T>(
        &self,
        op: &str,
        call: impl Future<Output = Result<T, NavError>>,
    ) -> Result<T, NavError> {
        tokio::time::timeout(self.settle_timeout, call)
            .await
            .map_err(|_| {
                NavError::browser(format!("{op} timed out after {:?}", self.settle_timeout))
            })?
    }
}
