//! The browser side of the loop.

pub(crate) mod blocking;
mod chrome;
mod dom;

pub use chrome::ChromeBrowser;

use std::ops::Deref;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::NavError;
use crate::types::Direction;

/// Everything the loop and the executor need from a browser session.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), NavError>;

    /// PNG of the visible viewport only.
    async fn screenshot(&self) -> Result<Vec<u8>, NavError>;

    async fn click(&self, x: u32, y: u32) -> Result<(), NavError>;

    async fn type_text(&self, text: &str) -> Result<(), NavError>;

    async fn press_key(&self, key: &str) -> Result<(), NavError>;

    async fn scroll(&self, direction: Direction, pixels: u32) -> Result<(), NavError>;

    async fn wait_for_settle(&self, timeout: Duration) -> Result<(), NavError>;

    async fn current_url(&self) -> Result<String, NavError>;

    async fn page_text(&self) -> Result<String, NavError>;

    /// Releases the session. Must be safe to call more than once.
    fn close(&self);
}

/// Owns a browser for the duration of one run and closes it on every exit path.
pub struct Session<B: Browser> {
    browser: B,
}

impl<B: Browser> Session<B> {
    pub fn open(browser: B) -> Self {
        Self { browser }
    }
}

impl<B: Browser> Deref for Session<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.browser
    }
}

impl<B: Browser> Drop for Session<B> {
    fn drop(&mut self) {
        self.browser.close();
        info!("browser session closed");
    }
}
