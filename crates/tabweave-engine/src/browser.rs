use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tabweave_common::protocol::{PageRequest, PageResponse};
use tabweave_common::value::{HttpResponse, TabHandle, TabStatus, WindowHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser endpoint is not connected")]
    NotConnected,

    #[error("no such window: {0}")]
    NoSuchWindow(i64),

    #[error("no such tab: {0}")]
    NoSuchTab(i64),

    #[error("no active tab in the current window")]
    NoActiveTab,

    #[error("page dispatch failed: {0}")]
    Page(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

/// The narrow capability interface the engine drives the browser through.
/// Implementations own the actual windows/tabs/network plumbing; the engine
/// only ever sees handles.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new browser window.
    async fn create_window(&mut self) -> Result<WindowHandle, BrowserError>;

    /// Close a window and every tab in it.
    async fn close_window(&mut self, window_id: i64) -> Result<(), BrowserError>;

    /// Open a new tab in a window, optionally navigating it on creation.
    async fn create_tab(
        &mut self,
        window_id: i64,
        url: Option<&str>,
    ) -> Result<TabHandle, BrowserError>;

    /// Point an existing tab at a new location.
    async fn navigate_tab(&mut self, tab_id: i64, url: &str) -> Result<TabHandle, BrowserError>;

    /// Fetch the current state of a tab.
    async fn get_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError>;

    /// Bring a tab to the foreground of its window.
    async fn activate_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError>;

    /// The active tab of the current window.
    async fn active_tab(&mut self) -> Result<TabHandle, BrowserError>;

    /// Issue an HTTP request from the privileged context.
    async fn fetch(
        &mut self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<HttpResponse, BrowserError>;

    /// Round-trip a request to the in-page executor of the request's tab.
    async fn dispatch_page(&mut self, request: PageRequest) -> Result<PageResponse, BrowserError>;
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("deadline exceeded waiting for tab {tab_id} to finish loading ({waited_ms}ms)")]
    DeadlineExceeded { tab_id: i64, waited_ms: u64 },

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Poll a tab until its load status is complete, under a deadline. The
/// deadline keeps a tab that never settles from wedging the whole run.
pub async fn wait_for_tab_complete<B: Browser + ?Sized>(
    browser: &mut B,
    tab_id: i64,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<TabHandle, WaitError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let tab = browser.get_tab(tab_id).await?;
        if tab.status == TabStatus::Complete {
            return Ok(tab);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(WaitError::DeadlineExceeded {
                tab_id,
                waited_ms: timeout.as_millis() as u64,
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
