//! `Browser` capability provider backed by the bridge: every window/tab/page
//! operation becomes a frame serviced by the in-browser glue. HTTP requests
//! are served locally, since this process is the privileged network context.

use crate::server::{Bridge, BridgeError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tabweave_common::protocol::{PageRequest, PageResponse};
use tabweave_common::value::{HttpResponse, TabHandle, WindowHandle};
use tabweave_engine::browser::{Browser, BrowserError};
use tracing::{debug, info};

/// Max polls waiting for the glue to connect before a command fails.
const CONNECT_RETRIES: u32 = 60;
/// Interval between connection polls (60 * 500ms = 30s).
const CONNECT_POLL: Duration = Duration::from_millis(500);
/// Deadline for the glue to answer a single command.
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BridgeBrowser {
    bridge: Bridge,
    http: reqwest::Client,
}

impl BridgeBrowser {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            http: reqwest::Client::new(),
        }
    }

    async fn wait_connected(&self) -> Result<(), BrowserError> {
        if self.bridge.is_connected() {
            return Ok(());
        }
        info!("Waiting for the browser glue to connect...");
        for _ in 0..CONNECT_RETRIES {
            tokio::time::sleep(CONNECT_POLL).await;
            if self.bridge.is_connected() {
                info!("Browser glue connected");
                return Ok(());
            }
        }
        Err(BrowserError::NotConnected)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, BrowserError> {
        self.wait_connected().await?;
        debug!(method, "bridge call");
        let reply = tokio::time::timeout(REPLY_TIMEOUT, self.bridge.request(method, params))
            .await
            .map_err(|_| BrowserError::Other(format!("timed out waiting for {method} reply")))?;
        let value = reply.map_err(|err| match err {
            BridgeError::NotConnected | BridgeError::ConnectionLost => BrowserError::NotConnected,
            other => BrowserError::Other(other.to_string()),
        })?;
        serde_json::from_value(value)
            .map_err(|err| BrowserError::Other(format!("malformed {method} reply: {err}")))
    }
}

#[async_trait]
impl Browser for BridgeBrowser {
    async fn create_window(&mut self) -> Result<WindowHandle, BrowserError> {
        self.call("windows.create", json!({})).await
    }

    async fn close_window(&mut self, window_id: i64) -> Result<(), BrowserError> {
        self.call::<serde_json::Value>("windows.remove", json!({ "windowId": window_id }))
            .await?;
        Ok(())
    }

    async fn create_tab(
        &mut self,
        window_id: i64,
        url: Option<&str>,
    ) -> Result<TabHandle, BrowserError> {
        self.call("tabs.create", json!({ "windowId": window_id, "url": url }))
            .await
    }

    async fn navigate_tab(&mut self, tab_id: i64, url: &str) -> Result<TabHandle, BrowserError> {
        self.call("tabs.update", json!({ "tabId": tab_id, "url": url }))
            .await
    }

    async fn get_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError> {
        self.call("tabs.get", json!({ "tabId": tab_id })).await
    }

    async fn activate_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError> {
        self.call("tabs.activate", json!({ "tabId": tab_id })).await
    }

    async fn active_tab(&mut self) -> Result<TabHandle, BrowserError> {
        self.call("tabs.active", json!({})).await
    }

    async fn fetch(
        &mut self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<HttpResponse, BrowserError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| BrowserError::Http(format!("invalid method: {method}")))?;
        let mut request = self.http.request(method, url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .map_err(|err| BrowserError::Http(err.to_string()))?;

        let status = response.status().as_u16();
        let mut header_map = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                header_map.insert(name.to_string(), value.to_string());
            }
        }
        let body = response
            .text()
            .await
            .map_err(|err| BrowserError::Http(err.to_string()))?;
        Ok(HttpResponse {
            status,
            headers: header_map,
            body,
        })
    }

    async fn dispatch_page(&mut self, request: PageRequest) -> Result<PageResponse, BrowserError> {
        let params = serde_json::to_value(&request)
            .map_err(|err| BrowserError::Page(err.to_string()))?;
        self.call("page.dispatch", params).await
    }
}
