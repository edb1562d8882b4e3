#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use tabweave_common::protocol::{
    Action, ActionKind, ActionResult, LogLevel, PageRequest, PageResponse, Pipeline, Sequence,
    Variable,
};
use tabweave_common::value::{HttpResponse, TabHandle, TabStatus, WindowHandle};
use tabweave_engine::browser::{Browser, BrowserError};
use tabweave_page::channel::PageHandle;

pub struct RecordedFetch {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// Scripted browser capability provider: windows and tabs are plain state,
/// HTTP responses are canned, and page dispatch either goes to a wired
/// in-page executor or to queued responses.
pub struct MockBrowser {
    pub next_window: i64,
    pub next_tab: i64,
    pub windows: Vec<i64>,
    pub closed_windows: Vec<i64>,
    pub tabs: BTreeMap<i64, TabHandle>,
    pub active: Option<i64>,
    /// When set, tabs never reach the complete status.
    pub stuck_loading: bool,
    pub fetches: Vec<RecordedFetch>,
    pub http_response: HttpResponse,
    pub page: Option<PageHandle>,
    pub page_responses: VecDeque<PageResponse>,
    pub page_requests: Vec<PageRequest>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self {
            next_window: 0,
            next_tab: 0,
            windows: Vec::new(),
            closed_windows: Vec::new(),
            tabs: BTreeMap::new(),
            active: None,
            stuck_loading: false,
            fetches: Vec::new(),
            http_response: HttpResponse {
                status: 200,
                headers: BTreeMap::new(),
                body: "ok".to_string(),
            },
            page: None,
            page_responses: VecDeque::new(),
            page_requests: Vec::new(),
        }
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_status(&self) -> TabStatus {
        if self.stuck_loading {
            TabStatus::Loading
        } else {
            TabStatus::Complete
        }
    }

    /// Seed a tab without going through CreateTab.
    pub fn seed_tab(&mut self, id: i64, window_id: i64, url: &str) -> TabHandle {
        let tab = TabHandle {
            id,
            window_id,
            url: Some(url.to_string()),
            status: self.load_status(),
            active: false,
        };
        self.tabs.insert(id, tab.clone());
        self.next_tab = self.next_tab.max(id);
        tab
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn create_window(&mut self) -> Result<WindowHandle, BrowserError> {
        self.next_window += 1;
        self.windows.push(self.next_window);
        Ok(WindowHandle {
            id: self.next_window,
        })
    }

    async fn close_window(&mut self, window_id: i64) -> Result<(), BrowserError> {
        let Some(at) = self.windows.iter().position(|id| *id == window_id) else {
            return Err(BrowserError::NoSuchWindow(window_id));
        };
        self.windows.remove(at);
        self.closed_windows.push(window_id);
        Ok(())
    }

    async fn create_tab(
        &mut self,
        window_id: i64,
        url: Option<&str>,
    ) -> Result<TabHandle, BrowserError> {
        if !self.windows.contains(&window_id) {
            return Err(BrowserError::NoSuchWindow(window_id));
        }
        self.next_tab += 1;
        let tab = TabHandle {
            id: self.next_tab,
            window_id,
            url: url.map(str::to_string),
            status: self.load_status(),
            active: false,
        };
        self.tabs.insert(tab.id, tab.clone());
        Ok(tab)
    }

    async fn navigate_tab(&mut self, tab_id: i64, url: &str) -> Result<TabHandle, BrowserError> {
        let status = self.load_status();
        let Some(tab) = self.tabs.get_mut(&tab_id) else {
            return Err(BrowserError::NoSuchTab(tab_id));
        };
        tab.url = Some(url.to_string());
        tab.status = status;
        Ok(tab.clone())
    }

    async fn get_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError> {
        self.tabs
            .get(&tab_id)
            .cloned()
            .ok_or(BrowserError::NoSuchTab(tab_id))
    }

    async fn activate_tab(&mut self, tab_id: i64) -> Result<TabHandle, BrowserError> {
        if !self.tabs.contains_key(&tab_id) {
            return Err(BrowserError::NoSuchTab(tab_id));
        }
        for tab in self.tabs.values_mut() {
            tab.active = tab.id == tab_id;
        }
        self.active = Some(tab_id);
        Ok(self.tabs[&tab_id].clone())
    }

    async fn active_tab(&mut self) -> Result<TabHandle, BrowserError> {
        self.active
            .and_then(|id| self.tabs.get(&id))
            .cloned()
            .ok_or(BrowserError::NoActiveTab)
    }

    async fn fetch(
        &mut self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<HttpResponse, BrowserError> {
        self.fetches.push(RecordedFetch {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
        });
        Ok(self.http_response.clone())
    }

    async fn dispatch_page(&mut self, request: PageRequest) -> Result<PageResponse, BrowserError> {
        self.page_requests.push(request.clone());
        if let Some(page) = &self.page {
            return page
                .request(request)
                .await
                .map_err(|err| BrowserError::Page(err.to_string()));
        }
        Ok(self.page_responses.pop_front().unwrap_or_default())
    }
}

pub fn var(original_name: &str, name: &str, ty: &str) -> Variable {
    Variable::new(original_name, name, ty)
}

pub fn action(kind: ActionKind, inputs: Vec<Variable>, outputs: Vec<Variable>) -> Action {
    Action {
        kind,
        inputs,
        outputs,
    }
}

pub fn pipeline(actions: Vec<Action>, context: &[(&str, &str)]) -> Pipeline {
    Pipeline {
        id: "pipeline-1".to_string(),
        sequence: Sequence {
            id: "sequence-1".to_string(),
            name: "test sequence".to_string(),
            description: String::new(),
            actions,
        },
        context: context
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        is_running: false,
        is_finished: false,
    }
}

pub fn count_level(result: &ActionResult, level: LogLevel) -> usize {
    result
        .action_logs
        .iter()
        .filter(|entry| entry.level == level)
        .count()
}
