use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Handle to a browser window owned by the capability provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowHandle {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Unloaded,
    #[default]
    Loading,
    Complete,
}

/// Handle to a browser tab. Mirrors the fields the engine actually reads;
/// `window_id` is mandatory so a bare `{id}` object stays a window handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabHandle {
    pub id: i64,
    pub window_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub status: TabStatus,
    #[serde(default)]
    pub active: bool,
}

/// Opaque label for a DOM element located by a prior find action. The owning
/// tab travels with the element id, so later in-page actions can be routed
/// without a separate `Tab` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHandle {
    pub tab_id: i64,
    pub element_id: u64,
}

/// Raw response captured by the HttpRequest action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
}

/// A value living in the execution context. Serializes as plain JSON; the
/// untagged order resolves handle shapes by their mandatory fields (tabs
/// before windows, element lists before single elements).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Elements(Vec<ElementHandle>),
    Element(ElementHandle),
    Tab(TabHandle),
    Window(WindowHandle),
    Selector(Selector),
    Response(HttpResponse),
    Json(serde_json::Value),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Elements(_) => "elements",
            Value::Element(_) => "element",
            Value::Tab(_) => "tab",
            Value::Window(_) => "window",
            Value::Selector(_) => "selector",
            Value::Response(_) => "response",
            Value::Json(_) => "json",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_window(&self) -> Option<&WindowHandle> {
        match self {
            Value::Window(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_tab(&self) -> Option<&TabHandle> {
        match self {
            Value::Tab(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementHandle> {
        match self {
            Value::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_elements(&self) -> Option<&[ElementHandle]> {
        match self {
            Value::Elements(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_selector(&self) -> Option<&Selector> {
        match self {
            Value::Selector(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&HttpResponse> {
        match self {
            Value::Response(r) => Some(r),
            _ => None,
        }
    }

    /// The tab an element-bearing value is anchored to, if any.
    pub fn owning_tab(&self) -> Option<i64> {
        match self {
            Value::Element(e) => Some(e.tab_id),
            Value::Elements(es) => es.first().map(|e| e.tab_id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<WindowHandle> for Value {
    fn from(v: WindowHandle) -> Self {
        Value::Window(v)
    }
}

impl From<TabHandle> for Value {
    fn from(v: TabHandle) -> Self {
        Value::Tab(v)
    }
}

impl From<ElementHandle> for Value {
    fn from(v: ElementHandle) -> Self {
        Value::Element(v)
    }
}

impl From<Vec<ElementHandle>> for Value {
    fn from(v: Vec<ElementHandle>) -> Self {
        Value::Elements(v)
    }
}

impl From<Selector> for Value {
    fn from(v: Selector) -> Self {
        Value::Selector(v)
    }
}

impl From<HttpResponse> for Value {
    fn from(v: HttpResponse) -> Self {
        Value::Response(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        serde_json::from_value(v.clone()).unwrap_or(Value::Json(v))
    }
}
