//! The in-page dispatcher: a mirror of the dispatch table for DOM-touching
//! actions. It runs inside the page, exchanges only serialized data with the
//! privileged side, and never mutates the caller's context directly.

use crate::dom::{Dom, NodeId};
use std::collections::{BTreeMap, HashMap};
use tabweave_common::codec;
use tabweave_common::protocol::{
    Action, ActionKind, LogEntry, PageRequest, PageResponse, binding,
};
use tabweave_common::value::{ElementHandle, Value};
use tracing::debug;

/// Executes page-bound actions against a document, keeping the registry of
/// element labels handed out by find actions.
pub struct PageExecutor<D> {
    dom: D,
    labels: HashMap<u64, NodeId>,
    next_label: u64,
}

impl<D: Dom> PageExecutor<D> {
    pub fn new(dom: D) -> Self {
        Self {
            dom,
            labels: HashMap::new(),
            next_label: 0,
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    pub fn execute(&mut self, request: &PageRequest) -> PageResponse {
        debug!(action = %request.action.kind, "page executor received action");
        match &request.action.kind {
            ActionKind::ClickElement => self.click_element(request),
            ActionKind::ReadElementText => self.read_element_text(request),
            ActionKind::WriteElementText => self.write_element_text(request),
            ActionKind::FindElementBySelector => self.find_element(request),
            ActionKind::FindElementsBySelector => self.find_elements(request),
            other => PageResponse {
                action_logs: vec![LogEntry::warning(format!(
                    "No page handler for {other} action"
                ))],
                action_outputs: BTreeMap::new(),
            },
        }
    }

    /// Decode a declared input out of the serialized request context.
    fn input_value(&self, request: &PageRequest, name: &str) -> Option<Value> {
        let var = request.action.input(name)?;
        let raw = request.context.get(&var.name)?;
        codec::decode(&var.ty, raw).ok()
    }

    fn resolve_element(
        &self,
        request: &PageRequest,
        logs: &mut Vec<LogEntry>,
    ) -> Option<NodeId> {
        let Some(value) = self.input_value(request, binding::ELEMENT) else {
            logs.push(LogEntry::error("Element input not defined!"));
            return None;
        };
        let Some(handle) = value.as_element().copied() else {
            logs.push(LogEntry::error(format!(
                "Element input is not an element (got {})!",
                value.type_name()
            )));
            return None;
        };
        match self.labels.get(&handle.element_id) {
            Some(node) => Some(*node),
            None => {
                logs.push(LogEntry::error(format!(
                    "Unknown element label {}!",
                    handle.element_id
                )));
                None
            }
        }
    }

    fn label_for(&mut self, node: NodeId, tab_id: i64) -> ElementHandle {
        self.next_label += 1;
        self.labels.insert(self.next_label, node);
        ElementHandle {
            tab_id,
            element_id: self.next_label,
        }
    }

    fn click_element(&mut self, request: &PageRequest) -> PageResponse {
        let mut logs = Vec::new();
        let outputs = BTreeMap::new();
        if let Some(node) = self.resolve_element(request, &mut logs) {
            self.dom.click(node);
            logs.push(LogEntry::success("Element clicked"));
        }
        PageResponse {
            action_logs: logs,
            action_outputs: outputs,
        }
    }

    fn read_element_text(&mut self, request: &PageRequest) -> PageResponse {
        let mut logs = Vec::new();
        let mut outputs = BTreeMap::new();
        if let Some(node) = self.resolve_element(request, &mut logs) {
            // An input's current value wins over rendered text.
            let content = match self.dom.input_value(node) {
                Some(value) => value,
                None => self.dom.text(node),
            };
            store(
                &request.action,
                &mut logs,
                &mut outputs,
                binding::ELEMENT_TEXT,
                &Value::String(content),
            );
        }
        PageResponse {
            action_logs: logs,
            action_outputs: outputs,
        }
    }

    fn write_element_text(&mut self, request: &PageRequest) -> PageResponse {
        let mut logs = Vec::new();
        let mut outputs = BTreeMap::new();
        let Some(node) = self.resolve_element(request, &mut logs) else {
            return PageResponse {
                action_logs: logs,
                action_outputs: outputs,
            };
        };
        let Some(text) = self
            .input_value(request, binding::TEXT)
            .and_then(|value| value.as_str().map(str::to_string))
        else {
            logs.push(LogEntry::error("Text input not defined!"));
            return PageResponse {
                action_logs: logs,
                action_outputs: outputs,
            };
        };

        let is_input = self.dom.is_text_input(node);
        if is_input {
            self.dom.set_input_value(node, &text);
            logs.push(LogEntry::success("Text written to element"));
        } else {
            logs.push(LogEntry::warning(
                "Element is not a text input; nothing was written",
            ));
        }
        store(
            &request.action,
            &mut logs,
            &mut outputs,
            binding::IS_INPUT,
            &Value::Bool(is_input),
        );
        PageResponse {
            action_logs: logs,
            action_outputs: outputs,
        }
    }

    fn find_elements(&mut self, request: &PageRequest) -> PageResponse {
        let mut logs = Vec::new();
        let mut outputs = BTreeMap::new();
        let Some(query) = self.selector_query(request, &mut logs) else {
            return PageResponse {
                action_logs: logs,
                action_outputs: outputs,
            };
        };

        let nodes = self.dom.query_all(&query);
        logs.push(LogEntry::info(format!(
            "Found {} element(s) matching {query}",
            nodes.len()
        )));
        let handles: Vec<ElementHandle> = nodes
            .into_iter()
            .map(|node| {
                self.dom.mark(node);
                self.label_for(node, request.tab_id)
            })
            .collect();
        let count = handles.len();

        store(
            &request.action,
            &mut logs,
            &mut outputs,
            binding::ELEMENTS,
            &Value::Elements(handles),
        );
        store(
            &request.action,
            &mut logs,
            &mut outputs,
            binding::COUNT,
            &Value::Number(count as f64),
        );
        PageResponse {
            action_logs: logs,
            action_outputs: outputs,
        }
    }

    fn find_element(&mut self, request: &PageRequest) -> PageResponse {
        let mut logs = Vec::new();
        let mut outputs = BTreeMap::new();
        let Some(query) = self.selector_query(request, &mut logs) else {
            return PageResponse {
                action_logs: logs,
                action_outputs: outputs,
            };
        };

        match self.dom.query_all(&query).into_iter().next() {
            Some(node) => {
                self.dom.mark(node);
                let handle = self.label_for(node, request.tab_id);
                store(
                    &request.action,
                    &mut logs,
                    &mut outputs,
                    binding::ELEMENT,
                    &Value::Element(handle),
                );
            }
            None => logs.push(LogEntry::warning(format!("No element matched {query}"))),
        }
        PageResponse {
            action_logs: logs,
            action_outputs: outputs,
        }
    }

    fn selector_query(&self, request: &PageRequest, logs: &mut Vec<LogEntry>) -> Option<String> {
        let Some(value) = self.input_value(request, binding::SELECTOR) else {
            logs.push(LogEntry::error("Selector input not defined!"));
            return None;
        };
        let Some(selector) = value.as_selector() else {
            logs.push(LogEntry::error(format!(
                "Selector input is not a selector (got {})!",
                value.type_name()
            )));
            return None;
        };
        Some(selector.to_query_string())
    }
}

/// Write a page-side result under its declared output binding, serialized
/// for the reply. Mirrors the privileged side's output contract.
fn store(
    action: &Action,
    logs: &mut Vec<LogEntry>,
    outputs: &mut BTreeMap<String, String>,
    name: &str,
    value: &Value,
) {
    let Some(var) = action.output(name) else {
        logs.push(LogEntry::warning(format!("{name} output not defined!")));
        return;
    };
    match codec::encode(value) {
        Ok(raw) => {
            outputs.insert(var.name.clone(), raw);
            logs.push(LogEntry::success(format!("{name} saved to output variable")));
        }
        Err(err) => logs.push(LogEntry::warning(format!(
            "{name} output could not be serialized: {err}"
        ))),
    }
}
