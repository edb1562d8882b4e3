use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known binding names handlers resolve against `Variable::original_name`.
pub mod binding {
    pub const WINDOW: &str = "Window";
    pub const TAB: &str = "Tab";
    pub const URL: &str = "Url";
    pub const METHOD: &str = "Method";
    pub const HEADERS: &str = "Headers";
    pub const RESPONSE: &str = "Response";
    pub const SELECTOR: &str = "Selector";
    pub const ELEMENT: &str = "Element";
    pub const ELEMENTS: &str = "Elements";
    pub const COUNT: &str = "Count";
    pub const ELEMENT_TEXT: &str = "Element Text";
    pub const TEXT: &str = "Text";
    pub const IS_INPUT: &str = "Is Input";
    pub const SUBTRACT_FROM: &str = "Subtract From";
    pub const TO_SUBTRACT: &str = "To Subtract";
    pub const DIFFERENCE: &str = "Difference";
    pub const FIRST_NUMBER: &str = "First Number";
    pub const SECOND_NUMBER: &str = "Second Number";
    pub const SUM: &str = "Sum";
    pub const PRODUCT: &str = "Product";
    pub const DIVIDEND: &str = "Dividend";
    pub const DIVISOR: &str = "Divisor";
    pub const QUOTIENT: &str = "Quotient";
    pub const INPUT: &str = "Input";
    pub const OUTPUT: &str = "Output";
    pub const FIRST: &str = "First";
    pub const SECOND: &str = "Second";
    pub const RESULT: &str = "Result";
    pub const STRING: &str = "String";
    pub const NUMBER: &str = "Number";
    pub const CONVERTED: &str = "Converted Successfully";
    pub const MILLISECONDS: &str = "Milliseconds";
    pub const CONDITION: &str = "Condition";
}

/// A named, typed slot an action reads from or writes into the context.
///
/// `original_name` is the semantic name a handler matches on ("Tab", "Url");
/// `name` is the globally-unique context key within one sequence run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub original_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl Variable {
    pub fn new(
        original_name: impl Into<String>,
        name: impl Into<String>,
        ty: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            name: name.into(),
            ty: ty.into(),
            optional: false,
            default_value: None,
        }
    }
}

/// Every opcode the engine understands. Strings outside the closed set are
/// carried as `Custom` and forwarded to the in-page dispatcher unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateWindow,
    CloseWindow,
    CreateTab,
    NavigateToUrl,
    HttpRequest,
    Subtract,
    Addition,
    Multiply,
    Divide,
    Not,
    And,
    Or,
    ParseNumber,
    ParseUrl,
    WaitForMilliseconds,
    WaitForTabToLoad,
    Goto,
    FindElementBySelector,
    FindElementsBySelector,
    ClickElement,
    ReadElementText,
    WriteElementText,
    Custom(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::CreateWindow => "CreateWindow",
            ActionKind::CloseWindow => "CloseWindow",
            ActionKind::CreateTab => "CreateTab",
            ActionKind::NavigateToUrl => "NavigateToURL",
            ActionKind::HttpRequest => "HttpRequest",
            ActionKind::Subtract => "Subtract",
            ActionKind::Addition => "Addition",
            ActionKind::Multiply => "Multiply",
            ActionKind::Divide => "Divide",
            ActionKind::Not => "Not",
            ActionKind::And => "And",
            ActionKind::Or => "Or",
            ActionKind::ParseNumber => "ParseNumber",
            ActionKind::ParseUrl => "ParseURL",
            ActionKind::WaitForMilliseconds => "WaitForMilliseconds",
            ActionKind::WaitForTabToLoad => "WaitForTabToLoad",
            ActionKind::Goto => "Goto",
            ActionKind::FindElementBySelector => "FindElementBySelector",
            ActionKind::FindElementsBySelector => "FindElementsBySelector",
            ActionKind::ClickElement => "ClickElement",
            ActionKind::ReadElementText => "ReadElementText",
            ActionKind::WriteElementText => "WriteElementText",
            ActionKind::Custom(s) => s,
        }
    }

    /// Whether dispatch crosses into the in-page executor. Unrecognized
    /// opcodes are page-bound by convention.
    pub fn runs_in_page(&self) -> bool {
        matches!(
            self,
            ActionKind::FindElementBySelector
                | ActionKind::FindElementsBySelector
                | ActionKind::ClickElement
                | ActionKind::ReadElementText
                | ActionKind::WriteElementText
                | ActionKind::Custom(_)
        )
    }
}

impl From<&str> for ActionKind {
    fn from(s: &str) -> Self {
        match s {
            "CreateWindow" => ActionKind::CreateWindow,
            "CloseWindow" => ActionKind::CloseWindow,
            "CreateTab" => ActionKind::CreateTab,
            "NavigateToURL" => ActionKind::NavigateToUrl,
            "HttpRequest" => ActionKind::HttpRequest,
            "Subtract" => ActionKind::Subtract,
            "Addition" => ActionKind::Addition,
            "Multiply" => ActionKind::Multiply,
            "Divide" => ActionKind::Divide,
            "Not" => ActionKind::Not,
            "And" => ActionKind::And,
            "Or" => ActionKind::Or,
            "ParseNumber" => ActionKind::ParseNumber,
            "ParseURL" => ActionKind::ParseUrl,
            "WaitForMilliseconds" => ActionKind::WaitForMilliseconds,
            "WaitForTabToLoad" => ActionKind::WaitForTabToLoad,
            "Goto" => ActionKind::Goto,
            "FindElementBySelector" => ActionKind::FindElementBySelector,
            "FindElementsBySelector" => ActionKind::FindElementsBySelector,
            "ClickElement" => ActionKind::ClickElement,
            "ReadElementText" => ActionKind::ReadElementText,
            "WriteElementText" => ActionKind::WriteElementText,
            other => ActionKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ActionKind::from(s.as_str()))
    }
}

/// One instruction in a sequence: an opcode plus declared input/output slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "actionString")]
    pub kind: ActionKind,
    #[serde(default)]
    pub inputs: Vec<Variable>,
    #[serde(default)]
    pub outputs: Vec<Variable>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Look up a declared input by its semantic name.
    pub fn input(&self, original_name: &str) -> Option<&Variable> {
        self.inputs.iter().find(|v| v.original_name == original_name)
    }

    /// Look up a declared output by its semantic name.
    pub fn output(&self, original_name: &str) -> Option<&Variable> {
        self.outputs.iter().find(|v| v.original_name == original_name)
    }
}

/// An ordered, index-addressable program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A server-queued unit of work: a sequence plus its initial context, with
/// every context value carried as a serialized string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    pub sequence: Sequence,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warning,
    Success,
    Info,
}

/// A single `{key, value}` log line inside an action result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "key")]
    pub level: LogLevel,
    #[serde(rename = "value")]
    pub message: String,
}

impl LogEntry {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Warning,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }
}

/// The record of one executed action: the serialized input snapshot, the
/// ordered logs, the serialized outputs and the timing window. Never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action: Action,
    #[serde(default)]
    pub action_context: BTreeMap<String, String>,
    #[serde(default)]
    pub action_logs: Vec<LogEntry>,
    #[serde(default)]
    pub action_outputs: BTreeMap<String, String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

/// The run report for one pipeline, sealed when `end_at` is stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResult {
    pub id: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub results: Vec<ActionResult>,
}

/// Request sent from the privileged dispatcher to the in-page executor.
/// Context values cross the boundary as serialized strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub action: Action,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    pub tab_id: i64,
}

/// Reply from the in-page executor; output values are serialized strings that
/// must be decoded before re-entering the live context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default)]
    pub action_logs: Vec<LogEntry>,
    #[serde(default)]
    pub action_outputs: BTreeMap<String, String>,
}
