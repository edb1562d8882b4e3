//! The serialize/deserialize boundary.
//!
//! Every value crossing a process edge (pipeline initial context, in-page
//! request context, in-page reply outputs) travels as a JSON string. Decoding
//! is checked against the declared `Variable` type tag; an unknown tag falls
//! back to shape-based interpretation.

use crate::selector::Selector;
use crate::value::{ElementHandle, HttpResponse, TabHandle, Value, WindowHandle};
use thiserror::Error;

/// Declared type tags understood by the codec.
pub mod type_tag {
    pub const NUMBER: &str = "number";
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const WINDOW: &str = "window";
    pub const TAB: &str = "tab";
    pub const ELEMENT: &str = "element";
    pub const ELEMENTS: &str = "elements";
    pub const SELECTOR: &str = "selector";
    pub const RESPONSE: &str = "response";
    pub const JSON: &str = "json";
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to decode value as {ty}: {source}")]
    Decode {
        ty: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Serialize a context value for transport.
pub fn encode(value: &Value) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(CodecError::Encode)
}

/// Deserialize a transported value, checked against the declared type tag.
pub fn decode(ty: &str, raw: &str) -> Result<Value, CodecError> {
    let wrap = |source| CodecError::Decode {
        ty: ty.to_string(),
        source,
    };
    match ty.to_ascii_lowercase().as_str() {
        type_tag::NUMBER => serde_json::from_str::<f64>(raw)
            .map(Value::Number)
            .map_err(wrap),
        type_tag::STRING | "text" => serde_json::from_str::<String>(raw)
            .map(Value::String)
            .map_err(wrap),
        type_tag::BOOLEAN | "bool" => serde_json::from_str::<bool>(raw)
            .map(Value::Bool)
            .map_err(wrap),
        type_tag::WINDOW => serde_json::from_str::<WindowHandle>(raw)
            .map(Value::Window)
            .map_err(wrap),
        type_tag::TAB => serde_json::from_str::<TabHandle>(raw)
            .map(Value::Tab)
            .map_err(wrap),
        type_tag::ELEMENT => serde_json::from_str::<ElementHandle>(raw)
            .map(Value::Element)
            .map_err(wrap),
        type_tag::ELEMENTS => serde_json::from_str::<Vec<ElementHandle>>(raw)
            .map(Value::Elements)
            .map_err(wrap),
        type_tag::SELECTOR => serde_json::from_str::<Selector>(raw)
            .map(Value::Selector)
            .map_err(wrap),
        type_tag::RESPONSE => serde_json::from_str::<HttpResponse>(raw)
            .map(Value::Response)
            .map_err(wrap),
        _ => decode_untyped(raw),
    }
}

/// Deserialize without a declared tag, resolving the shape structurally.
/// Used for pipeline initial contexts, which carry no type information.
pub fn decode_untyped(raw: &str) -> Result<Value, CodecError> {
    serde_json::from_str::<Value>(raw).map_err(|source| CodecError::Decode {
        ty: "untyped".to_string(),
        source,
    })
}
