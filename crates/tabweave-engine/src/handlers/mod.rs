//! The action handler library.
//!
//! Every handler follows the same contract: declared inputs are resolved by
//! matching `Variable::original_name` against a fixed literal, then read out
//! of the context under the variable's unique binding name. A missing
//! mandatory declaration (or a binding with no usable value) logs an Error
//! and marks the action fatal. Missing optional inputs fall back to their
//! documented default with a Warning. Outputs are written back under the
//! declared binding; an undeclared output only warns, because the side
//! effect has already happened.

pub mod http;
pub mod logic;
pub mod math;
pub mod page;
pub mod parse;
pub mod tab;
pub mod wait;
pub mod window;

use crate::context::ExecutionContext;
use std::collections::BTreeMap;
use tabweave_common::codec;
use tabweave_common::protocol::{Action, LogEntry};
use tabweave_common::value::Value;
use tracing::warn;

/// What a handler hands back to the dispatcher: the ordered log lines, the
/// serialized outputs for the action record, and the fatal flag.
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    pub logs: Vec<LogEntry>,
    pub outputs: BTreeMap<String, String>,
    pub fatal: bool,
}

impl HandlerOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::error(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::warning(message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::success(message));
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::info(message));
    }

    /// Log an Error and mark the action fatal.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error(message);
        self.fatal = true;
    }
}

/// Resolve a mandatory input: the declaration must exist and its binding
/// must hold a value. Any miss completes the outcome as fatal.
pub(crate) fn require<'a>(
    action: &Action,
    ctx: &'a ExecutionContext,
    name: &str,
    out: &mut HandlerOutcome,
) -> Option<&'a Value> {
    let Some(var) = action.input(name) else {
        out.fail(format!("{name} input not defined!"));
        return None;
    };
    match ctx.get(&var.name) {
        Some(value) => Some(value),
        None => {
            out.fail(format!("{name} input has no value in context!"));
            None
        }
    }
}

pub(crate) fn require_number(
    action: &Action,
    ctx: &ExecutionContext,
    name: &str,
    out: &mut HandlerOutcome,
) -> Option<f64> {
    let value = require(action, ctx, name, out)?;
    match value.as_number() {
        Some(n) => Some(n),
        None => {
            out.fail(format!(
                "{name} input is not a number (got {})!",
                value.type_name()
            ));
            None
        }
    }
}

pub(crate) fn require_bool(
    action: &Action,
    ctx: &ExecutionContext,
    name: &str,
    out: &mut HandlerOutcome,
) -> Option<bool> {
    let value = require(action, ctx, name, out)?;
    match value.as_bool() {
        Some(b) => Some(b),
        None => {
            out.fail(format!(
                "{name} input is not a boolean (got {})!",
                value.type_name()
            ));
            None
        }
    }
}

pub(crate) fn require_string<'a>(
    action: &Action,
    ctx: &'a ExecutionContext,
    name: &str,
    out: &mut HandlerOutcome,
) -> Option<&'a str> {
    let value = require(action, ctx, name, out)?;
    match value.as_str() {
        Some(s) => Some(s),
        None => {
            out.fail(format!(
                "{name} input is not a string (got {})!",
                value.type_name()
            ));
            None
        }
    }
}

/// Read an optional input's bound value, if the declaration exists at all.
pub(crate) fn optional<'a>(
    action: &Action,
    ctx: &'a ExecutionContext,
    name: &str,
) -> Option<&'a Value> {
    let var = action.input(name)?;
    ctx.get(&var.name)
}

/// Write a handler result under its declared output binding. The value
/// enters the live context and, serialized, the action record. An absent
/// declaration discards the value with a Warning.
pub(crate) fn store_output(
    action: &Action,
    ctx: &mut ExecutionContext,
    out: &mut HandlerOutcome,
    name: &str,
    value: Value,
) {
    let Some(var) = action.output(name) else {
        out.warning(format!("{name} output not defined!"));
        return;
    };
    match codec::encode(&value) {
        Ok(raw) => {
            out.outputs.insert(var.name.clone(), raw);
        }
        Err(err) => {
            warn!(binding = %var.name, %err, "failed to serialize output");
            out.warning(format!("{name} output could not be serialized"));
        }
    }
    ctx.insert(var.name.clone(), value);
    out.success(format!("{name} saved to output variable"));
}
