//! Parsing actions. Parse failure is representable through the
//! `Converted Successfully` output, so it never fails the action.

use super::{HandlerOutcome, require_string, store_output};
use crate::context::ExecutionContext;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::Value;
use url::Url;

/// ParseNumber: parse the mandatory `String` input into a number. On
/// success both `Number` and the flag are written; on failure only the flag.
pub fn parse_number(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(raw) = require_string(action, ctx, binding::STRING, &mut out) else {
        return out;
    };
    match raw.trim().parse::<f64>() {
        Ok(number) => {
            store_output(action, ctx, &mut out, binding::NUMBER, Value::Number(number));
            store_output(action, ctx, &mut out, binding::CONVERTED, Value::Bool(true));
        }
        Err(_) => {
            out.warning(format!("\"{raw}\" could not be parsed as a number"));
            store_output(action, ctx, &mut out, binding::CONVERTED, Value::Bool(false));
        }
    }
    out
}

/// ParseURL: validate the mandatory `String` input as a URL. The string
/// passes through unchanged either way; the flag records the verdict.
pub fn parse_url(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(raw) = require_string(action, ctx, binding::STRING, &mut out) else {
        return out;
    };
    let raw = raw.to_string();
    let converted = Url::parse(&raw).is_ok();
    if !converted {
        out.warning(format!("\"{raw}\" is not a valid URL"));
    }
    store_output(action, ctx, &mut out, binding::URL, Value::String(raw));
    store_output(
        action,
        ctx,
        &mut out,
        binding::CONVERTED,
        Value::Bool(converted),
    );
    out
}
