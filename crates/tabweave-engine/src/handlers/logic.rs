//! Boolean gates. Inputs are mandatory and missing declarations are fatal,
//! matching the arithmetic family.

use super::{HandlerOutcome, require_bool, store_output};
use crate::context::ExecutionContext;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::Value;

pub fn not(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(input) = require_bool(action, ctx, binding::INPUT, &mut out) else {
        return out;
    };
    store_output(action, ctx, &mut out, binding::OUTPUT, Value::Bool(!input));
    out
}

fn gate(
    action: &Action,
    ctx: &mut ExecutionContext,
    op: impl FnOnce(bool, bool) -> bool,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(first) = require_bool(action, ctx, binding::FIRST, &mut out) else {
        return out;
    };
    let Some(second) = require_bool(action, ctx, binding::SECOND, &mut out) else {
        return out;
    };
    store_output(
        action,
        ctx,
        &mut out,
        binding::RESULT,
        Value::Bool(op(first, second)),
    );
    out
}

pub fn and(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    gate(action, ctx, |a, b| a && b)
}

pub fn or(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    gate(action, ctx, |a, b| a || b)
}
