//! Arithmetic actions. Both operands are mandatory; results follow IEEE-754,
//! so a zero divisor produces an infinity or NaN rather than failing the
//! action (the Warning marks where it entered the run).

use super::{HandlerOutcome, require_number, store_output};
use crate::context::ExecutionContext;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::Value;

fn binary_op(
    action: &Action,
    ctx: &mut ExecutionContext,
    lhs_name: &str,
    rhs_name: &str,
    output_name: &str,
    op: impl FnOnce(f64, f64) -> f64,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(lhs) = require_number(action, ctx, lhs_name, &mut out) else {
        return out;
    };
    let Some(rhs) = require_number(action, ctx, rhs_name, &mut out) else {
        return out;
    };
    let result = op(lhs, rhs);
    store_output(action, ctx, &mut out, output_name, Value::Number(result));
    out
}

pub fn subtract(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    binary_op(
        action,
        ctx,
        binding::SUBTRACT_FROM,
        binding::TO_SUBTRACT,
        binding::DIFFERENCE,
        |a, b| a - b,
    )
}

pub fn addition(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    binary_op(
        action,
        ctx,
        binding::FIRST_NUMBER,
        binding::SECOND_NUMBER,
        binding::SUM,
        |a, b| a + b,
    )
}

pub fn multiply(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    binary_op(
        action,
        ctx,
        binding::FIRST_NUMBER,
        binding::SECOND_NUMBER,
        binding::PRODUCT,
        |a, b| a * b,
    )
}

pub fn divide(action: &Action, ctx: &mut ExecutionContext) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(dividend) = require_number(action, ctx, binding::DIVIDEND, &mut out) else {
        return out;
    };
    let Some(divisor) = require_number(action, ctx, binding::DIVISOR, &mut out) else {
        return out;
    };
    if divisor == 0.0 {
        out.warning("Divisor is zero; the quotient will not be a finite number");
    }
    store_output(
        action,
        ctx,
        &mut out,
        binding::QUOTIENT,
        Value::Number(dividend / divisor),
    );
    out
}
