use super::{HandlerOutcome, require, store_output};
use crate::browser::Browser;
use crate::context::ExecutionContext;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::Value;

/// CreateWindow: open a new browser window and bind it under `Window`.
pub async fn create_window<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let window = match browser.create_window().await {
        Ok(window) => window,
        Err(err) => {
            out.fail(format!("Failed to create window: {err}"));
            return out;
        }
    };
    out.success(format!("Window created (id {})", window.id));
    store_output(action, ctx, &mut out, binding::WINDOW, Value::Window(window));
    out
}

/// CloseWindow: close the window bound under the mandatory `Window` input.
pub async fn close_window<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(value) = require(action, ctx, binding::WINDOW, &mut out) else {
        return out;
    };
    let Some(window) = value.as_window() else {
        out.fail(format!(
            "Window input is not a window (got {})!",
            value.type_name()
        ));
        return out;
    };
    let id = window.id;
    if let Err(err) = browser.close_window(id).await {
        out.fail(format!("Failed to close window {id}: {err}"));
        return out;
    }
    out.success(format!("Window closed (id {id})"));
    out
}
