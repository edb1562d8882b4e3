//! Cross-context dispatch: actions that touch the DOM are forwarded to the
//! in-page executor of their target tab. The whole context crosses the
//! boundary serialized; reply outputs come back serialized and are decoded
//! against the declared output types before re-entering the live context.

use super::{HandlerOutcome, require};
use crate::browser::{Browser, WaitError, wait_for_tab_complete};
use crate::context::ExecutionContext;
use crate::executor::EngineConfig;
use tabweave_common::codec;
use tabweave_common::protocol::{Action, ActionKind, PageRequest, binding};
use tracing::debug;

/// Check the mandatory declarations of the known page opcodes before paying
/// for the round trip. Unrecognized opcodes have no known contract and are
/// forwarded as-is.
fn check_mandatory(
    action: &Action,
    ctx: &ExecutionContext,
    out: &mut HandlerOutcome,
) -> bool {
    let ok = match &action.kind {
        ActionKind::FindElementBySelector | ActionKind::FindElementsBySelector => {
            match require(action, ctx, binding::SELECTOR, out) {
                Some(value) if value.as_selector().is_some() => true,
                Some(value) => {
                    out.fail(format!(
                        "Selector input is not a selector (got {})!",
                        value.type_name()
                    ));
                    false
                }
                None => false,
            }
        }
        ActionKind::ClickElement | ActionKind::ReadElementText => {
            element_input_ok(action, ctx, out)
        }
        ActionKind::WriteElementText => {
            element_input_ok(action, ctx, out)
                && match require(action, ctx, binding::TEXT, out) {
                    Some(value) if value.as_str().is_some() => true,
                    Some(value) => {
                        out.fail(format!(
                            "Text input is not a string (got {})!",
                            value.type_name()
                        ));
                        false
                    }
                    None => false,
                }
        }
        _ => true,
    };
    ok
}

fn element_input_ok(
    action: &Action,
    ctx: &ExecutionContext,
    out: &mut HandlerOutcome,
) -> bool {
    match require(action, ctx, binding::ELEMENT, out) {
        Some(value) if value.as_element().is_some() => true,
        Some(value) => {
            out.fail(format!(
                "Element input is not an element (got {})!",
                value.type_name()
            ));
            false
        }
        None => false,
    }
}

/// Resolve the tab the request should land in: a declared `Tab` input wins,
/// then the owning tab carried by any element-bearing input, then the
/// active tab of the current window.
async fn resolve_tab<B: Browser + ?Sized>(
    action: &Action,
    ctx: &ExecutionContext,
    browser: &mut B,
) -> Result<i64, String> {
    if let Some(var) = action.input(binding::TAB)
        && let Some(tab) = ctx.get(&var.name).and_then(|value| value.as_tab())
    {
        return Ok(tab.id);
    }
    for input in &action.inputs {
        if let Some(tab_id) = ctx.get(&input.name).and_then(|value| value.owning_tab()) {
            return Ok(tab_id);
        }
    }
    browser
        .active_tab()
        .await
        .map(|tab| tab.id)
        .map_err(|err| format!("No target tab available: {err}"))
}

/// Forward an action to the in-page executor and fold its reply back into
/// the run.
pub async fn page_action<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
    config: &EngineConfig,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    if !check_mandatory(action, ctx, &mut out) {
        return out;
    }

    let tab_id = match resolve_tab(action, ctx, browser).await {
        Ok(tab_id) => tab_id,
        Err(message) => {
            out.fail(message);
            return out;
        }
    };

    // The target must be frontmost and settled before the page sees the
    // request.
    if let Err(err) = browser.activate_tab(tab_id).await {
        out.fail(format!("Failed to activate tab {tab_id}: {err}"));
        return out;
    }
    match wait_for_tab_complete(
        browser,
        tab_id,
        config.tab_load_timeout,
        config.tab_poll_interval,
    )
    .await
    {
        Ok(_) => {}
        Err(err @ WaitError::DeadlineExceeded { .. }) => {
            out.fail(err.to_string());
            return out;
        }
        Err(WaitError::Browser(err)) => {
            out.fail(format!("Failed to read tab state: {err}"));
            return out;
        }
    }

    let request = PageRequest {
        action: action.clone(),
        context: ctx.serialize_all(),
        tab_id,
    };
    debug!(action = %action.kind, tab_id, "dispatching action to page");
    let response = match browser.dispatch_page(request).await {
        Ok(response) => response,
        Err(err) => {
            out.fail(format!("Page dispatch failed: {err}"));
            return out;
        }
    };

    out.logs.extend(response.action_logs);

    for output in &action.outputs {
        let Some(raw) = response.action_outputs.get(&output.name) else {
            out.warning(format!(
                "{} output not provided by the page",
                output.original_name
            ));
            continue;
        };
        match codec::decode(&output.ty, raw) {
            Ok(value) => {
                out.outputs.insert(output.name.clone(), raw.clone());
                ctx.insert(output.name.clone(), value);
            }
            Err(err) => {
                out.warning(format!(
                    "{} output could not be decoded: {err}",
                    output.original_name
                ));
            }
        }
    }
    out
}
