use super::{HandlerOutcome, optional, require, store_output};
use crate::browser::{Browser, WaitError, wait_for_tab_complete};
use crate::context::ExecutionContext;
use crate::executor::EngineConfig;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::{TabHandle, Value};

fn require_tab(
    action: &Action,
    ctx: &ExecutionContext,
    out: &mut HandlerOutcome,
) -> Option<TabHandle> {
    let value = require(action, ctx, binding::TAB, out)?;
    match value.as_tab() {
        Some(tab) => Some(tab.clone()),
        None => {
            out.fail(format!(
                "Tab input is not a tab (got {})!",
                value.type_name()
            ));
            None
        }
    }
}

/// Optional `Url` input; a bound non-string value degrades to the default
/// with a Warning rather than failing the action.
fn optional_url(action: &Action, ctx: &ExecutionContext, out: &mut HandlerOutcome) -> Option<String> {
    let value = optional(action, ctx, binding::URL)?;
    match value.as_str() {
        Some(url) => Some(url.to_string()),
        None => {
            out.warning(format!(
                "Url input is not a string (got {}), ignoring it",
                value.type_name()
            ));
            None
        }
    }
}

/// CreateTab: open a tab in the mandatory `Window`, optionally navigating to
/// `Url`, and wait for the load to settle before binding the tab.
pub async fn create_tab<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
    config: &EngineConfig,
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
    let window_id = window.id;

    let url = optional_url(action, ctx, &mut out);
    if let Some(url) = &url {
        out.info(format!("Navigating to {url}"));
    }

    let tab = match browser.create_tab(window_id, url.as_deref()).await {
        Ok(tab) => tab,
        Err(err) => {
            out.fail(format!("Failed to create tab: {err}"));
            return out;
        }
    };
    let tab = match wait_for_tab_complete(
        browser,
        tab.id,
        config.tab_load_timeout,
        config.tab_poll_interval,
    )
    .await
    {
        Ok(tab) => tab,
        Err(err @ WaitError::DeadlineExceeded { .. }) => {
            out.fail(err.to_string());
            return out;
        }
        Err(WaitError::Browser(err)) => {
            out.fail(format!("Failed to read tab state: {err}"));
            return out;
        }
    };
    out.success(format!("Tab created (id {})", tab.id));
    store_output(action, ctx, &mut out, binding::TAB, Value::Tab(tab));
    out
}

/// NavigateToURL: update the mandatory `Tab` input's location. An absent
/// `Url` makes this a no-operation, not a failure.
pub async fn navigate_to_url<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(tab) = require_tab(action, ctx, &mut out) else {
        return out;
    };

    let Some(url) = optional_url(action, ctx, &mut out) else {
        out.warning("Url input not defined! (this is a no-operation action)");
        return out;
    };
    out.info(format!("Navigating to {url}"));

    let refreshed = match browser.navigate_tab(tab.id, &url).await {
        Ok(tab) => tab,
        Err(err) => {
            out.fail(format!("Failed to navigate tab {}: {err}", tab.id));
            return out;
        }
    };
    store_output(action, ctx, &mut out, binding::TAB, Value::Tab(refreshed));
    out
}

/// WaitForTabToLoad: poll the mandatory `Tab` input until its status is
/// complete, bounded by the configured deadline.
pub async fn wait_for_tab_to_load<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
    config: &EngineConfig,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(tab) = require_tab(action, ctx, &mut out) else {
        return out;
    };
    match wait_for_tab_complete(
        browser,
        tab.id,
        config.tab_load_timeout,
        config.tab_poll_interval,
    )
    .await
    {
        Ok(tab) => {
            out.success(format!("Tab {} finished loading", tab.id));
            store_output(action, ctx, &mut out, binding::TAB, Value::Tab(tab));
        }
        Err(err @ WaitError::DeadlineExceeded { .. }) => out.fail(err.to_string()),
        Err(WaitError::Browser(err)) => out.fail(format!("Failed to read tab state: {err}")),
    }
    out
}
