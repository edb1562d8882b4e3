//! The privileged dispatcher: walks a sequence's action list, maintains the
//! shared context, routes each action to its handler (local or in-page) and
//! folds the per-action outcomes into a run report.

use crate::browser::Browser;
use crate::context::ExecutionContext;
use crate::handlers;
use chrono::Utc;
use std::time::Duration;
use tabweave_common::protocol::{
    Action, ActionKind, ActionResult, Pipeline, SequenceResult, binding,
};
use tabweave_common::value::Value;
use tracing::{debug, info};

/// Runtime limits for the engine's polling waits.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub tab_load_timeout: Duration,
    pub tab_poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tab_load_timeout: Duration::from_secs(10),
            tab_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Executes one pipeline at a time against a browser capability provider.
pub struct SequenceRunner<B> {
    browser: B,
    config: EngineConfig,
}

impl<B: Browser> SequenceRunner<B> {
    pub fn new(browser: B) -> Self {
        Self::with_config(browser, EngineConfig::default())
    }

    pub fn with_config(browser: B, config: EngineConfig) -> Self {
        Self { browser, config }
    }

    pub fn browser_mut(&mut self) -> &mut B {
        &mut self.browser
    }

    /// Run a pipeline's sequence to completion or first fatal action and
    /// return the sealed report. Context mutations are not rolled back on
    /// failure; the partial result is the record of what happened.
    pub async fn run(&mut self, pipeline: &Pipeline) -> SequenceResult {
        let start_at = Utc::now();
        let mut ctx = ExecutionContext::from_serialized(&pipeline.context);
        let actions = &pipeline.sequence.actions;
        let mut results = Vec::new();
        let mut pointer = 0usize;

        while let Some(action) = actions.get(pointer) {
            ctx.merge_defaults(action);

            // Goto is structural: it only moves the pointer and leaves no
            // trace in the results.
            if action.kind == ActionKind::Goto {
                let target = goto_target(action, &ctx, pointer, actions.len());
                debug!(from = pointer, to = target, "goto");
                pointer = target;
                continue;
            }

            info!(action = %action.kind, pointer, "running action");
            let result = self.execute_action(action, &mut ctx).await;
            let fatal = result.fatal;
            results.push(result);
            if fatal {
                info!(action = %action.kind, pointer, "fatal action, stopping sequence");
                break;
            }
            pointer += 1;
        }

        SequenceResult {
            id: pipeline.id.clone(),
            start_at,
            end_at: Utc::now(),
            results,
        }
    }

    async fn execute_action(
        &mut self,
        action: &Action,
        ctx: &mut ExecutionContext,
    ) -> ActionResult {
        let action_context = ctx.snapshot_of(action);
        let start_at = Utc::now();
        let outcome = self.dispatch(action, ctx).await;
        ActionResult {
            action: action.clone(),
            action_context,
            action_logs: outcome.logs,
            action_outputs: outcome.outputs,
            start_at,
            end_at: Utc::now(),
            fatal: outcome.fatal,
        }
    }

    async fn dispatch(
        &mut self,
        action: &Action,
        ctx: &mut ExecutionContext,
    ) -> handlers::HandlerOutcome {
        let browser = &mut self.browser;
        match &action.kind {
            ActionKind::CreateWindow => handlers::window::create_window(action, ctx, browser).await,
            ActionKind::CloseWindow => handlers::window::close_window(action, ctx, browser).await,
            ActionKind::CreateTab => {
                handlers::tab::create_tab(action, ctx, browser, &self.config).await
            }
            ActionKind::NavigateToUrl => {
                handlers::tab::navigate_to_url(action, ctx, browser).await
            }
            ActionKind::HttpRequest => handlers::http::http_request(action, ctx, browser).await,
            ActionKind::Subtract => handlers::math::subtract(action, ctx),
            ActionKind::Addition => handlers::math::addition(action, ctx),
            ActionKind::Multiply => handlers::math::multiply(action, ctx),
            ActionKind::Divide => handlers::math::divide(action, ctx),
            ActionKind::Not => handlers::logic::not(action, ctx),
            ActionKind::And => handlers::logic::and(action, ctx),
            ActionKind::Or => handlers::logic::or(action, ctx),
            ActionKind::ParseNumber => handlers::parse::parse_number(action, ctx),
            ActionKind::ParseUrl => handlers::parse::parse_url(action, ctx),
            ActionKind::WaitForMilliseconds => {
                handlers::wait::wait_for_milliseconds(action, ctx).await
            }
            ActionKind::WaitForTabToLoad => {
                handlers::tab::wait_for_tab_to_load(action, ctx, browser, &self.config).await
            }
            // Intercepted in `run`; a Goto reaching here was addressed out
            // of band and does nothing.
            ActionKind::Goto => handlers::HandlerOutcome::new(),
            ActionKind::FindElementBySelector
            | ActionKind::FindElementsBySelector
            | ActionKind::ClickElement
            | ActionKind::ReadElementText
            | ActionKind::WriteElementText
            | ActionKind::Custom(_) => {
                handlers::page::page_action(action, ctx, browser, &self.config).await
            }
        }
    }
}

/// Compute where a Goto moves the pointer. The `Number` offset is relative;
/// with a declared `Condition` the jump only happens on true, otherwise the
/// pointer advances by one. A Goto without a usable offset jumps to the end
/// of the sequence, terminating the run.
fn goto_target(action: &Action, ctx: &ExecutionContext, pointer: usize, len: usize) -> usize {
    let offset = action
        .input(binding::NUMBER)
        .and_then(|var| ctx.get(&var.name))
        .and_then(Value::as_number);
    let Some(offset) = offset else {
        return len;
    };

    let delta = match action.input(binding::CONDITION) {
        None => offset as i64,
        Some(var) => {
            let condition = ctx
                .get(&var.name)
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if condition { offset as i64 } else { 1 }
        }
    };
    (pointer as i64 + delta).clamp(0, len as i64) as usize
}
