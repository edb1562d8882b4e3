use super::{HandlerOutcome, optional};
use crate::context::ExecutionContext;
use std::time::Duration;
use tabweave_common::protocol::{Action, binding};

/// WaitForMilliseconds: suspend sequence progress for the given duration.
/// An undeclared or unusable input makes this a no-operation with a Warning.
pub async fn wait_for_milliseconds(action: &Action, ctx: &ExecutionContext) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let millis = match optional(action, ctx, binding::MILLISECONDS) {
        Some(value) => match value.as_number() {
            Some(ms) if ms >= 0.0 => ms as u64,
            _ => {
                out.warning(format!(
                    "Milliseconds input is not a usable number (got {})! (this is a no-operation action)",
                    value.type_name()
                ));
                return out;
            }
        },
        None => {
            out.warning("Milliseconds input not defined! (this is a no-operation action)");
            return out;
        }
    };
    out.info(format!("Waiting {millis} milliseconds"));
    tokio::time::sleep(Duration::from_millis(millis)).await;
    out
}
