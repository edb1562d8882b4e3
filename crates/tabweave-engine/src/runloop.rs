//! The polling driver: every tick pulls the head of the remote queue,
//! confirms ownership, runs the sequence and reports the result. One
//! sequence is in flight at a time; the execution slot is taken before any
//! queue traffic so overlapping ticks cannot race between fetch, confirm
//! and run.

use crate::browser::Browser;
use crate::executor::SequenceRunner;
use crate::remote::RunQueue;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What a single tick did, mostly for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick holds the execution slot.
    Busy,
    /// Queue empty or unreachable.
    Idle,
    /// The server did not confirm our claim on the pipeline.
    Refused,
    /// A sequence ran; delivery of the report may still have failed.
    Completed { reported: bool },
}

pub struct RunLoop<B, Q> {
    queue: Q,
    runner: Mutex<SequenceRunner<B>>,
    interval: Duration,
}

impl<B: Browser, Q: RunQueue> RunLoop<B, Q> {
    pub fn new(queue: Q, runner: SequenceRunner<B>, interval: Duration) -> Self {
        Self {
            queue,
            runner: Mutex::new(runner),
            interval,
        }
    }

    /// One fetch-confirm-execute-report cycle.
    pub async fn tick(&self) -> TickOutcome {
        // Take the slot first; a second tick arriving while a sequence is
        // still running (or still being claimed) backs off immediately.
        let Ok(mut runner) = self.runner.try_lock() else {
            return TickOutcome::Busy;
        };

        let pipeline = match self.queue.fetch_next().await {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return TickOutcome::Idle,
            Err(err) => {
                warn!(%err, "failed to poll the run queue");
                return TickOutcome::Idle;
            }
        };
        debug!(pipeline = %pipeline.id, "got pipeline from run queue");

        match self.queue.confirm(&pipeline.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(pipeline = %pipeline.id, "pipeline claim not confirmed");
                return TickOutcome::Refused;
            }
            Err(err) => {
                warn!(pipeline = %pipeline.id, %err, "confirmation request failed");
                return TickOutcome::Refused;
            }
        }

        info!(pipeline = %pipeline.id, "running sequence");
        let result = runner.run(&pipeline).await;

        // Delivery is best-effort: a failed report is logged, never retried.
        let reported = match self.queue.save_result(&result).await {
            Ok(()) => true,
            Err(err) => {
                warn!(pipeline = %pipeline.id, %err, "failed to save sequence result");
                false
            }
        };
        TickOutcome::Completed { reported }
    }

    /// Drive ticks on the configured interval, forever. There is no abort
    /// path; a running sequence finishes or dies on its first fatal action.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
