//! Wall-clock scheduler on tokio
//!
//! Every timer is a spawned task ticking a `tokio::time::interval` and
//! pushing `(token, event)` into one unbounded channel. The owner drains the
//! receiver and feeds the simulator, so all state changes still happen on a
//! single task.
//!
//! Cancelling aborts the timer task, but an event it already queued stays in
//! the channel. Receivers match the token against the timer they currently
//! have armed. Dropping the scheduler aborts every timer.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use drc_core::{CancelToken, Scheduler};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// `tokio::time::interval` panics on a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct TokioScheduler<E> {
    tx: mpsc::UnboundedSender<(CancelToken, E)>,
    timers: HashMap<CancelToken, JoinHandle<()>>,
    next_token: u64,
}

impl<E: Clone + Send + 'static> TokioScheduler<E> {
    /// Create a scheduler and the receiving end of its event channel.
    ///
    /// Timers are spawned on the current tokio runtime, so `schedule` must be
    /// called from within one.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(CancelToken, E)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            timers: HashMap::new(),
            next_token: 0,
        };
        (scheduler, rx)
    }

    /// Number of armed timers
    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl<E: Clone + Send + 'static> Scheduler<E> for TokioScheduler<E> {
    fn schedule(&mut self, interval: Duration, event: E) -> CancelToken {
        let period = interval.max(MIN_INTERVAL);
        let token = CancelToken(self.next_token);
        self.next_token += 1;

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            // First tick one period from now, not immediately
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send((token, event.clone())).is_err() {
                    break;
                }
            }
        });

        debug!(%token, period_ms = period.as_millis() as u64, "Timer armed");
        self.timers.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: CancelToken) -> bool {
        match self.timers.remove(&token) {
            Some(handle) => {
                handle.abort();
                debug!(%token, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<E> Drop for TokioScheduler<E> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
