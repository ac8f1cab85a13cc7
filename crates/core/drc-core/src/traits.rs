//! Core traits for DRC
//!
//! Two seams separate the deterministic core from the outside world:
//! - `Scheduler`: periodic timers. The simulation engine drives it from a
//!   virtual clock, the orchestrator from tokio intervals.
//! - `SmsGateway`: outbound alert delivery. Bulk messaging works through
//!   this interface ONLY, so tests can swap in a scripted gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DrcError;
use crate::types::SmsResponse;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, DrcError>;

/// Handle returned by [`Scheduler::schedule`], used to cancel the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CancelToken(pub u64);

impl std::fmt::Display for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Periodic timer source.
///
/// Every scheduled timer re-fires `event` each `interval`, the first time one
/// interval after the call. Cancelled timers never fire again.
pub trait Scheduler<E> {
    /// Arm a periodic timer
    fn schedule(&mut self, interval: Duration, event: E) -> CancelToken;

    /// Disarm a timer. Returns false if the token is unknown or already cancelled.
    fn cancel(&mut self, token: CancelToken) -> bool;

    /// Clock used to stamp entity timestamps
    fn now(&self) -> DateTime<Utc>;
}

/// Outbound SMS delivery
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send a single message. A delivered-but-rejected message is
    /// `Ok(SmsResponse { success: false, .. })`; transport failures are `Err`.
    async fn send_sms(&self, to: &str, body: &str) -> Result<SmsResponse>;
}
