//! # DRC Orchestrator
//!
//! Live runtime for the disaster response simulation.
//!
//! ## Architecture
//!
//! ```text
//! TokioScheduler (interval tasks)
//!        │ events (mpsc)
//!        ▼
//! Simulator (drc-simulation-engine) ──notices──▶ operations::run_live
//!                                                   │
//!                                                   ▼
//!                                     messaging::send_bulk ──▶ SmsGateway
//!                                                                 │
//!                                                   SmsClient (reqwest) ──▶ SMS relay
//! ```
//!
//! Bulk messaging only talks to the [`drc_core::SmsGateway`] trait, so the
//! HTTP client can be swapped for a scripted gateway in tests.

#![warn(clippy::all)]

pub mod error;
pub mod messaging;
pub mod operations;
pub mod runtime;
pub mod sms;

// Error handling
pub use error::{OrchestratorError, Result};

// SMS relay client
pub use sms::{DEFAULT_SMS_ENDPOINT, SmsClient, SmsConfig, SmsRequest};

// Bulk messaging
pub use messaging::{BulkSendResult, DeliveryOutcome, RecipientList, emergency_message, send_bulk};

// Live runtime
pub use operations::{LiveOptions, LiveReport, run_live};
pub use runtime::TokioScheduler;
