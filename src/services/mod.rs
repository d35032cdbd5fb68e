//! Service layer for the live feed client.
//!
//! - Reconnecting per-match state machine (`LiveUpdateChannel`)
//! - Bounded newest-first event storage (`EventLog`)
//! - Reconnect delay policy (`BackoffPolicy`)

pub mod backoff;
pub mod channel;
pub mod event_log;

pub use backoff::{BackoffDecision, BackoffPolicy};
pub use channel::{Action, ConnectionId, LiveUpdateChannel, TimerId};
pub use event_log::EventLog;
