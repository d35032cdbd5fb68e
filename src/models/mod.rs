// src/models/mod.rs

//! Domain models for the live feed client.

mod config;
mod event;
mod status;

// Re-export all public types
pub use config::{ApiConfig, Config, EventLogConfig, OutputConfig, ReconnectConfig};
pub use event::{EventType, LiveEvent, LiveEventPayload};
pub use status::ConnectionStatus;
