// src/lib.rs

//! cricket-live: live match update feed library

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod transport;
pub mod utils;
