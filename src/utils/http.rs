// src/utils/http.rs

//! HTTP client utilities.

use crate::error::Result;
use crate::models::ApiConfig;

/// Create an asynchronous HTTP client for long-lived streams.
///
/// Only the connect phase is bounded; a total request timeout would cut
/// healthy streams.
pub fn create_stream_client(config: &ApiConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout())
        .build()?;
    Ok(client)
}
