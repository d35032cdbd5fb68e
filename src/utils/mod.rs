//! Utility functions and helpers.

pub mod http;
pub mod sse;

use url::Url;

use crate::error::{AppError, Result};

/// Builds per-match stream URLs from the configured API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    base: Url,
}

impl StreamEndpoint {
    /// Parse and check the API base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "API base URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `<base>/live/matches/<match_id>/stream`, with the id percent-encoded
    /// as a single path segment. The id itself is not validated.
    pub fn url_for(&self, match_id: &str) -> String {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["live", "matches", match_id, "stream"]);
        }
        url.to_string()
    }
}
