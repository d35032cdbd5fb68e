//! Transport abstractions for live event streams.
//!
//! A transport turns a stream URL into a sequence of raw message payloads.
//! The stream ending, or yielding an error, counts as a disconnect.
//!
//! ```text
//! GET {base}/live/matches/{id}/stream
//!     │
//!     ├── Err(_)          connect failed      -> channel.on_error
//!     └── Ok(stream)      connected           -> channel.on_open
//!           ├── Some(Ok(payload))             -> channel.on_message
//!           ├── Some(Err(_))                  -> channel.on_error
//!           └── None      stream ended        -> channel.on_error
//! ```

pub mod http;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;

// Re-export for convenience
pub use http::HttpTransport;

/// Raw payloads from one open connection.
pub type PayloadStream = BoxStream<'static, Result<String>>;

/// Trait for live stream backends.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Open a stream. Resolves once the server has accepted the request.
    async fn connect(&self, url: &str) -> Result<PayloadStream>;
}
