//! Pipeline entry points for live feeds.
//!
//! - `follow_match`: Build a channel from config and follow one match
//! - `spawn_feed`: Drive an existing channel on a tokio task

pub mod follow;

pub use follow::{FeedSnapshot, LiveFeedHandle, follow_match, spawn_feed};
