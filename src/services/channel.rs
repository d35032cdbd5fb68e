//! Live update channel for a single match.
//!
//! The channel is a plain state object. It performs no IO: every transition
//! returns the [`Action`]s a driver has to carry out (open or drop a stream,
//! arm or cancel the reconnect timer), and the driver reports back through
//! [`LiveUpdateChannel::on_open`], [`LiveUpdateChannel::on_message`],
//! [`LiveUpdateChannel::on_error`] and [`LiveUpdateChannel::on_timer`].
//!
//! Connections and timers carry generation ids. Callbacks with an id the
//! channel no longer tracks are ignored, so nothing reconnects after
//! [`LiveUpdateChannel::close`].
//!
//! ## Reconnect rules
//!
//! - Only transport errors (including failure to open) trigger a retry;
//!   malformed payloads never do.
//! - Automatic attempt `n` waits `min(2s * 2^(n-1), 30s)`.
//! - After five attempts without a successful open the channel gives up
//!   until [`LiveUpdateChannel::reconnect`] is called.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, ConnectionStatus, LiveEvent, LiveEventPayload};
use crate::services::backoff::{BackoffDecision, BackoffPolicy};
use crate::services::event_log::EventLog;
use crate::utils::StreamEndpoint;

/// Error shown while automatic reconnects are in progress.
pub const CONNECTION_LOST: &str = "Connection lost. Reconnecting to live updates...";

/// Error shown once automatic reconnects have given up.
pub const RETRIES_EXHAUSTED: &str =
    "Unable to connect to live updates. Reconnect manually to try again.";

/// Identifies one transport connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Identifies one scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Side effect requested by the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a stream to `url` and report back with `connection`
    Connect { connection: ConnectionId, url: String },
    /// Drop the stream for `connection`, if one is open
    Disconnect { connection: ConnectionId },
    /// Call `on_timer(timer)` after `delay`
    ScheduleReconnect {
        timer: TimerId,
        attempt: u32,
        delay: Duration,
    },
    /// Forget the timer; it must never fire
    CancelReconnect { timer: TimerId },
}

#[derive(Debug, Clone, Copy)]
struct PendingReconnect {
    timer: TimerId,
    attempt: u32,
    delay: Duration,
}

/// Reconnecting, bounded view of one match's live events.
#[derive(Debug)]
pub struct LiveUpdateChannel {
    endpoint: StreamEndpoint,
    policy: BackoffPolicy,
    match_id: Option<String>,
    status: ConnectionStatus,
    log: EventLog,
    connection: Option<ConnectionId>,
    pending: Option<PendingReconnect>,
    exhausted: bool,
    next_id: u64,
    received: u64,
}

impl LiveUpdateChannel {
    pub fn new(endpoint: StreamEndpoint, policy: BackoffPolicy, capacity: usize) -> Self {
        Self {
            endpoint,
            policy,
            match_id: None,
            status: ConnectionStatus::default(),
            log: EventLog::with_capacity(capacity),
            connection: None,
            pending: None,
            exhausted: false,
            next_id: 0,
            received: 0,
        }
    }

    /// Build a channel from the API, reconnect and event log settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = StreamEndpoint::new(&config.api.base_url)?;
        let policy = BackoffPolicy::with_config(config.reconnect.clone());
        Ok(Self::new(endpoint, policy, config.events.capacity))
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Received events, newest first.
    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    /// Total valid events accepted over the channel's lifetime.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Automatic retries have stopped; only `reconnect` tries again.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn active_connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    /// Pending reconnect timer with its attempt number and delay.
    pub fn pending_reconnect(&self) -> Option<(TimerId, u32, Duration)> {
        self.pending.map(|p| (p.timer, p.attempt, p.delay))
    }

    /// Start following `match_id`.
    ///
    /// The id is used as given; callers must not pass an empty one. Any
    /// existing stream or timer is torn down first. Switching to another
    /// match clears the log.
    pub fn open(&mut self, match_id: impl Into<String>) -> Vec<Action> {
        let match_id = match_id.into();
        let mut actions = self.teardown();

        if self.match_id.as_deref() != Some(match_id.as_str()) {
            self.log.clear();
        }
        self.status = ConnectionStatus::default();
        self.exhausted = false;

        actions.push(self.connect_to(&match_id));
        self.match_id = Some(match_id);
        actions
    }

    /// The transport for `connection` is open.
    pub fn on_open(&mut self, connection: ConnectionId) {
        if !self.is_current(connection) {
            log::debug!("Ignoring open from stale {}", connection);
            return;
        }

        if self.status.retry_count > 0 {
            log::info!(
                "Live updates reconnected after {} attempt(s)",
                self.status.retry_count
            );
        } else {
            log::info!("Live updates connected ({})", connection);
        }

        self.status = ConnectionStatus {
            connected: true,
            reconnecting: false,
            error: None,
            retry_count: 0,
        };
        self.exhausted = false;
    }

    /// A payload arrived on `connection`. Returns the stored event, or
    /// `None` when the payload was dropped.
    pub fn on_message(&mut self, connection: ConnectionId, raw: &str) -> Option<&LiveEvent> {
        self.on_message_at(connection, raw, Utc::now())
    }

    /// Like [`Self::on_message`] with an explicit clock reading for events
    /// that carry no timestamp.
    pub fn on_message_at(
        &mut self,
        connection: ConnectionId,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Option<&LiveEvent> {
        if !self.is_current(connection) {
            log::debug!("Ignoring message from stale {}", connection);
            return None;
        }

        match LiveEventPayload::parse(raw) {
            Ok(payload) => {
                self.received += 1;
                let event = payload.normalize(self.received, now);
                log::debug!("Live event {} ({})", event.id, event.event_type);
                self.log.push(event);
                self.log.latest()
            }
            Err(e) => {
                log::warn!("Dropping malformed live event: {}", e);
                None
            }
        }
    }

    /// The transport for `connection` failed to open or dropped.
    pub fn on_error(&mut self, connection: ConnectionId, reason: &str) -> Vec<Action> {
        if !self.is_current(connection) {
            log::debug!("Ignoring error from stale {}: {}", connection, reason);
            return Vec::new();
        }

        log::warn!("Live stream error ({}): {}", connection, reason);
        self.connection = None;
        self.status.connected = false;
        self.status.error = Some(CONNECTION_LOST.to_string());

        let mut actions = vec![Action::Disconnect { connection }];
        actions.extend(self.schedule_reconnect());
        actions
    }

    /// A scheduled reconnect fired.
    pub fn on_timer(&mut self, timer: TimerId) -> Vec<Action> {
        if self.pending.map(|p| p.timer) != Some(timer) {
            log::debug!("Ignoring stale {}", timer);
            return Vec::new();
        }
        self.pending = None;

        match self.match_id.clone() {
            Some(match_id) => vec![self.connect_to(&match_id)],
            None => Vec::new(),
        }
    }

    /// Manual reconnect: reset the retry budget and connect right away.
    /// Does nothing before the first `open`.
    pub fn reconnect(&mut self) -> Vec<Action> {
        let Some(match_id) = self.match_id.clone() else {
            log::debug!("Reconnect requested before any match was opened");
            return Vec::new();
        };

        log::info!("Manual reconnect for match {}", match_id);
        let mut actions = self.teardown();
        self.status = ConnectionStatus::default();
        self.exhausted = false;
        actions.push(self.connect_to(&match_id));
        actions
    }

    /// Stop the stream and any pending reconnect. Safe to call repeatedly.
    pub fn close(&mut self) -> Vec<Action> {
        let actions = self.teardown();
        if !actions.is_empty() {
            log::debug!("Closing live updates for {:?}", self.match_id);
        }
        self.status.connected = false;
        self.status.reconnecting = false;
        actions
    }

    fn is_current(&self, connection: ConnectionId) -> bool {
        self.connection == Some(connection)
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn connect_to(&mut self, match_id: &str) -> Action {
        let connection = ConnectionId(self.allocate_id());
        self.connection = Some(connection);
        let url = self.endpoint.url_for(match_id);
        log::debug!("Connecting {} to {}", connection, url);
        Action::Connect { connection, url }
    }

    fn teardown(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(pending) = self.pending.take() {
            actions.push(Action::CancelReconnect {
                timer: pending.timer,
            });
        }
        if let Some(connection) = self.connection.take() {
            actions.push(Action::Disconnect { connection });
        }
        actions
    }

    fn schedule_reconnect(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(pending) = self.pending.take() {
            actions.push(Action::CancelReconnect {
                timer: pending.timer,
            });
        }

        match self.policy.next(self.status.retry_count) {
            BackoffDecision::Retry { attempt, delay } => {
                let timer = TimerId(self.allocate_id());
                self.pending = Some(PendingReconnect {
                    timer,
                    attempt,
                    delay,
                });
                self.status.retry_count = attempt;
                self.status.reconnecting = true;
                log::info!(
                    "Reconnecting in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    self.policy.max_attempts()
                );
                actions.push(Action::ScheduleReconnect {
                    timer,
                    attempt,
                    delay,
                });
            }
            BackoffDecision::Exhausted { attempts } => {
                self.status.reconnecting = false;
                self.status.error = Some(RETRIES_EXHAUSTED.to_string());
                self.exhausted = true;
                log::error!(
                    "Giving up on live updates after {} reconnect attempts",
                    attempts
                );
            }
        }
        actions
    }
}
