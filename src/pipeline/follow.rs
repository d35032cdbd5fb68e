// src/pipeline/follow.rs

//! Live feed driver.
//!
//! Owns a [`LiveUpdateChannel`] inside a single tokio task and carries out
//! its actions: connecting through an [`EventTransport`], dropping streams,
//! and arming the reconnect timer. Open, message, error and timer callbacks
//! are serialized by one `select!` loop, so the channel never sees two
//! transitions at once. A connect in flight is just another branch of that
//! loop; closing or reconnecting drops it.
//!
//! Consumers hold a [`LiveFeedHandle`]: snapshots come out through a `watch`
//! channel, and `reconnect`/`close` go in through an `mpsc` queue. Dropping
//! the handle closes the feed.

use std::collections::VecDeque;
use std::future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};

use crate::error::Result;
use crate::models::{Config, ConnectionStatus, LiveEvent};
use crate::services::{Action, ConnectionId, LiveUpdateChannel, TimerId};
use crate::transport::{EventTransport, PayloadStream};

/// What a consumer sees of a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub match_id: String,
    pub status: ConnectionStatus,
    /// Newest first
    pub events: Vec<LiveEvent>,
    /// Valid events accepted since the feed started
    pub received: u64,
    /// Automatic reconnects gave up; call `reconnect` to try again
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
enum Control {
    Reconnect,
    Close,
}

/// Consumer side of a running feed.
pub struct LiveFeedHandle {
    control: mpsc::UnboundedSender<Control>,
    snapshot: watch::Receiver<FeedSnapshot>,
    task: JoinHandle<()>,
}

impl LiveFeedHandle {
    /// Latest published snapshot.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot.borrow().status.clone()
    }

    /// Receiver notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshot.clone()
    }

    /// Request a manual reconnect.
    pub fn reconnect(&self) {
        if self.control.send(Control::Reconnect).is_err() {
            log::debug!("Reconnect requested after the feed stopped");
        }
    }

    /// Close the feed and wait for the driver to stop. Returns the final
    /// snapshot.
    pub async fn close(self) -> FeedSnapshot {
        let LiveFeedHandle {
            control,
            snapshot,
            task,
        } = self;

        // The driver may already be gone; closing is still complete then.
        let _ = control.send(Control::Close);
        if let Err(e) = task.await {
            log::warn!("Live feed task ended abnormally: {}", e);
        }
        let last = snapshot.borrow().clone();
        last
    }
}

/// Build a channel from `config` and start following `match_id`.
pub fn follow_match<T>(config: &Config, transport: T, match_id: &str) -> Result<LiveFeedHandle>
where
    T: EventTransport + 'static,
{
    let channel = LiveUpdateChannel::from_config(config)?;
    Ok(spawn_feed(channel, transport, match_id))
}

/// Open `channel` for `match_id` and drive it on a new task.
///
/// Must be called from within a tokio runtime.
pub fn spawn_feed<T>(
    mut channel: LiveUpdateChannel,
    transport: T,
    match_id: impl Into<String>,
) -> LiveFeedHandle
where
    T: EventTransport + 'static,
{
    let actions = channel.open(match_id);
    let driver = FeedDriver {
        channel,
        transport: Arc::new(transport),
        connecting: None,
        stream: None,
        timer: None,
    };

    let (snapshot_tx, snapshot_rx) = watch::channel(driver.snapshot());
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(driver.run(actions, control_rx, snapshot_tx));

    LiveFeedHandle {
        control: control_tx,
        snapshot: snapshot_rx,
        task,
    }
}

enum Wake {
    Control(Option<Control>),
    Connected(ConnectionId, Result<PayloadStream>),
    Payload(ConnectionId, Option<Result<String>>),
    Timer(TimerId),
}

struct FeedDriver<T> {
    channel: LiveUpdateChannel,
    transport: Arc<T>,
    connecting: Option<(ConnectionId, BoxFuture<'static, Result<PayloadStream>>)>,
    stream: Option<(ConnectionId, PayloadStream)>,
    timer: Option<(TimerId, Pin<Box<Sleep>>)>,
}

impl<T: EventTransport + 'static> FeedDriver<T> {
    async fn run(
        mut self,
        initial: Vec<Action>,
        mut control: mpsc::UnboundedReceiver<Control>,
        snapshot: watch::Sender<FeedSnapshot>,
    ) {
        let mut queue: VecDeque<Action> = initial.into();
        let mut closing = false;

        loop {
            while let Some(action) = queue.pop_front() {
                self.apply(action);
            }
            self.publish(&snapshot);
            if closing {
                break;
            }

            match self.wait(&mut control).await {
                Wake::Control(Some(Control::Reconnect)) => queue.extend(self.channel.reconnect()),
                Wake::Control(Some(Control::Close) | None) => {
                    queue.extend(self.channel.close());
                    closing = true;
                }
                Wake::Connected(connection, Ok(stream)) => {
                    self.connecting = None;
                    self.stream = Some((connection, stream));
                    self.channel.on_open(connection);
                }
                Wake::Connected(connection, Err(e)) => {
                    self.connecting = None;
                    queue.extend(self.channel.on_error(connection, &e.to_string()));
                }
                Wake::Payload(connection, Some(Ok(payload))) => {
                    self.channel.on_message(connection, &payload);
                }
                Wake::Payload(connection, Some(Err(e))) => {
                    queue.extend(self.channel.on_error(connection, &e.to_string()));
                }
                Wake::Payload(connection, None) => {
                    queue.extend(self.channel.on_error(connection, "stream ended"));
                }
                Wake::Timer(timer) => {
                    self.timer = None;
                    queue.extend(self.channel.on_timer(timer));
                }
            }
        }

        log::debug!(
            "Live feed for match {} stopped",
            self.channel.match_id().unwrap_or_default()
        );
    }

    /// Wait for the next control message, connect outcome, payload or timer
    /// expiry.
    async fn wait(&mut self, control: &mut mpsc::UnboundedReceiver<Control>) -> Wake {
        let connecting = &mut self.connecting;
        let stream = &mut self.stream;
        let timer = &mut self.timer;

        let opened = async move {
            match connecting.as_mut() {
                Some((connection, attempt)) => Wake::Connected(*connection, attempt.await),
                None => future::pending::<Wake>().await,
            }
        };
        let payload = async move {
            match stream.as_mut() {
                Some((connection, stream)) => Wake::Payload(*connection, stream.next().await),
                None => future::pending::<Wake>().await,
            }
        };
        let expiry = async move {
            match timer.as_mut() {
                Some((id, deadline)) => {
                    deadline.as_mut().await;
                    Wake::Timer(*id)
                }
                None => future::pending::<Wake>().await,
            }
        };

        tokio::select! {
            command = control.recv() => Wake::Control(command),
            wake = opened => wake,
            wake = payload => wake,
            wake = expiry => wake,
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Connect { connection, url } => {
                let transport = Arc::clone(&self.transport);
                let attempt = async move { transport.connect(&url).await }.boxed();
                self.connecting = Some((connection, attempt));
            }
            Action::Disconnect { connection } => {
                if matches!(&self.connecting, Some((pending, _)) if *pending == connection) {
                    log::debug!("Abandoning connect for connection {}", connection);
                    self.connecting = None;
                }
                if matches!(&self.stream, Some((active, _)) if *active == connection) {
                    self.stream = None;
                }
            }
            Action::ScheduleReconnect { timer, delay, .. } => {
                self.timer = Some((timer, Box::pin(sleep(delay))));
            }
            Action::CancelReconnect { timer } => {
                if matches!(&self.timer, Some((pending, _)) if *pending == timer) {
                    self.timer = None;
                }
            }
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            match_id: self.channel.match_id().unwrap_or_default().to_string(),
            status: self.channel.status().clone(),
            events: self.channel.events().to_vec(),
            received: self.channel.received(),
            exhausted: self.channel.is_exhausted(),
        }
    }

    fn publish(&self, sender: &watch::Sender<FeedSnapshot>) {
        let next = self.snapshot();
        sender.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
