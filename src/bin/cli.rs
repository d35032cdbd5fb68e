//! cricket-live CLI
//!
//! Follows a match's live event stream from the terminal.

use std::future;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cricket_live::{
    config,
    error::{AppError, Result},
    models::{Config, LiveEvent},
    pipeline::{self, FeedSnapshot, LiveFeedHandle},
    services::BackoffPolicy,
    transport::HttpTransport,
    utils::StreamEndpoint,
};
use tokio::time::Instant;

/// cricket-live - Live match updates
#[derive(Parser, Debug)]
#[command(name = "cricket-live", version, about = "Live cricket match updates")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream live events for a match until interrupted
    Follow {
        /// Match identifier
        match_id: String,

        /// Stop after this many events
        #[arg(long)]
        limit: Option<u64>,

        /// Reconnect manually whenever automatic retries give up
        #[arg(long)]
        keep_trying: bool,
    },

    /// Print the automatic reconnect schedule
    Backoff,

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Follow {
            match_id,
            limit,
            keep_trying,
        } => {
            let config = config::load_all(&cli.config)?;
            follow(&config, &match_id, limit, keep_trying).await?;
        }

        Command::Backoff => {
            let config = Config::load_or_default(&cli.config);
            let policy = BackoffPolicy::with_config(config.reconnect);
            for (index, delay) in policy.schedule().iter().enumerate() {
                log::info!("Attempt {}: after {}ms", index + 1, delay.as_millis());
            }
            log::info!(
                "Then stop after {} attempts until a manual reconnect",
                policy.max_attempts()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config::load_all(&cli.config) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

/// How `run_follow` treats limits and exhausted retries.
struct FollowOptions {
    limit: Option<u64>,
    keep_trying: bool,
    retry_delay: Duration,
    template: String,
}

/// Print events and status changes until interrupted, limited, or out of
/// retries.
async fn follow(
    config: &Config,
    match_id: &str,
    limit: Option<u64>,
    keep_trying: bool,
) -> Result<()> {
    if match_id.trim().is_empty() {
        return Err(AppError::validation("match id must not be empty"));
    }

    let url = StreamEndpoint::new(&config.api.base_url)?.url_for(match_id);
    log::info!("Following {}", url);

    let transport = HttpTransport::new(&config.api)?;
    let handle = pipeline::follow_match(config, transport, match_id)?;
    let options = FollowOptions {
        limit,
        keep_trying,
        retry_delay: Duration::from_millis(config.reconnect.max_delay_ms),
        template: config.output.template.clone(),
    };
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {}", e);
            future::pending::<()>().await;
        }
    };

    let last = run_follow(handle, url.as_str(), &options, interrupt).await?;
    log::info!(
        "Received {} events for match {}",
        last.received,
        last.match_id
    );
    Ok(())
}

/// Drive the output loop for a running feed. The feed is closed before
/// returning, whatever the outcome.
async fn run_follow(
    handle: LiveFeedHandle,
    url: &str,
    options: &FollowOptions,
    interrupt: impl Future<Output = ()>,
) -> Result<FeedSnapshot> {
    let mut updates = handle.subscribe();
    let mut printed = 0;
    let mut last_status = String::new();

    let retry = tokio::time::sleep(Duration::ZERO);
    let mut retry_armed = false;
    tokio::pin!(retry);
    tokio::pin!(interrupt);

    let outcome = loop {
        tokio::select! {
            () = &mut interrupt => {
                log::info!("Interrupted");
                break Ok(());
            }
            () = &mut retry, if retry_armed => {
                retry_armed = false;
                handle.reconnect();
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = updates.borrow_and_update().clone();
                for event in new_events(&snapshot, printed, options.limit) {
                    println!("{}", event.format(&options.template));
                }
                printed = snapshot.received;

                let status = snapshot.status.summary();
                if status != last_status {
                    log::info!("Status: {}", status);
                    last_status = status;
                }

                if options.limit.is_some_and(|n| snapshot.received >= n) {
                    break Ok(());
                }
                if snapshot.exhausted && !retry_armed {
                    let message = snapshot.status.error.unwrap_or_default();
                    if !options.keep_trying {
                        break Err(AppError::transport(url, message));
                    }
                    log::warn!(
                        "{}; trying again in {}ms",
                        message,
                        options.retry_delay.as_millis()
                    );
                    retry.as_mut().reset(Instant::now() + options.retry_delay);
                    retry_armed = true;
                }
            }
        }
    };

    let last = handle.close().await;
    outcome.map(|()| last)
}

/// Events accepted since `printed`, oldest first, never running past
/// `limit` in total.
fn new_events(snapshot: &FeedSnapshot, printed: u64, limit: Option<u64>) -> Vec<&LiveEvent> {
    let fresh = snapshot
        .received
        .saturating_sub(printed)
        .min(snapshot.events.len() as u64) as usize;
    let allowed = limit.map_or(u64::MAX, |n| n.saturating_sub(printed));
    snapshot.events[..fresh]
        .iter()
        .rev()
        .take(usize::try_from(allowed).unwrap_or(usize::MAX))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use cricket_live::models::{EventType, LiveEventPayload};
    use cricket_live::services::LiveUpdateChannel;
    use cricket_live::transport::{EventTransport, PayloadStream};

    struct Refused;

    #[async_trait]
    impl EventTransport for Refused {
        async fn connect(&self, url: &str) -> Result<PayloadStream> {
            Err(AppError::transport(url, "connection refused"))
        }
    }

    fn options(keep_trying: bool) -> FollowOptions {
        FollowOptions {
            limit: None,
            keep_trying,
            retry_delay: Duration::from_secs(30),
            template: "{message}".into(),
        }
    }

    fn snapshot(received: u64, ids: &[i64]) -> FeedSnapshot {
        let events = ids
            .iter()
            .map(|id| {
                let payload = LiveEventPayload {
                    id: Some(*id),
                    match_id: "M1".into(),
                    message: format!("ball {id}"),
                    event_type: EventType::Boundary,
                    over_label: None,
                    innings_label: None,
                    created_at: None,
                };
                payload.normalize(*id as u64, Utc::now())
            })
            .collect();
        FeedSnapshot {
            match_id: "M1".into(),
            received,
            events,
            ..FeedSnapshot::default()
        }
    }

    fn ids(events: Vec<&LiveEvent>) -> Vec<i64> {
        events.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_new_events_oldest_first() {
        let snap = snapshot(5, &[5, 4, 3, 2, 1]);
        assert_eq!(ids(new_events(&snap, 2, None)), vec![3, 4, 5]);
        assert!(new_events(&snap, 5, None).is_empty());
    }

    #[test]
    fn test_new_events_stops_at_limit() {
        let snap = snapshot(5, &[5, 4, 3, 2, 1]);
        assert_eq!(ids(new_events(&snap, 0, Some(2))), vec![1, 2]);
        assert_eq!(ids(new_events(&snap, 2, Some(3))), vec![3]);
        assert!(new_events(&snap, 3, Some(3)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_without_keep_trying() {
        let channel = LiveUpdateChannel::from_config(&Config::default()).unwrap();
        let handle = pipeline::spawn_feed(channel, Refused, "M1");
        let start = Instant::now();

        let result = run_follow(handle, "http://test", &options(false), future::pending()).await;
        assert!(matches!(result, Err(AppError::Transport { .. })));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_during_retry_delay() {
        let channel = LiveUpdateChannel::from_config(&Config::default()).unwrap();
        let handle = pipeline::spawn_feed(channel, Refused, "M1");
        let start = Instant::now();

        // Retries run out at 60s; the manual retry would follow at 90s.
        let interrupt = tokio::time::sleep(Duration::from_secs(61));
        let last = run_follow(handle, "http://test", &options(true), interrupt)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(61));
        assert!(last.exhausted);
        assert!(!last.status.reconnecting);
    }
}
