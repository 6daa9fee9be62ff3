//! Live event consumer for the RWA feed.
//!
//! Reads the game's server-sent event feed, applies every event to the
//! nation registry, and forwards a rendered copy to each subscribed
//! webhook channel.
//!
//! # Architecture
//!
//! ```text
//! SSE feed --> StreamLoop --> Mutator --> Registry (PostgreSQL)
//!                         \-> Router --> render --> WebhookDelivery (fan-out)
//! ```
//!
//! When the feed closes or fails the consumer waits
//! `feed.reconnect_delay_ms` and reconnects. Ctrl-C stops it between
//! events, while connecting, or while waiting to reconnect.

mod error;
mod sse;
mod webhook;

use std::sync::Arc;

use rwa_core::config::{LoggingConfig, RwaConfig};
use rwa_core::shutdown::Shutdown;
use rwa_core::stream::{StreamEnd, StreamLoop};
use rwa_db::{NationStore, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ConsumerError;
use crate::sse::FeedClient;
use crate::webhook::WebhookDelivery;

/// Application entry point.
///
/// Loads configuration, connects to the registry, then consumes the feed
/// until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration, the database, or an HTTP client
/// cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RwaConfig::load().map_err(ConsumerError::from)?;
    init_logging(&config.logging);

    info!(config = %RwaConfig::path().display(), "rwa-consumer starting");

    let subscriptions = config.subscriptions();
    if subscriptions.is_empty() {
        info!("No channels loaded");
    } else {
        let names: Vec<&str> = subscriptions.iter().map(|s| s.name.as_str()).collect();
        info!(count = subscriptions.len(), channels = ?names, "Loaded channels");
    }

    let pool = PostgresPool::connect(&config.database.pool_config())
        .await
        .map_err(ConsumerError::from)?;
    pool.run_migrations().await.map_err(ConsumerError::from)?;
    let registry = NationStore::new(pool.pool());

    let delivery = WebhookDelivery::new(&config.delivery)?;
    let feed = FeedClient::new(&config.feed)?;

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received");
                shutdown.request();
            }
        });
    }

    let mut stream = StreamLoop::new(&registry, &delivery, &subscriptions)
        .with_dedup_window(config.feed.dedup_window);

    info!("Listening for events...");
    while !shutdown.is_requested() {
        let Some(connected) = shutdown.until(feed.connect()).await else {
            break;
        };
        match connected {
            Ok(messages) => {
                if stream.run(messages, &shutdown).await == StreamEnd::Shutdown {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Feed connection failed"),
        }

        let delay = config.feed.reconnect_delay();
        info!(delay_ms = delay.as_millis(), "Reconnecting to feed");
        if shutdown.until(tokio::time::sleep(delay)).await.is_none() {
            break;
        }
    }

    let stats = stream.stats();
    info!(
        messages = stats.messages,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        mutation_failures = stats.mutation_failures,
        skipped = stats.skipped,
        delivered = stats.delivered,
        delivery_failures = stats.delivery_failures,
        "rwa-consumer stopped"
    );
    pool.close().await;
    Ok(())
}

/// Initialize structured logging. `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
