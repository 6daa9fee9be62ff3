//! Daily snapshot ingester for the RWA registry.
//!
//! Downloads the gzipped nations dump, parses it off the async runtime,
//! and reconciles it into the registry with the dump's nominal timestamp
//! so fresher stream writes are never overwritten.
//!
//! With `snapshot.interval_secs = 0` a single run is made and any failure
//! is returned. Otherwise the ingester repeats on that interval until
//! Ctrl-C, logging failed runs and carrying on.

mod download;
mod dump;
mod error;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rwa_core::config::{LoggingConfig, RwaConfig};
use rwa_core::reconcile::{ReconcileReport, Reconciler, dump_timestamp};
use rwa_core::shutdown::Shutdown;
use rwa_db::{NationStore, PostgresPool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::IngestError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration or the database cannot be set up, or
/// if a one-shot run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RwaConfig::load().map_err(IngestError::from)?;
    init_logging(&config.logging);

    info!(
        config = %RwaConfig::path().display(),
        url = %config.snapshot.url,
        "rwa-ingester starting"
    );

    let pool = PostgresPool::connect(&config.database.pool_config())
        .await
        .map_err(IngestError::from)?;
    pool.run_migrations().await.map_err(IngestError::from)?;
    let registry = NationStore::new(pool.pool());

    let client = reqwest::Client::builder()
        .user_agent(config.feed.user_agent.as_str())
        .build()
        .map_err(|e| IngestError::Http(format!("failed to build HTTP client: {e}")))?;

    if config.snapshot.interval_secs == 0 {
        let outcome = ingest(&config, &client, &registry).await;
        pool.close().await;
        outcome?;
        return Ok(());
    }

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

    let interval = Duration::from_secs(config.snapshot.interval_secs);
    while !shutdown.is_requested() {
        if let Err(e) = ingest(&config, &client, &registry).await {
            tracing::error!(error = %e, "Snapshot run failed");
        }
        info!(next_in_secs = interval.as_secs(), "Waiting for next snapshot");
        if shutdown.until(tokio::time::sleep(interval)).await.is_none() {
            break;
        }
    }

    info!("rwa-ingester stopped");
    pool.close().await;
    Ok(())
}

/// One full download, parse, and reconcile pass.
async fn ingest(
    config: &RwaConfig,
    client: &reqwest::Client,
    registry: &NationStore<'_>,
) -> Result<ReconcileReport, IngestError> {
    let started = Instant::now();
    let snapshot = &config.snapshot;

    let timestamp = dump_timestamp(Utc::now(), snapshot.dump_hour, snapshot.dump_minute).ok_or(
        IngestError::InvalidDumpTime {
            hour: snapshot.dump_hour,
            minute: snapshot.dump_minute,
        },
    )?;

    let (file, bytes) = download::download_dump(client, &snapshot.url).await?;
    info!(bytes, "Dump downloaded");

    let rows = tokio::task::spawn_blocking(move || dump::parse_dump_file(file.path()))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))??;
    info!(nations = rows.len(), "Dump parsed");

    let report = Reconciler::new(registry)
        .with_batch_size(snapshot.batch_size)
        .reconcile(rows, timestamp)
        .await;

    info!(
        timestamp = %timestamp,
        total = report.total_rows,
        duplicates = report.duplicate_rows,
        accepted = report.accepted_rows,
        written = report.written_rows,
        failed_batches = report.failed_batches,
        failed_rows = report.failed_rows,
        elapsed_ms = started.elapsed().as_millis(),
        "Snapshot reconciled"
    );
    if !report.is_complete() {
        tracing::warn!(
            failed_batches = report.failed_batches,
            "Snapshot only partially applied"
        );
    }
    Ok(report)
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
