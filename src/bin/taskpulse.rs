//! Runs the periodic deadline scan against `PostgreSQL`.
//!
//! Usage:
//!
//! ```text
//! TASKPULSE_CONFIG=/etc/taskpulse.toml taskpulse
//! ```
//!
//! The configuration file must set `database_url`. The daemon scans every
//! `scan_interval_secs` until it receives Ctrl-C, then stops after the scan
//! in progress, if any, finishes. Log verbosity follows `RUST_LOG` and
//! defaults to `info`.

use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use mockable::DefaultClock;
use std::sync::Arc;
use taskpulse::config::{ConfigError, EngineConfig};
use taskpulse::notification::{
    adapters::{
        broadcast::BroadcastFanout,
        postgres::{PostgresNotificationRepository, PostgresPreferenceRepository},
    },
    services::{DeadlineScanner, ScanScheduler},
};
use taskpulse::task::adapters::postgres::{PostgresTaskRepository, TaskPgPool};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Errors that stop the daemon before it starts scanning.
#[derive(Debug, Error)]
enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("`database_url` must be set in the configuration file")]
    MissingDatabaseUrl,
    #[error("failed to build the database pool: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to wait for the shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

fn connect(database_url: &str) -> Result<TaskPgPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let database_url = config
        .database_url
        .as_deref()
        .ok_or(DaemonError::MissingDatabaseUrl)?;
    let pool = connect(database_url)?;

    let scanner = DeadlineScanner::new(
        Arc::new(PostgresTaskRepository::new(pool.clone())),
        Arc::new(PostgresNotificationRepository::new(pool.clone())),
        Arc::new(PostgresPreferenceRepository::new(pool)),
        Arc::new(BroadcastFanout::new(config.fanout_capacity)),
        Arc::new(DefaultClock),
    );
    let handle = ScanScheduler::new(Arc::new(scanner), config.scan_interval()).start();
    info!(fanout_capacity = config.fanout_capacity, "taskpulse daemon ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    handle.stop().await;
    Ok(())
}
