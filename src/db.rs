//! SQLite connection for the phrase weight store.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

use crate::config::Config;

/// Open the weight database, creating the file and its parent directory
/// on first use.
///
/// Feedback updates are read-modify-write per phrase from a single
/// processor, so the pool stays small; WAL keeps `weights dump` readers
/// from blocking behind an update, and the busy timeout covers a dump
/// racing an upsert.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let weight_db = &config.db.path;

    if let Some(parent) = weight_db.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", weight_db.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await?;

    Ok(pool)
}
