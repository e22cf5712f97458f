// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

use crate::error::DbError;

/// Writers from other processes wait this long for the file lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Create a SqlitePool with WAL mode and foreign keys enforced.
///
/// The database file's parent directory is created when missing.
///
/// # Arguments
/// * `database_url` - SQLite connection string (e.g., "sqlite:./data/vpnbot.db")
///
/// # Errors
/// Returns `DbError::Internal` if the URL is invalid or connection fails.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("Invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.foreign_keys(true)
		.busy_timeout(BUSY_TIMEOUT)
		.create_if_missing(true);

	if let Some(parent) = options
		.get_filename()
		.parent()
		.filter(|p| !p.as_os_str().is_empty())
	{
		tokio::fs::create_dir_all(parent).await.map_err(|e| {
			DbError::Internal(format!(
				"Failed to create database directory {}: {e}",
				parent.display()
			))
		})?;
	}

	let pool = SqlitePool::connect_with(options).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
