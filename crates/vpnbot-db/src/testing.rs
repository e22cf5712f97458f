// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pools for tests in this crate and its dependents.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::migrations::run_migrations;

/// Single-connection in-memory pool with the schema applied.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true);
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

/// File-backed pool with several connections, for concurrency tests.
pub async fn create_file_test_pool(dir: &Path) -> SqlitePool {
	let url = format!("sqlite:{}", dir.join("vpnbot-test.db").display());
	let pool = crate::pool::create_pool(&url).await.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}
