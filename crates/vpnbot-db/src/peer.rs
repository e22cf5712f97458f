// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users and their peer configurations.
//!
//! The repository is the single arbiter of name and address uniqueness.
//! [`PeerRepository::allocate_peer`] is the only path that picks an address,
//! and it does so under a write lock shared by every clone of the repository
//! and inside one transaction.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Mutex;
use vpnbot_common::{AddressPool, PeerName, UserId, WgPublicKey};

use crate::error::{map_unique, DbError, Result};
use crate::types::{NewPeer, PeerRecord, PeerRow, UserRecord, UserRow};

const PEER_COLUMNS: &str =
	"id, user_id, name, private_key, public_key, tunnel_address, created_at";

#[async_trait]
pub trait PeerStore: Send + Sync {
	async fn upsert_user(
		&self,
		id: UserId,
		username: Option<&str>,
		first_name: Option<&str>,
	) -> Result<UserRecord>;
	async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>>;
	async fn create_peer(
		&self,
		new: &NewPeer,
		tunnel_address: Ipv4Addr,
	) -> Result<PeerRecord>;
	async fn allocate_peer(
		&self,
		new: &NewPeer,
		pool: &AddressPool,
		max_per_user: u32,
	) -> Result<PeerRecord>;
	async fn get_peer(&self, user_id: UserId, name: &PeerName) -> Result<Option<PeerRecord>>;
	async fn list_peers(&self, user_id: UserId) -> Result<Vec<PeerRecord>>;
	async fn delete_peer(&self, user_id: UserId, name: &PeerName) -> Result<bool>;
	async fn last_allocated_address(&self) -> Result<Option<Ipv4Addr>>;
	async fn allocated_addresses(&self) -> Result<Vec<Ipv4Addr>>;
	async fn count_users(&self) -> Result<i64>;
	async fn count_peers(&self) -> Result<i64>;
	async fn count_peers_for_user(&self, user_id: UserId) -> Result<i64>;
}

#[derive(Clone)]
pub struct PeerRepository {
	pool: SqlitePool,
	write_lock: Arc<Mutex<()>>,
}

fn now_rfc3339() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_address(s: &str) -> Result<Ipv4Addr> {
	s.parse()
		.map_err(|e| DbError::Internal(format!("Invalid stored tunnel address {s:?}: {e}")))
}

impl PeerRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			write_lock: Arc::new(Mutex::new(())),
		}
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	// =========================================================================
	// Users
	// =========================================================================

	/// Insert the user on first contact, otherwise refresh the names.
	/// `created_at` is written once.
	#[tracing::instrument(skip(self, username, first_name), fields(%id))]
	pub async fn upsert_user(
		&self,
		id: UserId,
		username: Option<&str>,
		first_name: Option<&str>,
	) -> Result<UserRecord> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO users (id, username, first_name, created_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				username = excluded.username,
				first_name = excluded.first_name
			"#,
		)
		.bind(id.get())
		.bind(username)
		.bind(first_name)
		.bind(now_rfc3339())
		.execute(&mut *tx)
		.await?;

		let row: UserRow = sqlx::query_as(
			"SELECT id, username, first_name, created_at FROM users WHERE id = ?",
		)
		.bind(id.get())
		.fetch_one(&mut *tx)
		.await?;

		tx.commit().await?;

		row.try_into()
	}

	#[tracing::instrument(skip(self), fields(%id))]
	pub async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
		let row: Option<UserRow> = sqlx::query_as(
			"SELECT id, username, first_name, created_at FROM users WHERE id = ?",
		)
		.bind(id.get())
		.fetch_optional(&self.pool)
		.await?;

		row.map(UserRecord::try_from).transpose()
	}

	// =========================================================================
	// Peers
	// =========================================================================

	/// Insert a peer at a caller-chosen address. A duplicate name is
	/// [`DbError::Conflict`], a held address [`DbError::AddressTaken`].
	#[tracing::instrument(
		skip(self, new),
		fields(user_id = %new.user_id, name = %new.name, address = %tunnel_address)
	)]
	pub async fn create_peer(&self, new: &NewPeer, tunnel_address: Ipv4Addr) -> Result<PeerRecord> {
		let mut tx = self.pool.begin().await?;
		let record = insert_peer(&mut tx, new, tunnel_address).await?;
		tx.commit().await?;
		Ok(record)
	}

	/// Check name, cap and address space, then insert, as one unit.
	///
	/// # Errors
	/// - `Conflict` if the user already has a peer with this name
	/// - `LimitReached` if the user already holds `max_per_user` peers
	/// - `AddressPool` if the pool has no address left
	#[tracing::instrument(
		skip(self, new, pool),
		fields(user_id = %new.user_id, name = %new.name)
	)]
	pub async fn allocate_peer(
		&self,
		new: &NewPeer,
		pool: &AddressPool,
		max_per_user: u32,
	) -> Result<PeerRecord> {
		let _guard = self.write_lock.lock().await;
		// IMMEDIATE takes the write lock up front, so other processes on the
		// same file wait on busy_timeout and then see the committed row.
		let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

		let exists: Option<(i64,)> =
			sqlx::query_as("SELECT id FROM peer_configs WHERE user_id = ? AND name = ?")
				.bind(new.user_id.get())
				.bind(new.name.as_str())
				.fetch_optional(&mut *tx)
				.await?;
		if exists.is_some() {
			return Err(DbError::Conflict(format!(
				"peer {} already exists for user {}",
				new.name, new.user_id
			)));
		}

		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM peer_configs WHERE user_id = ?")
			.bind(new.user_id.get())
			.fetch_one(&mut *tx)
			.await?;
		if count >= i64::from(max_per_user) {
			return Err(DbError::LimitReached {
				limit: max_per_user,
			});
		}

		let existing: Vec<(String,)> =
			sqlx::query_as("SELECT tunnel_address FROM peer_configs ORDER BY id ASC")
				.fetch_all(&mut *tx)
				.await?;
		let existing = existing
			.iter()
			.map(|(s,)| parse_address(s))
			.collect::<Result<Vec<_>>>()?;

		let address = pool.next_address(&existing)?;
		let record = insert_peer(&mut tx, new, address).await?;
		tx.commit().await?;

		tracing::debug!(address = %record.tunnel_address, id = record.id, "peer allocated");
		Ok(record)
	}

	#[tracing::instrument(skip(self), fields(%user_id, %name))]
	pub async fn get_peer(&self, user_id: UserId, name: &PeerName) -> Result<Option<PeerRecord>> {
		let row: Option<PeerRow> = sqlx::query_as(&format!(
			"SELECT {PEER_COLUMNS} FROM peer_configs WHERE user_id = ? AND name = ?"
		))
		.bind(user_id.get())
		.bind(name.as_str())
		.fetch_optional(&self.pool)
		.await?;

		row.map(PeerRecord::try_from).transpose()
	}

	/// Newest first.
	#[tracing::instrument(skip(self), fields(%user_id))]
	pub async fn list_peers(&self, user_id: UserId) -> Result<Vec<PeerRecord>> {
		let rows: Vec<PeerRow> = sqlx::query_as(&format!(
			"SELECT {PEER_COLUMNS} FROM peer_configs WHERE user_id = ?
			 ORDER BY created_at DESC, id DESC"
		))
		.bind(user_id.get())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(PeerRecord::try_from).collect()
	}

	#[tracing::instrument(skip(self), fields(%user_id, %name))]
	pub async fn delete_peer(&self, user_id: UserId, name: &PeerName) -> Result<bool> {
		let mut tx = self.pool.begin().await?;
		let result = sqlx::query("DELETE FROM peer_configs WHERE user_id = ? AND name = ?")
			.bind(user_id.get())
			.bind(name.as_str())
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		Ok(result.rows_affected() > 0)
	}

	/// Address of the most recently inserted live peer.
	#[tracing::instrument(skip(self))]
	pub async fn last_allocated_address(&self) -> Result<Option<Ipv4Addr>> {
		let row: Option<(String,)> =
			sqlx::query_as("SELECT tunnel_address FROM peer_configs ORDER BY id DESC LIMIT 1")
				.fetch_optional(&self.pool)
				.await?;

		row.map(|(s,)| parse_address(&s)).transpose()
	}

	/// All live addresses in insertion order.
	#[tracing::instrument(skip(self))]
	pub async fn allocated_addresses(&self) -> Result<Vec<Ipv4Addr>> {
		let rows: Vec<(String,)> =
			sqlx::query_as("SELECT tunnel_address FROM peer_configs ORDER BY id ASC")
				.fetch_all(&self.pool)
				.await?;

		rows.iter().map(|(s,)| parse_address(s)).collect()
	}

	// =========================================================================
	// Counts
	// =========================================================================

	#[tracing::instrument(skip(self))]
	pub async fn count_users(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_peers(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM peer_configs")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	#[tracing::instrument(skip(self), fields(%user_id))]
	pub async fn count_peers_for_user(&self, user_id: UserId) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM peer_configs WHERE user_id = ?")
			.bind(user_id.get())
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}
}

async fn insert_peer(
	tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
	new: &NewPeer,
	tunnel_address: Ipv4Addr,
) -> Result<PeerRecord> {
	let created_at = now_rfc3339();
	let public_key: &WgPublicKey = &new.public_key;

	let result = sqlx::query(
		r#"
		INSERT INTO peer_configs (user_id, name, private_key, public_key, tunnel_address, created_at)
		VALUES (?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(new.user_id.get())
	.bind(new.name.as_str())
	.bind(new.private_key.expose().as_str())
	.bind(public_key.to_base64())
	.bind(tunnel_address.to_string())
	.bind(&created_at)
	.execute(&mut **tx)
	.await
	.map_err(|e| {
		map_unique(
			e,
			&format!("peer {} already exists for user {}", new.name, new.user_id),
			tunnel_address,
		)
	})?;

	let row: PeerRow = sqlx::query_as(&format!(
		"SELECT {PEER_COLUMNS} FROM peer_configs WHERE id = ?"
	))
	.bind(result.last_insert_rowid())
	.fetch_one(&mut **tx)
	.await?;

	row.try_into()
}

#[async_trait]
impl PeerStore for PeerRepository {
	async fn upsert_user(
		&self,
		id: UserId,
		username: Option<&str>,
		first_name: Option<&str>,
	) -> Result<UserRecord> {
		self.upsert_user(id, username, first_name).await
	}

	async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
		self.get_user(id).await
	}

	async fn create_peer(&self, new: &NewPeer, tunnel_address: Ipv4Addr) -> Result<PeerRecord> {
		self.create_peer(new, tunnel_address).await
	}

	async fn allocate_peer(
		&self,
		new: &NewPeer,
		pool: &AddressPool,
		max_per_user: u32,
	) -> Result<PeerRecord> {
		self.allocate_peer(new, pool, max_per_user).await
	}

	async fn get_peer(&self, user_id: UserId, name: &PeerName) -> Result<Option<PeerRecord>> {
		self.get_peer(user_id, name).await
	}

	async fn list_peers(&self, user_id: UserId) -> Result<Vec<PeerRecord>> {
		self.list_peers(user_id).await
	}

	async fn delete_peer(&self, user_id: UserId, name: &PeerName) -> Result<bool> {
		self.delete_peer(user_id, name).await
	}

	async fn last_allocated_address(&self) -> Result<Option<Ipv4Addr>> {
		self.last_allocated_address().await
	}

	async fn allocated_addresses(&self) -> Result<Vec<Ipv4Addr>> {
		self.allocated_addresses().await
	}

	async fn count_users(&self) -> Result<i64> {
		self.count_users().await
	}

	async fn count_peers(&self) -> Result<i64> {
		self.count_peers().await
	}

	async fn count_peers_for_user(&self, user_id: UserId) -> Result<i64> {
		self.count_peers_for_user(user_id).await
	}
}
