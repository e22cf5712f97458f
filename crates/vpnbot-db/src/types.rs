// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, NaiveDateTime, Utc};
use std::net::Ipv4Addr;
use vpnbot_common::{PeerName, SecretString, UserId, WgPublicKey};

use crate::error::{DbError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
	pub id: UserId,
	pub username: Option<String>,
	pub first_name: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl UserRecord {
	/// First name if known, else `@username`, else the numeric id.
	pub fn display_name(&self) -> String {
		match (&self.first_name, &self.username) {
			(Some(first), _) if !first.is_empty() => first.clone(),
			(_, Some(username)) if !username.is_empty() => format!("@{username}"),
			_ => self.id.to_string(),
		}
	}
}

/// A provisioned peer. `private_key` stays wrapped until a client
/// config is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
	pub id: i64,
	pub user_id: UserId,
	pub name: PeerName,
	pub private_key: SecretString,
	pub public_key: WgPublicKey,
	pub tunnel_address: Ipv4Addr,
	pub created_at: DateTime<Utc>,
}

/// Everything needed to persist a peer except its address.
#[derive(Debug, Clone)]
pub struct NewPeer {
	pub user_id: UserId,
	pub name: PeerName,
	pub private_key: SecretString,
	pub public_key: WgPublicKey,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
	pub id: i64,
	pub username: Option<String>,
	pub first_name: Option<String>,
	pub created_at: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PeerRow {
	pub id: i64,
	pub user_id: i64,
	pub name: String,
	pub private_key: String,
	pub public_key: String,
	pub tunnel_address: String,
	pub created_at: String,
}

impl TryFrom<UserRow> for UserRecord {
	type Error = DbError;

	fn try_from(row: UserRow) -> Result<Self> {
		Ok(UserRecord {
			id: UserId(row.id),
			username: row.username,
			first_name: row.first_name,
			created_at: parse_datetime(&row.created_at)?,
		})
	}
}

impl TryFrom<PeerRow> for PeerRecord {
	type Error = DbError;

	fn try_from(row: PeerRow) -> Result<Self> {
		let name = PeerName::new(row.name)
			.map_err(|e| DbError::Internal(format!("Invalid stored peer name: {e}")))?;
		let public_key = WgPublicKey::from_base64(&row.public_key)
			.map_err(|e| DbError::Internal(format!("Invalid stored public key: {e}")))?;
		let tunnel_address = row
			.tunnel_address
			.parse::<Ipv4Addr>()
			.map_err(|e| DbError::Internal(format!("Invalid stored tunnel address: {e}")))?;

		Ok(PeerRecord {
			id: row.id,
			user_id: UserId(row.user_id),
			name,
			private_key: SecretString::new(row.private_key),
			public_key,
			tunnel_address,
			created_at: parse_datetime(&row.created_at)?,
		})
	}
}

/// Accepts RFC 3339 as written by this crate, and SQLite's
/// `datetime('now')` form for rows inserted by hand.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Ok(dt.with_timezone(&Utc));
	}
	NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
		.map(|naive| naive.and_utc())
		.map_err(|e| DbError::Internal(format!("Invalid timestamp {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_both_timestamp_forms() {
		let a = parse_datetime("2025-03-01T10:20:30.000123Z").unwrap();
		let b = parse_datetime("2025-03-01 10:20:30").unwrap();
		assert_eq!(a.timestamp(), b.timestamp());
		assert!(parse_datetime("yesterday").is_err());
	}

	#[test]
	fn display_name_fallbacks() {
		let mut user = UserRecord {
			id: UserId(9),
			username: Some("ivan".to_string()),
			first_name: Some("Ivan".to_string()),
			created_at: Utc::now(),
		};
		assert_eq!(user.display_name(), "Ivan");
		user.first_name = None;
		assert_eq!(user.display_name(), "@ivan");
		user.username = None;
		assert_eq!(user.display_name(), "9");
	}
}
