// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;
use vpnbot_common::IpError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Conflict: {0}")]
	Conflict(String),

	/// The chosen tunnel address is already held by another peer.
	#[error("Tunnel address {0} is already allocated")]
	AddressTaken(Ipv4Addr),

	#[error("Peer limit of {limit} reached")]
	LimitReached { limit: u32 },

	#[error("Address pool: {0}")]
	AddressPool(#[from] IpError),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Maps unique-constraint violations on a peer insert. A clash on
/// `tunnel_address` is [`DbError::AddressTaken`]; any other is
/// [`DbError::Conflict`].
pub(crate) fn map_unique(e: sqlx::Error, what: &str, address: Ipv4Addr) -> DbError {
	match e {
		sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
			if db_err.message().contains("tunnel_address") {
				DbError::AddressTaken(address)
			} else {
				DbError::Conflict(what.to_string())
			}
		}
		_ => DbError::Sqlx(e),
	}
}
