// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;
use vpnbot_common::{ClientConfig, UserId};
use vpnbot_db::{PeerRecord, UserRecord};

/// Identity the front end supplies with every interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
	pub id: UserId,
	pub username: Option<String>,
	pub first_name: Option<String>,
}

impl UserIdentity {
	pub fn new(id: UserId) -> Self {
		Self {
			id,
			username: None,
			first_name: None,
		}
	}

	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());
		self
	}

	pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
		self.first_name = Some(first_name.into());
		self
	}
}

/// Result of applying a change to the tunnel daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DaemonSync {
	Applied,
	Failed { reason: String },
}

impl DaemonSync {
	pub fn is_applied(&self) -> bool {
		matches!(self, DaemonSync::Applied)
	}
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
	pub peer: PeerRecord,
	pub client_config: ClientConfig,
	pub daemon: DaemonSync,
}

#[derive(Debug, Clone)]
pub struct DeleteOutcome {
	pub peer: PeerRecord,
	pub daemon: DaemonSync,
}

/// Lifecycle state of one `(user, name)` pair. The in-between state only
/// exists inside the store transaction and is never observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerState {
	Absent,
	Active(PeerRecord),
}

#[derive(Debug, Clone)]
pub struct Profile {
	pub user: UserRecord,
	pub peers: Vec<PeerRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
	pub users: i64,
	pub peers: i64,
}
