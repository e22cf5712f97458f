// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

const DEFAULT_MAX_PEERS_PER_USER: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLimitsConfig {
	pub max_peers_per_user: u32,
}

impl Default for PeerLimitsConfig {
	fn default() -> Self {
		Self {
			max_peers_per_user: DEFAULT_MAX_PEERS_PER_USER,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeerLimitsConfigLayer {
	#[serde(default)]
	pub max_peers_per_user: Option<u32>,
}

impl PeerLimitsConfigLayer {
	pub fn merge(&mut self, other: PeerLimitsConfigLayer) {
		if other.max_peers_per_user.is_some() {
			self.max_peers_per_user = other.max_peers_per_user;
		}
	}

	pub fn finalize(self) -> PeerLimitsConfig {
		PeerLimitsConfig {
			max_peers_per_user: self
				.max_peers_per_user
				.unwrap_or(DEFAULT_MAX_PEERS_PER_USER),
		}
	}
}
