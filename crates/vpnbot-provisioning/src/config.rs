// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use vpnbot_common::AddressPool;

pub const DEFAULT_MAX_PEERS_PER_USER: u32 = 5;

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
	pub pool: AddressPool,
	pub max_peers_per_user: u32,
	/// Server public key as written into client configs.
	pub server_public_key: String,
	/// `host:port` clients connect to.
	pub server_endpoint: String,
}

impl ProvisioningConfig {
	pub fn new(server_public_key: impl Into<String>, server_endpoint: impl Into<String>) -> Self {
		Self {
			pool: AddressPool::default(),
			max_peers_per_user: DEFAULT_MAX_PEERS_PER_USER,
			server_public_key: server_public_key.into(),
			server_endpoint: server_endpoint.into(),
		}
	}

	pub fn with_pool(mut self, pool: AddressPool) -> Self {
		self.pool = pool;
		self
	}

	pub fn with_max_peers_per_user(mut self, max: u32) -> Self {
		self.max_peers_per_user = max;
		self
	}
}
