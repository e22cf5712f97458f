// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel address pool.

use ipnet::Ipv4Net;
use serde::Deserialize;
use vpnbot_common::ip::{DEFAULT_FIRST_HOST, DEFAULT_LAST_HOST};
use vpnbot_common::{AddressPool, AllocationStrategy, IpError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
	pub network: Ipv4Net,
	pub first_host: u32,
	pub last_host: u32,
	pub strategy: AllocationStrategy,
}

impl Default for PoolConfig {
	fn default() -> Self {
		PoolConfigLayer::default().finalize()
	}
}

impl PoolConfig {
	pub fn address_pool(&self) -> Result<AddressPool, IpError> {
		Ok(AddressPool::new(self.network, self.first_host, self.last_host)?.with_strategy(self.strategy))
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolConfigLayer {
	#[serde(default)]
	pub network: Option<Ipv4Net>,
	#[serde(default)]
	pub first_host: Option<u32>,
	#[serde(default)]
	pub last_host: Option<u32>,
	#[serde(default)]
	pub strategy: Option<AllocationStrategy>,
}

impl PoolConfigLayer {
	pub fn merge(&mut self, other: PoolConfigLayer) {
		if other.network.is_some() {
			self.network = other.network;
		}
		if other.first_host.is_some() {
			self.first_host = other.first_host;
		}
		if other.last_host.is_some() {
			self.last_host = other.last_host;
		}
		if other.strategy.is_some() {
			self.strategy = other.strategy;
		}
	}

	pub fn finalize(self) -> PoolConfig {
		PoolConfig {
			network: self
				.network
				.unwrap_or_else(|| AddressPool::default().network()),
			first_host: self.first_host.unwrap_or(DEFAULT_FIRST_HOST),
			last_host: self.last_host.unwrap_or(DEFAULT_LAST_HOST),
			strategy: self.strategy.unwrap_or_default(),
		}
	}
}
