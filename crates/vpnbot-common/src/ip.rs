// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel address pool.
//!
//! The pool is a single IPv4 network plus an inclusive range of host
//! offsets inside it. Nothing about the pool is persisted; the next address
//! is always derived from the addresses already held by live peers.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_NETWORK: &str = "10.0.0.0/24";
pub const DEFAULT_FIRST_HOST: u32 = 2;
pub const DEFAULT_LAST_HOST: u32 = 254;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpError {
	#[error("address pool exhausted: no host left after {0}")]
	Exhausted(Ipv4Addr),

	#[error("address {address} is outside pool network {network}")]
	OutsidePool { address: Ipv4Addr, network: Ipv4Net },

	#[error("invalid pool range {first}..={last} for network {network}")]
	InvalidRange {
		network: Ipv4Net,
		first: u32,
		last: u32,
	},

	#[error("unknown allocation strategy: {0}")]
	UnknownStrategy(String),
}

pub type Result<T> = std::result::Result<T, IpError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
	/// One past the most recently allocated address. Freed addresses are
	/// never handed out again.
	#[default]
	Sequential,
	/// Lowest host in range not held by a live peer.
	FirstFree,
}

impl FromStr for AllocationStrategy {
	type Err = IpError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
			"sequential" => Ok(Self::Sequential),
			"first_free" => Ok(Self::FirstFree),
			other => Err(IpError::UnknownStrategy(other.to_string())),
		}
	}
}

impl std::fmt::Display for AllocationStrategy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Sequential => f.write_str("sequential"),
			Self::FirstFree => f.write_str("first_free"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
	network: Ipv4Net,
	first_host: u32,
	last_host: u32,
	strategy: AllocationStrategy,
}

impl Default for AddressPool {
	fn default() -> Self {
		Self {
			network: Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 24).unwrap_or_default(),
			first_host: DEFAULT_FIRST_HOST,
			last_host: DEFAULT_LAST_HOST,
			strategy: AllocationStrategy::Sequential,
		}
	}
}

impl AddressPool {
	/// Builds a pool over `network` (truncated to its prefix) covering host
	/// offsets `first_host..=last_host`.
	pub fn new(network: Ipv4Net, first_host: u32, last_host: u32) -> Result<Self> {
		let network = network.trunc();
		let host_bits = 32 - u32::from(network.prefix_len());
		let max_offset = if host_bits == 32 {
			u32::MAX
		} else {
			(1u32 << host_bits) - 1
		};

		// The all-ones offset is the broadcast address.
		if first_host == 0 || first_host > last_host || last_host >= max_offset {
			return Err(IpError::InvalidRange {
				network,
				first: first_host,
				last: last_host,
			});
		}

		Ok(Self {
			network,
			first_host,
			last_host,
			strategy: AllocationStrategy::Sequential,
		})
	}

	pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
		self.strategy = strategy;
		self
	}

	pub fn network(&self) -> Ipv4Net {
		self.network
	}

	pub fn strategy(&self) -> AllocationStrategy {
		self.strategy
	}

	pub fn first_address(&self) -> Ipv4Addr {
		self.address_at(self.first_host)
	}

	pub fn last_address(&self) -> Ipv4Addr {
		self.address_at(self.last_host)
	}

	/// Number of addresses the pool can hand out.
	pub fn capacity(&self) -> u32 {
		self.last_host - self.first_host + 1
	}

	pub fn contains(&self, address: Ipv4Addr) -> bool {
		self
			.host_offset(address)
			.is_some_and(|h| h >= self.first_host && h <= self.last_host)
	}

	fn address_at(&self, host: u32) -> Ipv4Addr {
		Ipv4Addr::from(u32::from(self.network.network()) | host)
	}

	fn host_offset(&self, address: Ipv4Addr) -> Option<u32> {
		if self.network.contains(&address) {
			Some(u32::from(address) - u32::from(self.network.network()))
		} else {
			None
		}
	}

	/// Picks the address for a new peer. `existing` holds the addresses of
	/// live peers in allocation order.
	pub fn next_address(&self, existing: &[Ipv4Addr]) -> Result<Ipv4Addr> {
		match self.strategy {
			AllocationStrategy::Sequential => {
				let mut next = self.next_sequential(existing.last().copied())?;
				// Rows written under FirstFree can sit above the newest one.
				while existing.contains(&next) {
					next = self.next_sequential(Some(next))?;
				}
				Ok(next)
			}
			AllocationStrategy::FirstFree => self.first_free(existing),
		}
	}

	/// Sequential allocation from the most recent address alone.
	pub fn next_sequential(&self, last: Option<Ipv4Addr>) -> Result<Ipv4Addr> {
		let Some(last) = last else {
			return Ok(self.first_address());
		};

		let host = self.host_offset(last).ok_or(IpError::OutsidePool {
			address: last,
			network: self.network,
		})?;

		if host < self.first_host {
			return Ok(self.first_address());
		}

		if host >= self.last_host {
			return Err(IpError::Exhausted(last));
		}

		Ok(self.address_at(host + 1))
	}

	fn first_free(&self, existing: &[Ipv4Addr]) -> Result<Ipv4Addr> {
		let mut taken: Vec<u32> = existing
			.iter()
			.filter_map(|a| self.host_offset(*a))
			.filter(|h| *h >= self.first_host && *h <= self.last_host)
			.collect();
		taken.sort_unstable();
		taken.dedup();

		let mut candidate = self.first_host;
		for host in taken {
			if host != candidate {
				break;
			}
			if candidate == self.last_host {
				return Err(IpError::Exhausted(self.last_address()));
			}
			candidate += 1;
		}

		Ok(self.address_at(candidate))
	}
}
