// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	BotConfigLayer, DatabaseConfigLayer, LoggingConfigLayer, PeerLimitsConfigLayer, PoolConfigLayer,
	TunnelConfigLayer, WgServerConfigLayer,
};

/// All fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VpnbotConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub pool: Option<PoolConfigLayer>,
	#[serde(default)]
	pub server: Option<WgServerConfigLayer>,
	#[serde(default)]
	pub tunnel: Option<TunnelConfigLayer>,
	#[serde(default)]
	pub provisioning: Option<PeerLimitsConfigLayer>,
	#[serde(default)]
	pub bot: Option<BotConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl VpnbotConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: VpnbotConfigLayer) {
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.pool, other.pool, PoolConfigLayer::merge);
		merge_option(&mut self.server, other.server, WgServerConfigLayer::merge);
		merge_option(&mut self.tunnel, other.tunnel, TunnelConfigLayer::merge);
		merge_option(
			&mut self.provisioning,
			other.provisioning,
			PeerLimitsConfigLayer::merge,
		);
		merge_option(&mut self.bot, other.bot, BotConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T>(target: &mut Option<T>, source: Option<T>, merge_fn: fn(&mut T, T)) {
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}
