// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Front-end settings.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotConfig {
	/// The only user allowed to see global stats.
	pub admin_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfigLayer {
	#[serde(default)]
	pub admin_id: Option<i64>,
}

impl BotConfigLayer {
	pub fn merge(&mut self, other: BotConfigLayer) {
		if other.admin_id.is_some() {
			self.admin_id = other.admin_id;
		}
	}

	pub fn finalize(self) -> BotConfig {
		BotConfig {
			admin_id: self.admin_id,
		}
	}
}
