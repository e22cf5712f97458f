// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The tunnel server as clients see it.

use serde::Deserialize;

/// Both values end up in every client config. They are optional here so
/// that commands which never render a config can run without them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WgServerConfig {
	pub public_key: Option<String>,
	pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WgServerConfigLayer {
	#[serde(default)]
	pub public_key: Option<String>,
	#[serde(default)]
	pub endpoint: Option<String>,
}

impl WgServerConfigLayer {
	pub fn merge(&mut self, other: WgServerConfigLayer) {
		if other.public_key.is_some() {
			self.public_key = other.public_key;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
	}

	pub fn finalize(self) -> WgServerConfig {
		WgServerConfig {
			public_key: self.public_key.map(|k| k.trim().to_string()),
			endpoint: self.endpoint.map(|e| e.trim().to_string()),
		}
	}
}
