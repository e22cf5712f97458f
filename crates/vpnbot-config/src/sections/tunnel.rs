// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tunnel daemon control.

use serde::Deserialize;
use std::time::Duration;

fn default_interface() -> String {
	"wg0".to_string()
}

fn default_control_command() -> String {
	"awg".to_string()
}

fn default_save_command() -> String {
	"awg-quick".to_string()
}

const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
	pub enabled: bool,
	pub interface: String,
	pub control_command: String,
	pub save_command: String,
	pub timeout_secs: u64,
}

impl Default for TunnelConfig {
	fn default() -> Self {
		TunnelConfigLayer::default().finalize()
	}
}

impl TunnelConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs)
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TunnelConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub interface: Option<String>,
	#[serde(default)]
	pub control_command: Option<String>,
	#[serde(default)]
	pub save_command: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl TunnelConfigLayer {
	pub fn merge(&mut self, other: TunnelConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.interface.is_some() {
			self.interface = other.interface;
		}
		if other.control_command.is_some() {
			self.control_command = other.control_command;
		}
		if other.save_command.is_some() {
			self.save_command = other.save_command;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> TunnelConfig {
		TunnelConfig {
			enabled: self.enabled.unwrap_or(true),
			interface: self.interface.unwrap_or_else(default_interface),
			control_command: self.control_command.unwrap_or_else(default_control_command),
			save_command: self.save_command.unwrap_or_else(default_save_command),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}
