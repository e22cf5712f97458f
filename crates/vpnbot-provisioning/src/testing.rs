// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process tunnel controllers for tests.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use vpnbot_common::WgPublicKey;

use crate::tunnel::{Result, TunnelController, TunnelError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelCall {
	Add(WgPublicKey, Ipv4Addr),
	Remove(WgPublicKey),
}

/// Accepts every call and remembers it.
#[derive(Debug, Default)]
pub struct RecordingTunnelController {
	calls: Mutex<Vec<TunnelCall>>,
}

impl RecordingTunnelController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn calls(&self) -> Vec<TunnelCall> {
		self.calls.lock().map(|c| c.clone()).unwrap_or_default()
	}

	fn record(&self, call: TunnelCall) {
		if let Ok(mut calls) = self.calls.lock() {
			calls.push(call);
		}
	}
}

#[async_trait]
impl TunnelController for RecordingTunnelController {
	async fn add_peer(&self, public_key: &WgPublicKey, address: Ipv4Addr) -> Result<()> {
		self.record(TunnelCall::Add(*public_key, address));
		Ok(())
	}

	async fn remove_peer(&self, public_key: &WgPublicKey) -> Result<()> {
		self.record(TunnelCall::Remove(*public_key));
		Ok(())
	}
}

/// Fails every call as if the control tool exited non-zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTunnelController;

#[async_trait]
impl TunnelController for FailingTunnelController {
	async fn add_peer(&self, _public_key: &WgPublicKey, _address: Ipv4Addr) -> Result<()> {
		Err(TunnelError::CommandFailed {
			cmd: "awg".to_string(),
			args: vec!["set".to_string()],
			stderr: "Unable to access interface: No such device".to_string(),
		})
	}

	async fn remove_peer(&self, _public_key: &WgPublicKey) -> Result<()> {
		Err(TunnelError::CommandFailed {
			cmd: "awg".to_string(),
			args: vec!["set".to_string()],
			stderr: "Unable to access interface: No such device".to_string(),
		})
	}
}
