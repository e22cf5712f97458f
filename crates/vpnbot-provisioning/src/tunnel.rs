// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control of the running tunnel daemon's peer table.
//!
//! The daemon is driven through its command-line tools. The peer table is
//! not authoritative: the store is, and a failed daemon call never undoes a
//! store change.

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, trace, warn};
use vpnbot_common::WgPublicKey;

pub const DEFAULT_INTERFACE: &str = "wg0";
pub const DEFAULT_CONTROL_COMMAND: &str = "awg";
pub const DEFAULT_SAVE_COMMAND: &str = "awg-quick";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum TunnelError {
	#[error("{program} is not installed or not on PATH")]
	NotInstalled { program: String },

	#[error("{cmd} {} failed: {stderr}", .args.join(" "))]
	CommandFailed {
		cmd: String,
		args: Vec<String>,
		stderr: String,
	},

	#[error("{cmd} did not finish within {}s", .timeout.as_secs_f32())]
	Timeout { cmd: String, timeout: Duration },

	#[error("peer applied but saving the interface failed: {0}")]
	SaveFailed(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("tunnel control is disabled")]
	Disabled,
}

pub type Result<T> = std::result::Result<T, TunnelError>;

#[async_trait]
pub trait TunnelController: Send + Sync {
	/// Register `public_key` with `address/32` as its only allowed IP and
	/// persist the interface so the peer survives a daemon restart.
	async fn add_peer(&self, public_key: &WgPublicKey, address: Ipv4Addr) -> Result<()>;

	/// Drop `public_key` from the interface and persist.
	async fn remove_peer(&self, public_key: &WgPublicKey) -> Result<()>;
}

/// Drives `awg`/`wg` (set) and `awg-quick`/`wg-quick` (save).
#[derive(Debug, Clone)]
pub struct CommandTunnelController {
	interface: String,
	control_command: String,
	save_command: String,
	timeout: Duration,
}

impl Default for CommandTunnelController {
	fn default() -> Self {
		Self::new(DEFAULT_INTERFACE)
	}
}

impl CommandTunnelController {
	pub fn new(interface: impl Into<String>) -> Self {
		Self {
			interface: interface.into(),
			control_command: DEFAULT_CONTROL_COMMAND.to_string(),
			save_command: DEFAULT_SAVE_COMMAND.to_string(),
			timeout: DEFAULT_TIMEOUT,
		}
	}

	pub fn with_commands(
		mut self,
		control_command: impl Into<String>,
		save_command: impl Into<String>,
	) -> Self {
		self.control_command = control_command.into();
		self.save_command = save_command.into();
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn interface(&self) -> &str {
		&self.interface
	}

	async fn save(&self) -> Result<()> {
		run_command(&self.save_command, &["save", &self.interface], self.timeout)
			.await
			.map(|_| ())
			.map_err(|e| TunnelError::SaveFailed(e.to_string()))
	}
}

#[async_trait]
impl TunnelController for CommandTunnelController {
	#[tracing::instrument(skip(self, public_key), fields(peer = %public_key.short(), %address, interface = %self.interface))]
	async fn add_peer(&self, public_key: &WgPublicKey, address: Ipv4Addr) -> Result<()> {
		let key = public_key.to_base64();
		let allowed_ips = format!("{address}/32");
		run_command(
			&self.control_command,
			&[
				"set",
				&self.interface,
				"peer",
				&key,
				"allowed-ips",
				&allowed_ips,
			],
			self.timeout,
		)
		.await?;
		info!("peer added to interface");

		self.save().await
	}

	#[tracing::instrument(skip(self, public_key), fields(peer = %public_key.short(), interface = %self.interface))]
	async fn remove_peer(&self, public_key: &WgPublicKey) -> Result<()> {
		let key = public_key.to_base64();
		run_command(
			&self.control_command,
			&["set", &self.interface, "peer", &key, "remove"],
			self.timeout,
		)
		.await?;
		info!("peer removed from interface");

		self.save().await
	}
}

/// Stands in for the daemon when `tunnel.enabled = false`. Every call
/// fails with [`TunnelError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTunnelController;

#[async_trait]
impl TunnelController for DisabledTunnelController {
	async fn add_peer(&self, public_key: &WgPublicKey, address: Ipv4Addr) -> Result<()> {
		debug!(peer = %public_key.short(), %address, "tunnel disabled, not adding peer");
		Err(TunnelError::Disabled)
	}

	async fn remove_peer(&self, public_key: &WgPublicKey) -> Result<()> {
		debug!(peer = %public_key.short(), "tunnel disabled, not removing peer");
		Err(TunnelError::Disabled)
	}
}

async fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String> {
	let mut cmd = Command::new(program);
	cmd
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	trace!(cmd = %format!("{program} {}", args.join(" ")), "running tunnel command");

	let output = match tokio::time::timeout(timeout, cmd.output()).await {
		Ok(result) => result.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				warn!(program, "tunnel tool not found in PATH");
				TunnelError::NotInstalled {
					program: program.to_string(),
				}
			} else {
				TunnelError::Io(e)
			}
		})?,
		Err(_) => {
			warn!(program, ?timeout, "tunnel command timed out");
			return Err(TunnelError::Timeout {
				cmd: program.to_string(),
				timeout,
			});
		}
	};

	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
	} else {
		let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
		warn!(program, %stderr, "tunnel command failed");
		Err(TunnelError::CommandFailed {
			cmd: program.to_string(),
			args: args.iter().map(|s| s.to_string()).collect(),
			stderr,
		})
	}
}
