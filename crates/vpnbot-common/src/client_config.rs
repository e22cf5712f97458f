// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client-side `.conf` document handed to the user.

use crate::identity::{PeerName, UserId};
use crate::secret::SecretString;
use std::fmt::Write as _;
use std::net::Ipv4Addr;

pub const CLIENT_DNS: &str = "1.1.1.1, 8.8.8.8";
pub const CLIENT_MTU: u16 = 1380;
pub const CLIENT_ALLOWED_IPS: &str = "0.0.0.0/0, ::/0";
pub const PERSISTENT_KEEPALIVE_SECS: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub private_key: SecretString,
	pub address: Ipv4Addr,
	pub server_public_key: String,
	pub server_endpoint: String,
}

impl ClientConfig {
	pub fn new(
		private_key: SecretString,
		address: Ipv4Addr,
		server_public_key: impl Into<String>,
		server_endpoint: impl Into<String>,
	) -> Self {
		Self {
			private_key,
			address,
			server_public_key: server_public_key.into(),
			server_endpoint: server_endpoint.into(),
		}
	}

	/// The full document, private key included. Never log the result.
	pub fn render(&self) -> String {
		let mut out = String::with_capacity(320);
		// Writing to a String cannot fail.
		let _ = write!(
			out,
			"[Interface]\n\
			 PrivateKey = {private_key}\n\
			 Address = {address}/32\n\
			 DNS = {CLIENT_DNS}\n\
			 MTU = {CLIENT_MTU}\n\
			 \n\
			 [Peer]\n\
			 PublicKey = {server_public_key}\n\
			 Endpoint = {server_endpoint}\n\
			 AllowedIPs = {CLIENT_ALLOWED_IPS}\n\
			 PersistentKeepalive = {PERSISTENT_KEEPALIVE_SECS}\n",
			private_key = self.private_key.expose(),
			address = self.address,
			server_public_key = self.server_public_key,
			server_endpoint = self.server_endpoint,
		);
		out
	}

	/// Default file name when the document is saved for a user.
	pub fn file_name(user_id: UserId, name: &PeerName) -> String {
		format!("vpn_{user_id}_{name}.conf")
	}
}
