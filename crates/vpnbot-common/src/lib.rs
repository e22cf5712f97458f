// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared building blocks for vpnbot.
//!
//! - [`keys`]: WireGuard key pairs (X25519, standard base64)
//! - [`ip`]: the managed tunnel address pool and its allocation policy
//! - [`identity`]: user ids and validated peer names
//! - [`client_config`]: rendering of the client-side `.conf` document
//! - [`secret`]: a redacting wrapper for key material

pub mod client_config;
pub mod identity;
pub mod ip;
pub mod keys;
pub mod secret;

pub use client_config::ClientConfig;
pub use identity::{NameError, PeerName, UserId, SUGGESTED_PEER_NAMES};
pub use ip::{AddressPool, AllocationStrategy, IpError};
pub use keys::{KeyError, WgKeyPair, WgPrivateKey, WgPublicKey};
pub use secret::{Secret, SecretString, REDACTED};
