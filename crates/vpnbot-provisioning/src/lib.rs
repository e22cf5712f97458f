// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer provisioning and lifecycle.
//!
//! [`ProvisioningService`] ties together key generation, address
//! allocation (inside the store), persistence and the tunnel daemon.

pub mod config;
pub mod error;
pub mod service;
pub mod testing;
pub mod tunnel;
pub mod types;

pub use config::{ProvisioningConfig, DEFAULT_MAX_PEERS_PER_USER};
pub use error::{ErrorKind, ProvisionError, Result};
pub use service::ProvisioningService;
pub use tunnel::{CommandTunnelController, DisabledTunnelController, TunnelController, TunnelError};
pub use types::{
	CreateOutcome, DaemonSync, DeleteOutcome, PeerState, Profile, Stats, UserIdentity,
};
