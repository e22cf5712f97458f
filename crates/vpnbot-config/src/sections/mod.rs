// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for vpnbot.

pub mod bot;
pub mod database;
pub mod logging;
pub mod pool;
pub mod provisioning;
pub mod server;
pub mod tunnel;

pub use bot::{BotConfig, BotConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use pool::{PoolConfig, PoolConfigLayer};
pub use provisioning::{PeerLimitsConfig, PeerLimitsConfigLayer};
pub use server::{WgServerConfig, WgServerConfigLayer};
pub use tunnel::{TunnelConfig, TunnelConfigLayer};
