// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Context as _;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;
use vpnbot_config::VpnbotConfig;
use vpnbot_provisioning::{
	CommandTunnelController, DisabledTunnelController, ProvisioningConfig, ProvisioningService,
	TunnelController,
};

/// Everything a command needs: resolved config, the open pool and the
/// service wired on top of it.
pub struct CliContext {
	pub config: VpnbotConfig,
	pub service: ProvisioningService,
	pool: SqlitePool,
}

impl CliContext {
	/// Open the database, apply migrations and wire the service.
	pub async fn connect(config: VpnbotConfig) -> anyhow::Result<Self> {
		let pool = vpnbot_db::create_pool(&config.database.url)
			.await
			.with_context(|| format!("opening database {}", config.database.url))?;
		vpnbot_db::run_migrations(&pool)
			.await
			.context("running database migrations")?;
		Self::with_pool(config, pool)
	}

	/// Wire the service on an already migrated pool.
	pub fn with_pool(config: VpnbotConfig, pool: SqlitePool) -> anyhow::Result<Self> {
		let store = Arc::new(vpnbot_db::PeerRepository::new(pool.clone()));
		let service = ProvisioningService::new(store, tunnel_controller(&config), provisioning_config(&config)?);
		Ok(Self {
			config,
			service,
			pool,
		})
	}

	pub async fn close(self) {
		self.pool.close().await;
		info!("database pool closed");
	}
}

/// Server key and endpoint may be absent here; commands that render a
/// client config check for them via [`VpnbotConfig::server_identity`].
pub fn provisioning_config(config: &VpnbotConfig) -> anyhow::Result<ProvisioningConfig> {
	let pool = config.address_pool()?;
	Ok(ProvisioningConfig::new(
		config.server.public_key.clone().unwrap_or_default(),
		config.server.endpoint.clone().unwrap_or_default(),
	)
	.with_pool(pool)
	.with_max_peers_per_user(config.provisioning.max_peers_per_user))
}

pub fn tunnel_controller(config: &VpnbotConfig) -> Arc<dyn TunnelController> {
	let tunnel = &config.tunnel;
	if !tunnel.enabled {
		info!("tunnel control disabled, peers will only be stored");
		return Arc::new(DisabledTunnelController);
	}
	Arc::new(
		CommandTunnelController::new(&tunnel.interface)
			.with_commands(&tunnel.control_command, &tunnel.save_command)
			.with_timeout(tunnel.timeout()),
	)
}
