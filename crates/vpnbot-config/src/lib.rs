// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for vpnbot.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Config file (`/etc/vpnbot/vpnbot.toml`, or a path given by the caller)
//! 3. Environment variables (`VPNBOT_<SECTION>_<FIELD>`)
//!
//! # Usage
//!
//! ```ignore
//! use vpnbot_config::load_config;
//!
//! let config = load_config()?;
//! println!("allocating from {}", config.pool.network);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::VpnbotConfigLayer;
pub use sections::*;
pub use sources::{layer_from_env, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};
use vpnbot_common::{AddressPool, WgPublicKey};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct VpnbotConfig {
	pub database: DatabaseConfig,
	pub pool: PoolConfig,
	pub server: WgServerConfig,
	pub tunnel: TunnelConfig,
	pub provisioning: PeerLimitsConfig,
	pub bot: BotConfig,
	pub logging: LoggingConfig,
}

impl VpnbotConfig {
	/// Log the resolved settings. Call once the subscriber is installed.
	pub fn log_summary(&self) {
		info!(
			database = %self.database.url,
			network = %self.pool.network,
			first_host = self.pool.first_host,
			last_host = self.pool.last_host,
			strategy = %self.pool.strategy,
			interface = %self.tunnel.interface,
			tunnel_enabled = self.tunnel.enabled,
			max_peers_per_user = self.provisioning.max_peers_per_user,
			server_configured = self.server.public_key.is_some() && self.server.endpoint.is_some(),
			"vpnbot configuration loaded"
		);
	}

	/// The validated address pool.
	pub fn address_pool(&self) -> Result<AddressPool, ConfigError> {
		self
			.pool
			.address_pool()
			.map_err(|e| ConfigError::Validation(format!("pool: {e}")))
	}

	/// Server public key and endpoint, both of which every client config needs.
	pub fn server_identity(&self) -> Result<(&str, &str), ConfigError> {
		let key = self
			.server
			.public_key
			.as_deref()
			.ok_or_else(|| ConfigError::Missing("server.public_key (VPNBOT_SERVER_PUBLIC_KEY)".into()))?;
		let endpoint = self
			.server
			.endpoint
			.as_deref()
			.ok_or_else(|| ConfigError::Missing("server.endpoint (VPNBOT_SERVER_ENDPOINT)".into()))?;
		Ok((key, endpoint))
	}

	pub fn is_admin(&self, user_id: i64) -> bool {
		self.bot.admin_id == Some(user_id)
	}
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<VpnbotConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<VpnbotConfig, ConfigError> {
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	];
	load_from_sources(sources)
}

/// Merge the given sources by precedence and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<VpnbotConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = VpnbotConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: VpnbotConfigLayer) -> Result<VpnbotConfig, ConfigError> {
	let config = VpnbotConfig {
		database: layer.database.unwrap_or_default().finalize(),
		pool: layer.pool.unwrap_or_default().finalize(),
		server: layer.server.unwrap_or_default().finalize(),
		tunnel: layer.tunnel.unwrap_or_default().finalize(),
		provisioning: layer.provisioning.unwrap_or_default().finalize(),
		bot: layer.bot.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &VpnbotConfig) -> Result<(), ConfigError> {
	config.address_pool()?;

	if let Some(key) = &config.server.public_key {
		WgPublicKey::from_base64(key).map_err(|e| ConfigError::InvalidValue {
			key: "server.public_key".to_string(),
			message: e.to_string(),
		})?;
	}

	if config.tunnel.timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"tunnel.timeout_secs must be at least 1".to_string(),
		));
	}

	if config.provisioning.max_peers_per_user == 0 {
		return Err(ConfigError::Validation(
			"provisioning.max_peers_per_user must be at least 1".to_string(),
		));
	}

	Ok(())
}
