// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::VpnbotConfigLayer;
use crate::sections::{
	BotConfigLayer, DatabaseConfigLayer, LoggingConfigLayer, PeerLimitsConfigLayer, PoolConfigLayer,
	TunnelConfigLayer, WgServerConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<VpnbotConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<VpnbotConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(VpnbotConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/vpnbot/vpnbot.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<VpnbotConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(VpnbotConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: VpnbotConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: VPNBOT_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<VpnbotConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_env(&|name| std::env::var(name).ok())
	}
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Build a layer from an arbitrary variable lookup.
pub fn layer_from_env(lookup: Lookup<'_>) -> Result<VpnbotConfigLayer, ConfigError> {
	let env = Env(lookup);
	Ok(VpnbotConfigLayer {
		database: Some(DatabaseConfigLayer {
			url: env.var("VPNBOT_DATABASE_URL"),
		}),
		pool: Some(PoolConfigLayer {
			network: env.parse("VPNBOT_POOL_NETWORK")?,
			first_host: env.parse("VPNBOT_POOL_FIRST_HOST")?,
			last_host: env.parse("VPNBOT_POOL_LAST_HOST")?,
			strategy: env.parse("VPNBOT_POOL_STRATEGY")?,
		}),
		server: Some(WgServerConfigLayer {
			public_key: env.var("VPNBOT_SERVER_PUBLIC_KEY"),
			endpoint: env.var("VPNBOT_SERVER_ENDPOINT"),
		}),
		tunnel: Some(TunnelConfigLayer {
			enabled: env.bool("VPNBOT_TUNNEL_ENABLED"),
			interface: env.var("VPNBOT_TUNNEL_INTERFACE"),
			control_command: env.var("VPNBOT_TUNNEL_CONTROL_COMMAND"),
			save_command: env.var("VPNBOT_TUNNEL_SAVE_COMMAND"),
			timeout_secs: env.parse("VPNBOT_TUNNEL_TIMEOUT_SECS")?,
		}),
		provisioning: Some(PeerLimitsConfigLayer {
			max_peers_per_user: env.parse("VPNBOT_PROVISIONING_MAX_PEERS_PER_USER")?,
		}),
		bot: Some(BotConfigLayer {
			admin_id: env.parse("VPNBOT_BOT_ADMIN_ID")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env.var("VPNBOT_LOGGING_LEVEL"),
			format: env.parse("VPNBOT_LOGGING_FORMAT")?,
		}),
	})
}

struct Env<'a>(Lookup<'a>);

impl Env<'_> {
	fn var(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Option<bool> {
		self
			.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn parse<T>(&self, name: &str) -> Result<Option<T>, ConfigError>
	where
		T: FromStr,
		T::Err: std::fmt::Display,
	{
		match self.var(name) {
			Some(v) => v.trim().parse().map(Some).map_err(|e| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid value '{v}': {e}"),
			}),
			None => Ok(None),
		}
	}
}
