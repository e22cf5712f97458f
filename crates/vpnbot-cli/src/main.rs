// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! vpnbot binary.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vpnbot_cli::commands::{self, Command, IdentityArgs, Reply};
use vpnbot_cli::CliContext;
use vpnbot_common::WgKeyPair;
use vpnbot_config::{LogFormat, LoggingConfig};

/// vpnbot - WireGuard/AmneziaWG peer provisioning.
#[derive(Parser, Debug)]
#[command(name = "vpnbot", about = "WireGuard/AmneziaWG peer provisioning", version)]
struct Cli {
	/// Config file (defaults to /etc/vpnbot/vpnbot.toml)
	#[arg(long, global = true, env = "VPNBOT_CONFIG")]
	config: Option<PathBuf>,

	#[command(flatten)]
	identity: IdentityArgs,

	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	if let Command::Keygen = cli.command {
		let reply = Reply {
			text: commands::keygen_text(&WgKeyPair::generate()),
			success: true,
			attachment: None,
		};
		return commands::print_reply(reply, None).await;
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &cli.config {
		Some(path) => vpnbot_config::load_config_with_file(path)?,
		None => vpnbot_config::load_config()?,
	};

	init_tracing(&config.logging);
	config.log_summary();

	tracing::debug!(
		database = %config.database.url,
		interface = %config.tunnel.interface,
		"starting vpnbot"
	);

	let ctx = CliContext::connect(config).await?;
	let result = commands::dispatch(cli.command, &cli.identity, &ctx).await;
	ctx.close().await;

	commands::print_reply(result?, cli.identity.user_id).await
}

/// Logs go to stderr; stdout carries only the reply.
fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| logging.level.clone().into());
	let registry = tracing_subscriber::registry().with(filter);
	let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

	match logging.format {
		LogFormat::Pretty => registry.with(layer.pretty()).init(),
		LogFormat::Compact => registry.with(layer.compact()).init(),
		LogFormat::Json => registry.with(layer.json()).init(),
	}
}
