// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::context::CliContext;
use crate::messages;
use crate::output;
use clap::{Args, Subcommand};
use console::style;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing::{info, instrument};
use vpnbot_common::{ClientConfig, PeerName, UserId, WgKeyPair};
use vpnbot_provisioning::{ProvisionError, UserIdentity};

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Register (or refresh) the caller and show the greeting
	Start,
	/// Create a named peer and print its client config
	Create(PeerArgs),
	/// List the caller's peers
	List,
	/// Remove a peer from the daemon and the store
	Delete(NameArg),
	/// Print the client config of an existing peer again
	Download(PeerArgs),
	/// Show the caller's profile
	Profile,
	/// Global counts (admin only)
	Stats,
	/// Print a fresh key pair and a sample client config
	Keygen,
}

impl Command {
	/// Verbs that upsert the caller's user row before running. `start`
	/// upserts inside its handler so it can greet with the stored record.
	fn refreshes_user(&self) -> bool {
		!matches!(self, Command::Start | Command::Stats | Command::Keygen)
	}
}

#[derive(Debug, Clone, Args)]
pub struct IdentityArgs {
	/// Id of the calling user
	#[arg(long, global = true, env = "VPNBOT_USER_ID")]
	pub user_id: Option<i64>,

	#[arg(long, global = true)]
	pub username: Option<String>,

	#[arg(long, global = true)]
	pub first_name: Option<String>,
}

impl IdentityArgs {
	pub fn identity(&self) -> anyhow::Result<UserIdentity> {
		let id = self
			.user_id
			.ok_or_else(|| anyhow::anyhow!("--user-id (or VPNBOT_USER_ID) is required"))?;
		let mut identity = UserIdentity::new(UserId(id));
		identity.username = self.username.clone();
		identity.first_name = self.first_name.clone();
		Ok(identity)
	}
}

#[derive(Debug, Clone, Args)]
pub struct NameArg {
	/// Peer name, e.g. phone or laptop
	pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct PeerArgs {
	#[command(flatten)]
	pub peer: NameArg,

	/// Write the config to this file (or directory) instead of stdout
	#[arg(long, short)]
	pub output: Option<PathBuf>,
}

/// What a command hands back to the terminal.
#[derive(Debug, Default)]
pub struct Reply {
	pub text: String,
	pub success: bool,
	pub attachment: Option<Attachment>,
}

#[derive(Debug)]
pub struct Attachment {
	pub name: PeerName,
	pub config: ClientConfig,
	pub output: Option<PathBuf>,
}

impl Reply {
	fn ok(text: impl Into<String>) -> Self {
		Self {
			text: text.into(),
			success: true,
			attachment: None,
		}
	}

	fn failed(err: &ProvisionError) -> Self {
		Self {
			text: messages::error_reply(err),
			success: false,
			attachment: None,
		}
	}

	/// Nothing is printed at all.
	fn silent() -> Self {
		Self::default()
	}
}

/// Run one command against the service. Caller errors become replies;
/// anything else is returned as an error.
pub async fn dispatch(command: Command, ident: &IdentityArgs, ctx: &CliContext) -> anyhow::Result<Reply> {
	let identity = match command {
		Command::Keygen => UserIdentity::new(UserId(ident.user_id.unwrap_or_default())),
		_ => ident.identity()?,
	};
	match run(command, &identity, ctx).await {
		Ok(reply) => Ok(reply),
		Err(e) if matches!(e.kind(), vpnbot_provisioning::ErrorKind::InternalError) => Err(e.into()),
		Err(e) => Ok(Reply::failed(&e)),
	}
}

type HandlerResult = vpnbot_provisioning::Result<Reply>;

async fn run(command: Command, identity: &UserIdentity, ctx: &CliContext) -> HandlerResult {
	if command.refreshes_user() {
		ctx.service.register_user(identity).await?;
	}
	match command {
		Command::Start => handle_start(identity, ctx).await,
		Command::Create(args) => handle_create(identity, args, ctx).await,
		Command::List => handle_list(identity, ctx).await,
		Command::Delete(args) => handle_delete(identity, args, ctx).await,
		Command::Download(args) => handle_download(identity, args, ctx).await,
		Command::Profile => handle_profile(identity, ctx).await,
		Command::Stats => handle_stats(identity, ctx).await,
		Command::Keygen => Ok(Reply::ok(keygen_text(&WgKeyPair::generate()))),
	}
}

#[instrument(skip_all, fields(user_id = %identity.id))]
async fn handle_start(identity: &UserIdentity, ctx: &CliContext) -> HandlerResult {
	let user = ctx.service.register_user(identity).await?;
	info!(username = ?user.username, "user started bot");
	Ok(Reply::ok(messages::greeting(&user)))
}

#[instrument(skip_all, fields(user_id = %identity.id, name = %args.peer.name))]
async fn handle_create(identity: &UserIdentity, args: PeerArgs, ctx: &CliContext) -> HandlerResult {
	require_server(ctx)?;
	match ctx.service.create(identity.id, &args.peer.name).await {
		Ok(outcome) => {
			let text = messages::created(&outcome);
			Ok(Reply {
				text,
				success: outcome.daemon.is_applied(),
				attachment: Some(Attachment {
					name: outcome.peer.name,
					config: outcome.client_config,
					output: args.output,
				}),
			})
		}
		Err(ProvisionError::DuplicateName { name }) => {
			let config = ctx.service.download(identity.id, &name).await?;
			Ok(Reply {
				text: messages::resending(&name),
				success: true,
				attachment: Some(Attachment {
					name: PeerName::new(name)?,
					config,
					output: args.output,
				}),
			})
		}
		Err(e) => Err(e),
	}
}

#[instrument(skip_all, fields(user_id = %identity.id))]
async fn handle_list(identity: &UserIdentity, ctx: &CliContext) -> HandlerResult {
	let peers = ctx.service.list(identity.id).await?;
	Ok(Reply::ok(messages::peer_list(&peers)))
}

#[instrument(skip_all, fields(user_id = %identity.id, name = %args.name))]
async fn handle_delete(identity: &UserIdentity, args: NameArg, ctx: &CliContext) -> HandlerResult {
	let outcome = ctx.service.delete(identity.id, &args.name).await?;
	Ok(Reply {
		text: messages::deleted(&outcome),
		success: outcome.daemon.is_applied(),
		attachment: None,
	})
}

#[instrument(skip_all, fields(user_id = %identity.id, name = %args.peer.name))]
async fn handle_download(identity: &UserIdentity, args: PeerArgs, ctx: &CliContext) -> HandlerResult {
	require_server(ctx)?;
	let config = ctx.service.download(identity.id, &args.peer.name).await?;
	Ok(Reply {
		text: String::new(),
		success: true,
		attachment: Some(Attachment {
			name: PeerName::new(args.peer.name)?,
			config,
			output: args.output,
		}),
	})
}

#[instrument(skip_all, fields(user_id = %identity.id))]
async fn handle_profile(identity: &UserIdentity, ctx: &CliContext) -> HandlerResult {
	let profile = ctx.service.profile(identity.id).await?;
	Ok(Reply::ok(messages::profile(&profile)))
}

#[instrument(skip_all, fields(user_id = %identity.id))]
async fn handle_stats(identity: &UserIdentity, ctx: &CliContext) -> HandlerResult {
	if !ctx.config.is_admin(identity.id.get()) {
		return Ok(Reply::silent());
	}
	let stats = ctx.service.stats().await?;
	Ok(Reply::ok(messages::stats(&stats)))
}

fn require_server(ctx: &CliContext) -> vpnbot_provisioning::Result<()> {
	ctx
		.config
		.server_identity()
		.map(|_| ())
		.map_err(|e| ProvisionError::Internal(e.to_string()))
}

/// Key pair plus a sample client config with placeholder server values.
pub fn keygen_text(keys: &WgKeyPair) -> String {
	let private_key = keys.private_key().to_base64();
	let sample = ClientConfig::new(
		private_key.clone(),
		Ipv4Addr::new(10, 0, 0, 2),
		"SERVER_PUBLIC_KEY_HERE",
		"1.2.3.4:51820",
	);
	format!(
		"Private key: {}\nPublic key:  {}\n\nSample client config:\n\n{}",
		private_key.expose(),
		keys.public_key(),
		sample.render()
	)
}

/// Print a reply and deliver its attachment.
pub async fn print_reply(reply: Reply, user_id: Option<i64>) -> anyhow::Result<()> {
	if !reply.text.is_empty() {
		let marker = if reply.success {
			style("✓").green().bold()
		} else {
			style("!").yellow().bold()
		};
		println!("{marker} {}", reply.text);
	}

	let Some(attachment) = reply.attachment else {
		return Ok(());
	};

	match attachment.output {
		Some(output) => {
			let user_id = UserId(user_id.unwrap_or_default());
			let path = output::resolve_output_path(&output, user_id, &attachment.name);
			output::write_client_config(&attachment.config, &path).await?;
			println!(
				"{} Saved {}",
				style("✓").green().bold(),
				style(path.display()).cyan()
			);
		}
		None => {
			if !reply.text.is_empty() {
				println!();
			}
			print!("{}", attachment.config.render());
		}
	}
	Ok(())
}
