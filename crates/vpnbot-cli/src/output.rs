// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Writing client configs to disk.

use std::path::{Path, PathBuf};
use tracing::instrument;
use vpnbot_common::{ClientConfig, PeerName, UserId};

/// Resolve `--output`: a directory gets the default file name appended.
pub fn resolve_output_path(output: &Path, user_id: UserId, name: &PeerName) -> PathBuf {
	if output.is_dir() {
		output.join(ClientConfig::file_name(user_id, name))
	} else {
		output.to_path_buf()
	}
}

/// Write the rendered document. The file holds a private key, so it is
/// created owner-only on unix.
#[instrument(skip(config), fields(path = %path.display()))]
pub async fn write_client_config(config: &ClientConfig, path: &Path) -> std::io::Result<()> {
	let content = config.render();

	#[cfg(unix)]
	{
		use tokio::fs::OpenOptions;
		use tokio::io::AsyncWriteExt;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.mode(0o600)
			.open(path)
			.await?;
		file.write_all(content.as_bytes()).await?;
		file.flush().await?;
	}

	#[cfg(not(unix))]
	{
		tokio::fs::write(path, content).await?;
	}

	Ok(())
}
