// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command-line front end for vpnbot.
//!
//! Each invocation carries the caller's identity (`--user-id`, optionally
//! `--username`/`--first-name`) the way a chat update would, runs one verb
//! against the provisioning service and prints the reply on stdout.

pub mod commands;
pub mod context;
pub mod messages;
pub mod output;

pub use commands::{dispatch, Command, IdentityArgs};
pub use context::CliContext;
