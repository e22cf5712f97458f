// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reply texts. Plain strings so the front end can decorate them.

use vpnbot_common::SUGGESTED_PEER_NAMES;
use vpnbot_db::{PeerRecord, UserRecord};
use vpnbot_provisioning::{
	CreateOutcome, DaemonSync, DeleteOutcome, ErrorKind, Profile, ProvisionError, Stats,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub fn greeting(user: &UserRecord) -> String {
	format!(
		"Hello, {}!\n\nI hand out VPN configs. Create one with `vpnbot create <name>`, \
		 for example one of: {}.",
		user.display_name(),
		SUGGESTED_PEER_NAMES.join(", ")
	)
}

pub fn created(outcome: &CreateOutcome) -> String {
	let mut text = format!(
		"Your VPN config \"{}\" is ready.\n\nIP: {}\n\nImport the file into a WireGuard or AmneziaWG client.",
		outcome.peer.name, outcome.peer.tunnel_address
	);
	if let Some(warning) = daemon_warning(&outcome.daemon, "The config", "created") {
		text.push_str("\n\n");
		text.push_str(&warning);
	}
	text
}

/// The user asked to create a name they already hold.
pub fn resending(name: &str) -> String {
	format!("You already have a VPN config named \"{name}\". Sending it again.")
}

pub fn deleted(outcome: &DeleteOutcome) -> String {
	let subject = format!("VPN config \"{}\"", outcome.peer.name);
	daemon_warning(&outcome.daemon, &subject, "removed")
		.unwrap_or_else(|| format!("{subject} was removed from the server and the database."))
}

/// Reply sentence when the daemon did not take the change.
pub fn daemon_warning(daemon: &DaemonSync, subject: &str, action: &str) -> Option<String> {
	match daemon {
		DaemonSync::Applied => None,
		DaemonSync::Failed { .. } => {
			Some(format!("{subject} was {action}, but the server could not be updated."))
		}
	}
}

pub fn peer_list(peers: &[PeerRecord]) -> String {
	if peers.is_empty() {
		return no_peers_hint();
	}
	let mut text = String::from("Your VPN configs:\n");
	for peer in peers {
		text.push_str(&format!(
			"\n  {:<12} {:<15} created {}",
			peer.name.as_str(),
			peer.tunnel_address.to_string(),
			peer.created_at.format(TIME_FORMAT)
		));
	}
	text
}

pub fn profile(profile: &Profile) -> String {
	let user = &profile.user;
	let mut text = format!(
		"Your profile\n\nID: {}\nUsername: @{}\nRegistered: {}\n",
		user.id,
		user.username.as_deref().unwrap_or("none"),
		user.created_at.format(TIME_FORMAT)
	);
	if profile.peers.is_empty() {
		text.push('\n');
		text.push_str(&no_peers_hint());
		return text;
	}
	for peer in &profile.peers {
		text.push_str(&format!(
			"\nVPN config \"{}\"\nIP: {}\nCreated: {}\n",
			peer.name,
			peer.tunnel_address,
			peer.created_at.format(TIME_FORMAT)
		));
	}
	text
}

pub fn stats(stats: &Stats) -> String {
	format!(
		"Statistics\n\nTotal users: {}\nVPN configs: {}",
		stats.users, stats.peers
	)
}

fn no_peers_hint() -> String {
	"You have no VPN configs yet.\n\nRun `vpnbot create <name>` to create one.".to_string()
}

/// Human-readable reply for a failed request.
pub fn error_reply(err: &ProvisionError) -> String {
	match err {
		ProvisionError::DuplicateName { name } => {
			format!("You already have a VPN config named \"{name}\".")
		}
		ProvisionError::NotFound { name } => format!("You have no VPN config named \"{name}\"."),
		ProvisionError::QuotaExceeded { limit } => format!(
			"You already have {limit} VPN configs, which is the limit. Delete one first."
		),
		ProvisionError::InvalidName(e) => format!(
			"That name cannot be used ({e}). Use up to 32 letters, digits, '-' or '_'."
		),
		ProvisionError::UnknownUser(_) => "Please run `vpnbot start` first.".to_string(),
		_ => match err.kind() {
			ErrorKind::OperatorError => {
				"The server has run out of VPN addresses. Please contact the administrator."
					.to_string()
			}
			ErrorKind::CallerError | ErrorKind::InternalError => {
				"Something went wrong on our side. Please try again later.".to_string()
			}
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use std::net::Ipv4Addr;
	use vpnbot_common::{ClientConfig, PeerName, UserId, WgKeyPair};

	fn user(first_name: Option<&str>) -> UserRecord {
		UserRecord {
			id: UserId(42),
			username: Some("alice".to_string()),
			first_name: first_name.map(str::to_string),
			created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
		}
	}

	fn peer(name: &str, last_octet: u8) -> PeerRecord {
		let keys = WgKeyPair::generate();
		PeerRecord {
			id: i64::from(last_octet),
			user_id: UserId(42),
			name: PeerName::new(name).unwrap(),
			private_key: keys.private_key().to_base64(),
			public_key: *keys.public_key(),
			tunnel_address: Ipv4Addr::new(10, 0, 0, last_octet),
			created_at: Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap(),
		}
	}

	fn outcome(daemon: DaemonSync) -> CreateOutcome {
		let peer = peer("phone", 2);
		let client_config = ClientConfig::new(
			peer.private_key.clone(),
			peer.tunnel_address,
			"SERVER",
			"1.2.3.4:51820",
		);
		CreateOutcome {
			peer,
			client_config,
			daemon,
		}
	}

	#[test]
	fn greeting_uses_first_name() {
		let text = greeting(&user(Some("Alice")));
		assert!(text.starts_with("Hello, Alice!"));
		assert!(text.contains("phone, laptop"));
		assert!(greeting(&user(None)).starts_with("Hello, @alice!"));
	}

	#[test]
	fn created_mentions_address() {
		let text = created(&outcome(DaemonSync::Applied));
		assert!(text.contains("\"phone\""));
		assert!(text.contains("IP: 10.0.0.2"));
		assert!(!text.contains("could not be updated"));
	}

	#[test]
	fn created_with_daemon_failure_warns() {
		let text = created(&outcome(DaemonSync::Failed {
			reason: "awg: not found".to_string(),
		}));
		assert!(text.ends_with("\n\nThe config was created, but the server could not be updated."));
		assert!(!text.contains("awg: not found"));
	}

	#[test]
	fn deleted_reports_daemon_state() {
		let ok = DeleteOutcome {
			peer: peer("laptop", 3),
			daemon: DaemonSync::Applied,
		};
		assert!(deleted(&ok).contains("removed from the server and the database"));

		let failed = DeleteOutcome {
			daemon: DaemonSync::Failed {
				reason: "timeout".to_string(),
			},
			..ok
		};
		assert_eq!(
			deleted(&failed),
			"VPN config \"laptop\" was removed, but the server could not be updated."
		);
	}

	#[test]
	fn empty_list_hints_at_create() {
		assert!(peer_list(&[]).contains("vpnbot create"));
		let text = peer_list(&[peer("phone", 3), peer("laptop", 2)]);
		assert!(text.contains("phone"));
		assert!(text.contains("10.0.0.2"));
		assert!(text.contains("2025-03-02 08:00 UTC"));
	}

	#[test]
	fn profile_lists_peers_or_hint() {
		let empty = Profile {
			user: user(Some("Alice")),
			peers: vec![],
		};
		let text = profile(&empty);
		assert!(text.contains("ID: 42"));
		assert!(text.contains("Username: @alice"));
		assert!(text.contains("Registered: 2025-03-01 12:30 UTC"));
		assert!(text.contains("no VPN configs yet"));

		let full = Profile {
			user: user(None),
			peers: vec![peer("router", 7)],
		};
		assert!(profile(&full).contains("IP: 10.0.0.7"));
	}

	#[test]
	fn stats_text() {
		assert_eq!(
			stats(&Stats { users: 3, peers: 8 }),
			"Statistics\n\nTotal users: 3\nVPN configs: 8"
		);
	}

	#[test]
	fn error_replies_are_distinct_per_kind() {
		let exhausted = error_reply(&ProvisionError::AddressSpaceExhausted);
		let internal = error_reply(&ProvisionError::Internal("boom".to_string()));
		let quota = error_reply(&ProvisionError::QuotaExceeded { limit: 5 });
		assert!(exhausted.contains("run out of VPN addresses"));
		assert!(internal.contains("went wrong"));
		assert!(!internal.contains("boom"));
		assert!(quota.contains("5 VPN configs"));
		assert_ne!(exhausted, internal);
	}
}
