// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use vpnbot_common::{AddressPool, UserId};
use vpnbot_db::testing::{create_file_test_pool, create_test_pool};
use vpnbot_db::PeerRepository;
use vpnbot_provisioning::testing::{FailingTunnelController, RecordingTunnelController};
use vpnbot_provisioning::{
	DaemonSync, ProvisionError, ProvisioningConfig, ProvisioningService, TunnelController,
	UserIdentity,
};

const SERVER_KEY: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

fn ip(s: &str) -> Ipv4Addr {
	s.parse().unwrap()
}

async fn service(tunnel: Arc<dyn TunnelController>, config: ProvisioningConfig) -> ProvisioningService {
	let repo = PeerRepository::new(create_test_pool().await);
	ProvisioningService::new(Arc::new(repo), tunnel, config)
}

async fn register(service: &ProvisioningService, id: i64) {
	service
		.register_user(&UserIdentity::new(UserId(id)).with_username(format!("user{id}")))
		.await
		.unwrap();
}

fn config() -> ProvisioningConfig {
	ProvisioningConfig::new(SERVER_KEY, "vpn.example.org:51820")
}

#[tokio::test]
async fn create_delete_list_scenario() {
	let service = service(Arc::new(RecordingTunnelController::new()), config()).await;
	register(&service, 1).await;

	let a = service.create(UserId(1), "A").await.unwrap();
	assert_eq!(a.peer.tunnel_address, ip("10.0.0.2"));

	let b = service.create(UserId(1), "B").await.unwrap();
	assert_eq!(b.peer.tunnel_address, ip("10.0.0.3"));

	service.delete(UserId(1), "A").await.unwrap();

	let peers = service.list(UserId(1)).await.unwrap();
	assert_eq!(peers.len(), 1);
	assert_eq!(peers[0].name.as_str(), "B");
	assert_eq!(peers[0].tunnel_address, ip("10.0.0.3"));
}

#[tokio::test]
async fn successive_creates_strictly_increase() {
	let service = service(
		Arc::new(RecordingTunnelController::new()),
		config().with_max_peers_per_user(50),
	)
	.await;
	for user in 1..=4 {
		register(&service, user).await;
	}

	let mut last: Option<Ipv4Addr> = None;
	for user in 1..=4 {
		for n in 0..10 {
			let outcome = service
				.create(UserId(user), &format!("dev{n}"))
				.await
				.unwrap();
			if let Some(prev) = last {
				assert!(outcome.peer.tunnel_address.octets()[3] > prev.octets()[3]);
			}
			last = Some(outcome.peer.tunnel_address);
		}
	}
	assert_eq!(last, Some(ip("10.0.0.41")));
}

#[tokio::test]
async fn recreate_after_delete_never_collides_with_active_peer() {
	let service = service(Arc::new(RecordingTunnelController::new()), config()).await;
	register(&service, 1).await;
	register(&service, 2).await;

	service.create(UserId(1), "X").await.unwrap();
	service.create(UserId(2), "phone").await.unwrap();
	service.create(UserId(1), "laptop").await.unwrap();

	service.delete(UserId(1), "X").await.unwrap();
	let recreated = service.create(UserId(1), "X").await.unwrap();

	let mut active = HashSet::new();
	for user in [1, 2] {
		for peer in service.list(UserId(user)).await.unwrap() {
			assert!(active.insert(peer.tunnel_address), "address shared");
		}
	}
	assert!(active.contains(&recreated.peer.tunnel_address));
	assert_eq!(active.len(), 3);
}

#[tokio::test]
async fn sixth_create_exceeds_quota() {
	let service = service(Arc::new(RecordingTunnelController::new()), config()).await;
	register(&service, 1).await;
	for n in 0..5 {
		service.create(UserId(1), &format!("d{n}")).await.unwrap();
	}

	let err = service.create(UserId(1), "d5").await.unwrap_err();
	assert!(matches!(err, ProvisionError::QuotaExceeded { limit: 5 }));
	assert_eq!(service.stats().await.unwrap().peers, 5);
}

#[tokio::test]
async fn allocation_past_upper_bound_is_exhausted() {
	let service = service(
		Arc::new(RecordingTunnelController::new()),
		config().with_pool(AddressPool::default()),
	)
	.await;

	// 253 peers fill 10.0.0.2..=10.0.0.254 at five per user.
	let mut created = 0;
	let mut user = 0;
	while created < 253 {
		user += 1;
		register(&service, user).await;
		for n in 0..5 {
			if created == 253 {
				break;
			}
			service.create(UserId(user), &format!("p{n}")).await.unwrap();
			created += 1;
		}
	}

	register(&service, 1000).await;
	let err = service.create(UserId(1000), "late").await.unwrap_err();
	assert!(matches!(err, ProvisionError::AddressSpaceExhausted));

	let stats = service.stats().await.unwrap();
	assert_eq!(stats.peers, 253);
	assert!(service.list(UserId(1000)).await.unwrap().is_empty());
}

#[tokio::test]
async fn daemon_failure_still_returns_peer() {
	let service = service(Arc::new(FailingTunnelController), config()).await;
	register(&service, 1).await;

	let outcome = service.create(UserId(1), "router").await.unwrap();
	assert!(matches!(outcome.daemon, DaemonSync::Failed { .. }));
	assert_eq!(outcome.peer.tunnel_address, ip("10.0.0.2"));
	assert!(outcome.client_config.render().contains("Address = 10.0.0.2/32"));

	let peers = service.list(UserId(1)).await.unwrap();
	assert_eq!(peers.len(), 1);
	assert_eq!(peers[0].name.as_str(), "router");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_for_one_name_have_one_winner() {
	let dir = tempfile::tempdir().unwrap();
	let repo = PeerRepository::new(create_file_test_pool(dir.path()).await);
	let service = ProvisioningService::new(
		Arc::new(repo),
		Arc::new(RecordingTunnelController::new()),
		config(),
	);
	register(&service, 1).await;

	let mut handles = Vec::new();
	for _ in 0..8 {
		let service = service.clone();
		handles.push(tokio::spawn(async move {
			service.create(UserId(1), "phone").await
		}));
	}

	let mut ok = 0;
	for handle in handles {
		match handle.await.unwrap() {
			Ok(_) => ok += 1,
			Err(ProvisionError::DuplicateName { .. }) => {}
			Err(e) => panic!("unexpected error: {e}"),
		}
	}
	assert_eq!(ok, 1);
	assert_eq!(service.list(UserId(1)).await.unwrap().len(), 1);
}
