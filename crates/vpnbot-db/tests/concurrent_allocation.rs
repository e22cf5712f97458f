// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashSet;
use vpnbot_common::{AddressPool, PeerName, UserId, WgKeyPair};
use vpnbot_db::testing::create_file_test_pool;
use vpnbot_db::{DbError, NewPeer, PeerRepository, PeerStore};

fn make_peer(user_id: i64, name: &str) -> NewPeer {
	let keypair = WgKeyPair::generate();
	NewPeer {
		user_id: UserId(user_id),
		name: PeerName::new(name).unwrap(),
		private_key: keypair.private_key().to_base64(),
		public_key: *keypair.public_key(),
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocations_never_share_an_address() {
	let dir = tempfile::tempdir().unwrap();
	let repo = PeerRepository::new(create_file_test_pool(dir.path()).await);
	for user in 1..=8 {
		repo.upsert_user(UserId(user), None, None).await.unwrap();
	}

	let pool = AddressPool::default();
	let mut handles = Vec::new();
	for user in 1..=8_i64 {
		for label in ["phone", "laptop", "tablet"] {
			let repo = repo.clone();
			handles.push(tokio::spawn(async move {
				repo.allocate_peer(&make_peer(user, label), &pool, 5).await
			}));
		}
	}

	let mut addresses = HashSet::new();
	for handle in handles {
		let record = handle.await.unwrap().unwrap();
		assert!(pool.contains(record.tunnel_address));
		assert!(addresses.insert(record.tunnel_address));
	}
	assert_eq!(addresses.len(), 24);
	assert_eq!(repo.count_peers().await.unwrap(), 24);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_name_has_one_winner() {
	let dir = tempfile::tempdir().unwrap();
	let repo = PeerRepository::new(create_file_test_pool(dir.path()).await);
	repo.upsert_user(UserId(1), Some("ivan"), None).await.unwrap();

	let store: std::sync::Arc<dyn PeerStore> = std::sync::Arc::new(repo.clone());
	let pool = AddressPool::default();
	let mut handles = Vec::new();
	for _ in 0..10 {
		let store = store.clone();
		handles.push(tokio::spawn(async move {
			store.allocate_peer(&make_peer(1, "phone"), &pool, 5).await
		}));
	}

	let mut ok = 0;
	let mut conflicts = 0;
	for handle in handles {
		match handle.await.unwrap() {
			Ok(_) => ok += 1,
			Err(DbError::Conflict(_)) => conflicts += 1,
			Err(e) => panic!("unexpected error: {e}"),
		}
	}
	assert_eq!(ok, 1);
	assert_eq!(conflicts, 9);
	assert_eq!(repo.count_peers_for_user(UserId(1)).await.unwrap(), 1);
}

/// Each task opens its own pool, as separate bot processes sharing one file would.
async fn independent_repository(url: &str) -> PeerRepository {
	PeerRepository::new(vpnbot_db::create_pool(url).await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_pools_same_name_has_one_winner() {
	let dir = tempfile::tempdir().unwrap();
	let seed = PeerRepository::new(create_file_test_pool(dir.path()).await);
	seed.upsert_user(UserId(1), Some("ivan"), None).await.unwrap();
	let url = format!("sqlite:{}", dir.path().join("vpnbot-test.db").display());

	let pool = AddressPool::default();
	let mut handles = Vec::new();
	for _ in 0..8 {
		let url = url.clone();
		handles.push(tokio::spawn(async move {
			let repo = independent_repository(&url).await;
			repo.allocate_peer(&make_peer(1, "phone"), &pool, 5).await
		}));
	}

	let mut ok = 0;
	let mut conflicts = 0;
	for handle in handles {
		match handle.await.unwrap() {
			Ok(_) => ok += 1,
			Err(DbError::Conflict(_)) => conflicts += 1,
			Err(e) => panic!("unexpected error: {e}"),
		}
	}
	assert_eq!(ok, 1);
	assert_eq!(conflicts, 7);
	assert_eq!(seed.count_peers_for_user(UserId(1)).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_pools_never_share_an_address() {
	let dir = tempfile::tempdir().unwrap();
	let seed = PeerRepository::new(create_file_test_pool(dir.path()).await);
	for user in 1..=6 {
		seed.upsert_user(UserId(user), None, None).await.unwrap();
	}
	let url = format!("sqlite:{}", dir.path().join("vpnbot-test.db").display());

	let pool = AddressPool::default();
	let mut handles = Vec::new();
	for user in 1..=6_i64 {
		let url = url.clone();
		handles.push(tokio::spawn(async move {
			let repo = independent_repository(&url).await;
			let mut records = Vec::new();
			for label in ["phone", "laptop"] {
				records.push(repo.allocate_peer(&make_peer(user, label), &pool, 5).await.unwrap());
			}
			records
		}));
	}

	let mut addresses = HashSet::new();
	for handle in handles {
		for record in handle.await.unwrap() {
			assert!(addresses.insert(record.tunnel_address));
		}
	}
	assert_eq!(addresses.len(), 12);
	assert_eq!(seed.count_peers().await.unwrap(), 12);
}

#[tokio::test]
async fn file_backed_store_survives_reopen() {
	let dir = tempfile::tempdir().unwrap();
	{
		let pool = create_file_test_pool(dir.path()).await;
		let repo = PeerRepository::new(pool.clone());
		repo.upsert_user(UserId(5), None, Some("Anna")).await.unwrap();
		repo
			.allocate_peer(&make_peer(5, "router"), &AddressPool::default(), 5)
			.await
			.unwrap();
		pool.close().await;
	}

	let repo = PeerRepository::new(create_file_test_pool(dir.path()).await);
	let peers = repo.list_peers(UserId(5)).await.unwrap();
	assert_eq!(peers.len(), 1);
	assert_eq!(peers[0].tunnel_address, "10.0.0.2".parse::<std::net::Ipv4Addr>().unwrap());
	let user = repo.get_user(UserId(5)).await.unwrap().unwrap();
	assert_eq!(user.display_name(), "Anna");
}
