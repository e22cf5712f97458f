// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use tracing::{info, instrument, warn};
use vpnbot_common::{ClientConfig, PeerName, UserId, WgKeyPair};
use vpnbot_db::{DbError, NewPeer, PeerRecord, PeerStore, UserRecord};

use crate::config::ProvisioningConfig;
use crate::error::{ProvisionError, Result};
use crate::tunnel::{TunnelController, TunnelError};
use crate::types::{
	CreateOutcome, DaemonSync, DeleteOutcome, PeerState, Profile, Stats, UserIdentity,
};

/// Peer lifecycle on top of a [`PeerStore`] and a [`TunnelController`].
///
/// The store is authoritative. Daemon failures are reported in the outcome
/// and never roll back a store change.
#[derive(Clone)]
pub struct ProvisioningService {
	store: Arc<dyn PeerStore>,
	tunnel: Arc<dyn TunnelController>,
	config: Arc<ProvisioningConfig>,
}

impl ProvisioningService {
	pub fn new(
		store: Arc<dyn PeerStore>,
		tunnel: Arc<dyn TunnelController>,
		config: ProvisioningConfig,
	) -> Self {
		Self {
			store,
			tunnel,
			config: Arc::new(config),
		}
	}

	pub fn config(&self) -> &ProvisioningConfig {
		&self.config
	}

	#[instrument(skip(self, identity), fields(user_id = %identity.id))]
	pub async fn register_user(&self, identity: &UserIdentity) -> Result<UserRecord> {
		let user = self
			.store
			.upsert_user(
				identity.id,
				identity.username.as_deref(),
				identity.first_name.as_deref(),
			)
			.await?;
		Ok(user)
	}

	#[instrument(skip(self), fields(%user_id))]
	pub async fn create(&self, user_id: UserId, name: &str) -> Result<CreateOutcome> {
		let name = PeerName::new(name)?;

		if self.store.get_user(user_id).await?.is_none() {
			return Err(ProvisionError::UnknownUser(user_id));
		}

		if self.store.get_peer(user_id, &name).await?.is_some() {
			return Err(ProvisionError::DuplicateName {
				name: name.into_inner(),
			});
		}

		let keypair = WgKeyPair::generate();
		let new = NewPeer {
			user_id,
			name: name.clone(),
			private_key: keypair.private_key().to_base64(),
			public_key: *keypair.public_key(),
		};

		let peer = self
			.store
			.allocate_peer(&new, &self.config.pool, self.config.max_peers_per_user)
			.await
			.map_err(|e| match e {
				DbError::Conflict(_) => ProvisionError::DuplicateName {
					name: name.to_string(),
				},
				other => other.into(),
			})?;

		info!(
			name = %peer.name,
			address = %peer.tunnel_address,
			peer = %peer.public_key.short(),
			"peer created"
		);

		let daemon = sync_result(
			self
				.tunnel
				.add_peer(&peer.public_key, peer.tunnel_address)
				.await,
		);
		let client_config = self.client_config(&peer);

		Ok(CreateOutcome {
			peer,
			client_config,
			daemon,
		})
	}

	#[instrument(skip(self), fields(%user_id))]
	pub async fn list(&self, user_id: UserId) -> Result<Vec<PeerRecord>> {
		Ok(self.store.list_peers(user_id).await?)
	}

	#[instrument(skip(self), fields(%user_id))]
	pub async fn status(&self, user_id: UserId, name: &str) -> Result<PeerState> {
		let name = PeerName::new(name)?;
		Ok(match self.store.get_peer(user_id, &name).await? {
			Some(peer) => PeerState::Active(peer),
			None => PeerState::Absent,
		})
	}

	/// Re-render the client config of an existing peer.
	#[instrument(skip(self), fields(%user_id))]
	pub async fn download(&self, user_id: UserId, name: &str) -> Result<ClientConfig> {
		match self.status(user_id, name).await? {
			PeerState::Active(peer) => Ok(self.client_config(&peer)),
			PeerState::Absent => Err(ProvisionError::NotFound {
				name: name.to_string(),
			}),
		}
	}

	#[instrument(skip(self), fields(%user_id))]
	pub async fn delete(&self, user_id: UserId, name: &str) -> Result<DeleteOutcome> {
		let name = PeerName::new(name)?;
		let peer = self
			.store
			.get_peer(user_id, &name)
			.await?
			.ok_or_else(|| ProvisionError::NotFound {
				name: name.to_string(),
			})?;

		let daemon = sync_result(self.tunnel.remove_peer(&peer.public_key).await);

		if !self.store.delete_peer(user_id, &name).await? {
			return Err(ProvisionError::NotFound {
				name: name.into_inner(),
			});
		}

		info!(
			name = %peer.name,
			address = %peer.tunnel_address,
			"peer deleted"
		);

		Ok(DeleteOutcome { peer, daemon })
	}

	#[instrument(skip(self), fields(%user_id))]
	pub async fn profile(&self, user_id: UserId) -> Result<Profile> {
		let user = self
			.store
			.get_user(user_id)
			.await?
			.ok_or(ProvisionError::UnknownUser(user_id))?;
		let peers = self.store.list_peers(user_id).await?;
		Ok(Profile { user, peers })
	}

	#[instrument(skip(self))]
	pub async fn stats(&self) -> Result<Stats> {
		Ok(Stats {
			users: self.store.count_users().await?,
			peers: self.store.count_peers().await?,
		})
	}

	fn client_config(&self, peer: &PeerRecord) -> ClientConfig {
		ClientConfig::new(
			peer.private_key.clone(),
			peer.tunnel_address,
			self.config.server_public_key.clone(),
			self.config.server_endpoint.clone(),
		)
	}
}

fn sync_result(result: std::result::Result<(), TunnelError>) -> DaemonSync {
	match result {
		Ok(()) => DaemonSync::Applied,
		Err(e) => {
			warn!(error = %e, "tunnel daemon not updated");
			DaemonSync::Failed {
				reason: e.to_string(),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FailingTunnelController, RecordingTunnelController, TunnelCall};
	use crate::tunnel::DisabledTunnelController;
	use std::net::Ipv4Addr;
	use vpnbot_common::{AddressPool, AllocationStrategy};
	use vpnbot_db::testing::create_test_pool;
	use vpnbot_db::PeerRepository;

	const SERVER_KEY: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

	fn ip(s: &str) -> Ipv4Addr {
		s.parse().unwrap()
	}

	async fn service_with(
		tunnel: Arc<dyn TunnelController>,
		config: ProvisioningConfig,
	) -> ProvisioningService {
		let repo = PeerRepository::new(create_test_pool().await);
		let service = ProvisioningService::new(Arc::new(repo), tunnel, config);
		service
			.register_user(
				&UserIdentity::new(UserId(1))
					.with_username("ivan")
					.with_first_name("Ivan"),
			)
			.await
			.unwrap();
		service
	}

	fn config() -> ProvisioningConfig {
		ProvisioningConfig::new(SERVER_KEY, "203.0.113.7:51820")
	}

	#[tokio::test]
	async fn test_create_applies_to_daemon() {
		let tunnel = Arc::new(RecordingTunnelController::new());
		let service = service_with(tunnel.clone(), config()).await;

		let outcome = service.create(UserId(1), "phone").await.unwrap();

		assert_eq!(outcome.peer.tunnel_address, ip("10.0.0.2"));
		assert_eq!(outcome.daemon, DaemonSync::Applied);
		assert_eq!(
			tunnel.calls(),
			vec![TunnelCall::Add(outcome.peer.public_key, ip("10.0.0.2"))]
		);

		let rendered = outcome.client_config.render();
		assert!(rendered.contains(&format!(
			"PrivateKey = {}",
			outcome.peer.private_key.expose()
		)));
		assert!(rendered.contains("Address = 10.0.0.2/32"));
		assert!(rendered.contains(&format!("PublicKey = {SERVER_KEY}")));
		assert!(rendered.contains("Endpoint = 203.0.113.7:51820"));
	}

	#[tokio::test]
	async fn test_create_rejects_invalid_name() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		let err = service.create(UserId(1), "my phone").await.unwrap_err();
		assert!(matches!(err, ProvisionError::InvalidName(_)));
	}

	#[tokio::test]
	async fn test_create_requires_registration() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		let err = service.create(UserId(2), "phone").await.unwrap_err();
		assert!(matches!(err, ProvisionError::UnknownUser(UserId(2))));
	}

	#[tokio::test]
	async fn test_duplicate_name_leaves_store_unchanged() {
		let tunnel = Arc::new(RecordingTunnelController::new());
		let service = service_with(tunnel.clone(), config()).await;
		let first = service.create(UserId(1), "phone").await.unwrap();

		let err = service.create(UserId(1), "phone").await.unwrap_err();
		assert!(matches!(err, ProvisionError::DuplicateName { ref name } if name == "phone"));

		let peers = service.list(UserId(1)).await.unwrap();
		assert_eq!(peers.len(), 1);
		assert_eq!(peers[0], first.peer);
		assert_eq!(tunnel.calls().len(), 1);
	}

	#[tokio::test]
	async fn test_switch_from_first_free_to_sequential_skips_live_addresses() {
		let store: Arc<dyn PeerStore> = Arc::new(PeerRepository::new(create_test_pool().await));
		let tunnel: Arc<dyn TunnelController> = Arc::new(RecordingTunnelController::new());
		let first_free = ProvisioningService::new(
			store.clone(),
			tunnel.clone(),
			config().with_pool(AddressPool::default().with_strategy(AllocationStrategy::FirstFree)),
		);
		first_free
			.register_user(&UserIdentity::new(UserId(1)))
			.await
			.unwrap();
		for name in ["a", "b", "c"] {
			first_free.create(UserId(1), name).await.unwrap();
		}
		first_free.delete(UserId(1), "a").await.unwrap();
		let d = first_free.create(UserId(1), "d").await.unwrap();
		assert_eq!(d.peer.tunnel_address, ip("10.0.0.2"));

		let sequential = ProvisioningService::new(store, tunnel, config());
		let fresh = sequential.create(UserId(1), "fresh").await.unwrap();
		assert_eq!(fresh.peer.tunnel_address, ip("10.0.0.5"));
	}

	#[tokio::test]
	async fn test_quota_exceeded_adds_nothing() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		for label in ["phone", "laptop", "tablet", "desktop", "router"] {
			service.create(UserId(1), label).await.unwrap();
		}

		let err = service.create(UserId(1), "spare").await.unwrap_err();
		assert!(matches!(err, ProvisionError::QuotaExceeded { limit: 5 }));
		assert_eq!(service.list(UserId(1)).await.unwrap().len(), 5);
	}

	#[tokio::test]
	async fn test_exhausted_pool() {
		let pool = AddressPool::new("10.0.0.0/24".parse().unwrap(), 253, 254).unwrap();
		let service = service_with(
			Arc::new(RecordingTunnelController::new()),
			config().with_pool(pool),
		)
		.await;
		service.create(UserId(1), "phone").await.unwrap();
		let second = service.create(UserId(1), "laptop").await.unwrap();
		assert_eq!(second.peer.tunnel_address, ip("10.0.0.254"));

		let err = service.create(UserId(1), "tablet").await.unwrap_err();
		assert!(matches!(err, ProvisionError::AddressSpaceExhausted));
		assert_eq!(err.kind(), crate::error::ErrorKind::OperatorError);
		assert_eq!(service.stats().await.unwrap().peers, 2);
	}

	#[tokio::test]
	async fn test_daemon_failure_keeps_record() {
		let service = service_with(Arc::new(FailingTunnelController), config()).await;

		let outcome = service.create(UserId(1), "phone").await.unwrap();
		assert!(matches!(outcome.daemon, DaemonSync::Failed { ref reason } if reason.contains("No such device")));

		let peers = service.list(UserId(1)).await.unwrap();
		assert_eq!(peers.len(), 1);
		assert_eq!(peers[0].name.as_str(), "phone");
	}

	#[tokio::test]
	async fn test_disabled_tunnel_is_degraded_not_fatal() {
		let service = service_with(Arc::new(DisabledTunnelController), config()).await;
		let outcome = service.create(UserId(1), "phone").await.unwrap();
		assert!(!outcome.daemon.is_applied());
		let deleted = service.delete(UserId(1), "phone").await.unwrap();
		assert!(!deleted.daemon.is_applied());
	}

	#[tokio::test]
	async fn test_status_lifecycle() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		assert_eq!(
			service.status(UserId(1), "phone").await.unwrap(),
			PeerState::Absent
		);

		let created = service.create(UserId(1), "phone").await.unwrap();
		assert_eq!(
			service.status(UserId(1), "phone").await.unwrap(),
			PeerState::Active(created.peer.clone())
		);

		service.delete(UserId(1), "phone").await.unwrap();
		assert_eq!(
			service.status(UserId(1), "phone").await.unwrap(),
			PeerState::Absent
		);
	}

	#[tokio::test]
	async fn test_delete_removes_from_daemon_then_store() {
		let tunnel = Arc::new(RecordingTunnelController::new());
		let service = service_with(tunnel.clone(), config()).await;
		let created = service.create(UserId(1), "phone").await.unwrap();

		let outcome = service.delete(UserId(1), "phone").await.unwrap();
		assert_eq!(outcome.peer.id, created.peer.id);
		assert_eq!(outcome.daemon, DaemonSync::Applied);
		assert_eq!(
			tunnel.calls().last(),
			Some(&TunnelCall::Remove(created.peer.public_key))
		);
		assert!(service.list(UserId(1)).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_delete_missing_is_not_found() {
		let tunnel = Arc::new(RecordingTunnelController::new());
		let service = service_with(tunnel.clone(), config()).await;
		let err = service.delete(UserId(1), "phone").await.unwrap_err();
		assert!(matches!(err, ProvisionError::NotFound { .. }));
		assert!(tunnel.calls().is_empty());
	}

	#[tokio::test]
	async fn test_delete_with_failing_daemon_still_deletes() {
		let service = service_with(Arc::new(FailingTunnelController), config()).await;
		service.create(UserId(1), "phone").await.unwrap();

		let outcome = service.delete(UserId(1), "phone").await.unwrap();
		assert!(!outcome.daemon.is_applied());
		assert!(service.list(UserId(1)).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_download_matches_create() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		let created = service.create(UserId(1), "laptop").await.unwrap();

		let downloaded = service.download(UserId(1), "laptop").await.unwrap();
		assert_eq!(downloaded.render(), created.client_config.render());

		let err = service.download(UserId(1), "phone").await.unwrap_err();
		assert!(matches!(err, ProvisionError::NotFound { .. }));
	}

	#[tokio::test]
	async fn test_profile_and_stats() {
		let service = service_with(Arc::new(RecordingTunnelController::new()), config()).await;
		service
			.register_user(&UserIdentity::new(UserId(2)).with_first_name("Anna"))
			.await
			.unwrap();
		service.create(UserId(1), "phone").await.unwrap();
		service.create(UserId(1), "laptop").await.unwrap();
		service.create(UserId(2), "phone").await.unwrap();

		let profile = service.profile(UserId(1)).await.unwrap();
		assert_eq!(profile.user.username.as_deref(), Some("ivan"));
		assert_eq!(profile.peers.len(), 2);
		assert_eq!(profile.peers[0].name.as_str(), "laptop");

		assert_eq!(
			service.stats().await.unwrap(),
			Stats { users: 2, peers: 3 }
		);

		let err = service.profile(UserId(3)).await.unwrap_err();
		assert!(matches!(err, ProvisionError::UnknownUser(_)));
	}
}
