//! In-memory reference implementations of every store trait, each guarded by a
//! `parking_lot::RwLock` over a `HashMap`.

// self
use crate::{
	_prelude::*,
	model::{Connection, ConnectionId, Credential, CredentialStatus, GrantEvent, GrantSnapshot, OutboxEntry, ProviderId, ScopeRef},
	store::{
		ConnectionStore, CredentialStore, GrantStore, GrantStoreTransactional, Installation, InstallationStore,
		NotificationDeliveryStatus, NotificationDispatchLedger, StoreError, StoreFuture, Subscription,
		SubscriptionStore, SyncCursor, SyncCursorStore, OutboxStore,
	},
};

fn ready<'a, T: 'a + Send>(value: Result<T, StoreError>) -> StoreFuture<'a, T> {
	Box::pin(async move { value })
}

/// How long a claimed-but-undecided outbox entry stays ineligible for re-claim.
///
/// Bounds how long a crashed dispatcher can hold an entry hostage before another dispatcher
/// may pick it back up.
const CLAIM_LEASE: Duration = Duration::seconds(30);

/// Single in-memory backend implementing every store trait this crate defines.
///
/// Intended for tests and local development; all state is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
	connections: RwLock<HashMap<ConnectionId, Connection>>,
	credentials: RwLock<HashMap<ConnectionId, Vec<Credential>>>,
	grant_snapshots: RwLock<HashMap<ConnectionId, Vec<GrantSnapshot>>>,
	grant_events: RwLock<HashMap<ConnectionId, Vec<GrantEvent>>>,
	outbox: RwLock<HashMap<String, OutboxEntry>>,
	outbox_claimed_until: RwLock<HashMap<String, OffsetDateTime>>,
	subscriptions: RwLock<HashMap<String, Subscription>>,
	sync_cursors: RwLock<HashMap<(ConnectionId, String), SyncCursor>>,
	installations: RwLock<HashMap<String, Installation>>,
	notification_ledger: RwLock<HashMap<String, (NotificationDeliveryStatus, Option<String>)>>,
}

impl ConnectionStore for MemoryStore {
	fn save(&self, connection: Connection) -> StoreFuture<'_, ()> {
		self.connections.write().insert(connection.id.clone(), connection);

		ready(Ok(()))
	}

	fn get<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, Option<Connection>> {
		ready(Ok(self.connections.read().get(id).cloned()))
	}

	fn list_by_provider_scope<'a>(
		&'a self,
		provider_id: &'a ProviderId,
		scope: &'a ScopeRef,
	) -> StoreFuture<'a, Vec<Connection>> {
		let matches = self
			.connections
			.read()
			.values()
			.filter(|c| &c.provider_id == provider_id && &c.scope == scope)
			.cloned()
			.collect();

		ready(Ok(matches))
	}
}

impl CredentialStore for MemoryStore {
	fn save_new_version(&self, credential: Credential) -> StoreFuture<'_, Credential> {
		let mut guard = self.credentials.write();
		let versions = guard.entry(credential.connection_id.clone()).or_default();

		if credential.status == CredentialStatus::Active {
			for existing in versions.iter_mut() {
				existing.status = CredentialStatus::Revoked;
			}
		}

		versions.push(credential.clone());

		ready(Ok(credential))
	}

	fn get_active_by_connection<'a>(
		&'a self,
		connection_id: &'a ConnectionId,
	) -> StoreFuture<'a, Option<Credential>> {
		let found = self
			.credentials
			.read()
			.get(connection_id)
			.and_then(|versions| versions.iter().rev().find(|c| c.status == CredentialStatus::Active).cloned());

		ready(Ok(found))
	}

	fn get_version<'a>(
		&'a self,
		connection_id: &'a ConnectionId,
		version: u64,
	) -> StoreFuture<'a, Option<Credential>> {
		let found = self
			.credentials
			.read()
			.get(connection_id)
			.and_then(|versions| versions.iter().find(|c| c.version == version).cloned());

		ready(Ok(found))
	}

	fn revoke_active<'a>(&'a self, connection_id: &'a ConnectionId) -> StoreFuture<'a, Option<Credential>> {
		let mut guard = self.credentials.write();
		let revoked = guard.get_mut(connection_id).and_then(|versions| {
			let active = versions.iter_mut().rev().find(|c| c.status == CredentialStatus::Active)?;

			active.status = CredentialStatus::Revoked;

			Some(active.clone())
		});

		ready(Ok(revoked))
	}
}

impl GrantStore for MemoryStore {
	fn save_snapshot(&self, snapshot: GrantSnapshot) -> StoreFuture<'_, ()> {
		self.grant_snapshots.write().entry(snapshot.connection_id.clone()).or_default().push(snapshot);

		ready(Ok(()))
	}

	fn get_latest_snapshot<'a>(&'a self, connection_id: &'a ConnectionId) -> StoreFuture<'a, Option<GrantSnapshot>> {
		let latest = self.grant_snapshots.read().get(connection_id).and_then(|v| v.last().cloned());

		ready(Ok(latest))
	}

	fn append_event(&self, event: GrantEvent) -> StoreFuture<'_, ()> {
		self.grant_events.write().entry(event.connection_id.clone()).or_default().push(event);

		ready(Ok(()))
	}
}
impl GrantStoreTransactional for MemoryStore {
	fn save_snapshot_and_event(&self, snapshot: GrantSnapshot, event: GrantEvent) -> StoreFuture<'_, ()> {
		self.grant_snapshots.write().entry(snapshot.connection_id.clone()).or_default().push(snapshot);
		self.grant_events.write().entry(event.connection_id.clone()).or_default().push(event);

		ready(Ok(()))
	}
}

impl OutboxStore for MemoryStore {
	fn enqueue(&self, entry: OutboxEntry) -> StoreFuture<'_, ()> {
		self.outbox.write().insert(entry.event.id.clone(), entry);

		ready(Ok(()))
	}

	fn claim_batch(&self, limit: usize) -> StoreFuture<'_, Vec<OutboxEntry>> {
		let now = OffsetDateTime::now_utc();
		let outbox = self.outbox.read();
		let mut claimed_until = self.outbox_claimed_until.write();
		let mut claimed = Vec::with_capacity(limit.min(outbox.len()));

		for (event_id, entry) in outbox.iter() {
			if claimed.len() >= limit {
				break;
			}

			if entry.next_attempt_at > now {
				continue;
			}

			if claimed_until.get(event_id).is_some_and(|lease| *lease > now) {
				continue;
			}

			claimed_until.insert(event_id.clone(), now + CLAIM_LEASE);
			claimed.push(entry.clone());
		}

		ready(Ok(claimed))
	}

	fn ack<'a>(&'a self, event_id: &'a str) -> StoreFuture<'a, ()> {
		self.outbox.write().remove(event_id);
		self.outbox_claimed_until.write().remove(event_id);

		ready(Ok(()))
	}

	fn retry<'a>(&'a self, event_id: &'a str, cause: String, next_attempt_at: OffsetDateTime) -> StoreFuture<'a, ()> {
		let mut guard = self.outbox.write();

		if let Some(entry) = guard.get_mut(event_id) {
			entry.attempt += 1;
			entry.next_attempt_at = next_attempt_at;
			entry
				.event
				.metadata
				.insert("last_retry_cause".to_owned(), serde_json::Value::String(cause));
		}

		drop(guard);

		self.outbox_claimed_until.write().remove(event_id);

		ready(Ok(()))
	}
}

impl SubscriptionStore for MemoryStore {
	fn save(&self, subscription: Subscription) -> StoreFuture<'_, ()> {
		self.subscriptions.write().insert(subscription.id.clone(), subscription);

		ready(Ok(()))
	}

	fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Subscription>> {
		ready(Ok(self.subscriptions.read().get(id).cloned()))
	}

	fn remove<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
		self.subscriptions.write().remove(id);

		ready(Ok(()))
	}
}

impl SyncCursorStore for MemoryStore {
	fn save(&self, cursor: SyncCursor) -> StoreFuture<'_, ()> {
		self.sync_cursors.write().insert((cursor.connection_id.clone(), cursor.stream.clone()), cursor);

		ready(Ok(()))
	}

	fn get<'a>(&'a self, connection_id: &'a ConnectionId, stream: &'a str) -> StoreFuture<'a, Option<SyncCursor>> {
		let key = (connection_id.clone(), stream.to_owned());

		ready(Ok(self.sync_cursors.read().get(&key).cloned()))
	}
}

impl InstallationStore for MemoryStore {
	fn save(&self, installation: Installation) -> StoreFuture<'_, ()> {
		self.installations.write().insert(installation.id.clone(), installation);

		ready(Ok(()))
	}

	fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Installation>> {
		ready(Ok(self.installations.read().get(id).cloned()))
	}

	fn remove<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()> {
		self.installations.write().remove(id);

		ready(Ok(()))
	}
}

impl NotificationDispatchLedger for MemoryStore {
	fn has_seen<'a>(&'a self, idempotency_key: &'a str) -> StoreFuture<'a, bool> {
		ready(Ok(self.notification_ledger.read().contains_key(idempotency_key)))
	}

	fn record<'a>(
		&'a self,
		idempotency_key: &'a str,
		status: NotificationDeliveryStatus,
		error: Option<String>,
	) -> StoreFuture<'a, ()> {
		self.notification_ledger.write().insert(idempotency_key.to_owned(), (status, error));

		ready(Ok(()))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use time::OffsetDateTime;

	fn connection() -> Connection {
		Connection::new(
			ConnectionId::new("conn-1").expect("Connection id fixture."),
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"external-1",
		)
	}

	#[tokio::test]
	async fn connection_round_trips() {
		let store = MemoryStore::default();

		store.save(connection()).await.expect("Save should succeed.");

		let fetched = store
			.get(&ConnectionId::new("conn-1").expect("Connection id fixture."))
			.await
			.expect("Get should succeed.")
			.expect("Connection should be present.");

		assert_eq!(fetched.external_account_id, "external-1");
	}

	#[tokio::test]
	async fn credential_save_new_version_revokes_prior_active() {
		let store = MemoryStore::default();
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let first = Credential {
			version: 1,
			connection_id: connection_id.clone(),
			encrypted_payload: vec![1],
			payload_format: crate::model::PayloadFormat::LegacyToken,
			payload_version: 1,
			token_type: None,
			requested_scopes: vec![],
			granted_scopes: vec![],
			expires_at: None,
			rotates_at: None,
			refreshable: false,
			status: CredentialStatus::Active,
		};
		let mut second = first.clone();
		second.version = 2;

		store.save_new_version(first).await.expect("Save should succeed.");
		store.save_new_version(second).await.expect("Save should succeed.");

		let active =
			store.get_active_by_connection(&connection_id).await.expect("Get should succeed.").expect("Active should exist.");

		assert_eq!(active.version, 2);

		let historical =
			store.get_version(&connection_id, 1).await.expect("Get should succeed.").expect("Version 1 should exist.");

		assert_eq!(historical.status, CredentialStatus::Revoked);
	}

	#[tokio::test]
	async fn outbox_claim_ack_and_retry() {
		let store = MemoryStore::default();
		let event = crate::model::LifecycleEvent::new(
			"evt-1",
			"connection.connected",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		);

		store.enqueue(OutboxEntry::new(event, OffsetDateTime::UNIX_EPOCH)).await.expect("Enqueue should succeed.");

		let claimed = store.claim_batch(10).await.expect("Claim should succeed.");
		assert_eq!(claimed.len(), 1);

		store
			.retry("evt-1", "boom".into(), OffsetDateTime::UNIX_EPOCH)
			.await
			.expect("Retry should succeed.");

		let claimed_again = store.claim_batch(10).await.expect("Claim should succeed.");
		assert_eq!(claimed_again[0].attempt, 1);

		store.ack("evt-1").await.expect("Ack should succeed.");

		let claimed_after_ack = store.claim_batch(10).await.expect("Claim should succeed.");
		assert!(claimed_after_ack.is_empty());
	}

	#[tokio::test]
	async fn claim_batch_skips_entries_not_yet_due() {
		let store = MemoryStore::default();
		let event = crate::model::LifecycleEvent::new(
			"evt-future",
			"connection.connected",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		);

		store
			.enqueue(OutboxEntry::new(event, OffsetDateTime::now_utc() + Duration::minutes(5)))
			.await
			.expect("Enqueue should succeed.");

		let claimed = store.claim_batch(10).await.expect("Claim should succeed.");

		assert!(claimed.is_empty(), "An entry scheduled for the future must not be claimable yet.");
	}

	#[tokio::test]
	async fn claim_batch_does_not_double_claim_while_a_lease_is_held() {
		let store = MemoryStore::default();
		let event = crate::model::LifecycleEvent::new(
			"evt-leased",
			"connection.connected",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		);

		store.enqueue(OutboxEntry::new(event, OffsetDateTime::UNIX_EPOCH)).await.expect("Enqueue should succeed.");

		let first_claim = store.claim_batch(10).await.expect("Claim should succeed.");
		assert_eq!(first_claim.len(), 1);

		let second_claim = store.claim_batch(10).await.expect("Claim should succeed.");
		assert!(second_claim.is_empty(), "A concurrent dispatcher must not reclaim a leased entry.");
	}

	#[tokio::test]
	async fn notification_ledger_tracks_seen_keys() {
		let store = MemoryStore::default();

		assert!(!store.has_seen("key-1").await.expect("Has-seen should succeed."));

		store
			.record("key-1", NotificationDeliveryStatus::Sent, None)
			.await
			.expect("Record should succeed.");

		assert!(store.has_seen("key-1").await.expect("Has-seen should succeed."));
	}
}
