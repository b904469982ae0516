//! Credential refresh orchestration: locking, provider invocation, idempotent rotation, grant
//! reconciliation, and status transitions on unrecoverable failures.

// self
use crate::{
	_prelude::*,
	cancel::Cancellation,
	codec::CredentialCodec,
	error::Error,
	grant_algebra,
	lock::{ConnectionLocker, LockAlreadyHeld},
	model::{
		ActiveCredential, CapabilityDescriptor, Connection, ConnectionId, Credential, CredentialStatus,
		GrantEvent, GrantEventType, GrantSnapshot, PayloadFormat, materially_differs,
	},
	operation::Sleeper,
	provider::Provider,
	registry::ProviderRegistry,
	store::{ConnectionStore, CredentialStore, GrantStore},
};

/// Whether a refresh call owns the connection lock itself, or is nested inside a caller that
/// already holds it (e.g. [`CredentialLifecycle::run_refresh_with_retry`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockScope {
	/// This call must acquire and release the lock itself.
	Outer,
	/// A caller already holds the lock; do not re-acquire.
	AlreadyLocked,
}

/// Input to a refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshRequest {
	/// Connection to refresh.
	pub connection_id: ConnectionId,
	/// Credential to refresh from, if the caller already has it decoded; otherwise the active
	/// stored credential is loaded and decoded.
	pub credential: Option<ActiveCredential>,
}

/// Successful result of a refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshOutcome {
	/// The credential now active for the connection (freshly rotated, or unchanged).
	pub credential: ActiveCredential,
	/// The connection after any status transitions from this refresh.
	pub connection: Connection,
	/// Whether reconciliation found missing required grants and requested re-consent.
	pub needs_reconsent: bool,
}

/// A refresh failure, annotated with whether it transitioned the connection to
/// `pending_reauth`.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct RefreshFailure {
	/// The underlying error.
	#[source]
	pub error: Error,
	/// Whether the connection was transitioned to `pending_reauth` because of this failure.
	pub pending_reauth: bool,
}

/// Operational defaults for [`CredentialLifecycle::run_refresh_with_retry`].
#[derive(Clone, Copy, Debug)]
pub struct RefreshDefaults {
	/// Maximum attempts, including the first.
	pub max_attempts: u32,
	/// Initial backoff delay.
	pub initial_backoff: Duration,
	/// Maximum backoff delay.
	pub max_backoff: Duration,
	/// TTL for the outer connection lock.
	pub lock_ttl: Duration,
}
impl Default for RefreshDefaults {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			initial_backoff: Duration::milliseconds(500),
			max_backoff: Duration::seconds(10),
			lock_ttl: Duration::seconds(30),
		}
	}
}

fn backoff_delay(attempt: u32, defaults: &RefreshDefaults) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	let scaled = defaults.initial_backoff * 2_i32.pow(exponent);

	scaled.min(defaults.max_backoff)
}

/// Orchestrates credential refresh across the connection store, credential store, grant
/// store, provider registry, and connection locker.
pub struct CredentialLifecycle<CS, CRS, GS, SL> {
	connection_store: Arc<CS>,
	credential_store: Arc<CRS>,
	grant_store: Arc<GS>,
	locker: Arc<ConnectionLocker>,
	registry: Arc<ProviderRegistry>,
	sleeper: SL,
	codec: CredentialCodec,
	defaults: RefreshDefaults,
}
impl<CS, CRS, GS, SL> CredentialLifecycle<CS, CRS, GS, SL>
where
	CS: ConnectionStore,
	CRS: CredentialStore,
	GS: GrantStore,
	SL: Sleeper,
{
	/// Builds a lifecycle orchestrator from its component stores and the provider registry.
	pub fn new(
		connection_store: Arc<CS>,
		credential_store: Arc<CRS>,
		grant_store: Arc<GS>,
		locker: Arc<ConnectionLocker>,
		registry: Arc<ProviderRegistry>,
		sleeper: SL,
		defaults: RefreshDefaults,
	) -> Self {
		Self { connection_store, credential_store, grant_store, locker, registry, sleeper, codec: CredentialCodec, defaults }
	}

	async fn load_connection(&self, connection_id: &ConnectionId) -> Result<Connection, Error> {
		self.connection_store
			.get(connection_id)
			.await
			.map_err(Error::Storage)?
			.ok_or_else(|| crate::store::StoreError::NotFound { what: format!("connection {connection_id}") }.into())
	}

	async fn load_active_credential(
		&self,
		req: &RefreshRequest,
	) -> Result<ActiveCredential, Error> {
		if let Some(credential) = req.credential.clone() {
			return Ok(credential);
		}

		let stored = self
			.credential_store
			.get_active_by_connection(&req.connection_id)
			.await
			.map_err(Error::Storage)?
			.ok_or(Error::TokenExpired)?;

		self.codec.decode(stored.payload_format, stored.payload_version, &stored.encrypted_payload, &req.connection_id)
	}

	fn provider_for(&self, connection: &Connection) -> Result<Arc<dyn Provider>, Error> {
		self.registry
			.get(connection.provider_id.as_ref())
			.ok_or_else(|| Error::ProviderNotFound { provider_id: connection.provider_id.to_string() })
	}

	/// Performs a single refresh attempt: lock (unless `lock_scope` says it's already held),
	/// call the provider, idempotently rotate the credential, reconcile grants, and surface
	/// a `needs_reconsent` transition if required grants are now missing.
	pub async fn refresh(&self, req: RefreshRequest, lock_scope: LockScope) -> Result<RefreshOutcome, Error> {
		let now = OffsetDateTime::now_utc();
		let mut guard = match lock_scope {
			LockScope::Outer => Some(
				self.locker
					.acquire(req.connection_id.clone(), self.defaults.lock_ttl, now)
					.map_err(|LockAlreadyHeld| Error::RefreshLocked { connection_id: req.connection_id.to_string() })?,
			),
			LockScope::AlreadyLocked => None,
		};

		let result = self.refresh_locked(&req, now).await;

		if let Some(handle) = guard.as_mut() {
			handle.release();
		}

		result
	}

	async fn refresh_locked(&self, req: &RefreshRequest, now: OffsetDateTime) -> Result<RefreshOutcome, Error> {
		let mut connection = self.load_connection(&req.connection_id).await?;
		let provider = self.provider_for(&connection)?;
		let current = self.load_active_credential(req).await?;
		let mut refreshed = provider.refresh(&current).await?;

		if let Some(grant_aware) = provider.grant_aware() {
			refreshed.requested_scopes = grant_aware.normalize_grants(&refreshed.requested_scopes);
			refreshed.granted_scopes = grant_aware.normalize_grants(&refreshed.granted_scopes);
		} else {
			refreshed.requested_scopes = grant_algebra::normalize(&refreshed.requested_scopes);
			refreshed.granted_scopes = grant_algebra::normalize(&refreshed.granted_scopes);
		}

		let stored_current =
			self.credential_store.get_active_by_connection(&req.connection_id).await.map_err(Error::Storage)?;
		let current_version = stored_current.as_ref().map_or(0, |c| c.version);

		if materially_differs(&current, &refreshed) || stored_current.is_none() {
			let payload = self.codec.encode(
				PayloadFormat::ActiveCredentialJson,
				CredentialCodec::CURRENT_JSON_VERSION,
				&refreshed,
			)?;
			let new_version = Credential {
				version: current_version + 1,
				connection_id: req.connection_id.clone(),
				encrypted_payload: payload,
				payload_format: PayloadFormat::ActiveCredentialJson,
				payload_version: CredentialCodec::CURRENT_JSON_VERSION,
				token_type: refreshed.token_type.clone(),
				requested_scopes: refreshed.requested_scopes.clone(),
				granted_scopes: refreshed.granted_scopes.clone(),
				expires_at: refreshed.expires_at,
				rotates_at: refreshed.rotates_at,
				refreshable: refreshed.refreshable,
				status: CredentialStatus::Active,
			};

			self.credential_store.save_new_version(new_version).await.map_err(Error::Storage)?;
		}

		connection.mark_active();

		let previous_snapshot = self.grant_store.get_latest_snapshot(&req.connection_id).await.map_err(Error::Storage)?;
		let previous_granted = previous_snapshot.as_ref().map(|s| s.granted.clone()).unwrap_or_default();
		let delta = grant_algebra::delta(&previous_granted, &refreshed.granted_scopes);
		let next_version = previous_snapshot.as_ref().map_or(1, |s| s.version + 1);
		let snapshot = GrantSnapshot {
			connection_id: req.connection_id.clone(),
			version: next_version,
			requested: refreshed.requested_scopes.clone(),
			granted: refreshed.granted_scopes.clone(),
			captured_at: now,
		};

		self.grant_store.save_snapshot(snapshot).await.map_err(Error::Storage)?;

		if let Some(event_type) = delta.event_type {
			self.grant_store
				.append_event(GrantEvent::new(req.connection_id.clone(), event_type, delta.added, delta.removed, now))
				.await
				.map_err(Error::Storage)?;
		}

		let capabilities: Vec<CapabilityDescriptor> = provider.capabilities();
		let missing = grant_algebra::missing_required(&capabilities, &refreshed.granted_scopes);
		let needs_reconsent = !missing.is_empty();

		if needs_reconsent {
			connection.mark_needs_reconsent();
			self.grant_store
				.append_event(GrantEvent::new(
					req.connection_id.clone(),
					GrantEventType::ReconsentRequested,
					vec![],
					missing,
					now,
				))
				.await
				.map_err(Error::Storage)?;
		}

		self.connection_store.save(connection.clone()).await.map_err(Error::Storage)?;

		Ok(RefreshOutcome { credential: refreshed, connection, needs_reconsent })
	}

	async fn transition_pending_reauth(&self, connection_id: &ConnectionId, error: &Error) {
		if let Ok(Some(mut connection)) = self.connection_store.get(connection_id).await {
			connection.mark_pending_reauth(error.to_string());
			let _ = self.connection_store.save(connection).await;
		}
	}

	/// Wraps [`Self::refresh`] with outer locking and bounded retry, transitioning the
	/// connection to `pending_reauth` on any unrecoverable error or after exhausting
	/// `defaults.max_attempts`.
	pub async fn run_refresh_with_retry(
		&self,
		req: RefreshRequest,
		cancel: &Cancellation,
	) -> Result<RefreshOutcome, RefreshFailure> {
		let now = OffsetDateTime::now_utc();
		let mut handle = self
			.locker
			.acquire(req.connection_id.clone(), self.defaults.lock_ttl, now)
			.map_err(|LockAlreadyHeld| RefreshFailure {
				error: Error::RefreshLocked { connection_id: req.connection_id.to_string() },
				pending_reauth: false,
			})?;

		let mut attempt = 0_u32;

		loop {
			attempt += 1;

			match self.refresh(req.clone(), LockScope::AlreadyLocked).await {
				Ok(outcome) => {
					handle.release();

					return Ok(outcome);
				},
				Err(error) => {
					let unrecoverable = error.is_unrecoverable_for_refresh();
					let exhausted = attempt >= self.defaults.max_attempts;

					if unrecoverable || exhausted {
						self.transition_pending_reauth(&req.connection_id, &error).await;
						handle.release();

						return Err(RefreshFailure { error, pending_reauth: true });
					}

					let delay = backoff_delay(attempt, &self.defaults);

					self.sleeper.sleep(delay, cancel).await;

					if cancel.is_cancelled() {
						handle.release();

						return Err(RefreshFailure { error, pending_reauth: false });
					}
				},
			}
		}
	}

	/// Loads (or accepts) a credential, evaluates freshness, and refreshes it if
	/// [`crate::freshness::should_refresh`] recommends it.
	pub async fn ensure_credential_fresh(
		&self,
		req: RefreshRequest,
		expiring_soon_window: Duration,
		refresh_lead_window: Duration,
		cancel: &Cancellation,
	) -> Result<(ActiveCredential, crate::freshness::FreshnessState), RefreshFailure> {
		let current = self
			.load_active_credential(&req)
			.await
			.map_err(|error| RefreshFailure { error, pending_reauth: false })?;
		let now = OffsetDateTime::now_utc();
		let state = crate::freshness::resolve_credential_token_state(&current, now, expiring_soon_window);

		if !crate::freshness::should_refresh(state, current.expires_at, now, refresh_lead_window) {
			return Ok((current, state));
		}

		let outcome = self.run_refresh_with_retry(req, cancel).await?;
		let refreshed_state =
			crate::freshness::resolve_credential_token_state(&outcome.credential, now, expiring_soon_window);

		Ok((outcome.credential, refreshed_state))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		model::{DeniedBehavior, ProviderId, ScopeRef, TokenSecret},
		provider::{BeginAuthRequest, BeginAuthResult, CompleteAuthRequest, ProviderFuture},
		store::memory::MemoryStore,
	};

	struct NoopSleeper;
	impl Sleeper for NoopSleeper {
		fn sleep<'a>(
			&'a self,
			_duration: Duration,
			_cancel: &'a Cancellation,
		) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>> {
			Box::pin(async {})
		}
	}

	struct StubProvider {
		id: ProviderId,
		next_access_token: Mutex<String>,
	}
	impl Provider for StubProvider {
		fn id(&self) -> &ProviderId {
			&self.id
		}

		fn auth_kind(&self) -> String {
			"oauth2".into()
		}

		fn supported_scope_types(&self) -> Vec<String> {
			vec!["org".into()]
		}

		fn capabilities(&self) -> Vec<CapabilityDescriptor> {
			vec![CapabilityDescriptor::new(
				crate::model::CapabilityName::new("reports.read").expect("Capability name fixture."),
				vec!["reports.read".into()],
			)
			.with_denied_behavior(DeniedBehavior::Block)]
		}

		fn begin_auth(&self, _request: BeginAuthRequest) -> ProviderFuture<'_, BeginAuthResult> {
			Box::pin(async { unimplemented!() })
		}

		fn complete_auth(&self, _request: CompleteAuthRequest) -> ProviderFuture<'_, ActiveCredential> {
			Box::pin(async { unimplemented!() })
		}

		fn refresh<'a>(&'a self, credential: &'a ActiveCredential) -> ProviderFuture<'a, ActiveCredential> {
			let next_token = self.next_access_token.lock().clone();
			let mut refreshed = credential.clone();

			refreshed.access_token = TokenSecret::new(next_token);

			Box::pin(async move { Ok(refreshed) })
		}
	}

	async fn lifecycle() -> (
		CredentialLifecycle<MemoryStore, MemoryStore, MemoryStore, NoopSleeper>,
		Arc<MemoryStore>,
		ConnectionId,
	) {
		let store = Arc::new(MemoryStore::default());
		let registry = Arc::new(ProviderRegistry::new());
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let provider_id = ProviderId::new("github").expect("Provider id fixture.");

		registry
			.register(Arc::new(StubProvider { id: provider_id.clone(), next_access_token: Mutex::new("access-2".into()) }))
			.expect("Register should succeed.");

		let connection =
			Connection::new(connection_id.clone(), provider_id, ScopeRef::new("org", "org-1").expect("Scope fixture."), "external-1");

		store.save(connection).await.expect("Save should succeed.");

		let initial = Credential {
			version: 1,
			connection_id: connection_id.clone(),
			encrypted_payload: b"access-1".to_vec(),
			payload_format: PayloadFormat::LegacyToken,
			payload_version: 1,
			token_type: None,
			requested_scopes: vec!["reports.read".into()],
			granted_scopes: vec!["reports.read".into()],
			expires_at: None,
			rotates_at: None,
			refreshable: true,
			status: CredentialStatus::Active,
		};

		store.save_new_version(initial).await.expect("Save should succeed.");

		let lifecycle = CredentialLifecycle::new(
			store.clone(),
			store.clone(),
			store.clone(),
			Arc::new(ConnectionLocker::new()),
			registry,
			NoopSleeper,
			RefreshDefaults::default(),
		);

		(lifecycle, store, connection_id)
	}

	#[tokio::test]
	async fn refresh_rotates_version_on_material_change() {
		let (lifecycle, store, connection_id) = lifecycle().await;
		let outcome = lifecycle
			.refresh(RefreshRequest { connection_id: connection_id.clone(), credential: None }, LockScope::Outer)
			.await
			.expect("Refresh should succeed.");

		assert_eq!(outcome.credential.access_token.expose(), "access-2");
		assert!(!outcome.needs_reconsent);

		let active = store
			.get_active_by_connection(&connection_id)
			.await
			.expect("Get should succeed.")
			.expect("Active credential should exist.");

		assert_eq!(active.version, 2);
	}

	#[tokio::test]
	async fn refresh_locked_returns_refresh_locked_error() {
		let (lifecycle, _store, connection_id) = lifecycle().await;
		let now = OffsetDateTime::now_utc();
		let _handle = lifecycle.locker.acquire(connection_id.clone(), Duration::seconds(30), now).expect("Acquire should succeed.");

		let result = lifecycle
			.refresh(RefreshRequest { connection_id, credential: None }, LockScope::Outer)
			.await;

		assert!(matches!(result, Err(Error::RefreshLocked { .. })));
	}

	#[tokio::test]
	async fn run_refresh_with_retry_succeeds_on_first_attempt() {
		let (lifecycle, _store, connection_id) = lifecycle().await;
		let cancel = Cancellation::new();
		let outcome = lifecycle
			.run_refresh_with_retry(RefreshRequest { connection_id, credential: None }, &cancel)
			.await
			.expect("Refresh should succeed.");

		assert_eq!(outcome.credential.access_token.expose(), "access-2");
	}
}
