//! Service facade: the single entry point composing the registry, stores, lifecycle
//! orchestrator, operation runtime, and hook coordinator into the public connector API.

// self
use crate::{
	_prelude::*,
	cancel::Cancellation,
	codec::CredentialCodec,
	config::ServiceConfig,
	error::{Error, ValidationError},
	freshness::FreshnessState,
	grant_algebra,
	hooks::HookCoordinator,
	lifecycle::{CredentialLifecycle, RefreshFailure, RefreshOutcome, RefreshRequest},
	lock::ConnectionLocker,
	model::{
		ActiveCredential, CapabilityDescriptor, CapabilityName, Connection, ConnectionId, ConnectionStatus,
		Credential, CredentialStatus, DeniedBehavior, GrantEvent, GrantEventType, GrantSnapshot, LifecycleEvent,
		PayloadFormat, ProviderId, ScopeRef,
	},
	obs::{record_operation_duration, record_operation_outcome, OpSpan, OperationOutcome},
	operation::{OperationRuntime, ProviderOperationOutcome, ProviderOperationRequest, Sleeper, SignedRequest, TransportAdapter, TransportRequest},
	permission::PermissionEvaluator,
	provider::{BeginAuthRequest, BeginAuthResult, CompleteAuthRequest},
	registry::ProviderRegistry,
	scope_resolver::{InheritancePolicy, ResolutionOutcome, ScopeResolver},
	store::{Installation, Store, Subscription},
};
use rand::{Rng, distr::Alphanumeric};

/// A pending OAuth authorization-code flow, keyed by its opaque state token.
#[derive(Clone, Debug)]
struct PendingOAuthState {
	provider_id: ProviderId,
	scope: ScopeRef,
	connection_id: Option<ConnectionId>,
	redirect_uri: Url,
	requested_scopes: Vec<String>,
	created_at: OffsetDateTime,
}

/// Outcome of [`Service::invoke_capability`].
#[derive(Clone, Debug)]
pub struct CapabilityResult {
	/// Whether the caller's grants authorized this capability.
	pub allowed: bool,
	/// Whether the underlying provider operation was actually executed.
	pub executed: bool,
	/// Required grants the connection was missing, if `allowed == false`.
	pub missing_grants: Vec<String>,
	/// How the capability behaves when denied, if `allowed == false`.
	pub mode: Option<DeniedBehavior>,
	/// Human-readable denial reason, if `allowed == false`.
	pub reason: Option<String>,
	/// The operation outcome, present whenever `executed == true`.
	pub operation: Option<ProviderOperationOutcome>,
}

fn now() -> OffsetDateTime {
	OffsetDateTime::now_utc()
}

fn random_token(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

/// Wraps `fut` with a tracing span and duration/outcome metrics labeled `operation`.
///
/// Every public [`Service`] operation goes through this (or [`observe_capability`]) so the
/// `tracing`/`metrics` features cover the whole facade, not just the components that happen to
/// call them directly.
async fn observe<T, E, Fut>(operation: &'static str, provider_id: &str, fut: Fut) -> Result<T, E>
where
	Fut: Future<Output = Result<T, E>>,
{
	let span = OpSpan::new(operation, provider_id);
	let start = now();
	let result = span.instrument(fut).await;

	record_operation_duration(operation, now() - start);

	let outcome = if result.is_ok() { OperationOutcome::Success } else { OperationOutcome::Failure };

	span.record_outcome(outcome.as_str());
	record_operation_outcome(operation, outcome);

	result
}

/// Like [`observe`], but for operations returning [`CapabilityResult`]: a policy denial is
/// recorded as [`OperationOutcome::Denied`] rather than [`OperationOutcome::Success`].
async fn observe_capability<Fut>(operation: &'static str, provider_id: &str, fut: Fut) -> Result<CapabilityResult, Error>
where
	Fut: Future<Output = Result<CapabilityResult, Error>>,
{
	let span = OpSpan::new(operation, provider_id);
	let start = now();
	let result = span.instrument(fut).await;

	record_operation_duration(operation, now() - start);

	let outcome = match &result {
		Ok(r) if r.allowed => OperationOutcome::Success,
		Ok(_) => OperationOutcome::Denied,
		Err(_) => OperationOutcome::Failure,
	};

	span.record_outcome(outcome.as_str());
	record_operation_outcome(operation, outcome);

	result
}

/// Composes every lower-level component into the public connector API.
///
/// Responsibilities: parameter normalization, OAuth state issuance/consumption, permission
/// evaluation, credential freshness/refresh delegation, and lifecycle event emission via the
/// hook coordinator and outbox. The facade does not own an outbox dispatcher or projectors;
/// callers register those independently against the same store.
pub struct Service<St, A>
where
	St: Store,
	A: TransportAdapter,
{
	store: Arc<St>,
	registry: Arc<ProviderRegistry>,
	lifecycle: CredentialLifecycle<St, St, St, Arc<dyn Sleeper>>,
	operation_runtime: OperationRuntime<A, Arc<dyn Sleeper>>,
	hooks: HookCoordinator,
	config: ServiceConfig,
	codec: CredentialCodec,
	oauth_states: Mutex<HashMap<String, PendingOAuthState>>,
	scope_resolver: ScopeResolver<St>,
}
impl<St, A> Service<St, A>
where
	St: Store,
	A: TransportAdapter,
{
	/// Builds a service over `store`, `registry`, and `config`, sharing `sleeper` between the
	/// credential lifecycle and the operation runtime.
	pub fn new(
		store: Arc<St>,
		registry: Arc<ProviderRegistry>,
		operation_runtime: OperationRuntime<A, Arc<dyn Sleeper>>,
		sleeper: Arc<dyn Sleeper>,
		config: ServiceConfig,
	) -> Self {
		let locker = Arc::new(ConnectionLocker::new());
		let lifecycle = CredentialLifecycle::new(
			store.clone(),
			store.clone(),
			store.clone(),
			locker.clone(),
			registry.clone(),
			sleeper,
			config.refresh,
		);
		let scope_resolver = ScopeResolver::new(store.clone(), InheritancePolicy::new(config.inheritance.enabled_providers.clone()));

		Self {
			store,
			registry,
			lifecycle,
			operation_runtime,
			hooks: HookCoordinator::new(),
			config,
			codec: CredentialCodec,
			oauth_states: Mutex::new(HashMap::new()),
			scope_resolver,
		}
	}

	/// Registers a pre-commit (fail-fast) lifecycle hook.
	pub fn register_pre_commit_hook(&mut self, hook: Arc<dyn crate::hooks::LifecycleHook>) {
		self.hooks.register_pre_commit(hook);
	}

	/// Registers a post-commit (aggregate) lifecycle hook.
	pub fn register_post_commit_hook(&mut self, hook: Arc<dyn crate::hooks::LifecycleHook>) {
		self.hooks.register_post_commit(hook);
	}

	fn provider_for(&self, provider_id: &ProviderId) -> Result<Arc<dyn crate::provider::Provider>, Error> {
		self.registry
			.get(provider_id.as_ref())
			.ok_or_else(|| Error::ProviderNotFound { provider_id: provider_id.to_string() })
	}

	async fn load_connection(&self, connection_id: &ConnectionId) -> Result<Connection, Error> {
		crate::store::ConnectionStore::get(&*self.store, connection_id)
			.await
			.map_err(Error::Storage)?
			.ok_or_else(|| crate::store::StoreError::NotFound { what: format!("connection {connection_id}") }.into())
	}

	async fn emit_event(&self, event: LifecycleEvent) -> Result<(), Error> {
		let post_commit_event = event.clone();
		let store = self.store.clone();

		self.hooks
			.execute_pre_commit_and_enqueue(event, move |event| {
				let store = store.clone();

				async move { store.enqueue(crate::model::OutboxEntry::new(event, now())).await.map_err(Error::Storage) }
			})
			.await?;

		let _ = self.hooks.execute_post_commit(&post_commit_event).await;

		Ok(())
	}

	fn new_oauth_state(&self, pending: PendingOAuthState) -> String {
		let state = random_token(32);

		self.oauth_states.lock().insert(state.clone(), pending);

		state
	}

	fn consume_oauth_state(&self, state: &str) -> Result<PendingOAuthState, Error> {
		let pending = self
			.oauth_states
			.lock()
			.remove(state)
			.ok_or_else(|| Error::Validation(ValidationError::InvalidStatus { status: "oauth_state_unknown".into() }))?;

		if now() > pending.created_at + self.config.oauth.state_ttl {
			return Err(Error::Validation(ValidationError::InvalidStatus { status: "oauth_state_expired".into() }));
		}

		Ok(pending)
	}

	/// Begins an interactive authorization handshake for a fresh connection.
	pub async fn connect(
		&self,
		provider_id: ProviderId,
		scope: ScopeRef,
		redirect_uri: Url,
		requested_scopes: Vec<String>,
	) -> Result<BeginAuthResult, Error> {
		let provider_id_label = provider_id.to_string();

		observe("connect", &provider_id_label, async {
			let provider = self.provider_for(&provider_id)?;
			let state = self.new_oauth_state(PendingOAuthState {
				provider_id,
				scope,
				connection_id: None,
				redirect_uri: redirect_uri.clone(),
				requested_scopes: requested_scopes.clone(),
				created_at: now(),
			});

			provider.begin_auth(BeginAuthRequest { requested_scopes, redirect_uri, state }).await
		})
		.await
	}

	/// Begins re-consent for an existing connection, to widen or repair its grants.
	pub async fn start_reconsent(
		&self,
		connection_id: ConnectionId,
		redirect_uri: Url,
		requested_scopes: Vec<String>,
	) -> Result<BeginAuthResult, Error> {
		observe("start_reconsent", "", async {
			let connection = self.load_connection(&connection_id).await?;
			let provider = self.provider_for(&connection.provider_id)?;
			let state = self.new_oauth_state(PendingOAuthState {
				provider_id: connection.provider_id,
				scope: connection.scope,
				connection_id: Some(connection_id),
				redirect_uri: redirect_uri.clone(),
				requested_scopes: requested_scopes.clone(),
				created_at: now(),
			});

			provider.begin_auth(BeginAuthRequest { requested_scopes, redirect_uri, state }).await
		})
		.await
	}

	async fn finish_auth_flow(
		&self,
		pending: PendingOAuthState,
		code: String,
		redirect_uri: Url,
		event_name: &'static str,
	) -> Result<Connection, Error> {
		if self.config.oauth.require_callback_redirect && pending.redirect_uri != redirect_uri {
			return Err(Error::Validation(ValidationError::InvalidStatus { status: "redirect_uri_mismatch".into() }));
		}

		let provider = self.provider_for(&pending.provider_id)?;
		let credential = provider.complete_auth(CompleteAuthRequest { code, redirect_uri }).await?;

		let mut connection = match &pending.connection_id {
			Some(connection_id) => self.load_connection(connection_id).await?,
			None => {
				let existing =
					self.store.list_by_provider_scope(&pending.provider_id, &pending.scope).await.map_err(Error::Storage)?;
				let reused = existing.into_iter().find(|c| c.status != ConnectionStatus::Disconnected);

				match reused {
					Some(connection) => connection,
					None => {
						let id = ConnectionId::new(format!("conn_{}", random_token(12)))
							.map_err(|e| Error::Validation(ValidationError::Identifier(e)))?;

						Connection::new(id, pending.provider_id.clone(), pending.scope.clone(), "")
					},
				}
			},
		};

		if let Some(external_account_id) = credential.metadata_str("external_account_id") {
			connection.external_account_id = external_account_id;
		}
		connection.mark_active();

		crate::store::ConnectionStore::save(&*self.store, connection.clone()).await.map_err(Error::Storage)?;

		let stored_current = self.store.get_active_by_connection(&connection.id).await.map_err(Error::Storage)?;
		let next_version = stored_current.as_ref().map_or(1, |c| c.version + 1);
		let payload = self.codec.encode(PayloadFormat::ActiveCredentialJson, CredentialCodec::CURRENT_JSON_VERSION, &credential)?;

		self.store
			.save_new_version(Credential {
				version: next_version,
				connection_id: connection.id.clone(),
				encrypted_payload: payload,
				payload_format: PayloadFormat::ActiveCredentialJson,
				payload_version: CredentialCodec::CURRENT_JSON_VERSION,
				token_type: credential.token_type.clone(),
				requested_scopes: credential.requested_scopes.clone(),
				granted_scopes: credential.granted_scopes.clone(),
				expires_at: credential.expires_at,
				rotates_at: credential.rotates_at,
				refreshable: credential.refreshable,
				status: CredentialStatus::Active,
			})
			.await
			.map_err(Error::Storage)?;

		let previous_snapshot = self.store.get_latest_snapshot(&connection.id).await.map_err(Error::Storage)?;
		let previous_granted = previous_snapshot.as_ref().map(|s| s.granted.clone()).unwrap_or_default();
		let delta = grant_algebra::delta(&previous_granted, &credential.granted_scopes);
		let snapshot = match &previous_snapshot {
			Some(previous) => previous.next(credential.requested_scopes.clone(), credential.granted_scopes.clone(), now()),
			None => GrantSnapshot::initial(connection.id.clone(), credential.requested_scopes.clone(), credential.granted_scopes.clone(), now()),
		};

		self.store.save_snapshot(snapshot).await.map_err(Error::Storage)?;

		if let Some(event_type) = delta.event_type {
			self.store
				.append_event(GrantEvent::new(connection.id.clone(), event_type, delta.added, delta.removed, now()))
				.await
				.map_err(Error::Storage)?;
		}

		self.emit_event(
			LifecycleEvent::new(random_token(12), event_name, connection.provider_id.clone(), connection.scope.clone(), "service", now())
				.with_connection_id(connection.id.clone()),
		)
		.await?;

		Ok(connection)
	}

	/// Completes an interactive authorization handshake for a fresh connection.
	pub async fn complete_callback(&self, state: &str, code: String, redirect_uri: Url) -> Result<Connection, Error> {
		observe("complete_callback", "", async {
			let pending = self.consume_oauth_state(state)?;

			self.finish_auth_flow(pending, code, redirect_uri, "connection.connected").await
		})
		.await
	}

	/// Completes a re-consent handshake for an existing connection.
	pub async fn complete_reconsent(&self, state: &str, code: String, redirect_uri: Url) -> Result<Connection, Error> {
		observe("complete_reconsent", "", async {
			let pending = self.consume_oauth_state(state)?;

			if pending.connection_id.is_none() {
				return Err(Error::Validation(ValidationError::MissingField { field: "connection_id" }));
			}

			let connection = self.finish_auth_flow(pending, code, redirect_uri, "connection.reconsent_completed").await?;

			self.store
				.append_event(GrantEvent::new(connection.id.clone(), GrantEventType::ReconsentCompleted, vec![], vec![], now()))
				.await
				.map_err(Error::Storage)?;

			Ok(connection)
		})
		.await
	}

	/// Refreshes a connection's active credential, retrying with backoff per configuration.
	///
	/// On failure, the returned [`RefreshFailure`] carries `pending_reauth: true` whenever this
	/// call transitioned the connection to `pending_reauth` (unrecoverable error or attempts
	/// exhausted), so callers don't need to re-derive it from [`Error::category`].
	pub async fn refresh(&self, connection_id: ConnectionId) -> Result<RefreshOutcome, RefreshFailure> {
		observe("refresh", "", async {
			let cancel = Cancellation::new();

			self.lifecycle.run_refresh_with_retry(RefreshRequest { connection_id, credential: None }, &cancel).await
		})
		.await
	}

	/// Revokes a connection's active credential and marks it disconnected.
	pub async fn revoke(&self, connection_id: ConnectionId) -> Result<(), Error> {
		observe("revoke", "", async {
			let connection = self.load_connection(&connection_id).await?;

			self.store.revoke_active(&connection_id).await.map_err(Error::Storage)?;

			let mut connection = connection;
			connection.mark_disconnected();
			crate::store::ConnectionStore::save(&*self.store, connection.clone()).await.map_err(Error::Storage)?;

			self.emit_event(
				LifecycleEvent::new(random_token(12), "connection.revoked", connection.provider_id.clone(), connection.scope.clone(), "service", now())
					.with_connection_id(connection_id),
			)
			.await
		})
		.await
	}

	async fn fresh_credential(&self, connection_id: &ConnectionId) -> Result<(ActiveCredential, FreshnessState), Error> {
		let cancel = Cancellation::new();

		self.lifecycle
			.ensure_credential_fresh(
				RefreshRequest { connection_id: connection_id.clone(), credential: None },
				self.config.freshness.expiring_soon_window,
				self.config.freshness.refresh_lead_window,
				&cancel,
			)
			.await
			.map_err(|failure| failure.error)
	}

	fn find_capability(provider: &Arc<dyn crate::provider::Provider>, name: &CapabilityName) -> Result<CapabilityDescriptor, Error> {
		provider
			.capabilities()
			.into_iter()
			.find(|c| &c.name == name)
			.ok_or_else(|| Error::CapabilityUnsupported { provider_id: provider.id().to_string(), capability: name.to_string() })
	}

	/// Invokes a grant-gated provider capability, permission-checking before execution.
	///
	/// Denied capabilities with [`DeniedBehavior::Block`] return `allowed: false` without
	/// executing; [`DeniedBehavior::Degrade`] still executes, leaving callers to interpret
	/// `reason`/`missing_grants` as a degradation notice.
	pub async fn invoke_capability(&self, connection_id: ConnectionId, capability: CapabilityName) -> Result<CapabilityResult, Error> {
		observe_capability("invoke_capability", "", async {
			let connection = self.load_connection(&connection_id).await?;
			let provider = self.provider_for(&connection.provider_id)?;
			let descriptor = Self::find_capability(&provider, &capability)?;

			let evaluator = PermissionEvaluator::new(self.store.clone());
			let decision = evaluator.evaluate(&connection_id, &descriptor).await?;

			if !decision.allowed && decision.mode == Some(DeniedBehavior::Block) {
				return Ok(CapabilityResult {
					allowed: false,
					executed: false,
					missing_grants: decision.missing_grants,
					mode: decision.mode,
					reason: decision.reason,
					operation: None,
				});
			}

			let resolver = provider
				.capability_operation_resolver()
				.ok_or_else(|| Error::CapabilityUnsupported { provider_id: provider.id().to_string(), capability: capability.to_string() })?;

			let (credential, _) = self.fresh_credential(&connection_id).await?;
			let request = resolver.resolve(&capability, &credential).await?;
			let cancel = Cancellation::new();
			let outcome = self.operation_runtime.execute_provider_operation(request, &cancel).await?;

			Ok(CapabilityResult {
				allowed: decision.allowed,
				executed: true,
				missing_grants: decision.missing_grants,
				mode: decision.mode,
				reason: decision.reason,
				operation: Some(outcome),
			})
		})
		.await
	}

	/// Invokes a grant-gated provider capability without a caller-supplied `connection_id`,
	/// resolving `(provider_id, scope)` to a connection through the [`ScopeResolver`] first.
	///
	/// Strict isolation applies by default: exactly one active connection for `(provider_id,
	/// scope)` resolves directly, two or more is ambiguous, and zero falls back to `parent_scope`
	/// only when the provider has inheritance enabled. An ambiguous or missing resolution returns
	/// `allowed: false` with the resolver's reason and never reaches permission evaluation or
	/// execution.
	pub async fn invoke_capability_by_scope(
		&self,
		provider_id: ProviderId,
		scope: ScopeRef,
		capability: CapabilityName,
		parent_scope: Option<ScopeRef>,
	) -> Result<CapabilityResult, Error> {
		observe_capability("invoke_capability_by_scope", provider_id.as_ref(), async {
			let resolution = self.scope_resolver.resolve(&provider_id, &scope, parent_scope.as_ref()).await;

			let connection = match (resolution.outcome, resolution.connection) {
				(ResolutionOutcome::Direct | ResolutionOutcome::Inherited, Some(connection)) => connection,
				_ => {
					return Ok(CapabilityResult {
						allowed: false,
						executed: false,
						missing_grants: Vec::new(),
						mode: None,
						reason: resolution.reason.or_else(|| Some("no active connection".to_owned())),
						operation: None,
					});
				},
			};

			self.invoke_capability(connection.id, capability).await
		})
		.await
	}

	/// Executes a pre-resolved provider operation request directly, bypassing capability
	/// resolution. Callers are responsible for any permission checks.
	pub async fn invoke_capability_operation(&self, request: ProviderOperationRequest) -> Result<ProviderOperationOutcome, Error> {
		let provider_id = request.provider_id.to_string();

		observe("invoke_capability_operation", &provider_id, async {
			let cancel = Cancellation::new();

			self.operation_runtime.execute_provider_operation(request, &cancel).await
		})
		.await
	}

	/// Signs `request` using the connection's active (freshness-checked) credential.
	pub async fn sign_request(&self, connection_id: ConnectionId, request: TransportRequest) -> Result<SignedRequest, Error> {
		observe("sign_request", "", async {
			let (credential, _) = self.fresh_credential(&connection_id).await?;

			self.operation_runtime.sign(&request, Some(&credential))
		})
		.await
	}

	/// Creates a push subscription to `topic` on behalf of `connection_id`.
	pub async fn subscribe(&self, connection_id: ConnectionId, topic: String) -> Result<Subscription, Error> {
		observe("subscribe", "", async {
			let connection = self.load_connection(&connection_id).await?;
			let provider = self.provider_for(&connection.provider_id)?;
			let subscribable = provider
				.subscribable()
				.ok_or_else(|| Error::CapabilityUnsupported { provider_id: provider.id().to_string(), capability: "subscribe".into() })?;

			let (credential, _) = self.fresh_credential(&connection_id).await?;
			let result = subscribable.subscribe(&topic, &credential).await?;

			let subscription = Subscription {
				id: random_token(12),
				connection_id,
				topic,
				external_subscription_id: Some(result.external_subscription_id),
				expires_at: result.expires_at,
			};

			crate::store::SubscriptionStore::save(&*self.store, subscription.clone()).await.map_err(Error::Storage)?;

			Ok(subscription)
		})
		.await
	}

	/// Renews a subscription before it expires.
	pub async fn renew_subscription(&self, subscription_id: &str) -> Result<Subscription, Error> {
		observe("renew_subscription", subscription_id, async {
			let mut subscription = crate::store::SubscriptionStore::get(&*self.store, subscription_id)
				.await
				.map_err(Error::Storage)?
				.ok_or_else(|| crate::store::StoreError::NotFound { what: format!("subscription {subscription_id}") })?;

			let connection = self.load_connection(&subscription.connection_id).await?;
			let provider = self.provider_for(&connection.provider_id)?;
			let subscribable = provider
				.subscribable()
				.ok_or_else(|| Error::CapabilityUnsupported { provider_id: provider.id().to_string(), capability: "subscribe".into() })?;

			let (credential, _) = self.fresh_credential(&subscription.connection_id).await?;
			let external_id = subscription
				.external_subscription_id
				.clone()
				.ok_or_else(|| Error::Validation(ValidationError::MissingField { field: "external_subscription_id" }))?;
			let result = subscribable.renew(&external_id, &credential).await?;

			subscription.external_subscription_id = Some(result.external_subscription_id);
			subscription.expires_at = result.expires_at;

			crate::store::SubscriptionStore::save(&*self.store, subscription.clone()).await.map_err(Error::Storage)?;

			Ok(subscription)
		})
		.await
	}

	/// Cancels a subscription.
	pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), Error> {
		observe("cancel_subscription", subscription_id, async {
			let subscription = crate::store::SubscriptionStore::get(&*self.store, subscription_id)
				.await
				.map_err(Error::Storage)?
				.ok_or_else(|| crate::store::StoreError::NotFound { what: format!("subscription {subscription_id}") })?;

			let connection = self.load_connection(&subscription.connection_id).await?;
			let provider = self.provider_for(&connection.provider_id)?;
			let subscribable = provider
				.subscribable()
				.ok_or_else(|| Error::CapabilityUnsupported { provider_id: provider.id().to_string(), capability: "subscribe".into() })?;

			if let Some(external_id) = &subscription.external_subscription_id {
				let (credential, _) = self.fresh_credential(&subscription.connection_id).await?;
				subscribable.cancel(external_id, &credential).await?;
			}

			crate::store::SubscriptionStore::remove(&*self.store, subscription_id).await.map_err(Error::Storage)?;

			Ok(())
		})
		.await
	}

	/// Persists an installation record.
	pub async fn save_installation(&self, installation: Installation) -> Result<(), Error> {
		observe("save_installation", "", async {
			crate::store::InstallationStore::save(&*self.store, installation).await.map_err(Error::Storage)
		})
		.await
	}

	/// Fetches an installation by id.
	pub async fn get_installation(&self, id: &str) -> Result<Option<Installation>, Error> {
		observe("get_installation", "", async { crate::store::InstallationStore::get(&*self.store, id).await.map_err(Error::Storage) }).await
	}

	/// Removes an installation.
	pub async fn remove_installation(&self, id: &str) -> Result<(), Error> {
		observe("remove_installation", "", async { crate::store::InstallationStore::remove(&*self.store, id).await.map_err(Error::Storage) }).await
	}
}
