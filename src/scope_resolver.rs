//! Resolves a provider + requested scope into a connection under a strict-isolation-by-default
//! policy, with opt-in inheritance per provider.

// self
use crate::{
	_prelude::*,
	model::{Connection, ConnectionId, ConnectionStatus, ProviderId, ScopeRef},
	store::ConnectionStore,
};

/// How a [`ResolutionRequest`] was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionOutcome {
	/// Resolved directly to a connection bound to the requested scope.
	Direct,
	/// Resolved to a parent scope's connection via opt-in inheritance.
	Inherited,
	/// No usable connection could be found.
	NotFound,
}

/// Result of a scope resolution attempt.
#[derive(Clone, Debug)]
pub struct Resolution {
	/// How the resolution was satisfied.
	pub outcome: ResolutionOutcome,
	/// The resolved connection, if any.
	pub connection: Option<Connection>,
	/// The parent connection inheritance was resolved through, if applicable.
	pub parent: Option<Connection>,
	/// Human-readable reason, populated when `outcome == NotFound`.
	pub reason: Option<String>,
}
impl Resolution {
	fn not_found(reason: impl Into<String>) -> Self {
		Self { outcome: ResolutionOutcome::NotFound, connection: None, parent: None, reason: Some(reason.into()) }
	}

	fn direct(connection: Connection) -> Self {
		Self { outcome: ResolutionOutcome::Direct, connection: Some(connection), parent: None, reason: None }
	}

	fn inherited(connection: Connection, parent: Connection) -> Self {
		Self {
			outcome: ResolutionOutcome::Inherited,
			connection: Some(connection),
			parent: Some(parent),
			reason: None,
		}
	}
}

/// Providers for which scope inheritance is enabled.
#[derive(Clone, Debug, Default)]
pub struct InheritancePolicy {
	enabled_providers: std::collections::HashSet<ProviderId>,
}
impl InheritancePolicy {
	/// Builds a policy enabling inheritance for the given providers.
	pub fn new(enabled_providers: impl IntoIterator<Item = ProviderId>) -> Self {
		Self { enabled_providers: enabled_providers.into_iter().collect() }
	}

	/// Returns true if `provider_id` has inheritance enabled.
	pub fn is_enabled(&self, provider_id: &ProviderId) -> bool {
		self.enabled_providers.contains(provider_id)
	}
}

/// Resolves `(provider_id, requested_scope)` pairs into connections.
pub struct ScopeResolver<S> {
	store: Arc<S>,
	inheritance: InheritancePolicy,
}
impl<S> ScopeResolver<S>
where
	S: ConnectionStore,
{
	/// Builds a resolver over `store`, honoring `inheritance` for opt-in providers.
	pub fn new(store: Arc<S>, inheritance: InheritancePolicy) -> Self {
		Self { store, inheritance }
	}

	/// Resolves `(provider_id, scope)` under strict isolation, falling back to inheritance via
	/// `parent` only if the provider has inheritance enabled and `parent` is supplied.
	pub async fn resolve(
		&self,
		provider_id: &ProviderId,
		scope: &ScopeRef,
		parent: Option<&ScopeRef>,
	) -> Resolution {
		let candidates = self.store.list_by_provider_scope(provider_id, scope).await.unwrap_or_default();
		let active: Vec<&Connection> = candidates.iter().filter(|c| c.status == ConnectionStatus::Active).collect();

		if active.len() == 1 {
			return Resolution::direct(active[0].clone());
		}
		if active.len() > 1 {
			return Resolution::not_found("ambiguous");
		}
		if candidates.is_empty() {
			if self.inheritance.is_enabled(provider_id) {
				if let Some(parent_scope) = parent {
					let parent_candidates =
						self.store.list_by_provider_scope(provider_id, parent_scope).await.unwrap_or_default();
					let parent_active: Vec<&Connection> =
						parent_candidates.iter().filter(|c| c.status == ConnectionStatus::Active).collect();

					if let [parent_connection] = parent_active[..] {
						return Resolution::inherited(parent_connection.clone(), parent_connection.clone());
					}
				}
			}

			return Resolution::not_found("no active connection");
		}

		// Non-empty, zero active: surface the one that best explains the situation, preferring
		// `needs_reconsent` over others, for the caller's error message.
		let preferred = candidates
			.iter()
			.find(|c| c.status == ConnectionStatus::NeedsReconsent)
			.or_else(|| candidates.first());

		Resolution::not_found(format!("no active connection ({})", preferred.map(|c| c.status).unwrap_or(ConnectionStatus::Disconnected)))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::memory::MemoryStore;

	fn scope() -> ScopeRef {
		ScopeRef::new("org", "org-1").expect("Scope fixture.")
	}

	fn provider() -> ProviderId {
		ProviderId::new("github").expect("Provider id fixture.")
	}

	#[tokio::test]
	async fn resolves_single_active_connection_directly() {
		let store = Arc::new(MemoryStore::default());
		let connection = Connection::new(
			ConnectionId::new("conn-1").expect("Connection id fixture."),
			provider(),
			scope(),
			"external-1",
		);

		store.save(connection).await.expect("Save should succeed.");

		let resolver = ScopeResolver::new(store, InheritancePolicy::default());
		let resolution = resolver.resolve(&provider(), &scope(), None).await;

		assert_eq!(resolution.outcome, ResolutionOutcome::Direct);
	}

	#[tokio::test]
	async fn multiple_active_connections_are_ambiguous() {
		let store = Arc::new(MemoryStore::default());

		for i in 0..2 {
			let connection = Connection::new(
				ConnectionId::new(format!("conn-{i}")).expect("Connection id fixture."),
				provider(),
				scope(),
				"external",
			);

			store.save(connection).await.expect("Save should succeed.");
		}

		let resolver = ScopeResolver::new(store, InheritancePolicy::default());
		let resolution = resolver.resolve(&provider(), &scope(), None).await;

		assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
		assert_eq!(resolution.reason.as_deref(), Some("ambiguous"));
	}

	#[tokio::test]
	async fn no_connection_is_not_found() {
		let store = Arc::new(MemoryStore::default());
		let resolver = ScopeResolver::new(store, InheritancePolicy::default());
		let resolution = resolver.resolve(&provider(), &scope(), None).await;

		assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
		assert_eq!(resolution.reason.as_deref(), Some("no active connection"));
	}

	#[tokio::test]
	async fn inheritance_disabled_by_default() {
		let store = Arc::new(MemoryStore::default());
		let parent_scope = ScopeRef::new("org", "parent-org").expect("Scope fixture.");
		let parent_connection = Connection::new(
			ConnectionId::new("conn-parent").expect("Connection id fixture."),
			provider(),
			parent_scope.clone(),
			"external-parent",
		);

		store.save(parent_connection).await.expect("Save should succeed.");

		let resolver = ScopeResolver::new(store, InheritancePolicy::default());
		let resolution = resolver.resolve(&provider(), &scope(), Some(&parent_scope)).await;

		assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
	}

	#[tokio::test]
	async fn inheritance_enabled_resolves_through_parent() {
		let store = Arc::new(MemoryStore::default());
		let parent_scope = ScopeRef::new("org", "parent-org").expect("Scope fixture.");
		let parent_connection = Connection::new(
			ConnectionId::new("conn-parent").expect("Connection id fixture."),
			provider(),
			parent_scope.clone(),
			"external-parent",
		);

		store.save(parent_connection).await.expect("Save should succeed.");

		let resolver = ScopeResolver::new(store, InheritancePolicy::new([provider()]));
		let resolution = resolver.resolve(&provider(), &scope(), Some(&parent_scope)).await;

		assert_eq!(resolution.outcome, ResolutionOutcome::Inherited);
	}
}
