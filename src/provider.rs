//! Provider adapter contract: the input boundary this crate sits above.

pub mod capability;

pub use capability::*;

// self
use crate::{
	_prelude::*,
	model::{ActiveCredential, CapabilityDescriptor, ProviderId},
};

/// Boxed future returned by every provider adapter method.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, crate::error::Error>> + 'a + Send>>;

/// Request to begin an interactive authorization handshake.
#[derive(Clone, Debug)]
pub struct BeginAuthRequest {
	/// Scopes the caller wants to request.
	pub requested_scopes: Vec<String>,
	/// Redirect URI the provider should return the caller to.
	pub redirect_uri: Url,
	/// Opaque CSRF/state token generated by the service facade.
	pub state: String,
}

/// Result of beginning an interactive authorization handshake.
#[derive(Clone, Debug)]
pub struct BeginAuthResult {
	/// URL the end user should be redirected to.
	pub authorize_url: Url,
}

/// Request to complete an interactive authorization handshake.
#[derive(Clone, Debug)]
pub struct CompleteAuthRequest {
	/// Authorization code or equivalent exchange artifact.
	pub code: String,
	/// Redirect URI used in the original request, re-supplied for verification.
	pub redirect_uri: Url,
}

/// Adapter contract every provider integration MUST implement.
pub trait Provider
where
	Self: Send + Sync,
{
	/// Stable provider identifier.
	fn id(&self) -> &ProviderId;

	/// Opaque, provider-defined authentication kind (e.g. `oauth2`, `api_key`, `sigv4`).
	fn auth_kind(&self) -> String;

	/// Scope type namespaces this provider's scopes live under (e.g. `org`, `user`).
	fn supported_scope_types(&self) -> Vec<String>;

	/// Capability descriptors this provider exposes.
	fn capabilities(&self) -> Vec<CapabilityDescriptor>;

	/// Begins an interactive authorization handshake.
	fn begin_auth(&self, request: BeginAuthRequest) -> ProviderFuture<'_, BeginAuthResult>;

	/// Completes an interactive authorization handshake, producing an initial credential.
	fn complete_auth(&self, request: CompleteAuthRequest) -> ProviderFuture<'_, ActiveCredential>;

	/// Refreshes a credential, producing a new (possibly identical) credential.
	fn refresh<'a>(&'a self, credential: &'a ActiveCredential) -> ProviderFuture<'a, ActiveCredential>;

	/// Returns the capability-operation resolver, if this provider supports invoking
	/// capabilities through the operation runtime.
	fn capability_operation_resolver(&self) -> Option<Arc<dyn CapabilityOperationResolver>> {
		None
	}

	/// Returns the subscription interface, if this provider supports push subscriptions.
	fn subscribable(&self) -> Option<Arc<dyn SubscribableProvider>> {
		None
	}

	/// Returns the incremental-sync interface, if this provider supports cursor-based sync.
	fn incremental_sync(&self) -> Option<Arc<dyn IncrementalSyncProvider>> {
		None
	}

	/// Returns the grant-normalization interface, if this provider reports raw grant strings
	/// that need normalizing beyond [`crate::grant_algebra::normalize`].
	fn grant_aware(&self) -> Option<Arc<dyn GrantAwareProvider>> {
		None
	}

	/// Returns the embedded-auth interface, if this provider supports a non-interactive
	/// authorization flow.
	fn embedded_auth(&self) -> Option<Arc<dyn EmbeddedAuthProvider>> {
		None
	}
}
