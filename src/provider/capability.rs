//! Optional provider capability interfaces, discovered at runtime via accessor methods on
//! [`crate::provider::Provider`] returning `Option<Arc<dyn Trait>>`.

// self
use crate::{
	_prelude::*,
	model::{ActiveCredential, CapabilityName},
	operation::ProviderOperationRequest,
};

/// Boxed future returned by optional capability interface methods.
pub type CapabilityFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, crate::error::Error>> + 'a + Send>>;

/// Resolves a capability invocation into a concrete, signable [`ProviderOperationRequest`].
pub trait CapabilityOperationResolver
where
	Self: Send + Sync,
{
	/// Builds the operation request for `capability`, given the caller's decoded credential.
	fn resolve<'a>(
		&'a self,
		capability: &'a CapabilityName,
		credential: &'a ActiveCredential,
	) -> CapabilityFuture<'a, ProviderOperationRequest>;
}

/// Result of a subscribe or renew call.
#[derive(Clone, Debug)]
pub struct SubscriptionResult {
	/// Provider-assigned subscription handle.
	pub external_subscription_id: String,
	/// Expiry instant, if the provider leases subscriptions.
	pub expires_at: Option<OffsetDateTime>,
}

/// Provider supports push subscriptions to a topic.
pub trait SubscribableProvider
where
	Self: Send + Sync,
{
	/// Creates a new subscription to `topic`.
	fn subscribe<'a>(
		&'a self,
		topic: &'a str,
		credential: &'a ActiveCredential,
	) -> CapabilityFuture<'a, SubscriptionResult>;

	/// Renews an existing subscription before it expires.
	fn renew<'a>(
		&'a self,
		external_subscription_id: &'a str,
		credential: &'a ActiveCredential,
	) -> CapabilityFuture<'a, SubscriptionResult>;

	/// Cancels a subscription.
	fn cancel<'a>(&'a self, external_subscription_id: &'a str, credential: &'a ActiveCredential) -> CapabilityFuture<'a, ()>;
}

/// A page of incrementally synced provider events plus the cursor to resume from.
#[derive(Clone, Debug)]
pub struct SyncPage {
	/// Raw provider event payloads.
	pub events: Vec<serde_json::Value>,
	/// Opaque cursor to pass on the next call; `None` means the stream is caught up.
	pub next_cursor: Option<String>,
}

/// Provider supports cursor-based incremental synchronization.
pub trait IncrementalSyncProvider
where
	Self: Send + Sync,
{
	/// Fetches the next page of events for `stream`, starting after `cursor`.
	fn sync<'a>(
		&'a self,
		stream: &'a str,
		cursor: Option<&'a str>,
		credential: &'a ActiveCredential,
	) -> CapabilityFuture<'a, SyncPage>;
}

/// Provider reports raw grant strings that need provider-specific normalization beyond
/// [`crate::grant_algebra::normalize`].
pub trait GrantAwareProvider
where
	Self: Send + Sync,
{
	/// Normalizes `raw` grant strings into this crate's canonical grant vocabulary.
	fn normalize_grants(&self, raw: &[String]) -> Vec<String>;
}

/// Provider supports a non-interactive (machine-to-machine) authorization flow.
pub trait EmbeddedAuthProvider
where
	Self: Send + Sync,
{
	/// Exchanges caller-supplied embedded credentials for an [`ActiveCredential`].
	fn authorize<'a>(&'a self, embedded_secret: &'a str) -> CapabilityFuture<'a, ActiveCredential>;
}
