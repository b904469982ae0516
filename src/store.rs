//! Storage contracts implemented by callers; this crate also ships in-memory reference
//! implementations of every trait under [`memory`] so the crate is runnable standalone.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	model::{Connection, ConnectionId, Credential, GrantEvent, GrantSnapshot, OutboxEntry, ProviderId, ScopeRef},
};

/// Boxed future returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The requested record does not exist.
	#[error("Record not found: {what}.")]
	NotFound {
		/// Human-readable description of the missing record.
		what: String,
	},
	/// The record already exists and the operation requires it to be absent.
	#[error("Record already exists: {what}.")]
	AlreadyExists {
		/// Human-readable description of the conflicting record.
		what: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persistence contract for [`Connection`] records.
pub trait ConnectionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces a connection record.
	fn save(&self, connection: Connection) -> StoreFuture<'_, ()>;

	/// Fetches a connection by id.
	fn get<'a>(&'a self, id: &'a ConnectionId) -> StoreFuture<'a, Option<Connection>>;

	/// Lists every connection bound to a `(provider, scope)` pair.
	fn list_by_provider_scope<'a>(
		&'a self,
		provider_id: &'a ProviderId,
		scope: &'a ScopeRef,
	) -> StoreFuture<'a, Vec<Connection>>;
}

/// Persistence contract for [`Credential`] records.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists a new credential version, superseding any prior active version for the same
	/// connection. Returns the persisted record.
	fn save_new_version(&self, credential: Credential) -> StoreFuture<'_, Credential>;

	/// Returns the at-most-one active credential for a connection.
	fn get_active_by_connection<'a>(
		&'a self,
		connection_id: &'a ConnectionId,
	) -> StoreFuture<'a, Option<Credential>>;

	/// Fetches a specific historical version.
	fn get_version<'a>(&'a self, connection_id: &'a ConnectionId, version: u64) -> StoreFuture<'a, Option<Credential>>;

	/// Marks the active credential (if any) as revoked.
	fn revoke_active<'a>(&'a self, connection_id: &'a ConnectionId) -> StoreFuture<'a, Option<Credential>>;
}

/// Persistence contract for [`GrantSnapshot`] and [`GrantEvent`] records.
pub trait GrantStore
where
	Self: Send + Sync,
{
	/// Persists a new snapshot version for a connection.
	fn save_snapshot(&self, snapshot: GrantSnapshot) -> StoreFuture<'_, ()>;

	/// Returns the most recent snapshot for a connection, if one has been captured.
	fn get_latest_snapshot<'a>(&'a self, connection_id: &'a ConnectionId) -> StoreFuture<'a, Option<GrantSnapshot>>;

	/// Appends a grant transition event.
	fn append_event(&self, event: GrantEvent) -> StoreFuture<'_, ()>;
}

/// Optional widening of [`GrantStore`] for backends that can persist a snapshot and its
/// triggering event atomically, without relying on the connection lock for serialization.
pub trait GrantStoreTransactional
where
	Self: GrantStore,
{
	/// Persists `snapshot` and `event` atomically.
	fn save_snapshot_and_event(&self, snapshot: GrantSnapshot, event: GrantEvent) -> StoreFuture<'_, ()>;
}

/// Persistence contract for the lifecycle event outbox.
pub trait OutboxStore
where
	Self: Send + Sync,
{
	/// Enqueues a new event for delivery.
	fn enqueue(&self, entry: OutboxEntry) -> StoreFuture<'_, ()>;

	/// Atomically claims up to `limit` entries that are due for delivery, marking them
	/// in-flight so concurrent dispatchers do not double-claim.
	fn claim_batch(&self, limit: usize) -> StoreFuture<'_, Vec<OutboxEntry>>;

	/// Acknowledges successful delivery, removing the entry from the queue.
	fn ack<'a>(&'a self, event_id: &'a str) -> StoreFuture<'a, ()>;

	/// Schedules a retry after a delivery failure, incrementing the attempt counter.
	fn retry<'a>(
		&'a self,
		event_id: &'a str,
		cause: String,
		next_attempt_at: OffsetDateTime,
	) -> StoreFuture<'a, ()>;
}

/// A caller-managed subscription to provider-pushed updates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
	/// Subscription identifier.
	pub id: String,
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Provider-defined topic or resource being watched.
	pub topic: String,
	/// Provider-assigned subscription handle, if any.
	pub external_subscription_id: Option<String>,
	/// Expiry instant, if the provider leases subscriptions.
	pub expires_at: Option<OffsetDateTime>,
}

/// Persistence contract for [`Subscription`] records.
pub trait SubscriptionStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces a subscription record.
	fn save(&self, subscription: Subscription) -> StoreFuture<'_, ()>;

	/// Fetches a subscription by id.
	fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Subscription>>;

	/// Removes a subscription.
	fn remove<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()>;
}

/// Cursor bookmarking progress through a provider's incremental sync feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Logical sync stream name.
	pub stream: String,
	/// Opaque cursor token, as returned by the provider.
	pub cursor: String,
	/// When this cursor was last advanced.
	pub updated_at: OffsetDateTime,
}

/// Persistence contract for [`SyncCursor`] records.
pub trait SyncCursorStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces a cursor.
	fn save(&self, cursor: SyncCursor) -> StoreFuture<'_, ()>;

	/// Fetches the current cursor for a connection + stream.
	fn get<'a>(&'a self, connection_id: &'a ConnectionId, stream: &'a str) -> StoreFuture<'a, Option<SyncCursor>>;
}

/// Record of a provider-side app installation (e.g. a GitHub App install).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
	/// Installation identifier.
	pub id: String,
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Provider-assigned installation identifier.
	pub external_installation_id: String,
	/// Free-form installation metadata.
	pub metadata: HashMap<String, serde_json::Value>,
}

/// Persistence contract for [`Installation`] records.
pub trait InstallationStore
where
	Self: Send + Sync,
{
	/// Inserts or replaces an installation record.
	fn save(&self, installation: Installation) -> StoreFuture<'_, ()>;

	/// Fetches an installation by id.
	fn get<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Installation>>;

	/// Removes an installation.
	fn remove<'a>(&'a self, id: &'a str) -> StoreFuture<'a, ()>;
}

/// Delivery status recorded for a single notification recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDeliveryStatus {
	/// The notification was sent successfully.
	Sent,
	/// Sending failed; the error text is recorded alongside.
	Failed,
}

/// Idempotency ledger gating duplicate notification sends across outbox redeliveries.
pub trait NotificationDispatchLedger
where
	Self: Send + Sync,
{
	/// Returns true if `idempotency_key` has already been recorded.
	fn has_seen<'a>(&'a self, idempotency_key: &'a str) -> StoreFuture<'a, bool>;

	/// Records a delivery attempt outcome for `idempotency_key`.
	fn record<'a>(
		&'a self,
		idempotency_key: &'a str,
		status: NotificationDeliveryStatus,
		error: Option<String>,
	) -> StoreFuture<'a, ()>;
}

/// Bundles every persistence contract the service facade depends on, so generic code can be
/// written over a single type parameter instead of one per store trait.
pub trait Store
where
	Self: ConnectionStore
		+ CredentialStore
		+ GrantStore
		+ OutboxStore
		+ SubscriptionStore
		+ SyncCursorStore
		+ InstallationStore
		+ NotificationDispatchLedger,
{
}
impl<T> Store for T where
	T: ConnectionStore
		+ CredentialStore
		+ GrantStore
		+ OutboxStore
		+ SubscriptionStore
		+ SyncCursorStore
		+ InstallationStore
		+ NotificationDispatchLedger
{
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_service_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let service_error: Error = store_error.clone().into();

		assert!(matches!(service_error, Error::Storage(_)));
		assert!(service_error.to_string().contains("database unreachable"));

		let source = StdError::source(&service_error)
			.expect("Service error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
