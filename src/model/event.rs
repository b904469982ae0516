//! Lifecycle event and outbox entry entities used for event propagation.

// self
use crate::{
	_prelude::*,
	model::{ConnectionId, ProviderId, ScopeRef},
};

/// Immutable record of something that happened to a connection or provider.
///
/// Stable event names follow a `<noun>.<verb>` convention, e.g. `connection.connected`,
/// `connection.failed`, `credential.rotated`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
	/// Unique event identifier.
	pub id: String,
	/// Stable event name, `<noun>.<verb>`.
	pub name: String,
	/// Provider this event relates to.
	pub provider_id: ProviderId,
	/// Tenant scope this event relates to.
	pub scope: ScopeRef,
	/// Connection this event relates to, if any.
	pub connection_id: Option<ConnectionId>,
	/// What originated the event (e.g. `service`, `refresh`, `outbox`).
	pub source: String,
	/// When the event occurred.
	pub occurred_at: OffsetDateTime,
	/// Event-specific payload.
	pub payload: HashMap<String, serde_json::Value>,
	/// Free-form metadata (e.g. an explicit `status` override for projection).
	pub metadata: HashMap<String, serde_json::Value>,
}
impl LifecycleEvent {
	/// Builds a new lifecycle event with empty payload and metadata.
	pub fn new(
		id: impl Into<String>,
		name: impl Into<String>,
		provider_id: ProviderId,
		scope: ScopeRef,
		source: impl Into<String>,
		occurred_at: OffsetDateTime,
	) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			provider_id,
			scope,
			connection_id: None,
			source: source.into(),
			occurred_at,
			payload: HashMap::new(),
			metadata: HashMap::new(),
		}
	}

	/// Sets the connection this event relates to, returning `self` for chaining.
	pub fn with_connection_id(mut self, connection_id: ConnectionId) -> Self {
		self.connection_id = Some(connection_id);
		self
	}

	/// Sets the payload map, returning `self` for chaining.
	pub fn with_payload(mut self, payload: HashMap<String, serde_json::Value>) -> Self {
		self.payload = payload;
		self
	}

	/// Sets the metadata map, returning `self` for chaining.
	pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
		self.metadata = metadata;
		self
	}

	/// Reads `metadata.status` as a string, if present.
	pub fn metadata_status(&self) -> Option<String> {
		self.metadata.get("status").and_then(|v| v.as_str()).map(str::to_owned)
	}
}

/// A [`LifecycleEvent`] queued for at-least-once delivery to projectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
	/// The queued event.
	pub event: LifecycleEvent,
	/// Number of delivery attempts made so far.
	pub attempt: u32,
	/// Earliest instant the next delivery attempt may run.
	pub next_attempt_at: OffsetDateTime,
}
impl OutboxEntry {
	/// Wraps a freshly enqueued event with zero attempts.
	pub fn new(event: LifecycleEvent, enqueued_at: OffsetDateTime) -> Self {
		Self { event, attempt: 0, next_attempt_at: enqueued_at }
	}

	/// Returns true if this entry has exceeded the given attempt ceiling.
	pub fn exhausted(&self, max_attempts: u32) -> bool {
		self.attempt >= max_attempts
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn event() -> LifecycleEvent {
		LifecycleEvent::new(
			"evt-1",
			"connection.failed",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		)
	}

	#[test]
	fn metadata_status_reads_explicit_override() {
		let evt = event().with_metadata(HashMap::from_iter([(
			"status".to_owned(),
			serde_json::Value::String("warn".into()),
		)]));

		assert_eq!(evt.metadata_status().as_deref(), Some("warn"));
	}

	#[test]
	fn outbox_entry_starts_unattempted() {
		let entry = OutboxEntry::new(event(), OffsetDateTime::UNIX_EPOCH);

		assert_eq!(entry.attempt, 0);
		assert!(!entry.exhausted(3));
	}

	#[test]
	fn outbox_entry_exhausted_at_ceiling() {
		let mut entry = OutboxEntry::new(event(), OffsetDateTime::UNIX_EPOCH);
		entry.attempt = 3;

		assert!(entry.exhausted(3));
	}
}
