//! Grant snapshot and event entities tracking what a connection is authorized for.

// self
use crate::{
	_prelude::*,
	model::ConnectionId,
};

/// Point-in-time record of what was requested versus granted for a connection.
///
/// Versions are dense and monotonic per connection, starting at 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSnapshot {
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Monotonic, gap-free version number starting at 1.
	pub version: u64,
	/// Normalized scopes that were requested.
	pub requested: Vec<String>,
	/// Normalized scopes actually granted.
	pub granted: Vec<String>,
	/// When this snapshot was captured.
	pub captured_at: OffsetDateTime,
}
impl GrantSnapshot {
	/// Builds the first snapshot (version 1) for a connection.
	pub fn initial(
		connection_id: ConnectionId,
		requested: Vec<String>,
		granted: Vec<String>,
		captured_at: OffsetDateTime,
	) -> Self {
		Self { connection_id, version: 1, requested, granted, captured_at }
	}

	/// Builds the next snapshot in sequence, reusing `self`'s connection.
	pub fn next(&self, requested: Vec<String>, granted: Vec<String>, captured_at: OffsetDateTime) -> Self {
		Self {
			connection_id: self.connection_id.clone(),
			version: self.version + 1,
			requested,
			granted,
			captured_at,
		}
	}
}

/// Classification of a grant-set transition, emitted when the granted set changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantEventType {
	/// Grants were added without any removal.
	Expanded,
	/// Some previously granted scopes were removed (but not all).
	Downgraded,
	/// All previously granted scopes were removed.
	Revoked,
	/// Re-consent was required due to missing required grants.
	ReconsentRequested,
	/// Re-consent was completed and grants restored.
	ReconsentCompleted,
}
impl Display for GrantEventType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let s = match self {
			Self::Expanded => "expanded",
			Self::Downgraded => "downgraded",
			Self::Revoked => "revoked",
			Self::ReconsentRequested => "reconsent_requested",
			Self::ReconsentCompleted => "reconsent_completed",
		};

		f.write_str(s)
	}
}

/// Append-only record of a grant-set transition for a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEvent {
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Classification of the transition.
	pub event_type: GrantEventType,
	/// Scopes present in the new granted set but not the previous one.
	pub added: Vec<String>,
	/// Scopes present in the previous granted set but not the new one.
	pub removed: Vec<String>,
	/// When the transition occurred.
	pub occurred_at: OffsetDateTime,
}
impl GrantEvent {
	/// Builds a new grant event.
	pub fn new(
		connection_id: ConnectionId,
		event_type: GrantEventType,
		added: Vec<String>,
		removed: Vec<String>,
		occurred_at: OffsetDateTime,
	) -> Self {
		Self { connection_id, event_type, added, removed, occurred_at }
	}
}
