//! Connection entity: the binding between a tenant scope and an external provider account.

// self
use crate::{
	_prelude::*,
	model::{ConnectionId, ProviderId, ScopeRef},
};

/// Lifecycle status of a [`Connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	/// Connection is authorized and its active credential is usable.
	Active,
	/// Grants no longer cover required capabilities; the end user must re-consent.
	NeedsReconsent,
	/// Refresh failed unrecoverably; the end user must redo the auth handshake.
	PendingReauth,
	/// Connection was explicitly revoked or torn down.
	Disconnected,
}
impl ConnectionStatus {
	/// Returns true if the connection's active credential may be used to call the provider.
	pub fn is_usable(self) -> bool {
		matches!(self, Self::Active)
	}
}
impl Display for ConnectionStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let s = match self {
			Self::Active => "active",
			Self::NeedsReconsent => "needs_reconsent",
			Self::PendingReauth => "pending_reauth",
			Self::Disconnected => "disconnected",
		};

		f.write_str(s)
	}
}

/// Binding between a tenant scope and an external provider account.
///
/// At most one connection per `(provider_id, scope)` is the intended invariant; the
/// [`crate::scope_resolver::ScopeResolver`] is responsible for detecting and
/// fail-closing on violations rather than the entity itself enforcing uniqueness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
	/// Connection identifier.
	pub id: ConnectionId,
	/// Provider this connection was established with.
	pub provider_id: ProviderId,
	/// Tenant scope this connection is bound to.
	pub scope: ScopeRef,
	/// Provider-assigned account identifier (e.g. the remote org/user id).
	pub external_account_id: String,
	/// Current lifecycle status.
	pub status: ConnectionStatus,
	/// Human-readable summary of the last unrecoverable failure, if any.
	pub last_error: Option<String>,
}
impl Connection {
	/// Builds a freshly connected (`active`) connection record.
	pub fn new(
		id: ConnectionId,
		provider_id: ProviderId,
		scope: ScopeRef,
		external_account_id: impl Into<String>,
	) -> Self {
		Self {
			id,
			provider_id,
			scope,
			external_account_id: external_account_id.into(),
			status: ConnectionStatus::Active,
			last_error: None,
		}
	}

	/// Transitions the connection to `active`, clearing any recorded error.
	pub fn mark_active(&mut self) {
		self.status = ConnectionStatus::Active;
		self.last_error = None;
	}

	/// Transitions the connection to `needs_reconsent`.
	pub fn mark_needs_reconsent(&mut self) {
		self.status = ConnectionStatus::NeedsReconsent;
	}

	/// Transitions the connection to `pending_reauth`, recording the triggering reason.
	pub fn mark_pending_reauth(&mut self, reason: impl Into<String>) {
		self.status = ConnectionStatus::PendingReauth;
		self.last_error = Some(reason.into());
	}

	/// Transitions the connection to `disconnected`.
	pub fn mark_disconnected(&mut self) {
		self.status = ConnectionStatus::Disconnected;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn fixture() -> Connection {
		Connection::new(
			ConnectionId::new("conn-1").expect("Connection id fixture should be valid."),
			ProviderId::new("github").expect("Provider id fixture should be valid."),
			ScopeRef::new("org", "org-1").expect("Scope fixture should be valid."),
			"external-1",
		)
	}

	#[test]
	fn new_connection_starts_active() {
		let connection = fixture();

		assert_eq!(connection.status, ConnectionStatus::Active);
		assert!(connection.last_error.is_none());
	}

	#[test]
	fn pending_reauth_records_reason() {
		let mut connection = fixture();

		connection.mark_pending_reauth("token expired");

		assert_eq!(connection.status, ConnectionStatus::PendingReauth);
		assert_eq!(connection.last_error.as_deref(), Some("token expired"));
	}

	#[test]
	fn mark_active_clears_error() {
		let mut connection = fixture();

		connection.mark_pending_reauth("boom");
		connection.mark_active();

		assert_eq!(connection.status, ConnectionStatus::Active);
		assert!(connection.last_error.is_none());
	}
}
