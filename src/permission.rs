//! Evaluates whether a connection's latest grant snapshot authorizes a capability.

// self
use crate::{
	_prelude::*,
	error::{Error, ValidationError},
	grant_algebra,
	model::{CapabilityDescriptor, ConnectionId, DeniedBehavior},
	store::GrantStore,
};

/// Result of evaluating a capability against a connection's grants.
///
/// `allowed = false` is a success-shaped result (not an [`Error`]) so callers can distinguish
/// a policy denial from an infrastructure failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionDecision {
	/// Whether the capability is authorized.
	pub allowed: bool,
	/// Required grants the connection is missing, sorted.
	pub missing_grants: Vec<String>,
	/// How the capability behaves when denied.
	pub mode: Option<DeniedBehavior>,
	/// Human-readable reason, populated when `allowed == false`.
	pub reason: Option<String>,
}

/// Evaluates capability authorization against a [`GrantStore`]'s latest snapshot.
pub struct PermissionEvaluator<S> {
	store: Arc<S>,
}
impl<S> PermissionEvaluator<S>
where
	S: GrantStore,
{
	/// Builds an evaluator over `store`.
	pub fn new(store: Arc<S>) -> Self {
		Self { store }
	}

	/// Evaluates `capability` for `connection_id`.
	pub async fn evaluate(
		&self,
		connection_id: &ConnectionId,
		capability: &CapabilityDescriptor,
	) -> Result<PermissionDecision, Error> {
		let snapshot = self
			.store
			.get_latest_snapshot(connection_id)
			.await
			.map_err(Error::Storage)?
			.ok_or_else(|| Error::Validation(ValidationError::MissingField { field: "grant_snapshot" }))?;

		let missing = grant_algebra::missing_required(std::slice::from_ref(capability), &snapshot.granted);

		if missing.is_empty() {
			return Ok(PermissionDecision { allowed: true, missing_grants: vec![], mode: None, reason: None });
		}

		Ok(PermissionDecision {
			allowed: false,
			missing_grants: missing,
			mode: Some(capability.denied_behavior),
			reason: Some("missing required grants".to_owned()),
		})
	}
}
