//! Pure functions for normalizing grant strings and computing set-difference deltas.

// self
use crate::{
	_prelude::*,
	model::{CapabilityDescriptor, GrantEventType},
};

/// Trims, lowercases, drops empties, dedupes, and sorts ascending.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(values: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
	let mut out: Vec<String> =
		values.into_iter().map(|v| v.as_ref().trim().to_ascii_lowercase()).filter(|v| !v.is_empty()).collect();

	out.sort();
	out.dedup();

	out
}

/// Result of diffing a previous and current granted set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantDelta {
	/// Scopes present in `current` but not `previous`, sorted.
	pub added: Vec<String>,
	/// Scopes present in `previous` but not `current`, sorted.
	pub removed: Vec<String>,
	/// Classification of the transition, if any event should be emitted.
	pub event_type: Option<GrantEventType>,
}

/// Computes the set-difference delta between `previous` and `current` granted sets.
///
/// Both inputs are normalized before comparison. `event_type` classification:
/// - `removed` non-empty and `current` empty → `Revoked`.
/// - `removed` non-empty otherwise → `Downgraded`.
/// - `added` non-empty (and `removed` empty) → `Expanded`.
/// - otherwise → `None` (no event).
pub fn delta(previous: &[String], current: &[String]) -> GrantDelta {
	let previous = normalize(previous);
	let current = normalize(current);
	let added: Vec<String> = current.iter().filter(|s| !previous.contains(*s)).cloned().collect();
	let removed: Vec<String> = previous.iter().filter(|s| !current.contains(*s)).cloned().collect();

	let event_type = if !removed.is_empty() && current.is_empty() {
		Some(GrantEventType::Revoked)
	} else if !removed.is_empty() {
		Some(GrantEventType::Downgraded)
	} else if !added.is_empty() {
		Some(GrantEventType::Expanded)
	} else {
		None
	};

	GrantDelta { added, removed, event_type }
}

/// Returns the sorted union of `capabilities`' required grants that are absent from `granted`.
pub fn missing_required(capabilities: &[CapabilityDescriptor], granted: &[String]) -> Vec<String> {
	let granted = normalize(granted);
	let mut required: Vec<String> =
		capabilities.iter().flat_map(|c| normalize(c.required_grants.iter())).collect();

	required.sort();
	required.dedup();
	required.retain(|g| !granted.contains(g));

	required
}
