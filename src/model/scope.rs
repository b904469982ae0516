//! Tenant scope addressing (`{type, id}`) shared across connections, grants, and events.

// self
use crate::_prelude::*;

/// Error returned when a [`ScopeRef`] fails validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// The scope type was empty or whitespace-only.
	#[error("Scope type cannot be empty.")]
	EmptyType,
	/// The scope id was empty or whitespace-only.
	#[error("Scope id cannot be empty.")]
	EmptyId,
}

/// Tenant addressability `{type, id}`, e.g. `{org, org_123}`.
///
/// Equality is case-insensitive on `scope_type` (stored pre-normalized to lowercase)
/// and exact on `scope_id`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
	/// Lowercase-normalized scope type (e.g. `org`, `workspace`, `user`).
	pub scope_type: String,
	/// Opaque scope identifier within the type's namespace.
	pub scope_id: String,
}
impl ScopeRef {
	/// Builds a scope reference, trimming and lowercasing the type and trimming the id.
	pub fn new(
		scope_type: impl AsRef<str>,
		scope_id: impl AsRef<str>,
	) -> Result<Self, ScopeValidationError> {
		let scope_type = scope_type.as_ref().trim().to_ascii_lowercase();
		let scope_id = scope_id.as_ref().trim().to_owned();

		if scope_type.is_empty() {
			return Err(ScopeValidationError::EmptyType);
		}
		if scope_id.is_empty() {
			return Err(ScopeValidationError::EmptyId);
		}

		Ok(Self { scope_type, scope_id })
	}
}
impl Display for ScopeRef {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}", self.scope_type, self.scope_id)
	}
}
