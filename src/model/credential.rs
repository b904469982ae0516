//! Credential entity: encrypted authorization material for a connection.

// self
use crate::{_prelude::*, model::ConnectionId};

/// Redacted secret wrapper that keeps token material out of logs and `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true if the underlying secret is empty after trimming.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Lifecycle status of a stored [`Credential`] version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
	/// The version currently authorizes provider calls. At most one per connection.
	Active,
	/// The version was superseded by a rotation or explicitly revoked.
	Revoked,
}

/// Wire format used to encode a credential's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
	/// Raw UTF-8 bytes of a single access or refresh token.
	LegacyToken,
	/// Structured JSON object, see [`crate::codec::ActiveCredentialJsonV1`].
	ActiveCredentialJson,
}

/// Persisted, versioned credential record.
///
/// Per connection, at most one credential has `status = Active`; a successful
/// refresh that yields a materially different credential creates version `N+1`,
/// while a no-op refresh must not increment the version (see
/// [`crate::lifecycle`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Monotonically increasing version number, starting at 1.
	pub version: u64,
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Encoded payload bytes; decode via [`crate::codec::CredentialCodec`].
	pub encrypted_payload: Vec<u8>,
	/// Wire format the payload was encoded with.
	pub payload_format: PayloadFormat,
	/// Format-specific schema version.
	pub payload_version: u32,
	/// Provider-reported token type (e.g. `Bearer`).
	pub token_type: Option<String>,
	/// Normalized scopes that were requested.
	pub requested_scopes: Vec<String>,
	/// Normalized scopes actually granted.
	pub granted_scopes: Vec<String>,
	/// Access token expiry instant, if the provider issues one.
	pub expires_at: Option<OffsetDateTime>,
	/// Provider-recommended rotation instant, if any.
	pub rotates_at: Option<OffsetDateTime>,
	/// Whether this credential can be auto-refreshed given a refresh token.
	pub refreshable: bool,
	/// Current lifecycle status.
	pub status: CredentialStatus,
}

/// Decoded, in-memory form of a credential passed to providers and signers.
#[derive(Clone, Serialize, Deserialize)]
pub struct ActiveCredential {
	/// Owning connection.
	pub connection_id: ConnectionId,
	/// Provider-reported token type (e.g. `Bearer`).
	pub token_type: Option<String>,
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Normalized scopes that were requested.
	pub requested_scopes: Vec<String>,
	/// Normalized scopes actually granted.
	pub granted_scopes: Vec<String>,
	/// Access token expiry instant, if any.
	pub expires_at: Option<OffsetDateTime>,
	/// Whether this credential can be auto-refreshed given a refresh token.
	pub refreshable: bool,
	/// Provider-recommended rotation instant, if any.
	pub rotates_at: Option<OffsetDateTime>,
	/// Free-form signer/provider metadata (e.g. SigV4 key material).
	pub metadata: HashMap<String, serde_json::Value>,
}
impl ActiveCredential {
	/// Returns true if a refresh token is present.
	pub fn has_refresh_token(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|t| !t.is_blank())
	}

	/// Returns true if an access token is present.
	pub fn has_access_token(&self) -> bool {
		!self.access_token.is_blank()
	}

	/// Returns a metadata value by key, cloned so callers can never alias the stored map.
	pub fn metadata_str(&self, key: &str) -> Option<String> {
		self.metadata.get(key).and_then(|v| v.as_str()).map(str::to_owned)
	}
}
impl Debug for ActiveCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActiveCredential")
			.field("connection_id", &self.connection_id)
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("requested_scopes", &self.requested_scopes)
			.field("granted_scopes", &self.granted_scopes)
			.field("expires_at", &self.expires_at)
			.field("refreshable", &self.refreshable)
			.field("rotates_at", &self.rotates_at)
			.finish()
	}
}

/// Returns true if two scope lists are equal as sets (order-insensitive, case-sensitive).
pub(crate) fn scopes_equal_as_sets(a: &[String], b: &[String]) -> bool {
	let mut a = a.to_vec();
	let mut b = b.to_vec();

	a.sort();
	b.sort();
	a.dedup();
	b.dedup();

	a == b
}

/// Reports whether `refreshed` differs materially from `current`, per the idempotent
/// rotation rule in [`crate::lifecycle`]: token_type, access_token (trimmed),
/// presence/value of refresh_token when no access_token, refreshable flag,
/// requested/granted scope sets, expires_at, rotates_at.
pub fn materially_differs(current: &ActiveCredential, refreshed: &ActiveCredential) -> bool {
	if current.token_type != refreshed.token_type {
		return true;
	}
	if current.access_token.expose().trim() != refreshed.access_token.expose().trim() {
		return true;
	}
	if !refreshed.has_access_token() {
		let current_refresh = current.refresh_token.as_ref().map(TokenSecret::expose);
		let refreshed_refresh = refreshed.refresh_token.as_ref().map(TokenSecret::expose);

		if current_refresh != refreshed_refresh {
			return true;
		}
	}
	if current.refreshable != refreshed.refreshable {
		return true;
	}
	if !scopes_equal_as_sets(&current.requested_scopes, &refreshed.requested_scopes) {
		return true;
	}
	if !scopes_equal_as_sets(&current.granted_scopes, &refreshed.granted_scopes) {
		return true;
	}
	if current.expires_at != refreshed.expires_at {
		return true;
	}
	if current.rotates_at != refreshed.rotates_at {
		return true;
	}

	false
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credential(access_token: &str) -> ActiveCredential {
		ActiveCredential {
			connection_id: ConnectionId::new("conn-1").expect("Connection id fixture."),
			token_type: Some("Bearer".into()),
			access_token: TokenSecret::new(access_token),
			refresh_token: Some(TokenSecret::new("refresh-1")),
			requested_scopes: vec!["email".into(), "profile".into()],
			granted_scopes: vec!["email".into()],
			expires_at: None,
			refreshable: true,
			rotates_at: None,
			metadata: HashMap::new(),
		}
	}

	#[test]
	fn identical_credentials_do_not_differ() {
		let a = credential("token-a");
		let b = credential("token-a");

		assert!(!materially_differs(&a, &b));
	}

	#[test]
	fn whitespace_only_access_token_change_is_ignored() {
		let a = credential("token-a");
		let b = credential(" token-a ");

		assert!(!materially_differs(&a, &b));
	}

	#[test]
	fn access_token_change_is_material() {
		let a = credential("token-a");
		let b = credential("token-b");

		assert!(materially_differs(&a, &b));
	}

	#[test]
	fn scope_reordering_is_not_material() {
		let mut a = credential("token-a");
		let mut b = credential("token-a");

		a.requested_scopes = vec!["email".into(), "profile".into()];
		b.requested_scopes = vec!["profile".into(), "email".into()];

		assert!(!materially_differs(&a, &b));
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}
}
