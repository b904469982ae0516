//! Versioned encode/decode of credential payloads.

// self
use crate::{
	_prelude::*,
	error::{Error, ValidationError},
	model::{ActiveCredential, ConnectionId, PayloadFormat, TokenSecret},
};

/// Error raised when a `(payload_format, payload_version)` combination has no codec.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unsupported credential payload format/version combination: {format:?} v{version}.")]
pub struct CodecUnsupported {
	/// The offending payload format.
	pub format: PayloadFormat,
	/// The offending payload version.
	pub version: u32,
}
impl From<CodecUnsupported> for Error {
	fn from(_: CodecUnsupported) -> Self {
		Self::Validation(ValidationError::MissingField { field: "payload_format" })
	}
}

/// Structured JSON payload shape for `active_credential_json` version 1.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ActiveCredentialJsonV1 {
	connection_id: String,
	token_type: Option<String>,
	access_token: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	refresh_token: Option<String>,
	#[serde(default)]
	requested_scopes: Vec<String>,
	#[serde(default)]
	granted_scopes: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	expires_at: Option<OffsetDateTime>,
	#[serde(default)]
	refreshable: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	rotates_at: Option<OffsetDateTime>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	metadata: HashMap<String, serde_json::Value>,
}

/// Encodes and decodes [`ActiveCredential`] payloads for every supported wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialCodec;
impl CredentialCodec {
	/// The schema version this codec writes for `active_credential_json`.
	pub const CURRENT_JSON_VERSION: u32 = 1;

	/// Encodes `credential` using `(format, version)`.
	pub fn encode(
		&self,
		format: PayloadFormat,
		version: u32,
		credential: &ActiveCredential,
	) -> Result<Vec<u8>, Error> {
		match (format, version) {
			(PayloadFormat::LegacyToken, 1) => {
				let token = credential.access_token.expose().trim();

				if token.is_empty() {
					return Err(Error::Validation(ValidationError::MissingField { field: "access_token" }));
				}

				Ok(token.as_bytes().to_vec())
			},
			(PayloadFormat::ActiveCredentialJson, 1) => {
				let payload = ActiveCredentialJsonV1 {
					connection_id: credential.connection_id.to_string(),
					token_type: credential.token_type.clone(),
					access_token: credential.access_token.expose().trim().to_owned(),
					refresh_token: credential
						.refresh_token
						.as_ref()
						.map(|t| t.expose().trim().to_owned())
						.filter(|s| !s.is_empty()),
					requested_scopes: credential.requested_scopes.clone(),
					granted_scopes: credential.granted_scopes.clone(),
					expires_at: credential.expires_at,
					refreshable: credential.refreshable,
					rotates_at: credential.rotates_at,
					metadata: credential.metadata.clone(),
				};

				serde_json::to_vec(&payload)
					.map_err(|e| Error::Transient(crate::error::TransientError::ResponseParse { source: e, status: None }))
			},
			_ => Err(CodecUnsupported { format, version }.into()),
		}
	}

	/// Decodes a payload back into an [`ActiveCredential`]. `fallback_connection_id` is used
	/// for `legacy_token`, which carries no connection reference of its own.
	pub fn decode(
		&self,
		format: PayloadFormat,
		version: u32,
		payload: &[u8],
		fallback_connection_id: &ConnectionId,
	) -> Result<ActiveCredential, Error> {
		if payload.is_empty() {
			return Err(Error::Validation(ValidationError::MissingField { field: "encrypted_payload" }));
		}

		match (format, version) {
			(PayloadFormat::LegacyToken, 1) => {
				let token = std::str::from_utf8(payload)
					.map_err(|_| Error::Validation(ValidationError::MissingField { field: "encrypted_payload" }))?
					.trim();

				Ok(ActiveCredential {
					connection_id: fallback_connection_id.clone(),
					token_type: None,
					access_token: TokenSecret::new(token),
					refresh_token: None,
					requested_scopes: vec![],
					granted_scopes: vec![],
					expires_at: None,
					refreshable: false,
					rotates_at: None,
					metadata: HashMap::new(),
				})
			},
			(PayloadFormat::ActiveCredentialJson, 1) => {
				let decoded: ActiveCredentialJsonV1 = serde_json::from_slice(payload).map_err(|e| {
					Error::Transient(crate::error::TransientError::ResponseParse { source: e, status: None })
				})?;

				Ok(ActiveCredential {
					connection_id: ConnectionId::new(decoded.connection_id)
						.unwrap_or_else(|_| fallback_connection_id.clone()),
					token_type: decoded.token_type,
					access_token: TokenSecret::new(decoded.access_token.trim()),
					refresh_token: decoded.refresh_token.map(|t| TokenSecret::new(t.trim())),
					requested_scopes: decoded.requested_scopes,
					granted_scopes: decoded.granted_scopes,
					expires_at: decoded.expires_at,
					refreshable: decoded.refreshable,
					rotates_at: decoded.rotates_at,
					metadata: decoded.metadata,
				})
			},
			_ => Err(CodecUnsupported { format, version }.into()),
		}
	}
}
