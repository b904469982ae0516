// self
use crate::{_prelude::*, operation::ProviderOperationRequest};
use sha2::{Digest, Sha256};

/// Derives a deterministic idempotency key from the provider, connection, operation, method,
/// canonical (sorted-query) URL, and a hash of the body.
///
/// The same key is produced whether the query was embedded in the URL or supplied via
/// [`crate::operation::TransportRequest::query`], since both are folded through
/// [`crate::operation::TransportRequest::canonical_url`] before hashing.
pub fn derive_idempotency_key(request: &ProviderOperationRequest) -> String {
	let mut hasher = Sha256::new();

	hasher.update(request.provider_id.as_ref().as_bytes());
	hasher.update(b"\0");
	hasher.update(request.connection_id.as_ref().as_bytes());
	hasher.update(b"\0");
	hasher.update(request.operation.as_bytes());
	hasher.update(b"\0");
	hasher.update(request.transport_request.method.as_bytes());
	hasher.update(b"\0");
	hasher.update(request.transport_request.canonical_url().as_str().as_bytes());
	hasher.update(b"\0");

	if let Some(body) = &request.transport_request.body {
		hasher.update(Sha256::digest(body));
	}

	hex::encode(hasher.finalize())
}

mod hex {
	pub fn encode(bytes: impl AsRef<[u8]>) -> String {
		bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
	}
}
