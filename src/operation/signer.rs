// self
use crate::{_prelude::*, error::{Error, ValidationError}, model::ActiveCredential, operation::{TransportRequest, TransportResponse}};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Result of signing a [`TransportRequest`].
pub struct SignedRequest {
	/// The request with signing headers applied.
	pub request: TransportRequest,
	/// Name of the strategy that performed the signing (`bearer`, `aws_sigv4`, `none`).
	pub strategy: &'static str,
	/// Signer-reported metadata, e.g. `signing_profile`, `signed_region`, `signing_mode`.
	pub meta: HashMap<String, String>,
}

/// Applies provider-specific authentication to an outbound request.
pub trait Signer
where
	Self: Send + Sync,
{
	/// Signs `request` using `credential`, if present.
	fn sign(&self, request: &TransportRequest, credential: Option<&ActiveCredential>) -> Result<SignedRequest, Error>;
}

/// Adds an `Authorization: Bearer <token>` header from the credential's access token.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl Signer for BearerSigner {
	fn sign(&self, request: &TransportRequest, credential: Option<&ActiveCredential>) -> Result<SignedRequest, Error> {
		let mut signed = request.clone();

		if let Some(credential) = credential {
			signed.headers.insert("Authorization".to_owned(), format!("Bearer {}", credential.access_token.expose()));
		}

		Ok(SignedRequest { request: signed, strategy: "bearer", meta: HashMap::new() })
	}
}

/// Signs requests using AWS Signature Version 4, reading key material from credential
/// metadata (`aws_access_key_id`, `aws_secret_access_key`, `aws_region`, `aws_service`,
/// `aws_signing_mode`, `aws_access_token_header`).
#[derive(Clone, Copy, Debug, Default)]
pub struct AwsSigV4Signer;
impl AwsSigV4Signer {
	fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
		let mut mac =
			HmacSha256::new_from_slice(format!("AWS4{secret}").as_bytes()).expect("HMAC accepts any key length.");
		mac.update(date.as_bytes());
		let k_date = mac.finalize().into_bytes();

		let mut mac = HmacSha256::new_from_slice(&k_date).expect("HMAC accepts any key length.");
		mac.update(region.as_bytes());
		let k_region = mac.finalize().into_bytes();

		let mut mac = HmacSha256::new_from_slice(&k_region).expect("HMAC accepts any key length.");
		mac.update(service.as_bytes());
		let k_service = mac.finalize().into_bytes();

		let mut mac = HmacSha256::new_from_slice(&k_service).expect("HMAC accepts any key length.");
		mac.update(b"aws4_request");

		mac.finalize().into_bytes().to_vec()
	}
}
impl Signer for AwsSigV4Signer {
	fn sign(&self, request: &TransportRequest, credential: Option<&ActiveCredential>) -> Result<SignedRequest, Error> {
		let credential = credential
			.ok_or_else(|| Error::Validation(ValidationError::MissingField { field: "credential" }))?;
		let access_key_id = credential
			.metadata_str("aws_access_key_id")
			.ok_or_else(|| Error::Validation(ValidationError::MissingField { field: "aws_access_key_id" }))?;
		let secret_access_key = credential
			.metadata_str("aws_secret_access_key")
			.ok_or_else(|| Error::Validation(ValidationError::MissingField { field: "aws_secret_access_key" }))?;
		let region = credential.metadata_str("aws_region").unwrap_or_else(|| "us-east-1".to_owned());
		let service = credential.metadata_str("aws_service").unwrap_or_else(|| "execute-api".to_owned());
		let signing_mode = credential.metadata_str("aws_signing_mode").unwrap_or_else(|| "header".to_owned());
		let access_token_header =
			credential.metadata_str("aws_access_token_header").unwrap_or_else(|| "X-Amz-Security-Token".to_owned());

		let now = OffsetDateTime::now_utc();
		let amz_date = now
			.format(&time::format_description::well_known::Iso8601::DEFAULT)
			.unwrap_or_default()
			.replace(['-', ':'], "")
			.split('.')
			.next()
			.unwrap_or_default()
			.to_owned()
			+ "Z";
		let date_stamp = &amz_date[..8];

		let mut signed = request.clone();
		let host = signed.url.host_str().unwrap_or_default().to_owned();
		let canonical_uri = if signed.url.path().is_empty() { "/".to_owned() } else { signed.url.path().to_owned() };
		let canonical_query = signed
			.query
			.iter()
			.map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
			.collect::<Vec<_>>()
			.join("&");
		let payload_hash = hex_digest(signed.body.as_deref().unwrap_or(&[]));

		signed.headers.insert("host".to_owned(), host.clone());
		signed.headers.insert("x-amz-date".to_owned(), amz_date.clone());
		if let Some(token) = credential.metadata_str("aws_session_token") {
			signed.headers.insert(access_token_header.to_ascii_lowercase(), token);
		}

		let mut header_names: Vec<&String> = signed.headers.keys().collect();
		header_names.sort();

		let canonical_headers = header_names
			.iter()
			.map(|k| format!("{}:{}\n", k.to_ascii_lowercase(), signed.headers[*k].trim()))
			.collect::<String>();
		let signed_headers = header_names.iter().map(|k| k.to_ascii_lowercase()).collect::<Vec<_>>().join(";");

		let canonical_request = format!(
			"{}\n{}\n{}\n{}\n{}\n{}",
			signed.method, canonical_uri, canonical_query, canonical_headers, signed_headers, payload_hash
		);
		let credential_scope = format!("{date_stamp}/{region}/{service}/aws4_request");
		let string_to_sign =
			format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{}", hex_digest(canonical_request.as_bytes()));

		let signing_key = Self::derive_signing_key(&secret_access_key, date_stamp, &region, &service);
		let mut mac = HmacSha256::new_from_slice(&signing_key).expect("HMAC accepts any key length.");
		mac.update(string_to_sign.as_bytes());
		let signature = hex::encode(mac.finalize().into_bytes());

		let authorization = format!(
			"AWS4-HMAC-SHA256 Credential={access_key_id}/{credential_scope}, SignedHeaders={signed_headers}, \
			 Signature={signature}"
		);

		signed.headers.insert("Authorization".to_owned(), authorization);

		let mut meta = HashMap::new();

		meta.insert("signing_profile".to_owned(), access_key_id);
		meta.insert("signed_region".to_owned(), region);
		meta.insert("signing_mode".to_owned(), signing_mode);

		Ok(SignedRequest { request: signed, strategy: "aws_sigv4", meta })
	}
}

/// Computes `clock_skew_hint_seconds` by comparing a provider's `Date` response header to the
/// local clock, for operations signed with [`AwsSigV4Signer`].
pub fn aws_clock_skew_hint_seconds(response: &TransportResponse) -> Option<i64> {
	let header = response.header("Date")?;
	let server_time =
		time::OffsetDateTime::parse(header.trim(), &time::format_description::well_known::Rfc2822).ok()?;

	Some((OffsetDateTime::now_utc() - server_time).whole_seconds())
}

fn hex_digest(bytes: &[u8]) -> String {
	hex::encode(Sha256::digest(bytes))
}

mod hex {
	pub fn encode(bytes: impl AsRef<[u8]>) -> String {
		bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
	}
}

mod urlencoding {
	pub fn encode(value: &str) -> String {
		let mut out = String::with_capacity(value.len());

		for byte in value.bytes() {
			match byte {
				b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
				_ => out.push_str(&format!("%{byte:02X}")),
			}
		}

		out
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::{ConnectionId, TokenSecret};

	fn credential_with(metadata: HashMap<String, serde_json::Value>) -> ActiveCredential {
		ActiveCredential {
			connection_id: ConnectionId::new("conn-1").expect("Connection id fixture."),
			token_type: None,
			access_token: TokenSecret::new("access-token"),
			refresh_token: None,
			requested_scopes: vec![],
			granted_scopes: vec![],
			expires_at: None,
			refreshable: false,
			rotates_at: None,
			metadata,
		}
	}

	#[test]
	fn bearer_signer_adds_authorization_header() {
		let request =
			TransportRequest::new("GET", Url::parse("https://api.example.com/v1/reports").expect("Url fixture."));
		let credential = credential_with(HashMap::new());
		let signed = BearerSigner.sign(&request, Some(&credential)).expect("Sign should succeed.");

		assert_eq!(signed.request.headers.get("Authorization").map(String::as_str), Some("Bearer access-token"));
		assert_eq!(signed.strategy, "bearer");
	}

	#[test]
	fn sigv4_signer_requires_access_key_metadata() {
		let request =
			TransportRequest::new("GET", Url::parse("https://dynamodb.us-east-1.amazonaws.com/").expect("Url fixture."));
		let credential = credential_with(HashMap::new());

		assert!(AwsSigV4Signer.sign(&request, Some(&credential)).is_err());
	}

	#[test]
	fn sigv4_signer_produces_authorization_header() {
		let request =
			TransportRequest::new("GET", Url::parse("https://dynamodb.us-east-1.amazonaws.com/").expect("Url fixture."));
		let credential = credential_with(HashMap::from_iter([
			("aws_access_key_id".to_owned(), serde_json::Value::String("AKIDEXAMPLE".into())),
			("aws_secret_access_key".to_owned(), serde_json::Value::String("secret".into())),
			("aws_region".to_owned(), serde_json::Value::String("us-east-1".into())),
			("aws_service".to_owned(), serde_json::Value::String("dynamodb".into())),
		]));
		let signed = AwsSigV4Signer.sign(&request, Some(&credential)).expect("Sign should succeed.");

		assert!(signed.request.headers.get("Authorization").expect("Authorization header should be set.")
			.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
		assert_eq!(signed.meta.get("signed_region").map(String::as_str), Some("us-east-1"));
	}
}
