//! Signed, idempotent, rate-limited, retry-with-backoff provider operation runtime.

pub mod idempotency;
pub mod rate_limit;
pub mod retry;
pub mod signer;

pub use idempotency::*;
pub use rate_limit::*;
pub use retry::*;
pub use signer::*;

// self
use crate::{
	_prelude::*,
	error::{Error, ProviderOperationError, TransientError},
	model::{ActiveCredential, ConnectionId, ProviderId},
};

/// Transport mechanism a [`TransportRequest`] is carried over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
	/// Plain HTTP/REST request.
	Http,
}

/// A provider-bound request awaiting signing and transport.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method (e.g. `GET`, `POST`).
	pub method: String,
	/// Target URL, without query parameters merged in yet.
	pub url: Url,
	/// Query parameters to merge into the URL in canonical (sorted) order.
	pub query: BTreeMap<String, String>,
	/// Request headers.
	pub headers: HashMap<String, String>,
	/// Request body bytes, if any.
	pub body: Option<Vec<u8>>,
	/// Derived idempotency key, populated by the runtime before signing.
	pub idempotency: Option<String>,
	/// Header name used to carry the idempotency key; `None` suppresses the header.
	pub idempotency_header: Option<String>,
}
impl TransportRequest {
	/// Builds a bare request with no query, headers, or body.
	pub fn new(method: impl Into<String>, url: Url) -> Self {
		Self {
			method: method.into(),
			url,
			query: BTreeMap::new(),
			headers: HashMap::new(),
			body: None,
			idempotency: None,
			idempotency_header: Some("Idempotency-Key".to_owned()),
		}
	}

	/// Returns the URL with `query` merged in canonical (sorted-key, percent-encoded) form.
	pub fn canonical_url(&self) -> Url {
		let mut url = self.url.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.clear();

			for (k, v) in &self.query {
				pairs.append_pair(k, v);
			}
		}

		url
	}
}

/// Response returned by a [`TransportAdapter`].
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status_code: u16,
	/// Response headers.
	pub headers: HashMap<String, String>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Looks up a response header case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}

/// Boxed future returned by transport adapters.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse, Error>> + 'a + Send>>;

/// Executes a signed [`TransportRequest`] against the network.
pub trait TransportAdapter
where
	Self: Send + Sync,
{
	/// Sends `request` and returns the raw response, or a transport-level error.
	fn execute<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a>;
}

/// Per-attempt retry policy.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
	/// Maximum number of attempts, including the first.
	pub max_attempts: u32,
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self { max_attempts: 3 }
	}
}

/// Sleeper abstraction honoring cancellation; see [`crate::cancel::Cancellation`].
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Sleeps for `duration`, returning early if `cancel` fires.
	fn sleep<'a>(
		&'a self,
		duration: Duration,
		cancel: &'a crate::cancel::Cancellation,
	) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>>;
}
impl<T> Sleeper for Arc<T>
where
	T: Sleeper + ?Sized,
{
	fn sleep<'a>(
		&'a self,
		duration: Duration,
		cancel: &'a crate::cancel::Cancellation,
	) -> Pin<Box<dyn Future<Output = ()> + 'a + Send>> {
		(**self).sleep(duration, cancel)
	}
}

/// A request to invoke, as resolved by [`crate::provider::CapabilityOperationResolver`].
#[derive(Clone)]
pub struct ProviderOperationRequest {
	/// Provider identifier the request targets.
	pub provider_id: ProviderId,
	/// Connection identifier the request is executed on behalf of.
	pub connection_id: ConnectionId,
	/// Logical operation name (e.g. `reports.fetch`).
	pub operation: String,
	/// Transport mechanism the request is carried over.
	pub transport_kind: TransportKind,
	/// The request to sign and send.
	pub transport_request: TransportRequest,
	/// Retry policy for this invocation.
	pub retry: RetryPolicy,
	/// Decoded credential to sign the request with, if any.
	pub credential: Option<ActiveCredential>,
	/// Rate-limit bucket key; defaults to `provider_id:operation` when unset.
	pub bucket_key: Option<String>,
}

/// Outcome of a fully executed provider operation.
#[derive(Clone, Debug)]
pub struct ProviderOperationOutcome {
	/// Raw transport response.
	pub response: TransportResponse,
	/// Total attempts made, including the final one.
	pub attempts: u32,
	/// Whether any attempt was retried.
	pub retried: bool,
	/// Idempotency key used across all attempts.
	pub idempotency: String,
	/// Name of the signing strategy used (`bearer`, `aws_sigv4`).
	pub auth_strategy: &'static str,
	/// Signer-reported metadata (e.g. `clock_skew_hint_seconds`).
	pub meta: HashMap<String, String>,
}

/// Classification of a transport attempt's result, driving retry behavior.
enum Attempt {
	Success(TransportResponse),
	Retryable { retry_after: Option<Duration>, error: Error },
	Terminal(Error),
}

fn classify(result: Result<TransportResponse, Error>) -> Attempt {
	match result {
		Ok(response) if (200..300).contains(&response.status_code) => Attempt::Success(response),
		Ok(response) if response.status_code == 429 || response.status_code >= 500 => {
			let retry_after = response.header("Retry-After").and_then(parse_retry_after);
			let error = Error::ProviderOperationFailed(ProviderOperationError {
				status_code: response.status_code,
				body: String::from_utf8(response.body.clone()).ok(),
				headers: response.headers.clone(),
			});

			Attempt::Retryable { retry_after, error }
		},
		Ok(response) => Attempt::Terminal(Error::ProviderOperationFailed(ProviderOperationError {
			status_code: response.status_code,
			body: String::from_utf8(response.body).ok(),
			headers: response.headers,
		})),
		Err(e @ Error::Transport(_)) => Attempt::Retryable { retry_after: None, error: e },
		Err(e @ Error::Transient(_)) => Attempt::Retryable { retry_after: None, error: e },
		Err(e) => Attempt::Terminal(e),
	}
}

fn parse_retry_after(raw: &str) -> Option<Duration> {
	if let Ok(secs) = raw.trim().parse::<i64>() {
		return Some(Duration::seconds(secs.max(0)));
	}

	time::OffsetDateTime::parse(raw.trim(), &time::format_description::well_known::Rfc2822)
		.ok()
		.map(|at| (at - OffsetDateTime::now_utc()).max(Duration::ZERO))
}

/// Signs, rate-limits, transports, and retries a [`ProviderOperationRequest`].
pub struct OperationRuntime<A, S> {
	adapter: A,
	sleeper: S,
	rate_limiter: Arc<dyn RateLimitPolicy>,
	signer: Arc<dyn Signer>,
}
impl<A, S> OperationRuntime<A, S>
where
	A: TransportAdapter,
	S: Sleeper,
{
	/// Builds a runtime from a transport adapter, sleeper, rate limiter, and signer.
	pub fn new(adapter: A, sleeper: S, rate_limiter: Arc<dyn RateLimitPolicy>, signer: Arc<dyn Signer>) -> Self {
		Self { adapter, sleeper, rate_limiter, signer }
	}

	/// Signs `request` against `credential` without transporting it, for callers that need a
	/// ready-to-send request without going through [`Self::execute_provider_operation`].
	pub fn sign(
		&self,
		request: &TransportRequest,
		credential: Option<&ActiveCredential>,
	) -> Result<SignedRequest, Error> {
		self.signer.sign(request, credential)
	}

	/// Executes `request` end-to-end, honoring `cancel` across retry sleeps.
	pub async fn execute_provider_operation(
		&self,
		mut request: ProviderOperationRequest,
		cancel: &crate::cancel::Cancellation,
	) -> Result<ProviderOperationOutcome, Error> {
		let bucket_key = request
			.bucket_key
			.clone()
			.unwrap_or_else(|| format!("{}:{}", request.provider_id, request.operation));
		let idempotency = derive_idempotency_key(&request);

		request.transport_request.idempotency = Some(idempotency.clone());
		if let Some(header) = request.transport_request.idempotency_header.clone() {
			request.transport_request.headers.insert(header, idempotency.clone());
		}

		let mut attempts = 0_u32;
		let mut retried = false;
		let mut auth_strategy = "none";
		let mut meta = HashMap::new();

		loop {
			attempts += 1;

			self.rate_limiter.before_call(&bucket_key).map_err(|_| {
				Error::RateLimited { retry_after_secs: None }
			})?;

			let signed = self.signer.sign(&request.transport_request, request.credential.as_ref())?;
			auth_strategy = signed.strategy;
			meta = signed.meta;
			request.transport_request = signed.request;

			let outcome = self.adapter.execute(&request.transport_request).await;

			self.rate_limiter.after_call(&bucket_key, outcome.as_ref().ok());

			match classify(outcome) {
				Attempt::Success(response) => {
					if auth_strategy == "aws_sigv4" {
						if let Some(skew) = crate::operation::aws_clock_skew_hint_seconds(&response) {
							meta.insert("clock_skew_hint_seconds".to_owned(), skew.to_string());
						}
					}

					return Ok(ProviderOperationOutcome {
						response,
						attempts,
						retried,
						idempotency,
						auth_strategy,
						meta,
					});
				},
				Attempt::Terminal(error) => return Err(error),
				Attempt::Retryable { retry_after, error } => {
					if attempts >= request.retry.max_attempts {
						return Err(error);
					}

					retried = true;

					let delay = retry_after.unwrap_or_else(|| backoff_delay(attempts));

					self.sleeper.sleep(delay, cancel).await;

					if cancel.is_cancelled() {
						return Err(error);
					}
				},
			}
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn canonical_url_sorts_query_keys() {
		let mut request =
			TransportRequest::new("GET", Url::parse("https://api.example.com/v1/reports").expect("Url fixture."));

		request.query.insert("b".into(), "2".into());
		request.query.insert("a".into(), "1".into());

		assert_eq!(request.canonical_url().query(), Some("a=1&b=2"));
	}

	#[test]
	fn parses_numeric_retry_after() {
		assert_eq!(parse_retry_after("3"), Some(Duration::seconds(3)));
	}
}
