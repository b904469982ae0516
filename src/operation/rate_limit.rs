// self
use crate::{_prelude::*, error::Error, operation::TransportResponse};

/// Before/after hooks bracketing a transport call, keyed by a caller-chosen bucket.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Called before the transport call. An error aborts the attempt entirely (no retries).
	fn before_call(&self, key: &str) -> Result<(), RateLimitExceeded>;

	/// Called after the transport call with the raw response, if one was received, so the
	/// policy can adapt to provider-reported limits (e.g. `X-RateLimit-Remaining`).
	fn after_call(&self, key: &str, response: Option<&TransportResponse>);
}

/// Raised by [`RateLimitPolicy::before_call`] when a bucket has no remaining budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Rate limit exceeded.")]
pub struct RateLimitExceeded;
impl From<RateLimitExceeded> for Error {
	fn from(_: RateLimitExceeded) -> Self {
		Self::RateLimited { retry_after_secs: None }
	}
}

/// A rate limiter that never throttles; the default for providers without known limits.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRateLimiter;
impl RateLimitPolicy for NoopRateLimiter {
	fn before_call(&self, _key: &str) -> Result<(), RateLimitExceeded> {
		Ok(())
	}

	fn after_call(&self, _key: &str, _response: Option<&TransportResponse>) {}
}

/// A simple fixed-window token-bucket limiter keyed by bucket string.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
	capacity: u32,
	window: Duration,
	buckets: Mutex<HashMap<String, (u32, OffsetDateTime)>>,
}
impl FixedWindowRateLimiter {
	/// Builds a limiter allowing `capacity` calls per `window`.
	pub fn new(capacity: u32, window: Duration) -> Self {
		Self { capacity, window, buckets: Mutex::new(HashMap::new()) }
	}
}
impl RateLimitPolicy for FixedWindowRateLimiter {
	fn before_call(&self, key: &str) -> Result<(), RateLimitExceeded> {
		let now = OffsetDateTime::now_utc();
		let mut buckets = self.buckets.lock();
		let entry = buckets.entry(key.to_owned()).or_insert((0, now + self.window));

		if now >= entry.1 {
			*entry = (0, now + self.window);
		}

		if entry.0 >= self.capacity {
			return Err(RateLimitExceeded);
		}

		entry.0 += 1;

		Ok(())
	}

	fn after_call(&self, _key: &str, _response: Option<&TransportResponse>) {}
}
