// self
use crate::_prelude::*;

const INITIAL_BACKOFF: Duration = Duration::milliseconds(500);
const MAX_BACKOFF: Duration = Duration::seconds(10);

/// Computes the exponential backoff delay for a given 1-indexed attempt number.
///
/// `delay(attempt) = min(initial * 2^(attempt-1), max)`, with `initial = 500ms`, `max = 10s`.
pub fn backoff_delay(attempt: u32) -> Duration {
	let exponent = attempt.saturating_sub(1).min(16);
	let scaled = INITIAL_BACKOFF * 2_i32.pow(exponent);

	scaled.min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn backoff_grows_exponentially_then_caps() {
		assert_eq!(backoff_delay(1), Duration::milliseconds(500));
		assert_eq!(backoff_delay(2), Duration::milliseconds(1000));
		assert_eq!(backoff_delay(3), Duration::milliseconds(2000));
		assert_eq!(backoff_delay(10), Duration::seconds(10));
	}
}
