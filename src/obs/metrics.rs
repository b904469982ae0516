// self
use crate::obs::OperationOutcome;
use crate::_prelude::*;

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(operation: &str, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"connect_core_operation_total",
			"operation" => operation.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Records an operation's wall-clock duration via the global metrics recorder (when enabled).
pub fn record_operation_duration(operation: &str, elapsed: Duration) {
	#[cfg(feature = "metrics")]
	{
		let seconds = elapsed.as_seconds_f64().max(0.0);

		metrics::histogram!(
			"connect_core_operation_duration_seconds",
			"operation" => operation.to_owned()
		)
		.record(seconds);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, elapsed);
	}
}
