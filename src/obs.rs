//! Optional observability helpers wrapping every public facade operation.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit a structured `connect_core.op` span per facade call, carrying
//!   `operation`, `provider_id`, `decision`, and `outcome` fields.
//! - Enable `metrics` to increment the `connect_core_operation_total` counter and record the
//!   `connect_core_operation_duration_seconds` histogram, both labeled by `operation` (and
//!   `outcome` for the counter).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for a completed facade operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry into the operation, before a decision is known.
	Attempt,
	/// The operation completed successfully.
	Success,
	/// The operation failed and propagated an error to the caller.
	Failure,
	/// The operation completed but a capability/scope decision denied it.
	Denied,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Denied => "denied",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
