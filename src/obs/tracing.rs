// self
use crate::_prelude::*;

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used to wrap every public [`crate::service::Service`] call.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the operation name and provider id; `decision` and
	/// `outcome` start empty and are filled in via [`Self::record_decision`] /
	/// [`Self::record_outcome`] once known.
	pub fn new(operation: &str, provider_id: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"connect_core.op",
				operation,
				provider_id,
				decision = tracing::field::Empty,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, provider_id);

			Self {}
		}
	}

	/// Records the capability/scope decision reached for this operation.
	pub fn record_decision(&self, decision: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("decision", decision);
		#[cfg(not(feature = "tracing"))]
		let _ = decision;
	}

	/// Records the final outcome for this operation.
	pub fn record_outcome(&self, outcome: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome);
		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}
