//! Lightweight cooperative cancellation handle threaded through every suspension point.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::_prelude::*;

/// Cloneable cancellation signal. Cloning shares the same underlying flag.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);
impl Cancellation {
	/// Creates a fresh, non-cancelled handle.
	pub fn new() -> Self {
		Self::default()
	}

	/// Signals cancellation to every clone of this handle.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	/// Returns true once [`Self::cancel`] has been called on any clone.
	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}
