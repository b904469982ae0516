//! Lifecycle event projectors: fan-out targets invoked by the [`crate::outbox`] dispatcher.

pub mod activity;
pub mod notification;

pub use activity::ActivityProjector;
pub use notification::NotificationProjector;

// self
use crate::{_prelude::*, error::Error, model::LifecycleEvent};

/// Boxed future returned by [`Projector::project`].
pub type ProjectorFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'a + Send>>;

/// A named sink that reacts to delivered [`LifecycleEvent`]s.
///
/// The outbox dispatcher invokes every registered projector in alphabetic order by
/// [`Projector::name`], and only acknowledges delivery once all of them succeed.
pub trait Projector
where
	Self: Send + Sync,
{
	/// Stable name used for deterministic dispatch ordering.
	fn name(&self) -> &str;

	/// Projects `event`, returning an error if delivery to this sink failed.
	fn project<'a>(&'a self, event: &'a LifecycleEvent) -> ProjectorFuture<'a>;
}
