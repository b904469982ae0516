//! Claims and redelivers queued lifecycle events to every registered [`Projector`].

// self
use crate::{_prelude::*, error::Error, operation::backoff_delay, projector::Projector, store::OutboxStore};

/// Tunable limits for a [`OutboxDispatcher`].
#[derive(Clone, Copy, Debug)]
pub struct OutboxConfig {
	/// Maximum entries claimed per [`OutboxDispatcher::dispatch_pending`] call.
	pub batch_size: usize,
	/// Maximum delivery attempts before an entry is considered permanently failed.
	pub max_attempts: u32,
}
impl Default for OutboxConfig {
	fn default() -> Self {
		Self { batch_size: 10, max_attempts: 3 }
	}
}

/// Summary of a single [`OutboxDispatcher::dispatch_pending`] invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
	/// Number of entries claimed from the store.
	pub claimed: usize,
	/// Number of entries every projector accepted.
	pub delivered: usize,
	/// Number of entries that failed but are still under the attempt ceiling.
	pub retried: usize,
	/// Number of entries that exhausted their attempt ceiling.
	pub failed: usize,
}

/// Dispatches claimed outbox entries to every registered projector, in registration order.
pub struct OutboxDispatcher<S> {
	store: Arc<S>,
	projectors: Vec<Arc<dyn Projector>>,
	config: OutboxConfig,
}
impl<S> OutboxDispatcher<S>
where
	S: OutboxStore,
{
	/// Builds a dispatcher over `store`, delivering to `projectors` sorted alphabetically by
	/// name for deterministic ordering.
	pub fn new(store: Arc<S>, mut projectors: Vec<Arc<dyn Projector>>, config: OutboxConfig) -> Self {
		projectors.sort_by(|a, b| a.name().cmp(b.name()));

		Self { store, projectors, config }
	}

	/// Claims up to `limit` due entries and attempts delivery to every projector.
	///
	/// An entry is acknowledged only if every projector succeeds. Otherwise it is rescheduled
	/// with exponential backoff, or marked failed once `max_attempts` is reached; in both cases
	/// the store still records the failure cause. Delivery to all projectors is always attempted
	/// even once one has failed, so independent sinks never block each other.
	pub async fn dispatch_pending(&self, limit: usize) -> Result<DispatchStats, Error> {
		let limit = limit.min(self.config.batch_size);
		let entries = self.store.claim_batch(limit).await?;
		let mut stats = DispatchStats { claimed: entries.len(), ..Default::default() };

		for entry in entries {
			let mut failure = None;

			for projector in &self.projectors {
				if let Err(error) = projector.project(&entry.event).await {
					failure = Some(error);
				}
			}

			match failure {
				None => {
					self.store.ack(&entry.event.id).await?;
					stats.delivered += 1;
				},
				Some(error) => {
					let next_attempt = entry.attempt + 1;

					if next_attempt >= self.config.max_attempts {
						stats.failed += 1;
					} else {
						stats.retried += 1;
					}

					let next_attempt_at = OffsetDateTime::now_utc() + backoff_delay(next_attempt);

					self.store.retry(&entry.event.id, error.to_string(), next_attempt_at).await?;
				},
			}
		}

		Ok(stats)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		model::{LifecycleEvent, OutboxEntry, ProviderId, ScopeRef},
		projector::ProjectorFuture,
		store::memory::MemoryStore,
	};

	fn event(id: &str) -> LifecycleEvent {
		LifecycleEvent::new(
			id,
			"connection.connected",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		)
	}

	struct AlwaysOk;
	impl Projector for AlwaysOk {
		fn name(&self) -> &str {
			"activity"
		}

		fn project<'a>(&'a self, _event: &'a LifecycleEvent) -> ProjectorFuture<'a> {
			Box::pin(async move { Ok(()) })
		}
	}

	struct AlwaysFail;
	impl Projector for AlwaysFail {
		fn name(&self) -> &str {
			"notification"
		}

		fn project<'a>(&'a self, _event: &'a LifecycleEvent) -> ProjectorFuture<'a> {
			Box::pin(async move {
				Err(Error::Validation(crate::error::ValidationError::MissingField { field: "x" }))
			})
		}
	}

	#[tokio::test]
	async fn delivers_and_acks_when_every_projector_succeeds() {
		let store = Arc::new(MemoryStore::default());
		store.enqueue(OutboxEntry::new(event("evt-1"), OffsetDateTime::UNIX_EPOCH)).await.expect("Enqueue.");

		let dispatcher =
			OutboxDispatcher::new(store.clone(), vec![Arc::new(AlwaysOk)], OutboxConfig::default());
		let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");

		assert_eq!(stats, DispatchStats { claimed: 1, delivered: 1, retried: 0, failed: 0 });
	}

	#[tokio::test]
	async fn retries_below_attempt_ceiling_and_fails_at_ceiling() {
		let store = Arc::new(MemoryStore::default());
		store.enqueue(OutboxEntry::new(event("evt-1"), OffsetDateTime::UNIX_EPOCH)).await.expect("Enqueue.");

		let dispatcher = OutboxDispatcher::new(
			store.clone(),
			vec![Arc::new(AlwaysFail)],
			OutboxConfig { batch_size: 50, max_attempts: 2 },
		);

		let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");
		assert_eq!(stats, DispatchStats { claimed: 1, delivered: 0, retried: 1, failed: 0 });

		// The failed attempt rescheduled the entry with exponential backoff; it isn't due yet.
		let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");
		assert_eq!(stats, DispatchStats::default());

		tokio::time::sleep(std::time::Duration::from_millis(600)).await;

		let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");
		assert_eq!(stats, DispatchStats { claimed: 1, delivered: 0, retried: 0, failed: 1 });
	}

	#[tokio::test]
	async fn one_projector_failing_does_not_prevent_the_other_from_running() {
		let store = Arc::new(MemoryStore::default());
		store.enqueue(OutboxEntry::new(event("evt-1"), OffsetDateTime::UNIX_EPOCH)).await.expect("Enqueue.");

		let dispatcher = OutboxDispatcher::new(
			store.clone(),
			vec![Arc::new(AlwaysFail), Arc::new(AlwaysOk)],
			OutboxConfig::default(),
		);

		let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");

		assert_eq!(stats.delivered, 0);
		assert_eq!(stats.retried, 1);
	}
}
