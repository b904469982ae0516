//! Ordered pre-commit (fail-fast) and post-commit (aggregate) lifecycle event hooks.

// self
use crate::{_prelude::*, error::Error, model::LifecycleEvent};

/// Boxed future returned by a [`LifecycleHook`].
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'a + Send>>;

/// A named, side-effecting reaction to a [`LifecycleEvent`].
pub trait LifecycleHook
where
	Self: Send + Sync,
{
	/// Stable hook name, used in error aggregation.
	fn name(&self) -> &str;

	/// Reacts to `event`, failing the commit (pre-commit) or recording an aggregate failure
	/// (post-commit).
	fn call<'a>(&'a self, event: &'a LifecycleEvent) -> HookFuture<'a>;
}

/// A single hook's failure, captured during [`HookCoordinator::execute_post_commit`]
/// aggregation.
#[derive(Debug, ThisError)]
#[error("Hook `{hook}` failed: {source}")]
pub struct HookFailure {
	/// Name of the hook that failed.
	pub hook: String,
	/// The underlying error.
	#[source]
	pub source: Error,
}

/// Aggregated post-commit failures. Never rolls back: every registered hook still runs.
#[derive(Debug, ThisError)]
#[error("{} post-commit hook(s) failed", failures.len())]
pub struct PostCommitFailures {
	/// One entry per hook that failed, in registration order.
	pub failures: Vec<HookFailure>,
}

/// Ordered, append-only registry of lifecycle hooks. Registration order is execution order.
#[derive(Default)]
pub struct HookCoordinator {
	pre_commit: Vec<Arc<dyn LifecycleHook>>,
	post_commit: Vec<Arc<dyn LifecycleHook>>,
}
impl HookCoordinator {
	/// Creates a coordinator with no hooks registered.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a pre-commit (fail-fast) hook.
	pub fn register_pre_commit(&mut self, hook: Arc<dyn LifecycleHook>) {
		self.pre_commit.push(hook);
	}

	/// Appends a post-commit (aggregate) hook.
	pub fn register_post_commit(&mut self, hook: Arc<dyn LifecycleHook>) {
		self.post_commit.push(hook);
	}

	/// Runs every pre-commit hook in registration order, returning the first error encountered.
	pub async fn execute_pre_commit(&self, event: &LifecycleEvent) -> Result<(), Error> {
		for hook in &self.pre_commit {
			hook.call(event).await?;
		}

		Ok(())
	}

	/// Runs pre-commit hooks then enqueues `event` via `enqueue`. Does not enqueue if any
	/// pre-commit hook fails.
	pub async fn execute_pre_commit_and_enqueue<F, Fut>(
		&self,
		event: LifecycleEvent,
		enqueue: F,
	) -> Result<(), Error>
	where
		F: FnOnce(LifecycleEvent) -> Fut,
		Fut: Future<Output = Result<(), Error>>,
	{
		self.execute_pre_commit(&event).await?;
		enqueue(event).await
	}

	/// Runs every post-commit hook in registration order, aggregating (never short-circuiting
	/// on) failures.
	pub async fn execute_post_commit(&self, event: &LifecycleEvent) -> Result<(), PostCommitFailures> {
		let mut failures = Vec::new();

		for hook in &self.post_commit {
			if let Err(source) = hook.call(event).await {
				failures.push(HookFailure { hook: hook.name().to_owned(), source });
			}
		}

		if failures.is_empty() { Ok(()) } else { Err(PostCommitFailures { failures }) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::{ProviderId, ScopeRef};

	struct RecordingHook {
		name: &'static str,
		fail: bool,
		calls: Arc<Mutex<Vec<&'static str>>>,
	}
	impl LifecycleHook for RecordingHook {
		fn name(&self) -> &str {
			self.name
		}

		fn call<'a>(&'a self, _event: &'a LifecycleEvent) -> HookFuture<'a> {
			self.calls.lock().push(self.name);

			let fail = self.fail;
			let name = self.name;

			Box::pin(async move {
				if fail {
					Err(Error::Validation(crate::error::ValidationError::MissingField { field: "x" }))
				} else {
					let _ = name;
					Ok(())
				}
			})
		}
	}

	fn event() -> LifecycleEvent {
		LifecycleEvent::new(
			"evt-1",
			"connection.connected",
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		)
	}

	#[tokio::test]
	async fn pre_commit_runs_in_registration_order_and_stops_on_failure() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let mut coordinator = HookCoordinator::new();

		coordinator.register_pre_commit(Arc::new(RecordingHook { name: "a", fail: false, calls: calls.clone() }));
		coordinator.register_pre_commit(Arc::new(RecordingHook { name: "b", fail: true, calls: calls.clone() }));
		coordinator.register_pre_commit(Arc::new(RecordingHook { name: "c", fail: false, calls: calls.clone() }));

		let result = coordinator.execute_pre_commit(&event()).await;

		assert!(result.is_err());
		assert_eq!(*calls.lock(), vec!["a", "b"]);
	}

	#[tokio::test]
	async fn pre_commit_failure_prevents_enqueue() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let mut coordinator = HookCoordinator::new();

		coordinator.register_pre_commit(Arc::new(RecordingHook { name: "a", fail: true, calls: calls.clone() }));

		let enqueued = Arc::new(Mutex::new(false));
		let enqueued_flag = enqueued.clone();
		let result = coordinator
			.execute_pre_commit_and_enqueue(event(), move |_event| {
				let enqueued_flag = enqueued_flag.clone();

				async move {
					*enqueued_flag.lock() = true;
					Ok(())
				}
			})
			.await;

		assert!(result.is_err());
		assert!(!*enqueued.lock());
	}

	#[tokio::test]
	async fn post_commit_runs_every_hook_and_aggregates_failures() {
		let calls = Arc::new(Mutex::new(Vec::new()));
		let mut coordinator = HookCoordinator::new();

		coordinator.register_post_commit(Arc::new(RecordingHook { name: "a", fail: true, calls: calls.clone() }));
		coordinator.register_post_commit(Arc::new(RecordingHook { name: "b", fail: true, calls: calls.clone() }));
		coordinator.register_post_commit(Arc::new(RecordingHook { name: "c", fail: false, calls: calls.clone() }));

		let result = coordinator.execute_post_commit(&event()).await;

		assert_eq!(*calls.lock(), vec!["a", "b", "c"]);

		let failures = result.expect_err("Post-commit should aggregate failures.");

		assert_eq!(failures.failures.len(), 2);
	}
}
