//! S6: a lifecycle event runs through hooks, then the outbox dispatches it to every projector
//! in alphabetic order, with the notification projector deduplicating via its ledger.

// self
use connect_core::{
	error::Error,
	hooks::{HookCoordinator, HookFuture, LifecycleHook},
	model::{LifecycleEvent, OutboxEntry, ProviderId, ScopeRef},
	outbox::{OutboxConfig, OutboxDispatcher},
	projector::{
		activity::{ActivityProjector, ActivitySink, ActivitySinkFuture, OperationalActivitySink, ServiceActivityEntry},
		notification::{NotificationProjector, NotificationResolver, NotificationSender, NotificationSenderFuture, Recipient},
		Projector,
	},
	store::{memory::MemoryStore, OutboxStore},
};
use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex},
};
use time::OffsetDateTime;

fn failed_event() -> LifecycleEvent {
	let mut metadata = HashMap::new();

	metadata.insert("status".to_owned(), serde_json::Value::String("warn".to_owned()));

	LifecycleEvent::new(
		"evt-s6",
		"connection.failed",
		ProviderId::new("demo").expect("Provider id fixture."),
		ScopeRef::new("org", "org-1").expect("Scope fixture."),
		"service",
		OffsetDateTime::UNIX_EPOCH,
	)
	.with_metadata(metadata)
}

struct OkHook {
	calls: Arc<Mutex<Vec<&'static str>>>,
}
impl LifecycleHook for OkHook {
	fn name(&self) -> &str {
		"audit"
	}

	fn call<'a>(&'a self, _event: &'a LifecycleEvent) -> HookFuture<'a> {
		self.calls.lock().expect("Lock should not be poisoned.").push("audit");

		Box::pin(async { Ok(()) })
	}
}

struct FailingPrimarySink;
impl ActivitySink for FailingPrimarySink {
	fn record<'a>(&'a self, _entry: ServiceActivityEntry) -> ActivitySinkFuture<'a> {
		Box::pin(async { Err(Error::Validation(connect_core::error::ValidationError::MissingField { field: "x" })) })
	}
}

struct RecordingFallbackSink {
	recorded: Arc<Mutex<Vec<String>>>,
}
impl ActivitySink for RecordingFallbackSink {
	fn record<'a>(&'a self, entry: ServiceActivityEntry) -> ActivitySinkFuture<'a> {
		assert_eq!(entry.channel, connect_core::projector::activity::ACTIVITY_CHANNEL);

		self.recorded.lock().expect("Lock should not be poisoned.").push(entry.event_name);

		Box::pin(async { Ok(()) })
	}
}

struct OneRecipientResolver;
impl NotificationResolver for OneRecipientResolver {
	fn resolve<'a>(&'a self, _event: &'a LifecycleEvent) -> Pin<Box<dyn Future<Output = Option<(String, Vec<Recipient>)>> + 'a + Send>> {
		Box::pin(async { Some(("connection_failed".to_owned(), vec![Recipient { recipient_type: "email".into(), id: "owner@example.com".into() }])) })
	}
}

struct RecordingSender {
	sent: Arc<Mutex<Vec<String>>>,
}
impl NotificationSender for RecordingSender {
	fn send<'a>(&'a self, _definition_code: &'a str, recipient: &'a Recipient, _event: &'a LifecycleEvent) -> NotificationSenderFuture<'a> {
		self.sent.lock().expect("Lock should not be poisoned.").push(recipient.id.clone());

		Box::pin(async { Ok(()) })
	}
}

#[tokio::test]
async fn s6_lifecycle_event_runs_through_hooks_and_dispatches_in_alphabetic_projector_order() {
	let store = Arc::new(MemoryStore::default());
	let pre_commit_calls = Arc::new(Mutex::new(Vec::new()));
	let post_commit_calls = Arc::new(Mutex::new(Vec::new()));
	let mut hooks = HookCoordinator::new();

	hooks.register_pre_commit(Arc::new(OkHook { calls: pre_commit_calls.clone() }));
	hooks.register_post_commit(Arc::new(OkHook { calls: post_commit_calls.clone() }));

	let event = failed_event();
	let store_for_enqueue = store.clone();

	hooks
		.execute_pre_commit_and_enqueue(event.clone(), move |event| {
			let store = store_for_enqueue.clone();

			async move { store.enqueue(OutboxEntry::new(event, OffsetDateTime::UNIX_EPOCH)).await.map_err(Error::Storage) }
		})
		.await
		.expect("Pre-commit and enqueue should succeed.");

	hooks.execute_post_commit(&event).await.expect("Post-commit hooks should all succeed.");

	assert_eq!(*pre_commit_calls.lock().expect("Lock should not be poisoned."), vec!["audit"]);
	assert_eq!(*post_commit_calls.lock().expect("Lock should not be poisoned."), vec!["audit"]);

	let fallback_recorded = Arc::new(Mutex::new(Vec::new()));
	let activity_sink = OperationalActivitySink::new(FailingPrimarySink, RecordingFallbackSink { recorded: fallback_recorded.clone() });
	let activity_projector: Arc<dyn Projector> = Arc::new(ActivityProjector::new(activity_sink));

	let sent = Arc::new(Mutex::new(Vec::new()));
	let notification_projector: Arc<dyn Projector> =
		Arc::new(NotificationProjector::new(OneRecipientResolver, RecordingSender { sent: sent.clone() }, store.clone()));

	let dispatcher = OutboxDispatcher::new(
		store.clone(),
		vec![notification_projector, activity_projector],
		OutboxConfig::default(),
	);

	let stats = dispatcher.dispatch_pending(10).await.expect("Dispatch should succeed.");

	assert_eq!(stats.claimed, 1);
	assert_eq!(stats.delivered, 1);
	assert_eq!(stats.retried, 0);
	assert_eq!(stats.failed, 0);

	assert_eq!(*fallback_recorded.lock().expect("Lock should not be poisoned."), vec!["connection.failed".to_owned()]);
	assert_eq!(*sent.lock().expect("Lock should not be poisoned."), vec!["owner@example.com".to_owned()]);

	let pending = store.claim_batch(10).await.expect("Claim should succeed.");

	assert!(pending.is_empty(), "The acknowledged entry must not remain claimable.");
}
