//! Activity feed projector: maps lifecycle events onto a service-facing activity log.

// self
use crate::{
	_prelude::*,
	error::Error,
	model::LifecycleEvent,
	projector::{Projector, ProjectorFuture},
};

/// Derived severity of an activity entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityStatus {
	/// Routine, successful activity.
	Ok,
	/// Degraded but non-fatal activity (e.g. a retry).
	Warn,
	/// Failed activity.
	Error,
}
impl Display for ActivityStatus {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(match self {
			Self::Ok => "ok",
			Self::Warn => "warn",
			Self::Error => "error",
		})
	}
}

/// A single row in the service activity feed.
#[derive(Clone, Debug)]
pub struct ServiceActivityEntry {
	/// Who or what caused the event (`LifecycleEvent::source`, or `"system"` when absent).
	pub actor: String,
	/// What the event happened to: `"connection:"+id` when the event names a connection,
	/// else `"provider:"+id`.
	pub object: String,
	/// Fixed feed channel every activity entry is filed under.
	pub channel: String,
	/// Derived severity.
	pub status: ActivityStatus,
	/// When the underlying event occurred.
	pub occurred_at: OffsetDateTime,
	/// The original event name, preserved verbatim.
	pub event_name: String,
}

/// Derives an [`ActivityStatus`] from `event`, preferring an explicit `metadata_status` and
/// falling back to a substring match on the event name.
pub fn derive_status(event: &LifecycleEvent) -> ActivityStatus {
	if let Some(status) = event.metadata_status() {
		return match status.as_str() {
			"error" | "failed" | "fail" => ActivityStatus::Error,
			"warn" | "retry" | "degraded" => ActivityStatus::Warn,
			_ => ActivityStatus::Ok,
		};
	}

	let name = event.name.to_lowercase();

	if name.contains("fail") || name.contains("error") {
		ActivityStatus::Error
	} else if name.contains("retry") || name.contains("degrad") {
		ActivityStatus::Warn
	} else {
		ActivityStatus::Ok
	}
}

/// Fixed feed channel every [`ServiceActivityEntry`] is filed under.
pub const ACTIVITY_CHANNEL: &str = "services.lifecycle";

/// Maps a [`LifecycleEvent`] onto a [`ServiceActivityEntry`].
pub fn map_activity_entry(event: &LifecycleEvent) -> ServiceActivityEntry {
	let actor = if event.source.is_empty() { "system".to_owned() } else { event.source.clone() };
	let object = match &event.connection_id {
		Some(connection_id) => format!("connection:{connection_id}"),
		None => format!("provider:{}", event.provider_id),
	};

	ServiceActivityEntry {
		actor,
		object,
		channel: ACTIVITY_CHANNEL.to_owned(),
		status: derive_status(event),
		occurred_at: event.occurred_at,
		event_name: event.name.clone(),
	}
}

/// Boxed future returned by [`ActivitySink::record`].
pub type ActivitySinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'a + Send>>;

/// A destination for [`ServiceActivityEntry`] rows.
pub trait ActivitySink
where
	Self: Send + Sync,
{
	/// Records `entry`.
	fn record<'a>(&'a self, entry: ServiceActivityEntry) -> ActivitySinkFuture<'a>;
}

/// An [`ActivitySink`] that falls back to a secondary sink if the primary fails.
pub struct OperationalActivitySink<P, F> {
	primary: P,
	fallback: F,
}
impl<P, F> OperationalActivitySink<P, F>
where
	P: ActivitySink,
	F: ActivitySink,
{
	/// Builds a sink that records to `primary`, falling back to `fallback` on error.
	pub fn new(primary: P, fallback: F) -> Self {
		Self { primary, fallback }
	}
}
impl<P, F> ActivitySink for OperationalActivitySink<P, F>
where
	P: ActivitySink,
	F: ActivitySink,
{
	fn record<'a>(&'a self, entry: ServiceActivityEntry) -> ActivitySinkFuture<'a> {
		Box::pin(async move {
			match self.primary.record(entry.clone()).await {
				Ok(()) => Ok(()),
				Err(_) => self.fallback.record(entry).await,
			}
		})
	}
}

/// Projects lifecycle events onto a service activity feed via an [`ActivitySink`].
pub struct ActivityProjector<S> {
	sink: S,
}
impl<S> ActivityProjector<S>
where
	S: ActivitySink,
{
	/// Builds a projector delivering to `sink`.
	pub fn new(sink: S) -> Self {
		Self { sink }
	}
}
impl<S> Projector for ActivityProjector<S>
where
	S: ActivitySink,
{
	fn name(&self) -> &str {
		"activity"
	}

	fn project<'a>(&'a self, event: &'a LifecycleEvent) -> ProjectorFuture<'a> {
		Box::pin(async move { self.sink.record(map_activity_entry(event)).await })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::{ConnectionId, ProviderId, ScopeRef};

	fn event(name: &str) -> LifecycleEvent {
		LifecycleEvent::new(
			"evt-1",
			name,
			ProviderId::new("github").expect("Provider id fixture."),
			ScopeRef::new("org", "org-1").expect("Scope fixture."),
			"service",
			OffsetDateTime::UNIX_EPOCH,
		)
	}

	#[test]
	fn status_derives_from_name_when_metadata_absent() {
		assert_eq!(derive_status(&event("refresh.failed")), ActivityStatus::Error);
		assert_eq!(derive_status(&event("refresh.retrying")), ActivityStatus::Warn);
		assert_eq!(derive_status(&event("connection.connected")), ActivityStatus::Ok);
	}

	struct FailingSink;
	impl ActivitySink for FailingSink {
		fn record<'a>(&'a self, _entry: ServiceActivityEntry) -> ActivitySinkFuture<'a> {
			Box::pin(async move {
				Err(Error::Validation(crate::error::ValidationError::MissingField { field: "x" }))
			})
		}
	}

	struct RecordingSink {
		recorded: Arc<Mutex<Vec<String>>>,
	}
	impl ActivitySink for RecordingSink {
		fn record<'a>(&'a self, entry: ServiceActivityEntry) -> ActivitySinkFuture<'a> {
			self.recorded.lock().push(entry.event_name);

			Box::pin(async move { Ok(()) })
		}
	}

	#[tokio::test]
	async fn operational_sink_falls_back_on_primary_failure() {
		let recorded = Arc::new(Mutex::new(Vec::new()));
		let sink = OperationalActivitySink::new(FailingSink, RecordingSink { recorded: recorded.clone() });
		let projector = ActivityProjector::new(sink);

		projector.project(&event("connection.connected")).await.expect("Fallback should succeed.");

		assert_eq!(*recorded.lock(), vec!["connection.connected".to_owned()]);
	}

	#[test]
	fn map_activity_entry_follows_the_fixed_channel_and_object_mapping() {
		let mut provider_scoped = event("provider.registered");

		provider_scoped.source = String::new();

		let entry = map_activity_entry(&provider_scoped);

		assert_eq!(entry.channel, ACTIVITY_CHANNEL);
		assert_eq!(entry.actor, "system");
		assert_eq!(entry.object, "provider:github");

		let connection_scoped = event("connection.connected").with_connection_id(ConnectionId::new("conn-1").expect("Connection id fixture."));
		let entry = map_activity_entry(&connection_scoped);

		assert_eq!(entry.actor, "service");
		assert_eq!(entry.object, "connection:conn-1");
	}
}
