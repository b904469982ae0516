//! Notification projector: fans lifecycle events out to recipient-addressed notifications,
//! gated by a per-recipient idempotency ledger so outbox redeliveries never double-send.

// self
use crate::{
	_prelude::*,
	error::Error,
	model::LifecycleEvent,
	projector::{Projector, ProjectorFuture},
	store::{NotificationDeliveryStatus, NotificationDispatchLedger},
};
use sha2::{Digest, Sha256};

/// A single addressable notification target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
	/// Recipient kind (e.g. `email`, `webhook`, `slack_channel`).
	pub recipient_type: String,
	/// Recipient-kind-specific address.
	pub id: String,
}

/// Resolves a lifecycle event into a notification definition and its recipients.
pub trait NotificationResolver
where
	Self: Send + Sync,
{
	/// Boxed future returned by [`NotificationResolver::resolve`].
	fn resolve<'a>(
		&'a self,
		event: &'a LifecycleEvent,
	) -> Pin<Box<dyn Future<Output = Option<(String, Vec<Recipient>)>> + 'a + Send>>;
}

/// Boxed future returned by [`NotificationSender::send`].
pub type NotificationSenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'a + Send>>;

/// Delivers a single notification to a single recipient.
pub trait NotificationSender
where
	Self: Send + Sync,
{
	/// Sends the notification identified by `definition_code` to `recipient`.
	fn send<'a>(
		&'a self,
		definition_code: &'a str,
		recipient: &'a Recipient,
		event: &'a LifecycleEvent,
	) -> NotificationSenderFuture<'a>;
}

fn idempotency_key(definition_code: &str, event: &LifecycleEvent, recipient: &Recipient) -> String {
	let mut hasher = Sha256::new();

	hasher.update(b"notification\0");
	hasher.update(definition_code.as_bytes());
	hasher.update(b"\0");
	hasher.update(event.id.as_bytes());
	hasher.update(b"\0");
	hasher.update(recipient.recipient_type.to_lowercase().as_bytes());
	hasher.update(b":");
	hasher.update(recipient.id.as_bytes());

	hex::encode(hasher.finalize())
}

mod hex {
	pub fn encode(bytes: impl AsRef<[u8]>) -> String {
		bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
	}
}

/// Projects lifecycle events onto recipient notifications, deduplicating via a dispatch ledger.
pub struct NotificationProjector<R, S, L> {
	resolver: R,
	sender: S,
	ledger: Arc<L>,
}
impl<R, S, L> NotificationProjector<R, S, L>
where
	R: NotificationResolver,
	S: NotificationSender,
	L: NotificationDispatchLedger,
{
	/// Builds a projector resolving recipients via `resolver`, delivering via `sender`, and
	/// deduplicating via `ledger`.
	pub fn new(resolver: R, sender: S, ledger: Arc<L>) -> Self {
		Self { resolver, sender, ledger }
	}

	async fn deliver_to(&self, definition_code: &str, recipient: &Recipient, event: &LifecycleEvent) -> Result<(), Error> {
		let key = idempotency_key(definition_code, event, recipient);

		if self.ledger.has_seen(&key).await? {
			return Ok(());
		}

		match self.sender.send(definition_code, recipient, event).await {
			Ok(()) => {
				self.ledger.record(&key, NotificationDeliveryStatus::Sent, None).await?;
				Ok(())
			},
			Err(error) => {
				self.ledger.record(&key, NotificationDeliveryStatus::Failed, Some(error.to_string())).await?;
				Err(error)
			},
		}
	}
}
impl<R, S, L> Projector for NotificationProjector<R, S, L>
where
	R: NotificationResolver,
	S: NotificationSender,
	L: NotificationDispatchLedger,
{
	fn name(&self) -> &str {
		"notification"
	}

	fn project<'a>(&'a self, event: &'a LifecycleEvent) -> ProjectorFuture<'a> {
		Box::pin(async move {
			let Some((definition_code, recipients)) = self.resolver.resolve(event).await else {
				return Ok(());
			};

			if recipients.is_empty() {
				return Ok(());
			}

			let mut last_error = None;

			for recipient in &recipients {
				if let Err(error) = self.deliver_to(&definition_code, recipient, event).await {
					last_error = Some(error);
				}
			}

			match last_error {
				Some(error) => Err(error),
				None => Ok(()),
			}
		})
	}
}
