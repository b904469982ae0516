//! Named mutual-exclusion leases with TTL, guaranteeing at most one live holder per key.

// self
use crate::{_prelude::*, model::ConnectionId};

/// Error returned when a lease is already held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Lock already held.")]
pub struct LockAlreadyHeld;

/// In-memory TTL lease registry, one lease per [`ConnectionId`].
///
/// Callers MUST release on every exit path; [`LockHandle`] does this automatically on drop
/// as a backstop, but [`LockHandle::release`] should still be called explicitly so release
/// timing doesn't depend on when the guard happens to drop.
#[derive(Default)]
pub struct ConnectionLocker {
	leases: Mutex<HashMap<ConnectionId, OffsetDateTime>>,
}
impl ConnectionLocker {
	/// Creates an empty locker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Acquires a lease on `connection_id` valid until `now + ttl`, failing if a live lease
	/// is already held.
	pub fn acquire(
		self: &Arc<Self>,
		connection_id: ConnectionId,
		ttl: Duration,
		now: OffsetDateTime,
	) -> Result<LockHandle, LockAlreadyHeld> {
		let mut leases = self.leases.lock();

		if let Some(until) = leases.get(&connection_id) {
			if now < *until {
				return Err(LockAlreadyHeld);
			}
		}

		leases.insert(connection_id.clone(), now + ttl);

		Ok(LockHandle { locker: self.clone(), connection_id, released: false })
	}
}

/// RAII handle for a lease acquired via [`ConnectionLocker::acquire`].
pub struct LockHandle {
	locker: Arc<ConnectionLocker>,
	connection_id: ConnectionId,
	released: bool,
}
impl LockHandle {
	/// Releases the lease. Idempotent: calling this more than once is a no-op.
	pub fn release(&mut self) {
		if self.released {
			return;
		}

		self.locker.leases.lock().remove(&self.connection_id);
		self.released = true;
	}
}
impl Drop for LockHandle {
	fn drop(&mut self) {
		self.release();
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn acquire_fails_while_lease_is_live() {
		let locker = Arc::new(ConnectionLocker::new());
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let now = OffsetDateTime::UNIX_EPOCH;
		let _handle = locker.acquire(connection_id.clone(), Duration::seconds(30), now).expect("First acquire should succeed.");

		assert!(locker.acquire(connection_id, Duration::seconds(30), now).is_err());
	}

	#[test]
	fn release_allows_reacquisition() {
		let locker = Arc::new(ConnectionLocker::new());
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let now = OffsetDateTime::UNIX_EPOCH;
		let mut handle =
			locker.acquire(connection_id.clone(), Duration::seconds(30), now).expect("First acquire should succeed.");

		handle.release();

		assert!(locker.acquire(connection_id, Duration::seconds(30), now).is_ok());
	}

	#[test]
	fn lease_expires_after_ttl() {
		let locker = Arc::new(ConnectionLocker::new());
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let now = OffsetDateTime::UNIX_EPOCH;
		let _handle =
			locker.acquire(connection_id.clone(), Duration::seconds(30), now).expect("First acquire should succeed.");

		assert!(locker.acquire(connection_id, Duration::seconds(30), now + Duration::seconds(31)).is_ok());
	}

	#[test]
	fn drop_releases_the_lease() {
		let locker = Arc::new(ConnectionLocker::new());
		let connection_id = ConnectionId::new("conn-1").expect("Connection id fixture.");
		let now = OffsetDateTime::UNIX_EPOCH;

		{
			let _handle =
				locker.acquire(connection_id.clone(), Duration::seconds(30), now).expect("First acquire should succeed.");
		}

		assert!(locker.acquire(connection_id, Duration::seconds(30), now).is_ok());
	}
}
