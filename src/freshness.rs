//! Pure credential freshness evaluation: given a credential and clock, decide whether a
//! refresh is needed.

// self
use crate::{_prelude::*, model::ActiveCredential};

/// Default window before expiry at which a credential is considered "expiring soon".
pub const DEFAULT_EXPIRING_SOON_WINDOW: Duration = Duration::minutes(5);
/// Default lead time before expiry at which [`should_refresh`] recommends refreshing.
pub const DEFAULT_REFRESH_LEAD_WINDOW: Duration = Duration::minutes(5);

/// Snapshot of a credential's freshness at a point in time. Pure: same inputs, same output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreshnessState {
	/// Whether the credential carries a (non-blank) access token.
	pub has_access_token: bool,
	/// Whether the credential carries a (non-blank) refresh token.
	pub has_refresh_token: bool,
	/// `refreshable && has_refresh_token`.
	pub can_auto_refresh: bool,
	/// `expires_at <= now`, or `false` if there is no `expires_at`.
	pub is_expired: bool,
	/// `!is_expired && expires_at <= now + window`, or `false` if there is no `expires_at`.
	pub is_expiring_soon: bool,
}

/// Evaluates `credential`'s freshness as of `now`, considering a credential "expiring soon"
/// once within `expiring_soon_window` of its `expires_at`.
pub fn resolve_credential_token_state(
	credential: &ActiveCredential,
	now: OffsetDateTime,
	expiring_soon_window: Duration,
) -> FreshnessState {
	let has_access_token = credential.has_access_token();
	let has_refresh_token = credential.has_refresh_token();
	let can_auto_refresh = credential.refreshable && has_refresh_token;

	let (is_expired, is_expiring_soon) = match credential.expires_at {
		Some(expires_at) => {
			let expired = expires_at <= now;
			let soon = !expired && expires_at <= now + expiring_soon_window;

			(expired, soon)
		},
		None => (false, false),
	};

	FreshnessState { has_access_token, has_refresh_token, can_auto_refresh, is_expired, is_expiring_soon }
}

/// Decides whether a credential should be refreshed given its freshness state, the
/// credential's `expires_at`, and a `lead_window` before expiry.
///
/// `can_auto_refresh && (!has_access_token || expires_at <= now + lead_window)`. A credential
/// with no `expires_at` but a present access token is never recommended for refresh.
pub fn should_refresh(
	state: FreshnessState,
	expires_at: Option<OffsetDateTime>,
	now: OffsetDateTime,
	lead_window: Duration,
) -> bool {
	if !state.can_auto_refresh {
		return false;
	}
	if !state.has_access_token {
		return true;
	}

	expires_at.is_some_and(|at| at <= now + lead_window)
}
