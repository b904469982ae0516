//! Validated service configuration, built through [`ServiceConfigBuilder`].

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	freshness::{DEFAULT_EXPIRING_SOON_WINDOW, DEFAULT_REFRESH_LEAD_WINDOW},
	lifecycle::RefreshDefaults,
	model::ProviderId,
	outbox::OutboxConfig,
};

/// Scope-inheritance configuration.
#[derive(Clone, Debug, Default)]
pub struct InheritanceConfig {
	/// Providers for which inheritance through a parent scope is enabled.
	pub enabled_providers: Vec<ProviderId>,
}

/// OAuth-flow-specific configuration.
#[derive(Clone, Copy, Debug)]
pub struct OAuthConfig {
	/// Whether `complete_auth` requires the callback's redirect URI to match the one used to
	/// begin the flow.
	pub require_callback_redirect: bool,
	/// Time-to-live for a pending OAuth state token.
	pub state_ttl: Duration,
}
impl Default for OAuthConfig {
	fn default() -> Self {
		Self { require_callback_redirect: true, state_ttl: Duration::minutes(10) }
	}
}

/// Credential freshness evaluation windows.
#[derive(Clone, Copy, Debug)]
pub struct FreshnessDefaults {
	/// Window before expiry at which a credential is considered "expiring soon".
	pub expiring_soon_window: Duration,
	/// Lead time before expiry at which a refresh is recommended.
	pub refresh_lead_window: Duration,
}
impl Default for FreshnessDefaults {
	fn default() -> Self {
		Self { expiring_soon_window: DEFAULT_EXPIRING_SOON_WINDOW, refresh_lead_window: DEFAULT_REFRESH_LEAD_WINDOW }
	}
}

/// Top-level, validated service configuration.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
	/// Name of the running service, used in observability attribution.
	pub service_name: String,
	/// Scope-inheritance policy.
	pub inheritance: InheritanceConfig,
	/// OAuth-flow configuration.
	pub oauth: OAuthConfig,
	/// Credential refresh defaults.
	pub refresh: RefreshDefaults,
	/// Credential freshness evaluation windows.
	pub freshness: FreshnessDefaults,
	/// Outbox dispatch defaults.
	pub outbox: OutboxConfig,
}
impl ServiceConfig {
	/// Starts a builder with no service name set.
	pub fn builder() -> ServiceConfigBuilder {
		ServiceConfigBuilder::default()
	}
}

/// Validating builder for [`ServiceConfig`].
#[derive(Default)]
pub struct ServiceConfigBuilder {
	service_name: Option<String>,
	raw_inheritance_providers: Vec<String>,
	oauth: OAuthConfig,
	refresh: RefreshDefaults,
	freshness: FreshnessDefaults,
	outbox: OutboxConfig,
}
impl ServiceConfigBuilder {
	/// Sets the required service name.
	pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
		self.service_name = Some(service_name.into());
		self
	}

	/// Enables scope inheritance for `providers`, validated at [`Self::build`].
	pub fn inheritance_enabled_for(mut self, providers: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.raw_inheritance_providers.extend(providers.into_iter().map(Into::into));
		self
	}

	/// Overrides the OAuth configuration.
	pub fn oauth(mut self, oauth: OAuthConfig) -> Self {
		self.oauth = oauth;
		self
	}

	/// Overrides the refresh defaults.
	pub fn refresh(mut self, refresh: RefreshDefaults) -> Self {
		self.refresh = refresh;
		self
	}

	/// Overrides the freshness windows.
	pub fn freshness(mut self, freshness: FreshnessDefaults) -> Self {
		self.freshness = freshness;
		self
	}

	/// Overrides the outbox dispatch defaults.
	pub fn outbox(mut self, outbox: OutboxConfig) -> Self {
		self.outbox = outbox;
		self
	}

	/// Validates and builds the configuration.
	pub fn build(self) -> Result<ServiceConfig, ConfigError> {
		let service_name = self.service_name.filter(|s| !s.trim().is_empty()).ok_or(ConfigError::MissingServiceName)?;

		let enabled_providers = self
			.raw_inheritance_providers
			.iter()
			.map(|raw| ProviderId::new(raw).map_err(ConfigError::InvalidInheritanceProvider))
			.collect::<Result<Vec<_>, _>>()?;

		if self.oauth.state_ttl <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "oauth.state_ttl" });
		}
		if self.refresh.initial_backoff <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "refresh.initial_backoff" });
		}
		if self.refresh.max_backoff <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "refresh.max_backoff" });
		}
		if self.refresh.lock_ttl <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "refresh.lock_ttl" });
		}
		if self.refresh.max_attempts == 0 {
			return Err(ConfigError::NonPositiveCount { field: "refresh.max_attempts" });
		}
		if self.freshness.expiring_soon_window <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "freshness.expiring_soon_window" });
		}
		if self.freshness.refresh_lead_window <= Duration::ZERO {
			return Err(ConfigError::NonPositiveDuration { field: "freshness.refresh_lead_window" });
		}
		if self.outbox.batch_size == 0 {
			return Err(ConfigError::NonPositiveCount { field: "outbox.batch_size" });
		}
		if self.outbox.max_attempts == 0 {
			return Err(ConfigError::NonPositiveCount { field: "outbox.max_attempts" });
		}

		Ok(ServiceConfig {
			service_name,
			inheritance: InheritanceConfig { enabled_providers },
			oauth: self.oauth,
			refresh: self.refresh,
			freshness: self.freshness,
			outbox: self.outbox,
		})
	}
}
