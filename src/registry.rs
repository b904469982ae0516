//! Unique-by-id registry of provider adapters.

// self
use crate::{
	_prelude::*,
	error::{Error, ValidationError},
	model::ProviderId,
	provider::Provider,
};

/// Thread-safe registry of [`Provider`] adapters, keyed by [`ProviderId`].
#[derive(Default)]
pub struct ProviderRegistry {
	providers: RwLock<BTreeMap<ProviderId, Arc<dyn Provider>>>,
}
impl ProviderRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a provider. Fails if a provider is already registered under the same id.
	pub fn register(&self, provider: Arc<dyn Provider>) -> Result<(), Error> {
		let id = provider.id().clone();
		let mut providers = self.providers.write();

		if providers.contains_key(&id) {
			return Err(Error::Validation(ValidationError::MissingField { field: "provider_id" }));
		}

		providers.insert(id, provider);

		Ok(())
	}

	/// Fetches a provider by id, trimmed before lookup.
	pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
		self.providers.read().get(id.trim()).cloned()
	}

	/// Returns every registered provider, in deterministic id order.
	pub fn list(&self) -> Vec<Arc<dyn Provider>> {
		self.providers.read().values().cloned().collect()
	}
}
