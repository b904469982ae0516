//! Capability descriptor entity: a named provider operation gated by required grants.

// self
use crate::{_prelude::*, model::CapabilityName};

/// How a capability behaves when a caller lacks the required grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedBehavior {
	/// The operation is refused entirely.
	Block,
	/// The operation proceeds with reduced functionality.
	Degrade,
}
impl Display for DeniedBehavior {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let s = match self {
			Self::Block => "block",
			Self::Degrade => "degrade",
		};

		f.write_str(s)
	}
}

/// Describes a logical operation a provider exposes and the grants it requires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
	/// Logical capability name (e.g. `reports.read`).
	pub name: CapabilityName,
	/// Grants that MUST be present for the capability to be allowed.
	pub required_grants: Vec<String>,
	/// Grants that enrich the capability but are not mandatory.
	pub optional_grants: Vec<String>,
	/// Behavior when required grants are missing.
	pub denied_behavior: DeniedBehavior,
}
impl CapabilityDescriptor {
	/// Builds a descriptor with the given name and required grants, blocking by default.
	pub fn new(name: CapabilityName, required_grants: Vec<String>) -> Self {
		Self { name, required_grants, optional_grants: Vec::new(), denied_behavior: DeniedBehavior::Block }
	}

	/// Sets the optional grants list, returning `self` for chaining.
	pub fn with_optional_grants(mut self, optional_grants: Vec<String>) -> Self {
		self.optional_grants = optional_grants;
		self
	}

	/// Sets the denied behavior, returning `self` for chaining.
	pub fn with_denied_behavior(mut self, denied_behavior: DeniedBehavior) -> Self {
		self.denied_behavior = denied_behavior;
		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_defaults_to_block() {
		let descriptor = CapabilityDescriptor::new(
			CapabilityName::new("reports.read").expect("Capability name fixture."),
			vec!["reports.read".into()],
		);

		assert_eq!(descriptor.denied_behavior, DeniedBehavior::Block);
		assert!(descriptor.optional_grants.is_empty());
	}

	#[test]
	fn builder_chains_overrides() {
		let descriptor = CapabilityDescriptor::new(
			CapabilityName::new("reports.export").expect("Capability name fixture."),
			vec!["reports.read".into()],
		)
		.with_optional_grants(vec!["reports.export".into()])
		.with_denied_behavior(DeniedBehavior::Degrade);

		assert_eq!(descriptor.denied_behavior, DeniedBehavior::Degrade);
		assert_eq!(descriptor.optional_grants, vec!["reports.export".to_owned()]);
	}
}
