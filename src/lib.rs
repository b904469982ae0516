//! Multi-tenant connector core: provider-agnostic connection/credential lifecycle,
//! capability-gated operation execution, and grant-aware authorization over a pluggable
//! provider registry.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod freshness;
pub mod grant_algebra;
pub mod hooks;
pub mod lifecycle;
pub mod lock;
pub mod model;
pub mod obs;
pub mod outbox;
pub mod permission;
pub mod operation;
pub mod projector;
pub mod provider;
pub mod registry;
pub mod scope_resolver;
pub mod service;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
