//! Core domain entities: identifiers, scopes, connections, credentials, grants, capabilities,
//! and lifecycle events.

pub mod capability;
pub mod connection;
pub mod credential;
pub mod event;
pub mod grant;
pub mod ids;
pub mod scope;

pub use capability::*;
pub use connection::*;
pub use credential::*;
pub use event::*;
pub use grant::*;
pub use ids::*;
pub use scope::*;
