//! services/web/src/accounts/mod.rs
//!
//! Account operations that sit between the route handlers and the ports:
//! local credentials, OAuth identity linking, and login sessions.

pub mod credentials;
pub mod identity;
pub mod session;

pub use credentials::CredentialVerifier;
pub use identity::IdentityLinker;
pub use session::SessionManager;
