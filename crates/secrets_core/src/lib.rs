pub mod domain;
pub mod ports;

pub use domain::{AuthSession, Provider, User, UserCredentials};
pub use ports::{
    AuthError, AuthResult, AuthorizationRequest, DatabaseService, IdentityProvider, PortError,
    PortResult,
};
