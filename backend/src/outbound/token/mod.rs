//! Access token adapters.

mod jwt_authenticator;

pub use jwt_authenticator::JwtAuthenticator;
