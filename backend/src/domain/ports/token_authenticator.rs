//! Port for issuing and validating signed access tokens.
use crate::domain::AccessClaims;

use super::define_port_error;

define_port_error! {
    /// Token failures. Each cause stays distinguishable to callers.
    pub enum TokenError {
        InvalidSignature => "token signature is invalid",
        Expired => "token has expired",
        IssuerMismatch => "token issuer does not match",
        AudienceMismatch => "token audience does not match",
        /// The header names an algorithm other than the configured one.
        InvalidAlgorithm => "token algorithm is not accepted",
        /// Not yet valid, undecodable, or missing required claims.
        Malformed { message: String } => "token is malformed: {message}",
        Signing { message: String } => "token signing failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenAuthenticator: Send + Sync {
    fn generate(&self, claims: &AccessClaims) -> Result<String, TokenError>;

    fn validate(&self, token: &str) -> Result<AccessClaims, TokenError>;
}
