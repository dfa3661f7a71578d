//! HS256 access tokens via `jsonwebtoken`.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::AccessClaims;
use crate::domain::ports::{TokenAuthenticator, TokenError};

/// Signs and validates tokens with a shared secret.
///
/// Tokens must carry the configured issuer and audience; `exp` and `nbf` are
/// enforced with no leeway.
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &Zeroizing<String>, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

fn map_jwt_error(error: &jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::invalid_signature(),
        ErrorKind::ExpiredSignature => TokenError::expired(),
        ErrorKind::InvalidIssuer => TokenError::issuer_mismatch(),
        ErrorKind::InvalidAudience => TokenError::audience_mismatch(),
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::invalid_algorithm()
        }
        _ => TokenError::malformed(error.to_string()),
    }
}

impl TokenAuthenticator for JwtAuthenticator {
    fn generate(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|err| TokenError::signing(err.to_string()))
    }

    fn validate(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                debug!(error = %err, "access token rejected");
                map_jwt_error(&err)
            })
    }
}
