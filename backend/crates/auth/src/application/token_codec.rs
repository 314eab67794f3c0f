//! Token Codec
//!
//! Signs and verifies HMAC JWTs carrying [`TokenClaims`].

use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::application::config::AuthConfig;
use crate::domain::token::{TokenClaims, TokenClass};
use crate::error::{AuthError, AuthResult};

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_algorithm)
    }

    pub fn encode(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {e}")))
    }

    /// Verify signature and expiry, then the token class.
    pub fn decode(&self, token: &str, expected: TokenClass) -> AuthResult<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    tracing::debug!(error = %e, "Token rejected");
                    AuthError::InvalidToken
                }
            },
        )?;

        if data.claims.scope != expected {
            tracing::debug!(
                expected = %expected,
                actual = %data.claims.scope,
                "Token class mismatch"
            );
            return Err(AuthError::WrongTokenClass);
        }

        Ok(data.claims)
    }
}
