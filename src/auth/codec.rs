//! Signed token encoding and decoding.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::auth::claims::TokenClaims;
use crate::errors::TokenError;

/// Encodes claim sets into compact JWTs and verifies them on the way back.
///
/// The signing secret and algorithm are fixed for the lifetime of the process. Expiry is not
/// checked here so that the validator can report it as a distinct failure.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn encode(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify the signature and, when `audience` is given, require `aud` to equal it exactly.
    pub fn decode(&self, token: &str, audience: Option<&str>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidAudience => "audience mismatch".to_string(),
                    ErrorKind::InvalidSignature => "signature verification failed".to_string(),
                    ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
                    _ => e.to_string(),
                };
                tracing::debug!(?reason, "token decode failed");
                TokenError::InvalidFormat(reason)
            })
    }
}
