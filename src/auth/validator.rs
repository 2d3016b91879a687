//! Token validation and the exchange of short-lived tokens for long-lived ones.

use chrono::Utc;
use std::sync::Arc;

use crate::auth::claims::{Lifespan, TokenClaims};
use crate::auth::codec::TokenCodec;
use crate::auth::issuer::TokenIssuer;
use crate::auth::scope::Scope;
use crate::errors::TokenError;
use crate::storage::traits::ExchangeTokenCache;

/// What a caller must present to pass bearer authentication
#[derive(Debug, Clone, Default)]
pub struct BearerRequirement {
    /// Reject requests without a token
    pub required: bool,
    /// Scope the token must carry
    pub scope: Option<Scope>,
    /// Audience the token must be bound to
    pub audience: Option<String>,
}

impl BearerRequirement {
    /// Any valid token with the `identify` scope
    pub fn identify() -> Self {
        Self {
            required: true,
            scope: Some(Scope::Identify),
            audience: None,
        }
    }

    /// A token issued to AbandonAuth itself with the `abandonauth` scope
    pub fn abandonauth(internal_application_id: &str) -> Self {
        Self {
            required: true,
            scope: Some(Scope::AbandonAuth),
            audience: Some(internal_application_id.to_string()),
        }
    }

    /// A token is accepted but not needed
    pub fn optional() -> Self {
        Self::default()
    }
}

pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    exchange_tokens: Arc<dyn ExchangeTokenCache>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>, exchange_tokens: Arc<dyn ExchangeTokenCache>) -> Self {
        Self {
            codec,
            exchange_tokens,
        }
    }

    /// Validate a token.
    ///
    /// Checks run in a fixed order and the first failure wins: signature and audience, expiry,
    /// scope, then cache membership for short-lived tokens.
    pub fn validate(
        &self,
        token: &str,
        audience: Option<&str>,
        required_scope: Option<Scope>,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.codec.decode(token, audience)?;

        if claims.is_expired_at(Utc::now()) {
            tracing::debug!(user_id = %claims.user_id, "rejected expired token");
            return Err(TokenError::Expired);
        }

        if let Some(scope) = required_scope {
            if !claims.has_scope(scope) {
                tracing::debug!(user_id = %claims.user_id, %scope, "rejected token without scope");
                return Err(TokenError::InsufficientScope(scope.to_string()));
            }
        }

        if claims.lifespan == Lifespan::Short && !self.exchange_tokens.contains(token) {
            tracing::debug!(user_id = %claims.user_id, "rejected burned exchange token");
            return Err(TokenError::Revoked);
        }

        Ok(claims)
    }

    /// Like [`validate`](Self::validate), but an absent token is not an error
    pub fn validate_optional(
        &self,
        token: Option<&str>,
        audience: Option<&str>,
        required_scope: Option<Scope>,
    ) -> Result<Option<TokenClaims>, TokenError> {
        token
            .map(|token| self.validate(token, audience, required_scope))
            .transpose()
    }

    /// Bearer authentication for every route guard
    pub fn authenticate(
        &self,
        token: Option<&str>,
        requirement: &BearerRequirement,
    ) -> Result<Option<TokenClaims>, TokenError> {
        match token {
            None if requirement.required => Err(TokenError::MissingToken),
            token => self.validate_optional(
                token,
                requirement.audience.as_deref(),
                requirement.scope,
            ),
        }
    }

    /// Remove a short-lived token from the cache. Unknown or malformed tokens are ignored.
    pub fn burn(&self, token: &str) -> bool {
        let burned = self.exchange_tokens.remove(token);
        tracing::info!(burned, "exchange token burn requested");
        burned
    }
}

/// Trade a short-lived exchange token for a long-lived token.
///
/// When `audience` is given the exchange token must be bound to it; otherwise the new token
/// keeps the exchange token's audience. The exchange token is not consumed.
pub fn exchange_token(
    validator: &TokenValidator,
    issuer: &TokenIssuer,
    token: &str,
    audience: Option<&str>,
) -> Result<String, TokenError> {
    let claims = validator.validate(token, audience, Some(Scope::Identify))?;
    if claims.lifespan != Lifespan::Short {
        return Err(TokenError::InvalidFormat(
            "only exchange tokens can be exchanged".to_string(),
        ));
    }
    issuer.issue(&claims.user_id, &claims.aud, Lifespan::Long)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::scope::ScopeSet;
    use crate::storage::MemoryExchangeTokenCache;
    use chrono::Duration;
    use jsonwebtoken::Algorithm;

    struct Fixture {
        codec: Arc<TokenCodec>,
        cache: Arc<MemoryExchangeTokenCache>,
        issuer: TokenIssuer,
        validator: TokenValidator,
    }

    fn fixture() -> Fixture {
        let codec = Arc::new(TokenCodec::new(b"secret", Algorithm::HS256));
        let cache = Arc::new(MemoryExchangeTokenCache::new());
        let issuer = TokenIssuer::new(
            codec.clone(),
            cache.clone(),
            Duration::days(7),
            Duration::minutes(2),
            "internal-app".to_string(),
        );
        let validator = TokenValidator::new(codec.clone(), cache.clone());
        Fixture {
            codec,
            cache,
            issuer,
            validator,
        }
    }

    #[test]
    fn test_validate_long_lived() {
        let f = fixture();
        let token = f.issuer.issue_long_lived("u1", "devapp-7").unwrap();

        let claims = f
            .validator
            .validate(&token, Some("devapp-7"), Some(Scope::Identify))
            .unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.aud, "devapp-7");
    }

    #[test]
    fn test_wrong_audience_is_invalid_format() {
        let f = fixture();
        let token = f.issuer.issue_long_lived("u1", "devapp-7").unwrap();

        assert!(matches!(
            f.validator.validate(&token, Some("devapp-8"), None),
            Err(TokenError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_expired_before_scope() {
        let f = fixture();
        let token = f
            .codec
            .encode(&TokenClaims {
                user_id: "u1".to_string(),
                exp: Utc::now() - Duration::minutes(1),
                scope: ScopeSet::new([Scope::Identify]),
                aud: "a".to_string(),
                lifespan: Lifespan::Short,
            })
            .unwrap();

        // Not in the cache and lacking the scope, but expiry is reported first
        assert_eq!(
            f.validator
                .validate(&token, None, Some(Scope::AbandonAuth))
                .unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn test_insufficient_scope() {
        let f = fixture();
        let token = f.issuer.issue_long_lived("u1", "devapp-7").unwrap();

        assert_eq!(
            f.validator
                .validate(&token, None, Some(Scope::AbandonAuth))
                .unwrap_err(),
            TokenError::InsufficientScope("abandonauth".to_string())
        );
    }

    #[test]
    fn test_burned_short_lived_token_is_revoked() {
        let f = fixture();
        let token = f.issuer.issue_short_lived("u1", "a").unwrap();
        assert!(f.validator.validate(&token, None, None).is_ok());

        assert!(f.validator.burn(&token));
        assert_eq!(
            f.validator.validate(&token, None, None).unwrap_err(),
            TokenError::Revoked
        );
        assert!(!f.validator.burn(&token));
        assert!(!f.validator.burn("not-a-token"));
    }

    #[test]
    fn test_authenticate_requirements() {
        let f = fixture();
        let internal = f.issuer.issue_long_lived("u1", "internal-app").unwrap();
        let external = f.issuer.issue_long_lived("u1", "devapp-7").unwrap();
        let abandonauth = BearerRequirement::abandonauth("internal-app");

        assert_eq!(
            f.validator.authenticate(None, &abandonauth).unwrap_err(),
            TokenError::MissingToken
        );
        assert!(
            f.validator
                .authenticate(None, &BearerRequirement::optional())
                .unwrap()
                .is_none()
        );
        assert!(
            f.validator
                .authenticate(Some(&internal), &abandonauth)
                .unwrap()
                .is_some()
        );
        assert!(
            f.validator
                .authenticate(Some(&external), &abandonauth)
                .is_err()
        );
        assert!(
            f.validator
                .authenticate(Some(&external), &BearerRequirement::identify())
                .unwrap()
                .is_some()
        );
        // A bad token is still an error when authentication is optional
        assert!(
            f.validator
                .authenticate(Some("garbage"), &BearerRequirement::optional())
                .is_err()
        );
    }

    #[test]
    fn test_exchange_token() {
        let f = fixture();
        let short = f.issuer.issue_short_lived("u1", "devapp-7").unwrap();

        let long = exchange_token(&f.validator, &f.issuer, &short, Some("devapp-7")).unwrap();
        let claims = f.validator.validate(&long, Some("devapp-7"), None).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.lifespan, Lifespan::Long);

        // The exchange token remains usable until it is burned
        assert!(f.cache.contains(&short));
        assert!(exchange_token(&f.validator, &f.issuer, &short, None).is_ok());

        f.validator.burn(&short);
        assert_eq!(
            exchange_token(&f.validator, &f.issuer, &short, None).unwrap_err(),
            TokenError::Revoked
        );
    }

    #[test]
    fn test_long_lived_tokens_cannot_be_exchanged() {
        let f = fixture();
        let long = f.issuer.issue_long_lived("u1", "devapp-7").unwrap();
        assert!(matches!(
            exchange_token(&f.validator, &f.issuer, &long, None),
            Err(TokenError::InvalidFormat(_))
        ));
    }
}
