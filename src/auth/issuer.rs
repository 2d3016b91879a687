//! Token minting.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::auth::claims::{Lifespan, TokenClaims};
use crate::auth::codec::TokenCodec;
use crate::auth::scope::{Scope, ScopeSet};
use crate::errors::TokenError;
use crate::storage::traits::ExchangeTokenCache;

/// Builds claim sets and signs them.
///
/// Short-lived tokens are recorded in the exchange token cache at mint time; they stay
/// exchangeable until they expire or are burned.
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    exchange_tokens: Arc<dyn ExchangeTokenCache>,
    long_lived_ttl: Duration,
    short_lived_ttl: Duration,
    internal_application_id: String,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        exchange_tokens: Arc<dyn ExchangeTokenCache>,
        long_lived_ttl: Duration,
        short_lived_ttl: Duration,
        internal_application_id: String,
    ) -> Self {
        Self {
            codec,
            exchange_tokens,
            long_lived_ttl,
            short_lived_ttl,
            internal_application_id,
        }
    }

    /// The reserved application id whose long-lived tokens may manage AbandonAuth itself
    pub fn internal_application_id(&self) -> &str {
        &self.internal_application_id
    }

    /// Scopes granted to a token with the given audience and lifespan
    pub fn scope_for(&self, aud: &str, lifespan: Lifespan) -> ScopeSet {
        match lifespan {
            Lifespan::Long if aud == self.internal_application_id => {
                ScopeSet::new([Scope::Identify, Scope::AbandonAuth])
            }
            _ => ScopeSet::new([Scope::Identify]),
        }
    }

    /// Mint a token for `user_id` bound to the application `aud`
    pub fn issue(&self, user_id: &str, aud: &str, lifespan: Lifespan) -> Result<String, TokenError> {
        let ttl = match lifespan {
            Lifespan::Long => self.long_lived_ttl,
            Lifespan::Short => self.short_lived_ttl,
        };
        let claims = TokenClaims {
            user_id: user_id.to_string(),
            exp: Utc::now() + ttl,
            scope: self.scope_for(aud, lifespan),
            aud: aud.to_string(),
            lifespan,
        };

        let token = self.codec.encode(&claims)?;
        if lifespan == Lifespan::Short {
            self.exchange_tokens.insert(&token);
        }

        tracing::debug!(
            user_id = %claims.user_id,
            aud = %claims.aud,
            lifespan = ?claims.lifespan,
            scope = %claims.scope,
            "issued token"
        );
        Ok(token)
    }

    pub fn issue_long_lived(&self, user_id: &str, aud: &str) -> Result<String, TokenError> {
        self.issue(user_id, aud, Lifespan::Long)
    }

    pub fn issue_short_lived(&self, user_id: &str, aud: &str) -> Result<String, TokenError> {
        self.issue(user_id, aud, Lifespan::Short)
    }
}
