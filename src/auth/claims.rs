//! Claim set carried inside every signed AbandonAuth token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::scope::{Scope, ScopeSet};

/// Whether a token is a short-lived exchange token or a long-lived session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifespan {
    Long,
    Short,
}

/// All claim data for an AbandonAuth token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
    pub scope: ScopeSet,
    pub aud: String,
    pub lifespan: Lifespan,
}

impl TokenClaims {
    pub fn has_scope(&self, scope: Scope) -> bool {
        self.scope.contains(scope)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_claims_wire_format() {
        let claims = TokenClaims {
            user_id: "u1".to_string(),
            exp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            scope: ScopeSet::new([Scope::Identify, Scope::AbandonAuth]),
            aud: "internal-app".to_string(),
            lifespan: Lifespan::Long,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "user_id": "u1",
                "exp": 1_700_000_000,
                "scope": "identify abandonauth",
                "aud": "internal-app",
                "lifespan": "long",
            })
        );

        let parsed: TokenClaims = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, claims);
    }

    #[test]
    fn test_is_expired_at() {
        let now = Utc::now();
        let claims = TokenClaims {
            user_id: "u1".to_string(),
            exp: now - Duration::seconds(1),
            scope: ScopeSet::new([Scope::Identify]),
            aud: "a".to_string(),
            lifespan: Lifespan::Short,
        };
        assert!(claims.is_expired_at(now));
        assert!(!claims.is_expired_at(now - Duration::seconds(5)));
    }
}
