//! Token lifecycle integration tests
//!
//! These tests drive the issuer, validator, developer application service, callback guard and
//! identity bridge together over the in-memory storage backend.

use abandonauth::auth::{
    BcryptHasher, CallbackUriGuard, DeveloperApplicationService, IdentityBridge, Lifespan,
    OAuthProvider, ProviderKind, ProviderProfile, Scope, ScopeSet, TokenClaims, TokenCodec,
    TokenIssuer, TokenValidator, exchange_token,
};
use abandonauth::errors::{ApplicationError, GuardError, IdentityError, TokenError};
use abandonauth::storage::{
    ExchangeTokenCache, IdentityStorage, MemoryExchangeTokenCache, MemoryIdentityStorage,
    UserStore,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use std::sync::Arc;

const INTERNAL_APP: &str = "internal-app";

struct Harness {
    codec: Arc<TokenCodec>,
    cache: Arc<MemoryExchangeTokenCache>,
    storage: Arc<MemoryIdentityStorage>,
    issuer: Arc<TokenIssuer>,
    validator: TokenValidator,
    applications: DeveloperApplicationService,
    guard: CallbackUriGuard,
    bridge: IdentityBridge,
}

fn harness() -> Harness {
    let codec = Arc::new(TokenCodec::new(b"integration-secret", Algorithm::HS256));
    let cache = Arc::new(MemoryExchangeTokenCache::new());
    let storage = Arc::new(MemoryIdentityStorage::new());
    let issuer = Arc::new(TokenIssuer::new(
        codec.clone(),
        cache.clone(),
        Duration::days(7),
        Duration::minutes(2),
        INTERNAL_APP.to_string(),
    ));
    let identity: Arc<dyn IdentityStorage> = storage.clone();

    Harness {
        validator: TokenValidator::new(codec.clone(), cache.clone()),
        applications: DeveloperApplicationService::new(
            identity.clone(),
            Arc::new(BcryptHasher::new(4)),
            issuer.clone(),
        ),
        guard: CallbackUriGuard::new(identity.clone()),
        bridge: IdentityBridge::new(identity, issuer.clone()),
        codec,
        cache,
        storage,
        issuer,
    }
}

struct FakeProvider;

#[async_trait]
impl OAuthProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    fn authorize_url(&self, state: &str) -> String {
        format!("https://github.test/authorize?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        Ok(format!("access-for-{code}"))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, IdentityError> {
        let account = access_token.trim_start_matches("access-for-");
        Ok(ProviderProfile {
            external_id: format!("gh-{account}"),
            display_name: format!("octo-{account}"),
        })
    }
}

#[test]
fn test_issue_then_validate_round_trip() {
    let h = harness();

    for (user_id, aud) in [("u1", INTERNAL_APP), ("u2", "devapp-7"), ("u3", "x")] {
        let token = h.issuer.issue_long_lived(user_id, aud).unwrap();
        let claims = h
            .validator
            .validate(&token, Some(aud), Some(Scope::Identify))
            .unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.aud, aud);
        assert_eq!(claims.lifespan, Lifespan::Long);
    }
}

#[test]
fn test_internal_scope_policy() {
    let h = harness();

    let internal = h.issuer.issue_long_lived("u1", INTERNAL_APP).unwrap();
    let claims = h
        .validator
        .validate(&internal, Some(INTERNAL_APP), Some(Scope::AbandonAuth))
        .unwrap();
    assert_eq!(
        claims.scope,
        ScopeSet::new([Scope::Identify, Scope::AbandonAuth])
    );

    let external = h.issuer.issue_long_lived("u1", "devapp-7").unwrap();
    assert_eq!(
        h.validator
            .validate(&external, Some("devapp-7"), Some(Scope::AbandonAuth)),
        Err(TokenError::InsufficientScope("abandonauth".to_string()))
    );
}

#[test]
fn test_expired_wins_over_other_failures() {
    let h = harness();

    let claims = TokenClaims {
        user_id: "u1".to_string(),
        exp: Utc::now() - Duration::minutes(5),
        scope: ScopeSet::new([Scope::Identify]),
        aud: "devapp-7".to_string(),
        lifespan: Lifespan::Short,
    };
    // Short-lived, not cached, and missing the requested scope
    let token = h.codec.encode(&claims).unwrap();

    assert_eq!(
        h.validator
            .validate(&token, None, Some(Scope::AbandonAuth)),
        Err(TokenError::Expired)
    );
}

#[test]
fn test_uncached_short_lived_token_is_revoked() {
    let h = harness();

    let claims = TokenClaims {
        user_id: "u1".to_string(),
        exp: Utc::now() + Duration::minutes(2),
        scope: ScopeSet::new([Scope::Identify]),
        aud: "devapp-7".to_string(),
        lifespan: Lifespan::Short,
    };
    let token = h.codec.encode(&claims).unwrap();

    assert_eq!(
        h.validator.validate(&token, None, None),
        Err(TokenError::Revoked)
    );
}

#[test]
fn test_burn_revokes_before_expiry() {
    let h = harness();
    let token = h.issuer.issue_short_lived("u1", "devapp-7").unwrap();

    assert!(h.validator.validate(&token, Some("devapp-7"), None).is_ok());
    assert!(h.validator.burn(&token));
    assert_eq!(
        h.validator.validate(&token, Some("devapp-7"), None),
        Err(TokenError::Revoked)
    );

    // Burning again is harmless
    assert!(!h.validator.burn(&token));
    assert!(!h.validator.burn("not-a-token"));
}

#[test]
fn test_exchange_does_not_consume_token() {
    let h = harness();
    let short = h.issuer.issue_short_lived("u1", "devapp-7").unwrap();

    let first = exchange_token(&h.validator, &h.issuer, &short, Some("devapp-7")).unwrap();
    let second = exchange_token(&h.validator, &h.issuer, &short, Some("devapp-7")).unwrap();
    assert!(h.cache.contains(&short));

    for token in [first, second] {
        let claims = h.validator.validate(&token, Some("devapp-7"), None).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.lifespan, Lifespan::Long);
    }

    // Bound to a different application
    assert!(matches!(
        exchange_token(&h.validator, &h.issuer, &short, Some("devapp-8")),
        Err(TokenError::InvalidFormat(_))
    ));
}

#[test]
fn test_exchange_rejects_long_lived_input() {
    let h = harness();
    let long = h.issuer.issue_long_lived("u1", "devapp-7").unwrap();

    assert!(matches!(
        exchange_token(&h.validator, &h.issuer, &long, None),
        Err(TokenError::InvalidFormat(_))
    ));
}

#[test]
fn test_distinct_claims_yield_distinct_tokens() {
    let h = harness();

    let tokens = [
        h.issuer.issue_short_lived("u1", "a").unwrap(),
        h.issuer.issue_short_lived("u2", "a").unwrap(),
        h.issuer.issue_short_lived("u1", "b").unwrap(),
        h.issuer.issue_long_lived("u1", "a").unwrap(),
    ];
    for (i, left) in tokens.iter().enumerate() {
        for right in tokens.iter().skip(i + 1) {
            assert_ne!(left, right);
        }
    }

    // Burning one exchange token leaves the others live
    h.validator.burn(&tokens[0]);
    assert!(h.validator.validate(&tokens[1], None, None).is_ok());
    assert!(h.validator.validate(&tokens[2], None, None).is_ok());
}

#[tokio::test]
async fn test_rotation_invalidates_old_secret() {
    let h = harness();
    let created = h.applications.create("owner", None).await.unwrap();
    let app_id = created.application.id.clone();

    assert!(h
        .applications
        .verify(&app_id, &created.refresh_token)
        .await
        .unwrap());

    let rotated = h.applications.rotate(&app_id, "owner").await.unwrap();
    assert_ne!(rotated.refresh_token, created.refresh_token);
    assert!(!h
        .applications
        .verify(&app_id, &created.refresh_token)
        .await
        .unwrap());
    assert!(h
        .applications
        .verify(&app_id, &rotated.refresh_token)
        .await
        .unwrap());

    // The stored hash never equals the plaintext
    let stored = h.applications.find(&app_id).await.unwrap();
    assert_ne!(stored.refresh_token_hash, rotated.refresh_token);

    assert!(matches!(
        h.applications.rotate(&app_id, "someone-else").await,
        Err(ApplicationError::NotFound)
    ));
}

#[tokio::test]
async fn test_application_login_issues_self_bound_token() {
    let h = harness();
    let created = h.applications.create("owner", None).await.unwrap();
    let app_id = created.application.id.clone();

    let token = h
        .applications
        .login(&app_id, &created.refresh_token)
        .await
        .unwrap();
    let claims = h.validator.validate(&token, Some(&app_id), None).unwrap();
    assert_eq!(claims.user_id, app_id);
    assert_eq!(claims.lifespan, Lifespan::Short);

    assert!(matches!(
        h.applications.login(&app_id, "wrong").await,
        Err(ApplicationError::Forbidden)
    ));
    assert!(matches!(
        h.applications.login("missing", &created.refresh_token).await,
        Err(ApplicationError::Forbidden)
    ));
}

#[tokio::test]
async fn test_callback_guard_exact_match() {
    let h = harness();
    let created = h.applications.create("owner", None).await.unwrap();
    let app_id = created.application.id.clone();
    h.applications
        .update_callback_uris(&app_id, "owner", &["https://a/cb".to_string()])
        .await
        .unwrap();

    assert!(h.guard.verify(&app_id, "https://a/cb").await.is_ok());
    for proposed in ["https://b/cb", "https://a/cb/", "HTTPS://A/CB", "https://a/cb?x=1"] {
        assert!(
            matches!(
                h.guard.verify(&app_id, proposed).await,
                Err(GuardError::Forbidden)
            ),
            "{proposed} should be rejected"
        );
    }
    assert!(matches!(
        h.guard.verify("unknown-app", "https://a/cb").await,
        Err(GuardError::NotFound(_))
    ));

    // Clearing the allow-list rejects the old URI at once
    h.applications
        .update_callback_uris(&app_id, "owner", &[])
        .await
        .unwrap();
    assert!(matches!(
        h.guard.verify(&app_id, "https://a/cb").await,
        Err(GuardError::Forbidden)
    ));
}

#[tokio::test]
async fn test_federated_login_creates_one_user() {
    let h = harness();

    let first = h
        .bridge
        .login(&FakeProvider, "alice", "devapp-7")
        .await
        .unwrap();
    let second = h
        .bridge
        .login(&FakeProvider, "alice", "devapp-7")
        .await
        .unwrap();
    let other = h
        .bridge
        .login(&FakeProvider, "bob", "devapp-7")
        .await
        .unwrap();

    assert_eq!(first.user.id, second.user.id);
    assert_ne!(first.user.id, other.user.id);
    assert_eq!(first.user.username, "octo-alice");

    let linked = h
        .storage
        .find_user_by_external_account(ProviderKind::Github, "gh-alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.id, first.user.id);

    let claims = h
        .validator
        .validate(&second.exchange_token, Some("devapp-7"), Some(Scope::Identify))
        .unwrap();
    assert_eq!(claims.user_id, first.user.id);
    assert_eq!(claims.lifespan, Lifespan::Short);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_and_burn() {
    let h = harness();
    let issuer = h.issuer.clone();

    let handles = (0..64).map(|i| {
        let issuer = issuer.clone();
        tokio::spawn(async move { issuer.issue_short_lived(&format!("user-{i}"), "devapp-7") })
    });
    let tokens: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    assert_eq!(h.cache.len(), 64);

    let cache = h.cache.clone();
    let burns = tokens.iter().step_by(2).cloned().map(|token| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.remove(&token) })
    });
    for burned in futures::future::join_all(burns).await {
        assert!(burned.unwrap());
    }

    assert_eq!(h.cache.len(), 32);
    for (i, token) in tokens.iter().enumerate() {
        assert_eq!(h.cache.contains(token), i % 2 == 1);
    }
}
