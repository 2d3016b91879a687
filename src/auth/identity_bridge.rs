//! Maps a verified provider profile onto a local user and issues the exchange token.

use std::sync::Arc;

use crate::auth::issuer::TokenIssuer;
use crate::auth::providers::{OAuthProvider, ProviderKind, ProviderProfile};
use crate::errors::IdentityError;
use crate::storage::traits::{ExternalAccount, IdentityStorage, User};

/// Result of a completed provider login
pub struct FederatedLogin {
    pub user: User,
    /// Short-lived `identify` token bound to the requesting application
    pub exchange_token: String,
}

pub struct IdentityBridge {
    storage: Arc<dyn IdentityStorage>,
    issuer: Arc<TokenIssuer>,
}

impl IdentityBridge {
    pub fn new(storage: Arc<dyn IdentityStorage>, issuer: Arc<TokenIssuer>) -> Self {
        Self { storage, issuer }
    }

    /// Find the user linked to this provider account, creating user and link on first sight
    pub async fn complete(
        &self,
        provider: ProviderKind,
        profile: &ProviderProfile,
    ) -> Result<User, IdentityError> {
        if let Some(user) = self
            .storage
            .find_user_by_external_account(provider, &profile.external_id)
            .await?
        {
            return Ok(user);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: profile.display_name.clone(),
        };
        let account = ExternalAccount {
            provider,
            external_id: profile.external_id.clone(),
            user_id: user.id.clone(),
        };

        // A concurrent first login may have linked the account already; storage hands back
        // that user instead of creating a second one
        let linked = self
            .storage
            .create_user_with_external_account(&user, &account)
            .await?;
        if linked.id == user.id {
            tracing::info!(%provider, user_id = %linked.id, "created user for new provider account");
        }
        Ok(linked)
    }

    /// Run the provider half of a login and issue an exchange token for `audience`
    pub async fn login(
        &self,
        provider: &dyn OAuthProvider,
        code: &str,
        audience: &str,
    ) -> Result<FederatedLogin, IdentityError> {
        let access_token = provider.exchange_code(code).await?;
        let profile = provider.fetch_profile(&access_token).await?;

        let user = self.complete(provider.kind(), &profile).await?;
        let exchange_token = self.issuer.issue_short_lived(&user.id, audience)?;
        Ok(FederatedLogin {
            user,
            exchange_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Lifespan;
    use crate::auth::codec::TokenCodec;
    use crate::storage::traits::UserStore;
    use crate::storage::{MemoryExchangeTokenCache, MemoryIdentityStorage};
    use async_trait::async_trait;
    use chrono::Duration;
    use jsonwebtoken::Algorithm;

    struct StaticProvider {
        profile: Option<ProviderProfile>,
    }

    #[async_trait]
    impl OAuthProvider for StaticProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Discord
        }

        fn authorize_url(&self, state: &str) -> String {
            format!("https://provider.test/authorize?state={state}")
        }

        async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
            match code {
                "good" => Ok("access".to_string()),
                _ => Err(IdentityError::UpstreamFailure("bad code".to_string())),
            }
        }

        async fn fetch_profile(&self, _: &str) -> Result<ProviderProfile, IdentityError> {
            self.profile
                .clone()
                .ok_or_else(|| IdentityError::UpstreamFailure("no profile".to_string()))
        }
    }

    fn bridge() -> (IdentityBridge, Arc<MemoryIdentityStorage>, Arc<TokenCodec>) {
        let codec = Arc::new(TokenCodec::new(b"secret", Algorithm::HS256));
        let issuer = Arc::new(TokenIssuer::new(
            codec.clone(),
            Arc::new(MemoryExchangeTokenCache::new()),
            Duration::days(7),
            Duration::minutes(2),
            "internal-app".to_string(),
        ));
        let storage = Arc::new(MemoryIdentityStorage::new());
        (IdentityBridge::new(storage.clone(), issuer), storage, codec)
    }

    fn profile(id: &str, name: &str) -> ProviderProfile {
        ProviderProfile {
            external_id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_user_once() {
        let (bridge, storage, _) = bridge();

        let first = bridge
            .complete(ProviderKind::Github, &profile("42", "octocat"))
            .await
            .unwrap();
        assert_eq!(first.username, "octocat");

        // Display name changes at the provider do not create a new user
        let second = bridge
            .complete(ProviderKind::Github, &profile("42", "octocat2"))
            .await
            .unwrap();
        assert_eq!(first, second);

        assert_eq!(
            storage
                .find_user_by_external_account(ProviderKind::Github, "42")
                .await
                .unwrap(),
            Some(first.clone())
        );
        assert_eq!(storage.get_user(&first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_same_external_id_on_other_provider_is_a_new_user() {
        let (bridge, _, _) = bridge();
        let github = bridge
            .complete(ProviderKind::Github, &profile("42", "a"))
            .await
            .unwrap();
        let discord = bridge
            .complete(ProviderKind::Discord, &profile("42", "a"))
            .await
            .unwrap();
        assert_ne!(github.id, discord.id);
    }

    #[tokio::test]
    async fn test_login_issues_exchange_token() {
        let (bridge, _, codec) = bridge();
        let provider = StaticProvider {
            profile: Some(profile("80351110224678912", "nelly")),
        };

        let login = bridge.login(&provider, "good", "app-1").await.unwrap();
        let claims = codec.decode(&login.exchange_token, Some("app-1")).unwrap();
        assert_eq!(claims.user_id, login.user.id);
        assert_eq!(claims.lifespan, Lifespan::Short);
    }

    #[tokio::test]
    async fn test_provider_failures_surface() {
        let (bridge, _, _) = bridge();
        let provider = StaticProvider { profile: None };

        assert!(matches!(
            bridge.login(&provider, "bad", "app-1").await,
            Err(IdentityError::UpstreamFailure(_))
        ));
        assert!(matches!(
            bridge.login(&provider, "good", "app-1").await,
            Err(IdentityError::UpstreamFailure(_))
        ));
    }
}
