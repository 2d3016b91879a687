//! Application state shared by every request handler.

use std::sync::Arc;

use crate::auth::{
    CallbackUriGuard, CredentialHasher, DeveloperApplicationService, IdentityBridge,
    PasswordLoginService, ProviderKind, ProviderRegistry, TokenCodec, TokenIssuer, TokenValidator,
    OAuthProvider,
};
use crate::config::Config;
use crate::errors::{ApplicationError, HttpError};
use crate::storage::traits::{ExchangeTokenCache, IdentityStorage};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Users, linked accounts, developer applications and callback URIs
    pub storage: Arc<dyn IdentityStorage>,
    pub token_issuer: Arc<TokenIssuer>,
    pub token_validator: Arc<TokenValidator>,
    pub developer_applications: Arc<DeveloperApplicationService>,
    pub callback_guard: Arc<CallbackUriGuard>,
    pub identity_bridge: Arc<IdentityBridge>,
    pub password_logins: Arc<PasswordLoginService>,
    /// Enabled OAuth providers
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    /// Wire the token services and identity services around the given collaborators.
    ///
    /// `exchange_tokens` is shared by the issuer and the validator so short-lived tokens
    /// minted by one can be burned by the other.
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn IdentityStorage>,
        exchange_tokens: Arc<dyn ExchangeTokenCache>,
        hasher: Arc<dyn CredentialHasher>,
        providers: ProviderRegistry,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(
            config.jwt_secret.as_ref(),
            *config.jwt_algorithm.as_ref(),
        ));
        let token_issuer = Arc::new(TokenIssuer::new(
            codec.clone(),
            exchange_tokens.clone(),
            *config.long_lived_token_expiration.as_ref(),
            *config.short_lived_token_expiration.as_ref(),
            config.internal_application_id.clone(),
        ));
        let token_validator = Arc::new(TokenValidator::new(codec, exchange_tokens));

        Self {
            developer_applications: Arc::new(DeveloperApplicationService::new(
                storage.clone(),
                hasher.clone(),
                token_issuer.clone(),
            )),
            callback_guard: Arc::new(CallbackUriGuard::new(storage.clone())),
            identity_bridge: Arc::new(IdentityBridge::new(storage.clone(), token_issuer.clone())),
            password_logins: Arc::new(PasswordLoginService::new(
                storage.clone(),
                hasher,
                token_issuer.clone(),
            )),
            providers: Arc::new(providers),
            config,
            storage,
            token_issuer,
            token_validator,
        }
    }

    /// Seed the internal developer application that the management UI logs in through.
    ///
    /// Its refresh token comes from configuration and its callback URI is the UI landing page.
    pub async fn bootstrap(&self) -> Result<(), ApplicationError> {
        let application_id = &self.config.internal_application_id;
        self.developer_applications
            .ensure_application(
                application_id,
                application_id,
                self.config.internal_application_token.as_ref(),
                &[self.config.ui_callback_uri()],
            )
            .await?;
        Ok(())
    }

    /// The client for an enabled provider
    pub fn provider(&self, kind: ProviderKind) -> Result<Arc<dyn OAuthProvider>, HttpError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| HttpError::UnknownProvider(kind.to_string()))
    }
}
