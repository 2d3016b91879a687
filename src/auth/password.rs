//! Password-backed test users, only reachable when debug routes are enabled.

use std::sync::Arc;

use crate::auth::hash::{CredentialHasher, hash_secret, verify_secret};
use crate::auth::issuer::TokenIssuer;
use crate::errors::IdentityError;
use crate::storage::traits::{IdentityStorage, PasswordAccount, User};

pub struct PasswordLoginService {
    storage: Arc<dyn IdentityStorage>,
    hasher: Arc<dyn CredentialHasher>,
    issuer: Arc<TokenIssuer>,
}

impl PasswordLoginService {
    pub fn new(
        storage: Arc<dyn IdentityStorage>,
        hasher: Arc<dyn CredentialHasher>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            storage,
            hasher,
            issuer,
        }
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, IdentityError> {
        let password_hash = hash_secret(self.hasher.clone(), password.to_string()).await?;
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
        };
        let account = PasswordAccount {
            user_id: user.id.clone(),
            password_hash,
        };
        self.storage
            .create_user_with_password(&user, &account)
            .await?;

        tracing::info!(user_id = %user.id, "created password test user");
        Ok(user)
    }

    /// Check the password and issue a long-lived token for AbandonAuth itself
    pub async fn login(&self, user_id: &str, password: &str) -> Result<String, IdentityError> {
        let Some(account) = self.storage.get_password_account(user_id).await? else {
            return Err(IdentityError::InvalidCredentials);
        };
        let verified = verify_secret(
            self.hasher.clone(),
            password.to_string(),
            account.password_hash,
        )
        .await?;
        if !verified {
            tracing::debug!(%user_id, "password login rejected");
            return Err(IdentityError::InvalidCredentials);
        }

        let internal_application_id = self.issuer.internal_application_id().to_string();
        Ok(self
            .issuer
            .issue_long_lived(user_id, &internal_application_id)?)
    }
}
