//! Developer application credentials: creation, rotation, verification and callback URIs.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::hash::{CredentialHasher, generate_refresh_token, hash_secret, verify_secret};
use crate::auth::issuer::TokenIssuer;
use crate::errors::{ApplicationError, StorageError};
use crate::storage::traits::{CallbackUri, DeveloperApplication, IdentityStorage};

/// A freshly created or rotated application together with its plaintext refresh token.
///
/// The plaintext is never stored and cannot be recovered after this value is dropped.
pub struct IssuedCredentials {
    pub application: DeveloperApplication,
    pub refresh_token: String,
}

/// An application with its registered callback URIs
pub struct ApplicationWithCallbacks {
    pub application: DeveloperApplication,
    pub callback_uris: Vec<String>,
}

pub struct DeveloperApplicationService {
    storage: Arc<dyn IdentityStorage>,
    hasher: Arc<dyn CredentialHasher>,
    issuer: Arc<TokenIssuer>,
}

impl DeveloperApplicationService {
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

    /// Register a new application owned by `owner_id`
    pub async fn create(
        &self,
        owner_id: &str,
        name: Option<String>,
    ) -> Result<IssuedCredentials, ApplicationError> {
        let refresh_token = generate_refresh_token();
        let refresh_token_hash = hash_secret(self.hasher.clone(), refresh_token.clone()).await?;

        let application = DeveloperApplication {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name,
            refresh_token_hash,
            created_at: Utc::now(),
        };
        self.storage.store_application(&application).await?;

        tracing::info!(application_id = %application.id, %owner_id, "developer application created");
        Ok(IssuedCredentials {
            application,
            refresh_token,
        })
    }

    /// Make sure an application with a fixed id exists, verifies `refresh_token` and accepts
    /// every URI in `callback_uris`.
    ///
    /// Runs at every startup: an existing application keeps its owner and extra callback URIs
    /// but its refresh token is replaced.
    pub async fn ensure_application(
        &self,
        application_id: &str,
        owner_id: &str,
        refresh_token: &str,
        callback_uris: &[String],
    ) -> Result<DeveloperApplication, ApplicationError> {
        let refresh_token_hash =
            hash_secret(self.hasher.clone(), refresh_token.to_string()).await?;

        let application = match self.storage.get_application(application_id).await? {
            Some(_) => {
                self.storage
                    .update_refresh_token_hash(application_id, &refresh_token_hash)
                    .await?
            }
            None => {
                let application = DeveloperApplication {
                    id: application_id.to_string(),
                    owner_id: owner_id.to_string(),
                    name: None,
                    refresh_token_hash,
                    created_at: Utc::now(),
                };
                self.storage.store_application(&application).await?;
                tracing::info!(%application_id, "developer application seeded");
                application
            }
        };

        let present: HashSet<String> = self
            .storage
            .list_callback_uris(application_id)
            .await?
            .into_iter()
            .map(|callback| callback.uri)
            .collect();
        let mut seen = HashSet::new();
        let create: Vec<CallbackUri> = callback_uris
            .iter()
            .filter(|uri| !present.contains(uri.as_str()) && seen.insert(uri.as_str()))
            .map(|uri| CallbackUri {
                id: uuid::Uuid::new_v4().to_string(),
                developer_application_id: application_id.to_string(),
                uri: uri.clone(),
            })
            .collect();
        if !create.is_empty() {
            self.storage
                .sync_callback_uris(application_id, &create, &[])
                .await?;
        }

        Ok(application)
    }

    /// Load an application, treating applications owned by someone else as absent
    async fn owned(
        &self,
        application_id: &str,
        requesting_user_id: &str,
    ) -> Result<DeveloperApplication, ApplicationError> {
        match self.storage.get_application(application_id).await? {
            Some(application) if application.owner_id == requesting_user_id => Ok(application),
            _ => Err(ApplicationError::NotFound),
        }
    }

    /// Replace the refresh token of an owned application. The old token stops verifying at once.
    pub async fn rotate(
        &self,
        application_id: &str,
        requesting_user_id: &str,
    ) -> Result<IssuedCredentials, ApplicationError> {
        self.owned(application_id, requesting_user_id).await?;

        let refresh_token = generate_refresh_token();
        let refresh_token_hash = hash_secret(self.hasher.clone(), refresh_token.clone()).await?;
        let application = self
            .storage
            .update_refresh_token_hash(application_id, &refresh_token_hash)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => ApplicationError::NotFound,
                e => e.into(),
            })?;

        tracing::info!(%application_id, "developer application refresh token rotated");
        Ok(IssuedCredentials {
            application,
            refresh_token,
        })
    }

    /// Check a candidate refresh token. Unknown applications never verify.
    pub async fn verify(
        &self,
        application_id: &str,
        candidate_secret: &str,
    ) -> Result<bool, ApplicationError> {
        match self.authenticate(application_id, candidate_secret).await {
            Ok(_) => Ok(true),
            Err(ApplicationError::Forbidden) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Return the application if the refresh token verifies, otherwise `Forbidden`
    pub async fn authenticate(
        &self,
        application_id: &str,
        candidate_secret: &str,
    ) -> Result<DeveloperApplication, ApplicationError> {
        let Some(application) = self.storage.get_application(application_id).await? else {
            tracing::debug!(%application_id, "credentials presented for unknown application");
            return Err(ApplicationError::Forbidden);
        };

        let verified = verify_secret(
            self.hasher.clone(),
            candidate_secret.to_string(),
            application.refresh_token_hash.clone(),
        )
        .await?;
        if !verified {
            tracing::debug!(%application_id, "application refresh token did not verify");
            return Err(ApplicationError::Forbidden);
        }
        Ok(application)
    }

    /// Trade application credentials for a short-lived token naming the application
    pub async fn login(
        &self,
        application_id: &str,
        candidate_secret: &str,
    ) -> Result<String, ApplicationError> {
        let application = self.authenticate(application_id, candidate_secret).await?;
        Ok(self
            .issuer
            .issue_short_lived(&application.id, &application.id)?)
    }

    pub async fn get(
        &self,
        application_id: &str,
        requesting_user_id: &str,
    ) -> Result<ApplicationWithCallbacks, ApplicationError> {
        let application = self.owned(application_id, requesting_user_id).await?;
        let callback_uris = self
            .storage
            .list_callback_uris(application_id)
            .await?
            .into_iter()
            .map(|callback| callback.uri)
            .collect();
        Ok(ApplicationWithCallbacks {
            application,
            callback_uris,
        })
    }

    /// Look an application up by id with no ownership check
    pub async fn find(&self, application_id: &str) -> Result<DeveloperApplication, ApplicationError> {
        self.storage
            .get_application(application_id)
            .await?
            .ok_or(ApplicationError::NotFound)
    }

    pub async fn list_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<DeveloperApplication>, ApplicationError> {
        Ok(self.storage.list_applications_by_owner(owner_id).await?)
    }

    pub async fn delete(
        &self,
        application_id: &str,
        requesting_user_id: &str,
    ) -> Result<DeveloperApplication, ApplicationError> {
        self.owned(application_id, requesting_user_id).await?;
        let deleted = self
            .storage
            .delete_application(application_id)
            .await?
            .ok_or(ApplicationError::NotFound)?;

        tracing::info!(%application_id, "developer application deleted");
        Ok(deleted)
    }

    /// Make the application's callback URIs exactly `uris`.
    ///
    /// URIs already registered are left untouched, missing ones are created and the rest are
    /// deleted, all in one batch.
    pub async fn update_callback_uris(
        &self,
        application_id: &str,
        requesting_user_id: &str,
        uris: &[String],
    ) -> Result<DeveloperApplication, ApplicationError> {
        let application = self.owned(application_id, requesting_user_id).await?;
        let existing = self.storage.list_callback_uris(application_id).await?;

        let wanted: HashSet<&str> = uris.iter().map(String::as_str).collect();
        let present: HashSet<&str> = existing.iter().map(|c| c.uri.as_str()).collect();

        let mut seen = HashSet::new();
        let create: Vec<CallbackUri> = uris
            .iter()
            .filter(|uri| !present.contains(uri.as_str()) && seen.insert(uri.as_str()))
            .map(|uri| CallbackUri {
                id: uuid::Uuid::new_v4().to_string(),
                developer_application_id: application_id.to_string(),
                uri: uri.clone(),
            })
            .collect();
        let delete_ids: Vec<String> = existing
            .iter()
            .filter(|callback| !wanted.contains(callback.uri.as_str()))
            .map(|callback| callback.id.clone())
            .collect();

        self.storage
            .sync_callback_uris(application_id, &create, &delete_ids)
            .await?;

        tracing::info!(
            %application_id,
            created = create.len(),
            deleted = delete_ids.len(),
            "callback uris updated"
        );
        Ok(application)
    }
}
