//! Storage trait definitions for identities, developer applications, and exchange tokens.
//!
//! Defines async storage interfaces for users, linked provider accounts, developer
//! applications and their callback URIs that can be implemented by various backend
//! providers, plus the synchronous exchange-token cache contract.

use crate::auth::providers::ProviderKind;
use crate::errors::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, StorageError>;

// ===== Entities =====

/// A local user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Link between a third-party provider account and a local user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub provider: ProviderKind,
    pub external_id: String,
    pub user_id: String,
}

/// Password credentials for debug/test users
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct PasswordAccount {
    pub user_id: String,
    /// bcrypt hash of the password
    pub password_hash: String,
}

/// An application registered by a user to consume AbandonAuth tokens
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct DeveloperApplication {
    /// Unique application id, also used as token audience
    pub id: String,
    /// Owning user
    pub owner_id: String,
    pub name: Option<String>,
    /// bcrypt hash of the application's refresh token
    pub refresh_token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Allowed redirect target for a developer application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackUri {
    pub id: String,
    pub developer_application_id: String,
    pub uri: String,
}

// ===== Storage Traits =====

/// Trait for storing and retrieving users and their linked accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Retrieve a user by ID
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Find the user linked to a provider account
    async fn find_user_by_external_account(
        &self,
        provider: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>>;

    /// Create a user together with its provider account link as one unit.
    ///
    /// If the provider account is already linked, nothing is created and the linked user is
    /// returned instead.
    async fn create_user_with_external_account(
        &self,
        user: &User,
        account: &ExternalAccount,
    ) -> Result<User>;

    /// Create a user together with its password account as one unit
    async fn create_user_with_password(&self, user: &User, account: &PasswordAccount)
    -> Result<()>;

    /// Retrieve the password account of a user
    async fn get_password_account(&self, user_id: &str) -> Result<Option<PasswordAccount>>;
}

/// Trait for storing and retrieving developer applications
#[async_trait]
pub trait DeveloperApplicationStore: Send + Sync {
    /// Store a new developer application
    async fn store_application(&self, application: &DeveloperApplication) -> Result<()>;

    /// Retrieve an application by ID
    async fn get_application(&self, application_id: &str)
    -> Result<Option<DeveloperApplication>>;

    /// Replace the refresh token hash of an existing application
    async fn update_refresh_token_hash(
        &self,
        application_id: &str,
        refresh_token_hash: &str,
    ) -> Result<DeveloperApplication>;

    /// Delete an application and its callback URIs, returning what was deleted
    async fn delete_application(
        &self,
        application_id: &str,
    ) -> Result<Option<DeveloperApplication>>;

    /// List applications owned by a user
    async fn list_applications_by_owner(&self, owner_id: &str)
    -> Result<Vec<DeveloperApplication>>;
}

/// Trait for storing and retrieving callback URIs
#[async_trait]
pub trait CallbackUriStore: Send + Sync {
    /// List the callback URIs registered for an application
    async fn list_callback_uris(&self, application_id: &str) -> Result<Vec<CallbackUri>>;

    /// Create and delete callback URIs in a single batch
    async fn sync_callback_uris(
        &self,
        application_id: &str,
        create: &[CallbackUri],
        delete_ids: &[String],
    ) -> Result<()>;
}

// ===== Exchange Token Cache =====

/// Registry of short-lived tokens that have not been burned.
///
/// Membership at the instant of `contains` is authoritative for that call; no ordering is
/// guaranteed across concurrent callers. Implementations are process-local unless they are
/// backed by a shared store.
pub trait ExchangeTokenCache: Send + Sync {
    /// Record a freshly minted short-lived token
    fn insert(&self, token: &str);

    /// Check whether a token is still live
    fn contains(&self, token: &str) -> bool;

    /// Burn a token, returning false if it was not present
    fn remove(&self, token: &str) -> bool;
}

// ===== Combined Storage Trait =====

/// Combined identity storage trait
pub trait IdentityStorage: UserStore + DeveloperApplicationStore + CallbackUriStore {}

impl<T> IdentityStorage for T where T: UserStore + DeveloperApplicationStore + CallbackUriStore {}
