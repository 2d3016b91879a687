//! In-memory identity storage implementation
//!
//! This module provides in-memory implementations for user, developer application,
//! and callback URI storage traits. Related tables share one lock so multi-table writes
//! are applied as a unit.

use crate::auth::providers::ProviderKind;
use crate::errors::StorageError;
use crate::storage::traits::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct IdentityTables {
    users: HashMap<String, User>,
    external_accounts: HashMap<(ProviderKind, String), ExternalAccount>,
    password_accounts: HashMap<String, PasswordAccount>,
}

#[derive(Default)]
struct ApplicationTables {
    applications: HashMap<String, DeveloperApplication>,
    callback_uris: HashMap<String, CallbackUri>, // callback uri id -> uri
}

/// In-memory implementation for identity storage
#[derive(Default)]
pub struct MemoryIdentityStorage {
    identities: Mutex<IdentityTables>,
    applications: Mutex<ApplicationTables>,
}

impl MemoryIdentityStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn identities(&self) -> Result<MutexGuard<'_, IdentityTables>> {
        self.identities
            .lock()
            .map_err(|e| StorageError::LockFailed(format!("Lock error: {}", e)))
    }

    fn applications(&self) -> Result<MutexGuard<'_, ApplicationTables>> {
        self.applications
            .lock()
            .map_err(|e| StorageError::LockFailed(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl UserStore for MemoryIdentityStorage {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let tables = self.identities()?;
        Ok(tables.users.get(user_id).cloned())
    }

    async fn find_user_by_external_account(
        &self,
        provider: ProviderKind,
        external_id: &str,
    ) -> Result<Option<User>> {
        let tables = self.identities()?;
        Ok(tables
            .external_accounts
            .get(&(provider, external_id.to_string()))
            .and_then(|account| tables.users.get(&account.user_id))
            .cloned())
    }

    async fn create_user_with_external_account(
        &self,
        user: &User,
        account: &ExternalAccount,
    ) -> Result<User> {
        let mut tables = self.identities()?;

        let key = (account.provider, account.external_id.clone());
        if let Some(existing) = tables.external_accounts.get(&key) {
            return tables.users.get(&existing.user_id).cloned().ok_or_else(|| {
                StorageError::InvalidData(format!(
                    "external account linked to missing user {}",
                    existing.user_id
                ))
            });
        }

        if account.user_id != user.id {
            return Err(StorageError::InvalidData(
                "external account must link to the user being created".to_string(),
            ));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StorageError::Conflict(format!("user {} already exists", user.id)));
        }

        tables.users.insert(user.id.clone(), user.clone());
        tables.external_accounts.insert(key, account.clone());
        Ok(user.clone())
    }

    async fn create_user_with_password(
        &self,
        user: &User,
        account: &PasswordAccount,
    ) -> Result<()> {
        let mut tables = self.identities()?;

        if account.user_id != user.id {
            return Err(StorageError::InvalidData(
                "password account must belong to the user being created".to_string(),
            ));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StorageError::Conflict(format!("user {} already exists", user.id)));
        }

        tables.users.insert(user.id.clone(), user.clone());
        tables
            .password_accounts
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }

    async fn get_password_account(&self, user_id: &str) -> Result<Option<PasswordAccount>> {
        let tables = self.identities()?;
        Ok(tables.password_accounts.get(user_id).cloned())
    }
}

#[async_trait]
impl DeveloperApplicationStore for MemoryIdentityStorage {
    async fn store_application(&self, application: &DeveloperApplication) -> Result<()> {
        let mut tables = self.applications()?;
        if tables.applications.contains_key(&application.id) {
            return Err(StorageError::Conflict(format!(
                "developer application {} already exists",
                application.id
            )));
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(())
    }

    async fn get_application(
        &self,
        application_id: &str,
    ) -> Result<Option<DeveloperApplication>> {
        let tables = self.applications()?;
        Ok(tables.applications.get(application_id).cloned())
    }

    async fn update_refresh_token_hash(
        &self,
        application_id: &str,
        refresh_token_hash: &str,
    ) -> Result<DeveloperApplication> {
        let mut tables = self.applications()?;
        let application = tables
            .applications
            .get_mut(application_id)
            .ok_or_else(|| StorageError::NotFound(application_id.to_string()))?;
        application.refresh_token_hash = refresh_token_hash.to_string();
        Ok(application.clone())
    }

    async fn delete_application(
        &self,
        application_id: &str,
    ) -> Result<Option<DeveloperApplication>> {
        let mut tables = self.applications()?;
        let deleted = tables.applications.remove(application_id);
        if deleted.is_some() {
            tables
                .callback_uris
                .retain(|_, uri| uri.developer_application_id != application_id);
        }
        Ok(deleted)
    }

    async fn list_applications_by_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<DeveloperApplication>> {
        let tables = self.applications()?;
        let mut result: Vec<_> = tables
            .applications
            .values()
            .filter(|application| application.owner_id == owner_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(result)
    }
}

#[async_trait]
impl CallbackUriStore for MemoryIdentityStorage {
    async fn list_callback_uris(&self, application_id: &str) -> Result<Vec<CallbackUri>> {
        let tables = self.applications()?;
        let mut result: Vec<_> = tables
            .callback_uris
            .values()
            .filter(|uri| uri.developer_application_id == application_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(result)
    }

    async fn sync_callback_uris(
        &self,
        application_id: &str,
        create: &[CallbackUri],
        delete_ids: &[String],
    ) -> Result<()> {
        let mut tables = self.applications()?;

        if !tables.applications.contains_key(application_id) {
            return Err(StorageError::NotFound(application_id.to_string()));
        }
        // Validate the whole batch before touching anything
        for uri in create {
            if uri.developer_application_id != application_id {
                return Err(StorageError::InvalidData(format!(
                    "callback uri {} belongs to another application",
                    uri.id
                )));
            }
        }
        for id in delete_ids {
            match tables.callback_uris.get(id) {
                Some(uri) if uri.developer_application_id == application_id => {}
                _ => return Err(StorageError::NotFound(format!("callback uri {}", id))),
            }
        }

        for id in delete_ids {
            tables.callback_uris.remove(id);
        }
        for uri in create {
            tables.callback_uris.insert(uri.id.clone(), uri.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
        }
    }

    fn application(id: &str, owner_id: &str) -> DeveloperApplication {
        DeveloperApplication {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            name: None,
            refresh_token_hash: "hash".to_string(),
            created_at: Utc::now(),
        }
    }

    fn callback(id: &str, application_id: &str, uri: &str) -> CallbackUri {
        CallbackUri {
            id: id.to_string(),
            developer_application_id: application_id.to_string(),
            uri: uri.to_string(),
        }
    }

    #[tokio::test]
    async fn test_external_account_link_is_created_once() {
        let storage = MemoryIdentityStorage::new();
        let account = ExternalAccount {
            provider: ProviderKind::Github,
            external_id: "42".to_string(),
            user_id: "u1".to_string(),
        };

        let created = storage
            .create_user_with_external_account(&user("u1", "octocat"), &account)
            .await
            .unwrap();
        assert_eq!(created.id, "u1");

        // A second creation for the same provider account returns the linked user
        let second_account = ExternalAccount {
            user_id: "u2".to_string(),
            ..account.clone()
        };
        let existing = storage
            .create_user_with_external_account(&user("u2", "octocat"), &second_account)
            .await
            .unwrap();
        assert_eq!(existing.id, "u1");
        assert!(storage.get_user("u2").await.unwrap().is_none());

        let found = storage
            .find_user_by_external_account(ProviderKind::Github, "42")
            .await
            .unwrap();
        assert_eq!(found, Some(user("u1", "octocat")));

        // Same external id on another provider is a different identity
        assert!(
            storage
                .find_user_by_external_account(ProviderKind::Discord, "42")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_mismatched_link_creates_nothing() {
        let storage = MemoryIdentityStorage::new();
        let account = ExternalAccount {
            provider: ProviderKind::Google,
            external_id: "sub-1".to_string(),
            user_id: "someone-else".to_string(),
        };

        let result = storage
            .create_user_with_external_account(&user("u1", "name"), &account)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidData(_))));
        assert!(storage.get_user("u1").await.unwrap().is_none());
        assert!(
            storage
                .find_user_by_external_account(ProviderKind::Google, "sub-1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_application_cascades_callback_uris() {
        let storage = MemoryIdentityStorage::new();
        storage.store_application(&application("a1", "u1")).await.unwrap();
        storage
            .sync_callback_uris("a1", &[callback("c1", "a1", "https://a/cb")], &[])
            .await
            .unwrap();

        let deleted = storage.delete_application("a1").await.unwrap();
        assert_eq!(deleted.map(|a| a.id), Some("a1".to_string()));
        assert!(storage.list_callback_uris("a1").await.unwrap().is_empty());
        assert!(storage.delete_application("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_callback_uris_is_all_or_nothing() {
        let storage = MemoryIdentityStorage::new();
        storage.store_application(&application("a1", "u1")).await.unwrap();
        storage
            .sync_callback_uris("a1", &[callback("c1", "a1", "https://a/cb")], &[])
            .await
            .unwrap();

        let result = storage
            .sync_callback_uris(
                "a1",
                &[callback("c2", "a1", "https://b/cb")],
                &["missing".to_string()],
            )
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        let uris = storage.list_callback_uris("a1").await.unwrap();
        assert_eq!(uris, vec![callback("c1", "a1", "https://a/cb")]);
    }

    #[tokio::test]
    async fn test_update_refresh_token_hash_requires_application() {
        let storage = MemoryIdentityStorage::new();
        let result = storage.update_refresh_token_hash("missing", "hash").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
