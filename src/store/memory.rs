//! In-memory account store.
//!
//! Keeps everything in a map behind a single lock, so every trait call is
//! atomic. Nothing survives a restart.

use super::AccountStore;
use crate::error::AccountError;
use crate::models::{Account, NewAccount, ProfileChanges};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

/// First uniqueness violation against accounts other than `id`
fn conflict(
    accounts: &HashMap<Uuid, Account>,
    id: Uuid,
    email: Option<&str>,
    username: Option<&str>,
) -> Option<AccountError> {
    accounts.values().filter(|a| a.id != id).find_map(|other| {
        if email.is_some_and(|e| other.email == e) {
            Some(AccountError::DuplicateIdentity("Email already registered".into()))
        } else if username.is_some_and(|u| other.username.as_deref() == Some(u)) {
            Some(AccountError::DuplicateIdentity("Username already taken".into()))
        } else {
            None
        }
    })
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, AccountError> {
        let mut accounts = self.accounts.write().await;
        let id = Uuid::new_v4();

        if let Some(err) = conflict(&accounts, id, Some(&account.email), None) {
            return Err(err);
        }

        let now = Utc::now();
        let record = Account {
            id,
            username: None,
            email: account.email,
            full_name: account.full_name,
            password_hash: account.password_hash,
            avatar_url: None,
            refresh_token_id: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn find_by_full_name(&self, full_name: &str) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.full_name == full_name)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.accounts.write().await;

        if let Some(err) = conflict(
            &accounts,
            id,
            changes.email.as_deref(),
            changes.username.as_deref(),
        ) {
            return Err(err);
        }

        let Some(account) = accounts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(full_name) = changes.full_name {
            account.full_name = full_name;
        }
        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(username) = changes.username {
            account.username = Some(username);
        }
        account.updated_at = Utc::now();

        Ok(Some(account.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AccountError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, AccountError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|account| {
            account.avatar_url = Some(url.to_string());
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_id: Option<Uuid>,
    ) -> Result<(), AccountError> {
        if let Some(account) = self.accounts.write().await.get_mut(&id) {
            account.refresh_token_id = token_id;
        }
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        replacement: Uuid,
    ) -> Result<bool, AccountError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) if account.refresh_token_id == Some(expected) => {
                account.refresh_token_id = Some(replacement);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
