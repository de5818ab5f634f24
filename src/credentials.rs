//! Credential store
//!
//! Owns account records on top of an [`AccountStore`]: input normalization,
//! uniqueness checks and Argon2id password hashing. Plaintext passwords go
//! through [`CredentialStore::hash_password`] and are dropped right after.

use crate::config::AccountConfig;
use crate::error::AccountError;
use crate::models::{Account, AccountResponse, NewAccount, ProfileChanges};
use crate::store::AccountStore;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use std::sync::Arc;
use uuid::Uuid;

/// Argon2 cost parameters, fixed for the lifetime of the store
#[derive(Debug, Clone, Copy)]
struct HashCost {
    memory: u32,
    time: u32,
    parallelism: u32,
}

impl HashCost {
    fn hasher(&self) -> Result<Argon2<'static>, AccountError> {
        let params = Params::new(self.memory, self.time, self.parallelism, None)
            .map_err(|_| AccountError::Internal)?;

        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }
}

/// Account persistence plus password handling
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn AccountStore>,
    cost: HashCost,
    duplicate_check_full_name: bool,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn AccountStore>, config: &AccountConfig) -> Self {
        Self {
            store,
            cost: HashCost {
                memory: config.argon2_memory_cost,
                time: config.argon2_time_cost,
                parallelism: config.argon2_parallelism,
            },
            duplicate_check_full_name: config.duplicate_check_full_name,
        }
    }

    // ============================================
    // Password Hashing
    // ============================================

    /// Hash a password using Argon2id on the blocking pool
    pub async fn hash_password(&self, password: &str) -> Result<String, AccountError> {
        let hasher = self.cost.hasher()?;
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let hash = hasher.hash_password(password.as_bytes(), &salt)?.to_string();
            Ok::<_, AccountError>(hash)
        })
        .await?
    }

    /// Check `candidate` against the account's stored hash
    pub async fn verify_password(
        &self,
        account: &Account,
        candidate: &str,
    ) -> Result<bool, AccountError> {
        let hasher = self.cost.hasher()?;
        let hash = account.password_hash.clone();
        let candidate = candidate.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash).map_err(|_| AccountError::Internal)?;
            Ok::<_, AccountError>(
                hasher
                    .verify_password(candidate.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await?
    }

    // ============================================
    // Registration / Login
    // ============================================

    /// Create an account after validating and hashing the password
    pub async fn register(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<Account, AccountError> {
        let email = normalize(email);
        let full_name = full_name.trim();

        if email.is_empty() || full_name.is_empty() || password.trim().is_empty() {
            return Err(AccountError::validation("All fields are required"));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AccountError::DuplicateIdentity(
                "there exists an user with the provided credentials".to_string(),
            ));
        }

        if self.duplicate_check_full_name
            && self.store.find_by_full_name(full_name).await?.is_some()
        {
            return Err(AccountError::DuplicateIdentity(
                "there exists an user with the provided credentials".to_string(),
            ));
        }

        let password_hash = self.hash_password(password).await?;

        let account = self
            .store
            .insert(NewAccount {
                email,
                full_name: full_name.to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Look up an account by email and check its password
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let email = normalize(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::validation("Email and password are required"));
        }

        let account = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::NotFound)?;

        if !self.verify_password(&account, password).await? {
            tracing::info!(account_id = %account.id, "Rejected login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(account)
    }

    // ============================================
    // Account Updates
    // ============================================

    /// Apply supplied profile fields; blank values count as not supplied
    pub async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<AccountResponse, AccountError> {
        let changes = ProfileChanges {
            full_name: full_name.map(str::trim).filter(|v| !v.is_empty()).map(String::from),
            email: email.map(normalize).filter(|v| !v.is_empty()),
            username: username.map(normalize).filter(|v| !v.is_empty()),
        };

        if changes.is_empty() {
            return Err(AccountError::validation("At least one field is required"));
        }

        if let Some(username) = &changes.username {
            if let Some(other) = self.store.find_by_username(username).await? {
                if other.id != id {
                    return Err(AccountError::DuplicateIdentity(
                        "Username already taken".to_string(),
                    ));
                }
            }
        }

        if let Some(email) = &changes.email {
            if let Some(other) = self.store.find_by_email(email).await? {
                if other.id != id {
                    return Err(AccountError::DuplicateIdentity(
                        "Email already registered".to_string(),
                    ));
                }
            }
        }

        let account = self
            .store
            .update_profile(id, changes)
            .await?
            .ok_or(AccountError::NotFound)?;

        Ok(account.into())
    }

    /// Replace the password after checking the current one
    pub async fn change_password(
        &self,
        id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if old_password.is_empty() || new_password.trim().is_empty() {
            return Err(AccountError::validation("All fields are required"));
        }

        let account = self.find(id).await?.ok_or(AccountError::NotFound)?;

        if !self.verify_password(&account, old_password).await? {
            return Err(AccountError::InvalidCredentials);
        }

        let password_hash = self.hash_password(new_password).await?;
        if !self.store.set_password_hash(id, &password_hash).await? {
            return Err(AccountError::NotFound);
        }

        tracing::info!(account_id = %id, "Password changed");
        Ok(())
    }

    pub async fn set_avatar(&self, id: Uuid, url: &str) -> Result<AccountResponse, AccountError> {
        let account = self
            .store
            .set_avatar(id, url)
            .await?
            .ok_or(AccountError::NotFound)?;
        Ok(account.into())
    }

    // ============================================
    // Refresh Slot
    // ============================================

    pub async fn set_refresh_token(
        &self,
        id: Uuid,
        token_id: Option<Uuid>,
    ) -> Result<(), AccountError> {
        self.store.set_refresh_token(id, token_id).await
    }

    pub async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        replacement: Uuid,
    ) -> Result<bool, AccountError> {
        self.store.swap_refresh_token(id, expected, replacement).await
    }

    // ============================================
    // Lookups
    // ============================================

    /// Full record, including credentials; stays inside the crate's services
    pub async fn find(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        self.store.find_by_id(id).await
    }

    /// Public projection of an account
    pub async fn find_public(&self, id: Uuid) -> Result<Option<AccountResponse>, AccountError> {
        Ok(self.store.find_by_id(id).await?.map(AccountResponse::from))
    }
}

/// Lower-case and trim an identifier
fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}
