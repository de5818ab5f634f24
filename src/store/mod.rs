//! Account storage
//!
//! The [`AccountStore`] trait is the only way account rows are read or
//! written. [`PgAccountStore`] is the production backend and
//! [`MemoryAccountStore`] backs tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

use crate::error::AccountError;
use crate::models::{Account, NewAccount, ProfileChanges};

use async_trait::async_trait;
use uuid::Uuid;

/// Storage operations over account records
///
/// Implementations must enforce email uniqueness and username uniqueness
/// at write time, reporting violations as [`AccountError::DuplicateIdentity`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account with an empty refresh slot
    async fn insert(&self, account: NewAccount) -> Result<Account, AccountError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;

    async fn find_by_full_name(&self, full_name: &str) -> Result<Option<Account>, AccountError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError>;

    /// Apply the supplied fields, returning `None` if the account is gone
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Account>, AccountError>;

    /// Replace the password hash; `false` if the account is gone
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AccountError>;

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, AccountError>;

    /// Unconditionally overwrite (or clear) the refresh slot
    async fn set_refresh_token(&self, id: Uuid, token_id: Option<Uuid>) -> Result<(), AccountError>;

    /// Overwrite the refresh slot only if it still holds `expected`.
    ///
    /// Returns `true` when the swap happened.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        replacement: Uuid,
    ) -> Result<bool, AccountError>;
}
