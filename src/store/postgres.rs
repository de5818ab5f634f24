//! PostgreSQL account store.

use super::AccountStore;
use crate::error::AccountError;
use crate::models::{Account, NewAccount, ProfileChanges};

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Account store backed by a PostgreSQL `accounts` table
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the accounts table and its indexes if missing
    pub async fn migrate(&self) -> Result<(), AccountError> {
        tracing::info!("Running account database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username VARCHAR(50) UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                avatar_url VARCHAR(1000),
                refresh_token_id UUID,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_accounts_full_name ON accounts(full_name);")
            .execute(&self.db)
            .await?;

        tracing::info!("Account migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: NewAccount) -> Result<Account, AccountError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, full_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&account.email)
        .bind(&account.full_name)
        .bind(&account.password_hash)
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_full_name(&self, full_name: &str) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE full_name = $1 LIMIT 1")
            .bind(full_name)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as("SELECT * FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(account)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as(
            r#"
            UPDATE accounts SET
                full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                username = COALESCE($4, username),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.full_name)
        .bind(changes.email)
        .bind(changes.username)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AccountError> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, AccountError> {
        let account = sqlx::query_as(
            "UPDATE accounts SET avatar_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(url)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_id: Option<Uuid>,
    ) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE accounts SET refresh_token_id = $2 WHERE id = $1")
            .bind(id)
            .bind(token_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(account_id = %id, "Refresh slot write matched no account");
        }

        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        replacement: Uuid,
    ) -> Result<bool, AccountError> {
        let result = sqlx::query(
            "UPDATE accounts SET refresh_token_id = $3 WHERE id = $1 AND refresh_token_id = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(replacement)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
