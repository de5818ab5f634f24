//! Account Service
//!
//! Wires the credential store, token service and session guard together
//! and exposes one method per account operation. Handlers stay thin and
//! only translate between HTTP and these calls.

use crate::blob::BlobStore;
use crate::config::AccountConfig;
use crate::cookies::CookiePolicy;
use crate::credentials::CredentialStore;
use crate::error::AccountError;
use crate::guard::SessionGuard;
use crate::models::*;
use crate::store::AccountStore;
use crate::tokens::TokenService;

use axum::http::HeaderMap;
use std::sync::Arc;
use validator::Validate;

/// Account service
pub struct AccountService {
    config: AccountConfig,
    credentials: CredentialStore,
    tokens: Arc<TokenService>,
    guard: SessionGuard,
    blobs: Arc<dyn BlobStore>,
    cookies: CookiePolicy,
}

impl AccountService {
    /// Create a new account service
    pub fn new(
        store: Arc<dyn AccountStore>,
        blobs: Arc<dyn BlobStore>,
        config: AccountConfig,
    ) -> Self {
        let credentials = CredentialStore::new(store, &config);
        let tokens = Arc::new(TokenService::new(credentials.clone(), &config));
        let guard = SessionGuard::new(tokens.clone(), credentials.clone());
        let cookies = CookiePolicy::new(config.cookie_secure);

        Self {
            config,
            credentials,
            tokens,
            guard,
            blobs,
            cookies,
        }
    }

    /// Get reference to config
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    // ============================================
    // Cookies
    // ============================================

    /// `Set-Cookie` headers carrying a freshly issued pair
    pub fn token_cookies(&self, pair: &TokenPair) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.cookies.set_tokens(
            &mut headers,
            &pair.access_token,
            self.tokens.access_token_expiry(),
            &pair.refresh_token,
            self.tokens.refresh_token_expiry(),
        );
        headers
    }

    /// `Set-Cookie` headers removing both token cookies
    pub fn clear_cookies(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.cookies.clear_tokens(&mut headers);
        headers
    }

    // ============================================
    // Registration / Login / Logout
    // ============================================

    /// Create an account and open its first session
    pub async fn register(
        &self,
        req: RegisterRequest,
    ) -> Result<(AccountResponse, TokenPair), AccountError> {
        let req = RegisterRequest {
            email: req.email.trim().to_string(),
            full_name: req.full_name.trim().to_string(),
            ..req
        };
        if req.email.is_empty() || req.full_name.is_empty() || req.password.trim().is_empty() {
            return Err(AccountError::validation("All fields are required"));
        }
        req.validate()?;

        let account = self
            .credentials
            .register(&req.email, &req.full_name, &req.password)
            .await?;
        let pair = self.tokens.issue_pair(&account).await?;

        Ok((account.into(), pair))
    }

    /// Check credentials and issue a new pair, replacing any older session
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AccountError> {
        let account = self
            .credentials
            .authenticate(&req.email, &req.password)
            .await?;
        let pair = self.tokens.issue_pair(&account).await?;

        tracing::info!(account_id = %account.id, "User logged in");

        Ok(LoginResponse {
            user: account.into(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    pub async fn logout(&self, identity: &Identity) -> Result<(), AccountError> {
        self.tokens.revoke(identity.id).await?;
        tracing::info!(account_id = %identity.id, "User logged out");
        Ok(())
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AccountError> {
        self.tokens.rotate(refresh_token).await
    }

    // ============================================
    // Account Management
    // ============================================

    pub async fn change_password(
        &self,
        identity: &Identity,
        req: ChangePasswordRequest,
    ) -> Result<(), AccountError> {
        self.credentials
            .change_password(identity.id, &req.old_password, &req.new_password)
            .await
    }

    pub async fn update_account(
        &self,
        identity: &Identity,
        req: UpdateAccountRequest,
    ) -> Result<AccountResponse, AccountError> {
        let req = UpdateAccountRequest {
            email: req.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            ..req
        };
        req.validate()?;

        self.credentials
            .update_profile(
                identity.id,
                req.full_name.as_deref(),
                req.email.as_deref(),
                req.username.as_deref(),
            )
            .await
    }

    /// Store an avatar image in the blob store and record its URL
    pub async fn update_avatar(
        &self,
        identity: &Identity,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<AccountResponse, AccountError> {
        if data.is_empty() {
            return Err(AccountError::validation("Avatar field is required"));
        }

        if !content_type.starts_with("image/") {
            return Err(AccountError::Validation(format!(
                "File type '{}' not allowed for avatars",
                content_type
            )));
        }

        if data.len() > self.config.avatar_max_bytes {
            return Err(AccountError::Validation(format!(
                "File too large. Max size: {} bytes",
                self.config.avatar_max_bytes
            )));
        }

        let url = self.blobs.put(filename, content_type, data).await?;
        if url.trim().is_empty() {
            return Err(AccountError::validation("avatar-url not found"));
        }

        let account = self.credentials.set_avatar(identity.id, &url).await?;
        tracing::info!(account_id = %identity.id, "Avatar updated");
        Ok(account)
    }
}
