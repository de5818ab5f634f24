//! Token service
//!
//! Issues and rotates access/refresh JWT pairs. Each kind is signed with its
//! own secret. The account's refresh slot holds the `jti` of the one live
//! refresh token; a refresh token is accepted only while its `jti` is in
//! the slot, and rotation replaces it with a compare-and-swap.

use crate::config::AccountConfig;
use crate::credentials::CredentialStore;
use crate::error::AccountError;
use crate::models::{Account, TokenClaims, TokenPair};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: i64,
}

impl SigningKeys {
    fn new(secret: &str, expiry: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        }
    }
}

/// Access/refresh token issuance and rotation
pub struct TokenService {
    credentials: CredentialStore,
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    audience: String,
    revoke_on_reuse: bool,
}

impl TokenService {
    pub fn new(credentials: CredentialStore, config: &AccountConfig) -> Self {
        Self {
            credentials,
            access: SigningKeys::new(&config.access_token_secret, config.access_token_expiry),
            refresh: SigningKeys::new(&config.refresh_token_secret, config.refresh_token_expiry),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            revoke_on_reuse: config.revoke_on_refresh_reuse,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access.expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh.expiry
    }

    // ============================================
    // Signing
    // ============================================

    fn sign(&self, account: &Account, keys: &SigningKeys) -> Result<(String, Uuid), AccountError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(keys.expiry);
        let jti = Uuid::new_v4();

        let claims = TokenClaims {
            id: account.id,
            full_name: account.full_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti,
        };

        let token = encode(&Header::default(), &claims, &keys.encoding).map_err(|e| {
            tracing::error!("Token signing failed: {:?}", e);
            AccountError::Internal
        })?;

        Ok((token, jti))
    }

    /// Sign a fresh pair without touching the slot
    fn mint_pair(&self, account: &Account) -> Result<(TokenPair, Uuid), AccountError> {
        let (access_token, _) = self.sign(account, &self.access)?;
        let (refresh_token, refresh_id) = self.sign(account, &self.refresh)?;

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            refresh_id,
        ))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = 0;
        validation
    }

    // ============================================
    // Issue / Verify
    // ============================================

    /// Issue a pair and make its refresh token the account's only live one.
    ///
    /// Any previous refresh token for the account stops working.
    pub async fn issue_pair(&self, account: &Account) -> Result<TokenPair, AccountError> {
        let (pair, refresh_id) = self.mint_pair(account)?;
        self.credentials
            .set_refresh_token(account.id, Some(refresh_id))
            .await?;

        tracing::debug!(account_id = %account.id, "Issued token pair");
        Ok(pair)
    }

    /// Check an access token's signature and expiry
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AccountError> {
        let data = decode::<TokenClaims>(token, &self.access.decoding, &self.validation())?;
        Ok(data.claims)
    }

    /// Check a refresh token's signature and expiry
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AccountError> {
        let data = decode::<TokenClaims>(token, &self.refresh.decoding, &self.validation())?;
        Ok(data.claims)
    }

    // ============================================
    // Rotation / Revocation
    // ============================================

    /// Exchange the current refresh token for a new pair
    pub async fn rotate(&self, presented: &str) -> Result<TokenPair, AccountError> {
        let claims = self.verify_refresh(presented)?;

        let account = self
            .credentials
            .find(claims.id)
            .await?
            .ok_or(AccountError::TokenInvalid)?;

        if account.refresh_token_id != Some(claims.jti) {
            return Err(self.reuse_detected(&account).await);
        }

        let (pair, refresh_id) = self.mint_pair(&account)?;

        // Two rotations racing on the same token: only one swap lands
        let swapped = self
            .credentials
            .swap_refresh_token(account.id, claims.jti, refresh_id)
            .await?;

        if !swapped {
            return Err(self.reuse_detected(&account).await);
        }

        tracing::debug!(account_id = %account.id, "Rotated refresh token");
        Ok(pair)
    }

    async fn reuse_detected(&self, account: &Account) -> AccountError {
        tracing::warn!(
            account_id = %account.id,
            revoke = self.revoke_on_reuse,
            "Refresh token reuse detected"
        );

        if self.revoke_on_reuse {
            if let Err(err) = self.credentials.set_refresh_token(account.id, None).await {
                return err;
            }
        }

        AccountError::TokenReuseDetected
    }

    /// Clear the account's refresh slot
    pub async fn revoke(&self, account_id: Uuid) -> Result<(), AccountError> {
        self.credentials.set_refresh_token(account_id, None).await?;
        tracing::debug!(account_id = %account_id, "Revoked refresh token");
        Ok(())
    }
}
