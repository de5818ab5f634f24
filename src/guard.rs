//! Session guard
//!
//! Turns an inbound access token into the caller's [`Identity`]. Every
//! failure collapses into [`AccountError::Unauthenticated`].

use crate::credentials::CredentialStore;
use crate::error::AccountError;
use crate::models::Identity;
use crate::tokens::TokenService;

use std::sync::Arc;

pub struct SessionGuard {
    tokens: Arc<TokenService>,
    credentials: CredentialStore,
}

impl SessionGuard {
    pub fn new(tokens: Arc<TokenService>, credentials: CredentialStore) -> Self {
        Self {
            tokens,
            credentials,
        }
    }

    /// Verify the access token and load the account it names
    pub async fn authenticate(&self, access_token: Option<&str>) -> Result<Identity, AccountError> {
        let token = access_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AccountError::Unauthenticated)?;

        let claims = self.tokens.verify_access(token).map_err(|e| {
            tracing::debug!("Access token rejected: {}", e);
            AccountError::Unauthenticated
        })?;

        let identity = self
            .credentials
            .find_public(claims.id)
            .await?
            .ok_or(AccountError::Unauthenticated)?;

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::tests::test_config;
    use crate::models::TokenClaims;
    use crate::store::MemoryAccountStore;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tokio_test::assert_err;
    use uuid::Uuid;

    struct Fixture {
        credentials: CredentialStore,
        tokens: Arc<TokenService>,
        guard: SessionGuard,
    }

    fn fixture() -> Fixture {
        let config = test_config();
        let credentials = CredentialStore::new(Arc::new(MemoryAccountStore::new()), &config);
        let tokens = Arc::new(TokenService::new(credentials.clone(), &config));
        let guard = SessionGuard::new(tokens.clone(), credentials.clone());
        Fixture {
            credentials,
            tokens,
            guard,
        }
    }

    #[tokio::test]
    async fn test_authenticate_resolves_identity() {
        let f = fixture();
        let account = f.credentials.register("a@x.com", "A", "p1").await.unwrap();
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        let identity = f.guard.authenticate(Some(pair.access_token.as_str())).await.unwrap();
        assert_eq!(identity.id, account.id);
        assert_eq!(identity.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token() {
        let f = fixture();

        let err = assert_err!(f.guard.authenticate(None).await);
        assert!(matches!(err, AccountError::Unauthenticated));

        let err = assert_err!(f.guard.authenticate(Some("  ")).await);
        assert!(matches!(err, AccountError::Unauthenticated));

        let err = assert_err!(f.guard.authenticate(Some("garbage")).await);
        assert!(matches!(err, AccountError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let f = fixture();
        let account = f.credentials.register("a@x.com", "A", "p1").await.unwrap();
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        let err = assert_err!(f.guard.authenticate(Some(pair.refresh_token.as_str())).await);
        assert!(matches!(err, AccountError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let f = fixture();
        let config = test_config();
        let account = f.credentials.register("a@x.com", "A", "p1").await.unwrap();

        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            id: account.id,
            full_name: account.full_name.clone(),
            iat: now - 7_200,
            exp: now - 3_600,
            iss: config.jwt_issuer.clone(),
            aud: config.jwt_audience.clone(),
            jti: Uuid::new_v4(),
        };
        let key = EncodingKey::from_secret(config.access_token_secret.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let err = assert_err!(f.guard.authenticate(Some(token.as_str())).await);
        assert!(matches!(err, AccountError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let f = fixture();
        let account = f.credentials.register("a@x.com", "A", "p1").await.unwrap();
        let pair = f.tokens.issue_pair(&account).await.unwrap();

        // Validly signed, but this store never held the account
        let other = fixture();
        let err = assert_err!(other.guard.authenticate(Some(pair.access_token.as_str())).await);
        assert!(matches!(err, AccountError::Unauthenticated));
    }
}
