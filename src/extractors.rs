//! Account Extractors
//!
//! Axum extractors for the authenticated identity and request metadata.

use crate::cookies::{bearer_token, get_cookie, ACCESS_COOKIE_NAME};
use crate::error::AccountError;
use crate::handlers::AppState;
use crate::models::Identity;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Identity of the caller, resolved by the session guard.
///
/// The access token is taken from the `accessToken` cookie, falling back
/// to an `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AccountError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
            .or_else(|| bearer_token(&parts.headers));

        let identity = state.guard().authenticate(token.as_deref()).await?;
        Ok(CurrentUser(identity))
    }
}

/// Client information (IP, user agent)
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| {
                parts
                    .headers
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .map(String::from)
            });

        let user_agent = parts
            .headers
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .map(String::from);

        Ok(ClientInfo { ip, user_agent })
    }
}
