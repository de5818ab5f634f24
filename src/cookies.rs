//! Token cookies
//!
//! Builds the `Set-Cookie` values for the `accessToken` and `refreshToken`
//! cookies and reads cookies back out of request headers.

use axum::http::{header, HeaderMap, HeaderValue};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Attribute set shared by every token cookie
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Script-inaccessible cookie living for `max_age` seconds
    pub fn build(&self, name: &str, value: &str, max_age: i64) -> String {
        let same_site = if self.secure { "None" } else { "Lax" };
        let mut cookie = format!(
            "{name}={value}; Path=/; Max-Age={}; HttpOnly; SameSite={same_site}",
            max_age.max(0)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Expired, empty cookie that makes the browser drop `name`
    pub fn clear(&self, name: &str) -> String {
        self.build(name, "", 0)
    }

    /// Append both token cookies to `headers`
    pub fn set_tokens(
        &self,
        headers: &mut HeaderMap,
        access_token: &str,
        access_max_age: i64,
        refresh_token: &str,
        refresh_max_age: i64,
    ) {
        append(headers, self.build(ACCESS_COOKIE_NAME, access_token, access_max_age));
        append(headers, self.build(REFRESH_COOKIE_NAME, refresh_token, refresh_max_age));
    }

    /// Append clearing cookies for both tokens to `headers`
    pub fn clear_tokens(&self, headers: &mut HeaderMap) {
        append(headers, self.clear(ACCESS_COOKIE_NAME));
        append(headers, self.clear(REFRESH_COOKIE_NAME));
    }
}

fn append(headers: &mut HeaderMap, cookie: String) {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Dropping unencodable cookie: {:?}", e),
    }
}

/// Value of the named cookie from the request's `Cookie` headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
