//! Account HTTP Handlers
//!
//! REST endpoints for account operations. Every response uses the
//! `{success, data, message}` envelope; failures go through
//! [`AccountError`]'s `IntoResponse`.

use crate::cookies::{get_cookie, REFRESH_COOKIE_NAME};
use crate::error::AccountError;
use crate::extractors::{ClientInfo, CurrentUser};
use crate::models::*;
use crate::service::AccountService;

use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Shared account service state
pub type AppState = Arc<AccountService>;

/// Mount point for every account route
pub const API_PREFIX: &str = "/api/v1/user";

/// Multipart framing allowance on top of the avatar size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(service: Arc<AccountService>) -> Router {
    let avatar_limit = service.config().avatar_max_bytes + MULTIPART_OVERHEAD;

    // Public routes (no authentication required)
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token));

    // Secured routes, each handler resolves the caller through `CurrentUser`
    let secured = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", post(current_user))
        .route("/update-account", patch(update_account))
        .route(
            "/avatar",
            patch(update_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        );

    Router::new()
        .nest(API_PREFIX, public.merge(secured))
        .with_state(service)
}

/// Serve uploaded files from `upload_dir` under `public_url`.
///
/// A `public_url` that is not a local path (e.g. a CDN origin) is left to
/// whatever serves it and the router is returned unchanged.
pub fn serve_uploads(router: Router, public_url: &str, upload_dir: impl AsRef<Path>) -> Router {
    let mount = public_url.trim_end_matches('/');
    if !mount.starts_with('/') {
        tracing::info!(public_url, "Uploads are served externally");
        return router;
    }

    router.nest_service(mount, ServeDir::new(upload_dir))
}

// ============================================
// Registration / Login
// ============================================

/// POST /register
pub async fn register(
    State(svc): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AccountError> {
    let Json(req) = payload?;
    let (user, pair) = svc.register(req).await?;

    tracing::info!(account_id = %user.id, ip = ?client.ip, "User registered");

    Ok((
        StatusCode::CREATED,
        svc.token_cookies(&pair),
        Json(ApiResponse::new(user, "User registered successfully")),
    ))
}

/// POST /login
pub async fn login(
    State(svc): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AccountError> {
    let Json(req) = payload?;
    let response = svc.login(req).await?;

    tracing::debug!(
        account_id = %response.user.id,
        ip = ?client.ip,
        user_agent = ?client.user_agent,
        "Login from client"
    );

    let cookies = svc.token_cookies(&TokenPair {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
    });

    Ok((
        cookies,
        Json(ApiResponse::new(response, "User loggedIn Successfully")),
    ))
}

/// POST /refresh-token
///
/// Reads the refresh token from the `refreshToken` cookie or the JSON body.
pub async fn refresh_token(
    State(svc): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AccountError> {
    let presented = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .or_else(|| {
            serde_json::from_slice::<RefreshTokenRequest>(&body)
                .ok()
                .and_then(|req| req.refresh_token)
        })
        .filter(|token| !token.trim().is_empty())
        .ok_or(AccountError::TokenInvalid)?;

    let pair = svc.refresh(&presented).await?;

    Ok((
        svc.token_cookies(&pair),
        Json(ApiResponse::new(pair, "Access token refreshed")),
    ))
}

// ============================================
// Secured Operations
// ============================================

/// POST /logout
pub async fn logout(
    State(svc): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AccountError> {
    svc.logout(&user).await?;

    Ok((
        svc.clear_cookies(),
        Json(ApiResponse::new(serde_json::json!({}), "User Logged Out")),
    ))
}

/// POST /change-password
pub async fn change_password(
    State(svc): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AccountError> {
    let Json(req) = payload?;
    svc.change_password(&user, req).await?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({}),
        "password changed successfully",
    )))
}

/// POST /current-user
pub async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::new(
        serde_json::json!({ "user": user }),
        "current user fetched successfully",
    ))
}

/// PATCH /update-account
pub async fn update_account(
    State(svc): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AccountError> {
    let Json(req) = payload?;
    let user = svc.update_account(&user, req).await?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "user": user }),
        "account details updated",
    )))
}

/// PATCH /avatar
///
/// Accepts a single `avatar` file field.
pub async fn update_avatar(
    State(svc): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AccountError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }

        let filename = field.file_name().unwrap_or("avatar").to_string();
        let content_type = field
            .content_type()
            .ok_or_else(|| AccountError::validation("No content type provided"))?
            .to_string();
        let data = field.bytes().await?.to_vec();

        let user = svc
            .update_avatar(&user, &filename, &content_type, data)
            .await?;

        return Ok(Json(ApiResponse::new(
            serde_json::json!({ "user": user }),
            "Avatar uploaded successfully",
        )));
    }

    Err(AccountError::validation("Avatar field is required"))
}
