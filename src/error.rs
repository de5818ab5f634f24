//! Account Service Error Types
//!
//! Centralized error handling for all account and session operations.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::errors::ErrorKind;

/// Account service errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicateIdentity(String),

    #[error("User not found")]
    NotFound,

    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("Unauthorized request")]
    Unauthenticated,

    #[error("Invalid refresh token")]
    TokenInvalid,

    #[error("Refresh token has expired")]
    TokenExpired,

    #[error("Refresh token is used or expired")]
    TokenReuseDetected,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AccountError {
    pub fn validation(message: impl Into<String>) -> Self {
        AccountError::Validation(message.into())
    }

    /// HTTP status code for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) | AccountError::DuplicateIdentity(_) => {
                StatusCode::BAD_REQUEST
            }
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::InvalidCredentials
            | AccountError::Unauthenticated
            | AccountError::TokenInvalid
            | AccountError::TokenExpired
            | AccountError::TokenReuseDetected => StatusCode::UNAUTHORIZED,
            AccountError::Database(_)
            | AccountError::Storage(_)
            | AccountError::Config(_)
            | AccountError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    pub fn public_message(&self) -> String {
        match self {
            AccountError::Database(_)
            | AccountError::Storage(_)
            | AccountError::Config(_)
            | AccountError::Internal => "Internal Server Error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (
            status,
            Json(serde_json::json!({
                "success": false,
                "message": self.public_message()
            })),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AccountError::DuplicateIdentity(
                    "there exists an user with the provided credentials".to_string(),
                );
            }
        }

        tracing::error!("Database error: {:?}", err);
        AccountError::Database(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AccountError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AccountError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err);
        match err.kind() {
            ErrorKind::ExpiredSignature => AccountError::TokenExpired,
            _ => AccountError::TokenInvalid,
        }
    }
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(err: validator::ValidationErrors) -> Self {
        AccountError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AccountError {
    fn from(err: JsonRejection) -> Self {
        AccountError::Validation(err.body_text())
    }
}

impl From<MultipartRejection> for AccountError {
    fn from(err: MultipartRejection) -> Self {
        AccountError::Validation(err.body_text())
    }
}

impl From<MultipartError> for AccountError {
    fn from(err: MultipartError) -> Self {
        AccountError::Validation(err.body_text())
    }
}

impl From<tokio::task::JoinError> for AccountError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AccountError::Internal
    }
}
