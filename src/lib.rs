//! RustPress Accounts
//!
//! User account service for RustPress providing:
//! - Account registration and login
//! - Argon2id password hashing
//! - JWT access/refresh token pairs with a single refresh slot per account
//! - Refresh token rotation with reuse detection
//! - Profile and avatar updates
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `ACCESS_TOKEN_SECRET` - Secret for signing access tokens (required, min 32 chars)
//! - `REFRESH_TOKEN_SECRET` - Secret for signing refresh tokens (required, min 32 chars)
//! - `ACCESS_TOKEN_EXPIRY` - Access token lifetime, e.g. `900`, `15m` (default: 15m)
//! - `REFRESH_TOKEN_EXPIRY` - Refresh token lifetime (default: 10d)
//! - `JWT_ISSUER` - JWT issuer claim (default: "rustpress-accounts")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "rustpress-accounts-api")
//! - `ARGON2_MEMORY_COST`, `ARGON2_TIME_COST`, `ARGON2_PARALLELISM` - hashing cost
//! - `COOKIE_SECURE` - Mark token cookies `Secure` (default: true)
//! - `DUPLICATE_CHECK_FULL_NAME` - Reject registrations reusing a full name (default: false)
//! - `REVOKE_ON_REFRESH_REUSE` - Clear the refresh slot on detected reuse (default: true)
//! - `AVATAR_MAX_BYTES` - Largest accepted avatar upload (default: 5 MiB)
//! - `DATABASE_URL` - PostgreSQL connection string (required by the binary)
//! - `UPLOAD_DIR` - Directory avatars are written to (default: "public/uploads")
//! - `PUBLIC_UPLOAD_URL` - URL prefix stored for avatars; served from `UPLOAD_DIR`
//!   when it is a local path (default: "/uploads")
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_accounts::{AccountConfig, AccountService, LocalBlobStore, PgAccountStore};
//!
//! let store = PgAccountStore::new(pool);
//! store.migrate().await?;
//!
//! let service = Arc::new(AccountService::new(
//!     Arc::new(store),
//!     Arc::new(LocalBlobStore::new("public/uploads", "/uploads")),
//!     AccountConfig::from_env()?,
//! ));
//! let app = rustpress_accounts::create_routes(service);
//! ```

pub mod blob;
pub mod config;
pub mod cookies;
pub mod credentials;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod service;
pub mod store;
pub mod tokens;

// Re-export commonly used types
pub use blob::{BlobStore, LocalBlobStore};
pub use config::{AccountConfig, ServerConfig};
pub use credentials::CredentialStore;
pub use error::AccountError;
pub use extractors::{ClientInfo, CurrentUser};
pub use guard::SessionGuard;
pub use handlers::{serve_uploads, AppState, API_PREFIX};
pub use models::*;
pub use service::AccountService;
pub use store::{AccountStore, MemoryAccountStore, PgAccountStore};
pub use tokens::TokenService;

use axum::Router;
use std::sync::Arc;

/// Create account routes
///
/// All endpoints are mounted under [`API_PREFIX`].
pub fn create_routes(service: Arc<AccountService>) -> Router {
    handlers::create_routes(service)
}
