//! RustPress Accounts server
//!
//! Loads configuration from the environment, prepares the database and
//! serves the account API.

use rustpress_accounts::{
    create_routes, serve_uploads, AccountConfig, AccountService, LocalBlobStore, PgAccountStore,
    ServerConfig,
};

use axum::http::{header, HeaderValue, Method};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = ServerConfig::from_env()?;
    let config = AccountConfig::from_env()?;
    config.validate()?;

    let pool = PgPool::connect(&server.database_url).await?;
    let store = PgAccountStore::new(pool);
    store.migrate().await?;

    let blobs = LocalBlobStore::new(&server.upload_dir, &server.public_upload_url);
    let service = Arc::new(AccountService::new(
        Arc::new(store),
        Arc::new(blobs),
        config,
    ));

    let mut app = serve_uploads(
        create_routes(service),
        &server.public_upload_url,
        &server.upload_dir,
    );

    if let Some(origin) = &server.cors_origin {
        let cors = CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(&server.bind_address).await?;
    tracing::info!(address = %server.bind_address, "Account server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
