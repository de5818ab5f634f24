//! End-to-end tests of the account routes over the in-memory store.

use rustpress_accounts::{
    create_routes, serve_uploads, AccountConfig, AccountError, AccountService, BlobStore,
    LocalBlobStore, MemoryAccountStore,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Blob store keeping uploads in memory
#[derive(Default)]
struct MemoryBlobStore {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, AccountError> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| AccountError::Storage("poisoned".into()))?;
        files.push((filename.to_string(), data));
        Ok(format!("memory://uploads/{}", files.len()))
    }
}

struct TestApp {
    router: Router,
    blobs: Arc<MemoryBlobStore>,
}

struct TestResponse {
    status: StatusCode,
    cookies: Vec<String>,
    body: Value,
}

impl TestResponse {
    fn cookie(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}=");
        self.cookies.iter().find(|c| c.starts_with(&prefix)).map(String::as_str)
    }
}

fn test_config() -> AccountConfig {
    AccountConfig {
        argon2_memory_cost: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        cookie_secure: false,
        avatar_max_bytes: 1024,
        ..AccountConfig::new("a".repeat(32), "r".repeat(32))
    }
}

fn test_app() -> TestApp {
    let blobs = Arc::new(MemoryBlobStore::default());
    let service = Arc::new(AccountService::new(
        Arc::new(MemoryAccountStore::new()),
        blobs.clone(),
        test_config(),
    ));

    TestApp {
        router: create_routes(service),
        blobs,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            cookies,
            body,
        }
    }

    async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        self.json_request(Method::POST, path, body, None).await
    }

    async fn json_request(
        &self,
        method: Method,
        path: &str,
        body: Value,
        access_token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1/user{path}"))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn register(&self, email: &str, full_name: &str, password: &str) -> TestResponse {
        self.post_json(
            "/register",
            json!({ "email": email, "fullName": full_name, "password": password }),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json("/login", json!({ "email": email, "password": password }))
            .await
    }
}

fn tokens_of(response: &TestResponse) -> (String, String) {
    let data = &response.body["data"];
    (
        data["accessToken"].as_str().unwrap().to_string(),
        data["refreshToken"].as_str().unwrap().to_string(),
    )
}

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"--XBOUNDARY\r\n");
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
    body
}

fn avatar_request(access_token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::PATCH)
        .uri("/api/v1/user/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=XBOUNDARY",
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_register_login_rotate_and_reuse() {
    let app = test_app();

    let registered = app.register("A@X.com", "A", "p1").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["success"], true);
    assert_eq!(registered.body["data"]["email"], "a@x.com");
    assert!(registered.body["data"].get("passwordHash").is_none());
    assert!(registered.cookie("accessToken").is_some());
    assert!(registered.cookie("refreshToken").is_some());

    let login = app.login("a@x.com", "p1").await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["message"], "User loggedIn Successfully");
    assert_eq!(login.body["data"]["user"]["fullName"], "A");
    let (_, refresh) = tokens_of(&login);

    let rotated = app
        .post_json("/refresh-token", json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(rotated.status, StatusCode::OK);
    let (_, new_refresh) = tokens_of(&rotated);
    assert_ne!(new_refresh, refresh);
    assert!(rotated
        .cookie("refreshToken")
        .unwrap()
        .starts_with(&format!("refreshToken={new_refresh};")));

    let reused = app
        .post_json("/refresh-token", json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reused.body["success"], false);
    assert_eq!(reused.body["message"], "Refresh token is used or expired");

    // reuse cleared the slot, so the legitimate holder is logged out too
    let after_reuse = app
        .post_json("/refresh-token", json!({ "refreshToken": new_refresh }))
        .await;
    assert_eq!(after_reuse.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_reads_cookie() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    let (_, refresh) = tokens_of(&app.login("a@x.com", "p1").await);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/refresh-token")
        .header(header::COOKIE, format!("refreshToken={refresh}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);

    let missing = app.post_json("/refresh-token", json!({})).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_by_cookie_and_bearer() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    let (access, refresh) = tokens_of(&app.login("a@x.com", "p1").await);

    let by_bearer = app
        .json_request(Method::POST, "/current-user", json!({}), Some(&access))
        .await;
    assert_eq!(by_bearer.status, StatusCode::OK);
    assert_eq!(by_bearer.body["data"]["user"]["email"], "a@x.com");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/current-user")
        .header(header::COOKIE, format!("theme=dark; accessToken={access}"))
        .body(Body::empty())
        .unwrap();
    let by_cookie = app.send(request).await;
    assert_eq!(by_cookie.status, StatusCode::OK);

    let anonymous = app
        .json_request(Method::POST, "/current-user", json!({}), None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["message"], "Unauthorized request");

    let wrong_kind = app
        .json_request(Method::POST, "/current-user", json!({}), Some(&refresh))
        .await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    let (access, refresh) = tokens_of(&app.login("a@x.com", "p1").await);

    let logout = app
        .json_request(Method::POST, "/logout", json!({}), Some(&access))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "User Logged Out");
    assert!(logout.cookie("accessToken").unwrap().contains("Max-Age=0"));
    assert!(logout.cookie("refreshToken").unwrap().contains("Max-Age=0"));

    let refreshed = app
        .post_json("/refresh-token", json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    let (access, _) = tokens_of(&app.login("a@x.com", "p1").await);

    let wrong = app
        .json_request(
            Method::POST,
            "/change-password",
            json!({ "oldPassword": "nope", "newPassword": "p2" }),
            Some(&access),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let changed = app
        .json_request(
            Method::POST,
            "/change-password",
            json!({ "oldPassword": "p1", "newPassword": "p2" }),
            Some(&access),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    assert_eq!(app.login("a@x.com", "p1").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("a@x.com", "p2").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_account() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    app.register("b@x.com", "B", "p1").await;
    let (access, _) = tokens_of(&app.login("a@x.com", "p1").await);

    let updated = app
        .json_request(
            Method::PATCH,
            "/update-account",
            json!({ "fullName": "Alice", "username": "Alice01" }),
            Some(&access),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["user"]["fullName"], "Alice");
    assert_eq!(updated.body["data"]["user"]["username"], "alice01");

    let taken = app
        .json_request(
            Method::PATCH,
            "/update-account",
            json!({ "email": "b@x.com" }),
            Some(&access),
        )
        .await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken.body["success"], false);

    let empty = app
        .json_request(Method::PATCH, "/update-account", json!({}), Some(&access))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_avatar_upload() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;
    let (access, _) = tokens_of(&app.login("a@x.com", "p1").await);

    let uploaded = app
        .send(avatar_request(
            &access,
            multipart_body("avatar", "me.png", "image/png", &[1, 2, 3]),
        ))
        .await;
    assert_eq!(uploaded.status, StatusCode::OK);
    assert_eq!(
        uploaded.body["data"]["user"]["avatarUrl"],
        "memory://uploads/1"
    );
    assert_eq!(app.blobs.files.lock().unwrap()[0].1, vec![1, 2, 3]);

    let not_image = app
        .send(avatar_request(
            &access,
            multipart_body("avatar", "notes.txt", "text/plain", b"hello"),
        ))
        .await;
    assert_eq!(not_image.status, StatusCode::BAD_REQUEST);

    let wrong_field = app
        .send(avatar_request(
            &access,
            multipart_body("picture", "me.png", "image/png", &[1]),
        ))
        .await;
    assert_eq!(wrong_field.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_field.body["message"], "Avatar field is required");

    assert_eq!(app.blobs.files.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_uploaded_avatar_is_served() {
    let dir = std::env::temp_dir().join(format!("rustpress-accounts-{}", uuid::Uuid::new_v4()));
    let service = Arc::new(AccountService::new(
        Arc::new(MemoryAccountStore::new()),
        Arc::new(LocalBlobStore::new(&dir, "/uploads")),
        test_config(),
    ));
    let app = TestApp {
        router: serve_uploads(create_routes(service), "/uploads/", &dir),
        blobs: Arc::new(MemoryBlobStore::default()),
    };

    app.register("a@x.com", "A", "p1").await;
    let (access, _) = tokens_of(&app.login("a@x.com", "p1").await);

    let uploaded = app
        .send(avatar_request(
            &access,
            multipart_body("avatar", "me.png", "image/png", &[7, 8, 9]),
        ))
        .await;
    assert_eq!(uploaded.status, StatusCode::OK);
    let url = uploaded.body["data"]["user"]["avatarUrl"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(url.starts_with("/uploads/"));

    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.to_vec(), vec![7, 8, 9]);

    let request = Request::builder()
        .uri("/uploads/missing.png")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[test]
fn test_remote_upload_url_is_not_mounted() {
    // nest_service panics on these paths, so neither may be mounted
    let _ = serve_uploads(Router::new(), "https://cdn.example.com/uploads", "public/uploads");
    let _ = serve_uploads(Router::new(), "/", "public/uploads");
}

#[tokio::test]
async fn test_error_envelopes() {
    let app = test_app();
    app.register("a@x.com", "A", "p1").await;

    let duplicate = app.register("a@x.com", "Other", "p2").await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        duplicate.body,
        json!({
            "success": false,
            "message": "there exists an user with the provided credentials"
        })
    );

    let missing = app.register("c@x.com", "", "p1").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "All fields are required");

    let unknown = app.login("nobody@x.com", "p1").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let wrong_password = app.login("a@x.com", "bad").await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["message"], "Invalid user credentials");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/user/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let malformed = app.send(request).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["success"], false);
}
