#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;
use zoning_portal::{
    AppConfig, AppState, AuthProvider, InMemoryRepository, JwtSessionProvider, MockStorageService,
    auth::{Claims, SessionState},
    config::Env,
    create_router,
    models::{Role, User},
    repository::RepositoryState,
    storage::StorageState,
};

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
pub const BOUNDARY: &str = "zoning-portal-test-boundary";

/// TestApp
///
/// A router over the in-memory repository and the mock storage. The handles are kept so
/// tests can seed data and inspect storage writes.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
    pub state: AppState,
}

pub fn test_config(env: Env) -> AppConfig {
    AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn test_app_with(env: Env, storage: MockStorageService) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let config = test_config(env);
    let repo_state = repo.clone() as RepositoryState;
    let sessions =
        Arc::new(JwtSessionProvider::new(repo_state.clone(), config.clone())) as SessionState;

    let state = AppState {
        repo: repo_state,
        storage: Arc::new(storage.clone()) as StorageState,
        sessions,
        provider: AuthProvider::new(&config).unwrap(),
        config,
    };

    TestApp {
        router: create_router(state.clone()),
        repo,
        storage,
        state,
    }
}

/// Local environment, working storage: `x-user-id` authenticates seeded users.
pub fn test_app() -> TestApp {
    test_app_with(Env::Local, MockStorageService::new())
}

pub async fn seed_user(repo: &InMemoryRepository, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    repo.insert_user(User {
        id,
        email: format!("{}@zoning.test", role.as_str().to_lowercase()),
        full_name: Some(format!("Test {role}")),
        role,
    })
    .await;
    id
}

/// HS256 token for `user_id`, expiring `exp_offset` seconds from now (negative: already expired).
pub fn create_token(user_id: Uuid, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// JSON request, authenticated through the local `x-user-id` bypass when `user` is set.
pub fn json_request(method: &str, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub enum FormPart<'a> {
    Text(&'a str, &'a str),
    File {
        content_type: &'a str,
        filename: &'a str,
        bytes: Vec<u8>,
    },
}

pub fn multipart_body(parts: Vec<FormPart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        match part {
            FormPart::Text(name, value) => {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                    )
                    .as_bytes(),
                );
            }
            FormPart::File {
                content_type,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(user: Option<Uuid>, parts: Vec<FormPart<'_>>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}
