mod common;

use axum::{Json, Router, http::StatusCode, routing::post};
use common::{seed_user, test_config};
use reqwest::{Method, RequestBuilder};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use uuid::Uuid;
use zoning_portal::{
    AppConfig, AppState, AuthProvider, InMemoryRepository, JwtSessionProvider, MockStorageService,
    SessionState, config::Env, create_router, models::Role, repository::RepositoryState,
    storage::StorageState,
};

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Request authenticated through the local `x-user-id` bypass.
    fn as_user(&self, method: Method, path: &str, user: Uuid) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.address, path))
            .header("x-user-id", user.to_string())
    }

    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.address, path))
    }
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

async fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let repo_state = repo.clone() as RepositoryState;
    let sessions =
        Arc::new(JwtSessionProvider::new(repo_state.clone(), config.clone())) as SessionState;

    let state = AppState {
        repo: repo_state,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        sessions,
        provider: AuthProvider::new(&config).unwrap(),
        config,
    };

    let address = serve(create_router(state)).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        repo,
        client,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(test_config(Env::Local)).await
}

#[derive(Clone, Copy)]
enum ProviderMode {
    Accept,
    Reject,
    Fail,
    Stall,
}

/// Stand-in for the auth provider's sign-up endpoint, answering according to `mode`.
async fn spawn_auth_provider(mode: ProviderMode) -> (String, Uuid) {
    let user_id = Uuid::new_v4();
    let router = Router::new().route(
        "/auth/v1/signup",
        post(move |Json(_body): Json<Value>| async move {
            match mode {
                ProviderMode::Accept => (StatusCode::OK, Json(json!({ "id": user_id }))),
                ProviderMode::Reject => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "msg": "User already registered" })),
                ),
                ProviderMode::Fail => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "msg": "upstream down" })),
                ),
                ProviderMode::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    (StatusCode::OK, Json(json!({ "id": user_id })))
                }
            }
        }),
    );
    (serve(router).await, user_id)
}

async fn spawn_app_against(mode: ProviderMode) -> (TestApp, Uuid) {
    let (provider_url, provider_user_id) = spawn_auth_provider(mode).await;
    let app = spawn_app_with(AppConfig {
        auth_provider_url: provider_url,
        auth_provider_timeout: Duration::from_secs(1),
        ..test_config(Env::Local)
    })
    .await;
    (app, provider_user_id)
}

async fn create_barangay(app: &TestApp, admin: Uuid, name: &str) -> Value {
    let response = app
        .as_user(Method::POST, "/barangays", admin)
        .json(&json!({ "name": name, "district": "District 1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn create_application(app: &TestApp, applicant: Uuid, barangay_id: &Value) -> Value {
    let response = app
        .as_user(Method::POST, "/applications", applicant)
        .json(&json!({
            "barangay_id": barangay_id,
            "project_title": "Two-storey sari-sari store",
            "lot_area_sqm": 120.5
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn set_status(app: &TestApp, reviewer: Uuid, id: &str, status: &str) -> reqwest::Response {
    app.as_user(Method::PUT, &format!("/applications/{id}/status"), reviewer)
        .json(&json!({ "status": status, "remarks": "checked on site" }))
        .send()
        .await
        .unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .anonymous(Method::GET, "/health")
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_reference_data_roles() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, Role::Admin).await;
    let applicant = seed_user(&app.repo, Role::Applicant).await;
    let body = json!({ "name": "San Isidro" });

    let response = app
        .anonymous(Method::POST, "/barangays")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = app
        .as_user(Method::POST, "/barangays", applicant)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let barangay = create_barangay(&app, admin, "San Isidro").await;
    let id = barangay["id"].as_str().unwrap();

    // Reads are public.
    let listed: Vec<Value> = app
        .anonymous(Method::GET, "/barangays")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "San Isidro");

    let response = app
        .as_user(Method::PUT, &format!("/barangays/{id}"), admin)
        .json(&json!({ "district": "District 2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["name"], "San Isidro");
    assert_eq!(updated["district"], "District 2");

    let response = app
        .as_user(Method::DELETE, &format!("/barangays/{id}"), admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .anonymous(Method::GET, &format!("/barangays/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_zones_and_hazards_filter_by_barangay() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, Role::Admin).await;
    let north = create_barangay(&app, admin, "North").await;
    let south = create_barangay(&app, admin, "South").await;

    for (code, barangay) in [("R-1", &north["id"]), ("C-2", &south["id"])] {
        let response = app
            .as_user(Method::POST, "/zones", admin)
            .json(&json!({ "code": code, "name": format!("Zone {code}"), "barangay_id": barangay }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    let response = app
        .as_user(Method::POST, "/hazards", admin)
        .json(&json!({
            "name": "Riverbank",
            "hazard_type": "FLOOD",
            "level": "HIGH",
            "barangay_id": north["id"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let zones: Vec<Value> = app
        .anonymous(
            Method::GET,
            &format!("/zones?barangay_id={}", north["id"].as_str().unwrap()),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["code"], "R-1");

    let hazards: Vec<Value> = app
        .anonymous(
            Method::GET,
            &format!("/hazards?barangay_id={}", south["id"].as_str().unwrap()),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(hazards.is_empty());
}

#[tokio::test]
async fn test_businesses_are_private_to_their_owner() {
    let app = spawn_app().await;
    let owner = seed_user(&app.repo, Role::Applicant).await;
    let neighbour = seed_user(&app.repo, Role::Applicant).await;
    let reviewer = seed_user(&app.repo, Role::Reviewer).await;

    let response = app
        .as_user(Method::POST, "/businesses", owner)
        .json(&json!({ "name": "Aling Nena's Bakery", "address": "12 Rizal St." }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let business: Value = response.json().await.unwrap();
    assert_eq!(business["owner_id"], owner.to_string());
    let id = business["id"].as_str().unwrap();

    let response = app
        .as_user(Method::GET, &format!("/businesses/{id}"), neighbour)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let listed: Vec<Value> = app
        .as_user(Method::GET, "/businesses", neighbour)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    // Staff see every business.
    let response = app
        .as_user(Method::GET, &format!("/businesses/{id}"), reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .as_user(Method::POST, "/businesses", reviewer)
        .json(&json!({ "name": "Not allowed", "address": "nowhere" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_application_lifecycle() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, Role::Admin).await;
    let applicant = seed_user(&app.repo, Role::Applicant).await;
    let reviewer = seed_user(&app.repo, Role::Reviewer).await;
    let barangay = create_barangay(&app, admin, "Poblacion").await;

    // Only applicants file applications.
    let response = app
        .as_user(Method::POST, "/applications", reviewer)
        .json(&json!({ "barangay_id": barangay["id"], "project_title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Unknown barangay is a field error.
    let response = app
        .as_user(Method::POST, "/applications", applicant)
        .json(&json!({ "barangay_id": Uuid::new_v4(), "project_title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let application = create_application(&app, applicant, &barangay["id"]).await;
    let id = application["id"].as_str().unwrap().to_string();
    assert_eq!(application["status"], "PENDING");
    assert!(
        application["application_no"]
            .as_str()
            .unwrap()
            .starts_with("ZA-")
    );

    // Pending applications can still be edited by their owner.
    let response = app
        .as_user(Method::PUT, &format!("/applications/{id}"), applicant)
        .json(&json!({ "project_title": "Three-storey sari-sari store" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Applicants cannot review.
    let response = set_status(&app, applicant, &id, "APPROVED").await;
    assert_eq!(response.status(), 403);

    // PENDING -> APPROVED skips review.
    let response = set_status(&app, reviewer, &id, "APPROVED").await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["details"]["status"].is_array());

    let response = set_status(&app, reviewer, &id, "UNDER_REVIEW").await;
    assert_eq!(response.status(), 200);

    // No more edits once review started.
    let response = app
        .as_user(Method::PUT, &format!("/applications/{id}"), applicant)
        .json(&json!({ "project_title": "Too late" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = set_status(&app, reviewer, &id, "APPROVED").await;
    assert_eq!(response.status(), 200);
    let approved: Value = response.json().await.unwrap();
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["remarks"], "checked on site");
    assert_eq!(approved["project_title"], "Three-storey sari-sari store");

    // Staff can filter by status.
    let approved_list: Vec<Value> = app
        .as_user(Method::GET, "/applications?status=APPROVED", reviewer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(approved_list.len(), 1);

    let response = app
        .as_user(Method::DELETE, &format!("/applications/{id}"), reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .as_user(Method::DELETE, &format!("/applications/{id}"), admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_applicants_only_see_their_own_applications() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, Role::Admin).await;
    let first = seed_user(&app.repo, Role::Applicant).await;
    let second = seed_user(&app.repo, Role::Applicant).await;
    let barangay = create_barangay(&app, admin, "Bagong Silang").await;

    let mine = create_application(&app, first, &barangay["id"]).await;
    create_application(&app, second, &barangay["id"]).await;

    let listed: Vec<Value> = app
        .as_user(Method::GET, "/applications", first)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], mine["id"]);

    let response = app
        .as_user(
            Method::GET,
            &format!("/applications/{}", mine["id"].as_str().unwrap()),
            second,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let all: Vec<Value> = app
        .as_user(Method::GET, "/applications", admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_me_and_role_assignment() {
    let app = spawn_app().await;
    let admin = seed_user(&app.repo, Role::Admin).await;
    let user = seed_user(&app.repo, Role::Applicant).await;

    let me: Value = app
        .as_user(Method::GET, "/me", user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "APPLICANT");

    let response = app
        .as_user(Method::PUT, &format!("/users/{admin}/role"), user)
        .json(&json!({ "role": "APPLICANT" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = app
        .as_user(Method::PUT, &format!("/users/{user}/role"), admin)
        .json(&json!({ "role": "REVIEWER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Next request already carries the new role.
    let me: Value = app
        .as_user(Method::GET, "/me", user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "REVIEWER");

    let response = app
        .as_user(Method::PUT, &format!("/users/{}/role", Uuid::new_v4()), admin)
        .json(&json!({ "role": "REVIEWER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_register_creates_an_applicant_profile() {
    let (app, provider_user_id) = spawn_app_against(ProviderMode::Accept).await;

    let response = app
        .anonymous(Method::POST, "/register")
        .json(&json!({
            "email": "juan@example.ph",
            "password": "correct-horse",
            "full_name": "Juan dela Cruz"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["id"], provider_user_id.to_string());
    assert_eq!(profile["role"], "APPLICANT");

    // The new profile authenticates right away.
    let me: Value = app
        .as_user(Method::GET, "/me", provider_user_id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "juan@example.ph");
}

#[tokio::test]
async fn test_register_validation_and_provider_rejection() {
    let (app, _) = spawn_app_against(ProviderMode::Reject).await;

    let response = app
        .anonymous(Method::POST, "/register")
        .json(&json!({ "email": "not-an-email", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["details"]["email"].is_array());

    let response = app
        .anonymous(Method::POST, "/register")
        .json(&json!({ "email": "taken@example.ph", "password": "correct-horse" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_register_reports_provider_outages_as_server_errors() {
    for mode in [ProviderMode::Fail, ProviderMode::Stall] {
        let (app, provider_user_id) = spawn_app_against(mode).await;

        let response = app
            .anonymous(Method::POST, "/register")
            .json(&json!({ "email": "maria@example.ph", "password": "correct-horse" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 500);

        // Nothing was mirrored locally.
        let response = app
            .as_user(Method::GET, "/me", provider_user_id)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
    }
}

#[tokio::test]
async fn test_role_pages_over_http() {
    let app = spawn_app().await;
    let applicant = seed_user(&app.repo, Role::Applicant).await;

    let response = app
        .anonymous(Method::GET, "/compliance/approved")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
    assert_eq!(
        response.headers()["location"],
        "/auth/signin?callbackUrl=%2Fcompliance%2Fapproved"
    );

    let response = app
        .as_user(Method::GET, "/applicant/dashboard", applicant)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let dashboard: Vec<Value> = response.json().await.unwrap();
    assert!(dashboard.is_empty());
}
