mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{create_token, json_request, read_json, seed_user, test_app, test_app_with};
use tower::util::ServiceExt;
use zoning_portal::{MockStorageService, config::Env, models::Role};

const PAGES: [(&str, Role); 4] = [
    ("/applicant/dashboard", Role::Applicant),
    ("/reviewer/queue", Role::Reviewer),
    ("/admin/overview", Role::Admin),
    ("/compliance/approved", Role::Compliance),
];

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_matching_role_reaches_the_page() {
    let app = test_app();
    for (path, role) in PAGES {
        let user = seed_user(&app.repo, role).await;
        let response = app
            .router
            .clone()
            .oneshot(json_request("GET", path, Some(user), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn test_other_roles_are_redirected_home() {
    let app = test_app();
    for (path, required) in PAGES {
        for role in Role::ALL.into_iter().filter(|role| *role != required) {
            let user = seed_user(&app.repo, role).await;
            let response = app
                .router
                .clone()
                .oneshot(json_request("GET", path, Some(user), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{role} on {path}");
            assert_eq!(location(&response), "/");
        }
    }
}

#[tokio::test]
async fn test_anonymous_is_sent_to_sign_in_with_callback() {
    let app = test_app();
    let response = app
        .router
        .oneshot(json_request("GET", "/reviewer/queue?page=2", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "/auth/signin?callbackUrl=%2Freviewer%2Fqueue%3Fpage%3D2"
    );
}

#[tokio::test]
async fn test_gate_covers_unrouted_paths_under_a_prefix() {
    let app = test_app();
    let response = app
        .router
        .oneshot(json_request("GET", "/admin/settings", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/auth/signin?callbackUrl=%2Fadmin%2Fsettings");
}

#[tokio::test]
async fn test_prefix_match_is_segment_aware() {
    let app = test_app();
    let response = app
        .router
        .oneshot(json_request("GET", "/administrator", None, None))
        .await
        .unwrap();

    // Not a guarded area: plain 404, no redirect.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_expired_session_counts_as_absent() {
    let app = test_app_with(Env::Production, MockStorageService::new());
    let admin = seed_user(&app.repo, Role::Admin).await;

    let request = Request::builder()
        .uri("/admin/overview")
        .header(header::AUTHORIZATION, format!("Bearer {}", create_token(admin, -5)))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("/auth/signin?callbackUrl="));

    let request = Request::builder()
        .uri("/admin/overview")
        .header(header::AUTHORIZATION, format!("Bearer {}", create_token(admin, 300)))
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_repeated_requests_get_the_same_decision() {
    let app = test_app();
    let compliance = seed_user(&app.repo, Role::Compliance).await;

    let mut decisions = Vec::new();
    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(json_request("GET", "/reviewer/queue", Some(compliance), None))
            .await
            .unwrap();
        decisions.push((response.status(), location(&response).to_string()));
    }
    assert_eq!(decisions[0], decisions[1]);
}

#[tokio::test]
async fn test_api_routes_answer_with_json_errors_not_redirects() {
    let app = test_app();
    let response = app
        .router
        .oneshot(json_request("GET", "/applications", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(read_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_admin_overview_counts() {
    let app = test_app();
    let admin = seed_user(&app.repo, Role::Admin).await;
    seed_user(&app.repo, Role::Applicant).await;

    let response = app
        .router
        .oneshot(json_request("GET", "/admin/overview", Some(admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["total_barangays"], 0);
}
