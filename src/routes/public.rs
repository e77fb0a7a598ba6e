use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Besides liveness and registration this is the
/// read side of the municipal reference data (barangays, categories, zones, hazards),
/// which the sign-up and application forms need before the user has an account.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Sign-up through the auth provider; always creates an APPLICANT profile.
        .route("/register", post(handlers::register_user))
        // --- Reference data (read) ---
        .route("/barangays", get(handlers::list_barangays))
        .route("/barangays/{id}", get(handlers::get_barangay))
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{id}", get(handlers::get_category))
        // GET /zones?barangay_id=...
        .route("/zones", get(handlers::list_zones))
        .route("/zones/{id}", get(handlers::get_zone))
        // GET /hazards?barangay_id=...
        .route("/hazards", get(handlers::list_hazards))
        .route("/hazards/{id}", get(handlers::get_hazard))
}
