use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Page Router Module
///
/// Data endpoints for the role pages. Access is decided by `gate::page_gate`, applied
/// around the whole router in `create_router` so that every path under a guarded prefix
/// is covered, including ones with no handler.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/applicant/dashboard", get(handlers::applicant_dashboard))
        .route("/reviewer/queue", get(handlers::reviewer_queue))
        .route("/admin/overview", get(handlers::admin_overview))
        .route("/compliance/approved", get(handlers::compliance_approved))
}
