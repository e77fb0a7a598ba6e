use crate::{
    AppState, handlers,
    upload::{MAX_UPLOAD_BYTES, MULTIPART_OVERHEAD_BYTES},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every handler here takes a `Session` or an `Authorized<P>` extractor, so a request
/// without a live session is answered with 401 before its body is read, and a session
/// with the wrong role with 403.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // PUT /users/{id}/role  (ADMIN)
        .route("/users/{id}/role", put(handlers::assign_role))
        // --- Uploads ---
        // POST /upload/presigned
        // Authorizes a direct client-to-storage upload; returns a 10-minute PUT URL.
        .route("/upload/presigned", post(handlers::get_presigned_url))
        // POST /upload
        // Proxied multipart upload. The body limit leaves room for the multipart framing;
        // anything larger is reported as the regular size error.
        .route(
            "/upload",
            post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        // --- Reference data (write, ADMIN) ---
        .route("/barangays", post(handlers::create_barangay))
        .route(
            "/barangays/{id}",
            put(handlers::update_barangay).delete(handlers::delete_barangay),
        )
        .route("/categories", post(handlers::create_category))
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route("/zones", post(handlers::create_zone))
        .route(
            "/zones/{id}",
            put(handlers::update_zone).delete(handlers::delete_zone),
        )
        .route("/hazards", post(handlers::create_hazard))
        .route(
            "/hazards/{id}",
            put(handlers::update_hazard).delete(handlers::delete_hazard),
        )
        // --- Businesses ---
        .route(
            "/businesses",
            get(handlers::list_businesses).post(handlers::create_business),
        )
        .route(
            "/businesses/{id}",
            get(handlers::get_business)
                .put(handlers::update_business)
                .delete(handlers::delete_business),
        )
        // --- Zoning applications ---
        .route(
            "/applications",
            get(handlers::list_applications).post(handlers::create_application),
        )
        .route(
            "/applications/{id}",
            get(handlers::get_application)
                .put(handlers::update_application)
                .delete(handlers::delete_application),
        )
        // PUT /applications/{id}/status  (REVIEWER, ADMIN)
        .route(
            "/applications/{id}/status",
            put(handlers::update_application_status),
        )
        // PUT /applications/{id}/documents  (owner APPLICANT)
        // Records the key returned by an upload. Idempotent.
        .route(
            "/applications/{id}/documents",
            put(handlers::attach_document),
        )
}
