use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod provider;
pub mod repository;
pub mod storage;
pub mod upload;

// Routing, grouped by who may reach each endpoint.
pub mod routes;
use routes::{authenticated, pages, public};

// --- Public Re-exports ---

pub use auth::{JwtSessionProvider, SessionState};
pub use config::AppConfig;
pub use provider::AuthProvider;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::get_me, handlers::assign_role,
        handlers::get_presigned_url, handlers::upload_file,
        handlers::list_barangays, handlers::get_barangay, handlers::create_barangay,
        handlers::update_barangay, handlers::delete_barangay,
        handlers::list_categories, handlers::get_category, handlers::create_category,
        handlers::update_category, handlers::delete_category,
        handlers::list_zones, handlers::get_zone, handlers::create_zone,
        handlers::update_zone, handlers::delete_zone,
        handlers::list_hazards, handlers::get_hazard, handlers::create_hazard,
        handlers::update_hazard, handlers::delete_hazard,
        handlers::list_businesses, handlers::get_business, handlers::create_business,
        handlers::update_business, handlers::delete_business,
        handlers::list_applications, handlers::get_application, handlers::create_application,
        handlers::update_application, handlers::update_application_status,
        handlers::attach_document, handlers::delete_application,
        handlers::applicant_dashboard, handlers::reviewer_queue,
        handlers::admin_overview, handlers::compliance_approved,
    ),
    components(
        schemas(
            models::Role, models::ApplicationStatus, models::HazardLevel, models::DocumentField,
            models::User, models::UserProfile, models::Barangay, models::BusinessCategory,
            models::Zone, models::HazardZone, models::Business, models::ZoningApplication,
            models::ApplicationDocuments, models::AdminOverview, models::StatusCount,
            models::CreateBarangayRequest, models::UpdateBarangayRequest,
            models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::CreateZoneRequest, models::UpdateZoneRequest,
            models::CreateHazardZoneRequest, models::UpdateHazardZoneRequest,
            models::CreateBusinessRequest, models::UpdateBusinessRequest,
            models::CreateApplicationRequest, models::UpdateApplicationRequest,
            models::UpdateStatusRequest, models::AttachDocumentRequest,
            models::RegisterUserRequest, models::AssignRoleRequest,
            models::PresignedUploadRequest, models::PresignedUploadResponse,
            models::UploadResponse, error::ErrorResponse,
        )
    ),
    tags(
        (name = "zoning-portal", description = "Municipal Zoning Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the application's services. Cloned per request;
/// every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in deployments, in-memory in tests).
    pub repo: RepositoryState,
    /// Object storage (S3/MinIO, or the mock).
    pub storage: StorageState,
    /// Resolves requests to sessions. Consulted by the page gate and the session extractors.
    pub sessions: SessionState,
    /// Sign-up client for the external auth provider.
    pub provider: AuthProvider,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Handlers and extractors pull only the component they need out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AuthProvider {
    fn from_ref(app_state: &AppState) -> AuthProvider {
        app_state.provider.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing table, applies global and scoped middleware, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(pages::page_routes())
        // Page gate: wraps the whole router so every path under a guarded prefix is
        // checked, matched or not. Other paths pass straight through.
        .layer(middleware::from_fn_with_state(state.clone(), gate::page_gate))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span: method, uri and the `x-request-id` set by the layer
/// above, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
