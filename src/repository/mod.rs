use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    AdminOverview, ApplicationStatus, Barangay, Business, BusinessCategory,
    CreateApplicationRequest, CreateBarangayRequest, CreateBusinessRequest,
    CreateCategoryRequest, CreateHazardZoneRequest, CreateZoneRequest, DocumentField, HazardZone,
    Role, UpdateApplicationRequest, UpdateBarangayRequest, UpdateBusinessRequest,
    UpdateCategoryRequest, UpdateHazardZoneRequest, UpdateZoneRequest, User, Zone,
    ZoningApplication,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Persistence failures. Constraint violations become `Conflict` so handlers can answer
/// 409 instead of 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("{0}")]
    Conflict(String),
    #[error("corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // 23505 unique_violation, 23503 foreign_key_violation
            match db_err.code().as_deref() {
                Some("23505") => return RepositoryError::Conflict(format!("duplicate value: {}", db_err.message())),
                Some("23503") => return RepositoryError::Conflict(format!("record is still referenced: {}", db_err.message())),
                _ => {}
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Conflict for a guarded application write whose row no longer has the expected status.
pub(crate) fn status_moved(id: Uuid, expected: ApplicationStatus, actual: ApplicationStatus) -> RepositoryError {
    RepositoryError::Conflict(format!(
        "application {id} is {actual}, expected {expected}; it was changed by another request"
    ))
}

/// ApplicationFilter
///
/// Narrowing applied to application listings. Empty `statuses` means any status.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub applicant_id: Option<Uuid>,
    pub barangay_id: Option<Uuid>,
    pub statuses: Vec<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &ZoningApplication) -> bool {
        self.applicant_id.is_none_or(|id| application.applicant_id == id)
            && self.barangay_id.is_none_or(|id| application.barangay_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&application.status))
    }
}

/// Repository Trait
///
/// Persistence contract for the whole portal. Handlers only talk to `RepositoryState`,
/// so the Postgres implementation and the in-memory one are interchangeable.
///
/// Update methods return `Ok(None)` when the record does not exist; delete methods
/// return `Ok(false)` in the same case.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: User) -> RepoResult<User>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;

    // --- Barangays ---
    async fn list_barangays(&self) -> RepoResult<Vec<Barangay>>;
    async fn get_barangay(&self, id: Uuid) -> RepoResult<Option<Barangay>>;
    async fn create_barangay(&self, req: CreateBarangayRequest) -> RepoResult<Barangay>;
    async fn update_barangay(&self, id: Uuid, req: UpdateBarangayRequest) -> RepoResult<Option<Barangay>>;
    async fn delete_barangay(&self, id: Uuid) -> RepoResult<bool>;

    // --- Business categories ---
    async fn list_categories(&self) -> RepoResult<Vec<BusinessCategory>>;
    async fn get_category(&self, id: Uuid) -> RepoResult<Option<BusinessCategory>>;
    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<BusinessCategory>;
    async fn update_category(&self, id: Uuid, req: UpdateCategoryRequest) -> RepoResult<Option<BusinessCategory>>;
    async fn delete_category(&self, id: Uuid) -> RepoResult<bool>;

    // --- Zones ---
    async fn list_zones(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<Zone>>;
    async fn get_zone(&self, id: Uuid) -> RepoResult<Option<Zone>>;
    async fn create_zone(&self, req: CreateZoneRequest) -> RepoResult<Zone>;
    async fn update_zone(&self, id: Uuid, req: UpdateZoneRequest) -> RepoResult<Option<Zone>>;
    async fn delete_zone(&self, id: Uuid) -> RepoResult<bool>;

    // --- Hazard zones ---
    async fn list_hazards(&self, barangay_id: Option<Uuid>) -> RepoResult<Vec<HazardZone>>;
    async fn get_hazard(&self, id: Uuid) -> RepoResult<Option<HazardZone>>;
    async fn create_hazard(&self, req: CreateHazardZoneRequest) -> RepoResult<HazardZone>;
    async fn update_hazard(&self, id: Uuid, req: UpdateHazardZoneRequest) -> RepoResult<Option<HazardZone>>;
    async fn delete_hazard(&self, id: Uuid) -> RepoResult<bool>;

    // --- Businesses ---
    /// `owner_id = None` lists every business.
    async fn list_businesses(&self, owner_id: Option<Uuid>) -> RepoResult<Vec<Business>>;
    async fn get_business(&self, id: Uuid) -> RepoResult<Option<Business>>;
    async fn create_business(&self, req: CreateBusinessRequest, owner_id: Uuid) -> RepoResult<Business>;
    async fn update_business(&self, id: Uuid, req: UpdateBusinessRequest) -> RepoResult<Option<Business>>;
    async fn delete_business(&self, id: Uuid) -> RepoResult<bool>;

    // --- Zoning applications ---
    async fn list_applications(&self, filter: ApplicationFilter) -> RepoResult<Vec<ZoningApplication>>;
    async fn get_application(&self, id: Uuid) -> RepoResult<Option<ZoningApplication>>;
    async fn get_application_by_no(&self, application_no: &str) -> RepoResult<Option<ZoningApplication>>;
    async fn create_application(
        &self,
        req: CreateApplicationRequest,
        applicant_id: Uuid,
        application_no: String,
    ) -> RepoResult<ZoningApplication>;
    /// Applies the edit only while the application still has status `expected`; a row that
    /// moved on in the meantime is a `Conflict`.
    async fn update_application(
        &self,
        id: Uuid,
        expected: ApplicationStatus,
        req: UpdateApplicationRequest,
    ) -> RepoResult<Option<ZoningApplication>>;
    /// Compare-and-set on the status column: `from` must still be the stored status.
    async fn set_application_status(
        &self,
        id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        remarks: Option<String>,
    ) -> RepoResult<Option<ZoningApplication>>;
    /// Records a storage key in one document slot. Writing the same key twice is a no-op.
    async fn attach_document(&self, id: Uuid, field: DocumentField, key: String) -> RepoResult<Option<ZoningApplication>>;
    async fn delete_application(&self, id: Uuid) -> RepoResult<bool>;

    // --- Dashboards ---
    async fn get_overview(&self) -> RepoResult<AdminOverview>;
}

/// RepositoryState
///
/// Shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
