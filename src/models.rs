use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Closed Enumerations ---

/// Role
///
/// The access level attached to a profile and carried by every session.
/// Stored as upper-case text in `profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    #[default]
    Applicant,
    Reviewer,
    Admin,
    Compliance,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Applicant, Role::Reviewer, Role::Admin, Role::Compliance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Applicant => "APPLICANT",
            Role::Reviewer => "REVIEWER",
            Role::Admin => "ADMIN",
            Role::Compliance => "COMPLIANCE",
        }
    }

    /// Municipal staff see every application, not only their own.
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Applicant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// ApplicationStatus
///
/// Lifecycle of a zoning application. Only the transitions listed in
/// `can_transition_to` are accepted by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Revoked,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::Revoked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Revoked => "REVOKED",
        }
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, UnderReview) | (Pending, Rejected) | (UnderReview, Approved)
                | (UnderReview, Rejected) | (Approved, Revoked)
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum HazardLevel {
    #[default]
    Low,
    Moderate,
    High,
}

impl HazardLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardLevel::Low => "LOW",
            HazardLevel::Moderate => "MODERATE",
            HazardLevel::High => "HIGH",
        }
    }
}

impl TryFrom<String> for HazardLevel {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        [HazardLevel::Low, HazardLevel::Moderate, HazardLevel::High]
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or(UnknownVariant(value))
    }
}

/// DocumentField
///
/// The document slots of a zoning application that an uploaded object can be attached to.
/// The wire name (camelCase) is what clients send as `fieldName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum DocumentField {
    ProofOfResidency,
    BarangayClearance,
    LotPlan,
    LocationMap,
    TaxDeclaration,
    BusinessPermit,
}

impl DocumentField {
    pub const ALL: [DocumentField; 6] = [
        DocumentField::ProofOfResidency,
        DocumentField::BarangayClearance,
        DocumentField::LotPlan,
        DocumentField::LocationMap,
        DocumentField::TaxDeclaration,
        DocumentField::BusinessPermit,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            DocumentField::ProofOfResidency => "proofOfResidency",
            DocumentField::BarangayClearance => "barangayClearance",
            DocumentField::LotPlan => "lotPlan",
            DocumentField::LocationMap => "locationMap",
            DocumentField::TaxDeclaration => "taxDeclaration",
            DocumentField::BusinessPermit => "businessPermit",
        }
    }

    /// Column in `zoning_applications` holding the storage key for this slot.
    pub fn column(&self) -> &'static str {
        match self {
            DocumentField::ProofOfResidency => "proof_of_residency",
            DocumentField::BarangayClearance => "barangay_clearance",
            DocumentField::LotPlan => "lot_plan",
            DocumentField::LocationMap => "location_map",
            DocumentField::TaxDeclaration => "tax_declaration",
            DocumentField::BusinessPermit => "business_permit",
        }
    }
}

impl FromStr for DocumentField {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentField::ALL
            .into_iter()
            .find(|field| field.wire_name() == s.trim())
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// The profile mirrored from the external auth provider. The role here is the
/// source of truth for every session issued to this user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Barangay {
    pub id: Uuid,
    pub name: String,
    pub district: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BusinessCategory {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Zone
///
/// A land-use zone (e.g. `R-1`, `C-2`) optionally scoped to one barangay.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Zone {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub barangay_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct HazardZone {
    pub id: Uuid,
    pub name: String,
    // e.g. "flood", "landslide", "fault line"
    pub hazard_type: String,
    #[sqlx(try_from = "String")]
    pub level: HazardLevel,
    pub barangay_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Business {
    pub id: Uuid,
    // FK to profiles.id
    pub owner_id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub barangay_id: Option<Uuid>,
    pub address: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ApplicationDocuments
///
/// Storage keys of the supporting documents attached to an application. Each key is
/// written by the applicant after a successful upload; the upload itself never touches
/// this record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApplicationDocuments {
    pub proof_of_residency: Option<String>,
    pub barangay_clearance: Option<String>,
    pub lot_plan: Option<String>,
    pub location_map: Option<String>,
    pub tax_declaration: Option<String>,
    pub business_permit: Option<String>,
}

impl ApplicationDocuments {
    pub fn set(&mut self, field: DocumentField, key: String) {
        let slot = match field {
            DocumentField::ProofOfResidency => &mut self.proof_of_residency,
            DocumentField::BarangayClearance => &mut self.barangay_clearance,
            DocumentField::LotPlan => &mut self.lot_plan,
            DocumentField::LocationMap => &mut self.location_map,
            DocumentField::TaxDeclaration => &mut self.tax_declaration,
            DocumentField::BusinessPermit => &mut self.business_permit,
        };
        *slot = Some(key);
    }

    pub fn get(&self, field: DocumentField) -> Option<&str> {
        match field {
            DocumentField::ProofOfResidency => self.proof_of_residency.as_deref(),
            DocumentField::BarangayClearance => self.barangay_clearance.as_deref(),
            DocumentField::LotPlan => self.lot_plan.as_deref(),
            DocumentField::LocationMap => self.location_map.as_deref(),
            DocumentField::TaxDeclaration => self.tax_declaration.as_deref(),
            DocumentField::BusinessPermit => self.business_permit.as_deref(),
        }
    }
}

/// ZoningApplication
///
/// The central record of the portal. `application_no` is the human-facing reference
/// printed on clearances and used to scope document uploads.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ZoningApplication {
    pub id: Uuid,
    pub application_no: String,
    pub applicant_id: Uuid,
    pub business_id: Option<Uuid>,
    pub barangay_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub project_title: String,
    pub lot_area_sqm: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub remarks: Option<String>,
    #[sqlx(flatten)]
    pub documents: ApplicationDocuments,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ZoningApplication {
    /// Whether `user` may read this application: its applicant, or any staff role.
    pub fn visible_to(&self, user_id: Uuid, role: Role) -> bool {
        role.is_staff() || self.applicant_id == user_id
    }
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateBarangayRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(max = 120))]
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateBarangayRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 120))]
    pub district: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateZoneRequest {
    #[validate(length(min = 1, max = 16, message = "code must be 1-16 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub barangay_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateZoneRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 16, message = "code must be 1-16 characters"))]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateHazardZoneRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 60, message = "hazard_type must be 1-60 characters"))]
    pub hazard_type: String,
    pub level: HazardLevel,
    pub barangay_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateHazardZoneRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "name must be 1-120 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 60, message = "hazard_type must be 1-60 characters"))]
    pub hazard_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<HazardLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateBusinessRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    pub category_id: Option<Uuid>,
    pub barangay_id: Option<Uuid>,
    #[validate(length(min = 1, max = 300, message = "address must be 1-300 characters"))]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateBusinessRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barangay_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 300, message = "address must be 1-300 characters"))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct CreateApplicationRequest {
    pub business_id: Option<Uuid>,
    pub barangay_id: Uuid,
    pub zone_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "project_title must be 1-200 characters"))]
    pub project_title: String,
    #[validate(range(min = 0.0, message = "lot_area_sqm must not be negative"))]
    pub lot_area_sqm: Option<f64>,
}

/// UpdateApplicationRequest
///
/// Partial update by the applicant. Status and documents have their own endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateApplicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "project_title must be 1-200 characters"))]
    pub project_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, message = "lot_area_sqm must not be negative"))]
    pub lot_area_sqm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
}

/// AttachDocumentRequest
///
/// Follow-up write after an upload: records the returned storage key on the
/// application. Repeating it with the same key is harmless.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AttachDocumentRequest {
    pub field_name: DocumentField,
    #[validate(length(min = 1, max = 512, message = "key must be 1-512 characters"))]
    pub key: String,
}

/// RegisterUserRequest
///
/// The password is only passed through to the auth provider. No role field: self
/// registration always produces an applicant.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct AssignRoleRequest {
    pub role: Role,
}

// --- Upload Schemas ---

/// PresignedUploadRequest
///
/// Input for `POST /upload/presigned`. Every field defaults so that missing fields reach
/// validation and are reported together instead of failing on the first one.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Validate, Default)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct PresignedUploadRequest {
    #[schema(example = "residency.pdf")]
    #[validate(length(min = 1, max = 255, message = "filename is required"))]
    pub filename: String,
    #[schema(example = "application/pdf")]
    #[validate(length(min = 1, message = "contentType is required"))]
    pub content_type: String,
    #[schema(example = "proofOfResidency")]
    #[validate(
        length(min = 1, message = "fieldName is required"),
        custom(function = "validate_document_field")
    )]
    pub field_name: String,
    pub application_no: Option<String>,
    pub owner_id: Option<Uuid>,
    /// Declared object size in bytes. When present it is checked against the ceiling
    /// and signed into the upload URL.
    pub file_size: Option<u64>,
}

/// Empty values are left to the `length` rule so a missing field is reported once.
fn validate_document_field(value: &str) -> Result<(), validator::ValidationError> {
    if value.is_empty() || value.parse::<DocumentField>().is_ok() {
        return Ok(());
    }
    let allowed = DocumentField::ALL.map(|field| field.wire_name()).join(", ");
    Err(validator::ValidationError::new("document_field")
        .with_message(format!("fieldName must be one of: {allowed}").into()))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PresignedUploadResponse {
    pub storage_key: String,
    /// Time-limited URL for the client's PUT request.
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    /// Where the object will be readable once uploaded.
    #[serde(rename = "accessURL")]
    pub access_url: String,
    pub field_name: String,
    pub expires_in: u64,
}

/// UploadResponse
///
/// Result of the proxied upload (`POST /upload`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

// --- Page Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

/// AdminOverview
///
/// Counters shown on the administrator landing page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminOverview {
    pub total_users: i64,
    pub total_businesses: i64,
    pub total_barangays: i64,
    pub applications_by_status: Vec<StatusCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }
    }
}
