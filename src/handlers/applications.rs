use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{deleted, found};
use crate::{
    auth::{AdminOnly, ApplicantOnly, Authorized, ReviewerOrAdmin, Session},
    error::{ApiError, ValidatedJson},
    models::{
        ApplicationStatus, AttachDocumentRequest, CreateApplicationRequest, Role,
        UpdateApplicationRequest, UpdateStatusRequest, ZoningApplication,
    },
    repository::{ApplicationFilter, RepositoryError, RepositoryState},
    storage::sanitize_key,
    upload::UNASSIGNED,
};

/// Attempts at drawing an unused application number before giving up.
const APPLICATION_NO_ATTEMPTS: usize = 3;

/// ApplicationQuery
///
/// Accepted query parameters for `GET /applications`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ApplicationQuery {
    pub status: Option<ApplicationStatus>,
    pub barangay_id: Option<Uuid>,
}

/// `ZA-<year>-<8 upper-case hex digits>`, e.g. `ZA-2026-1F3C9A0B`.
pub fn generate_application_no(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("ZA-{}-{}", now.year(), random[..8].to_ascii_uppercase())
}

/// Loads an application the caller may read; anything else is a 404.
async fn visible_application(
    repo: &RepositoryState,
    session: &Session,
    id: Uuid,
) -> Result<ZoningApplication, ApiError> {
    let application = repo
        .get_application(id)
        .await?
        .filter(|a| a.visible_to(session.user_id, session.role));
    found(application, "application", id)
}

/// list_applications
///
/// [Authenticated Route] Applicants only see their own applications. Staff see all of
/// them and can narrow by status and barangay.
#[utoipa::path(
    get,
    path = "/applications",
    params(ApplicationQuery),
    responses(
        (status = 200, description = "Applications visible to the caller", body = [ZoningApplication]),
        (status = 401, description = "No session")
    )
)]
pub async fn list_applications(
    session: Session,
    State(repo): State<RepositoryState>,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<ZoningApplication>>, ApiError> {
    let filter = ApplicationFilter {
        applicant_id: (session.role == Role::Applicant).then_some(session.user_id),
        barangay_id: query.barangay_id,
        statuses: query.status.into_iter().collect(),
    };
    Ok(Json(repo.list_applications(filter).await?))
}

#[utoipa::path(
    get,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application", body = ZoningApplication),
        (status = 404, description = "Not Found or not visible")
    )
)]
pub async fn get_application(
    session: Session,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ZoningApplication>, ApiError> {
    Ok(Json(visible_application(&repo, &session, id).await?))
}

/// create_application
///
/// [Applicant Route] Files a new zoning application in PENDING state under a freshly
/// drawn application number.
#[utoipa::path(
    post,
    path = "/applications",
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Filed", body = ZoningApplication),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Only applicants file applications")
    )
)]
pub async fn create_application(
    Authorized(session, _): Authorized<ApplicantOnly>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ZoningApplication>), ApiError> {
    if repo.get_barangay(payload.barangay_id).await?.is_none() {
        return Err(ApiError::invalid_field("barangay_id", "unknown barangay"));
    }
    if let Some(business_id) = payload.business_id {
        let owned = repo
            .get_business(business_id)
            .await?
            .is_some_and(|b| b.owner_id == session.user_id);
        if !owned {
            return Err(ApiError::invalid_field("business_id", "unknown business"));
        }
    }

    let mut attempt = 0;
    let application = loop {
        attempt += 1;
        let application_no = generate_application_no(Utc::now());
        match repo
            .create_application(payload.clone(), session.user_id, application_no)
            .await
        {
            Err(RepositoryError::Conflict(reason)) if attempt < APPLICATION_NO_ATTEMPTS => {
                tracing::warn!(%reason, attempt, "application number collision, drawing again");
            }
            other => break other?,
        }
    };

    tracing::info!(
        application_id = %application.id,
        application_no = %application.application_no,
        applicant_id = %session.user_id,
        "zoning application filed"
    );
    Ok((StatusCode::CREATED, Json(application)))
}

/// update_application
///
/// [Applicant Route] The applicant may edit their application until review starts.
#[utoipa::path(
    put,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateApplicationRequest,
    responses(
        (status = 200, description = "Updated", body = ZoningApplication),
        (status = 404, description = "Not Found or not owned"),
        (status = 409, description = "No longer PENDING")
    )
)]
pub async fn update_application(
    Authorized(session, _): Authorized<ApplicantOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateApplicationRequest>,
) -> Result<Json<ZoningApplication>, ApiError> {
    let current = visible_application(&repo, &session, id).await?;
    if current.status != ApplicationStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "application {} is {} and can no longer be edited",
            current.application_no, current.status
        )));
    }
    let updated = repo
        .update_application(id, ApplicationStatus::Pending, payload)
        .await?;
    Ok(Json(found(updated, "application", id)?))
}

/// update_application_status
///
/// [Reviewer/Admin Route] Moves an application through the review flow. Transitions
/// outside `ApplicationStatus::can_transition_to` are a 400 on `status`; a status changed
/// by another request between the read and the write is a 409.
#[utoipa::path(
    put,
    path = "/applications/{id}/status",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ZoningApplication),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Not a reviewer or administrator"),
        (status = 409, description = "Status changed concurrently")
    )
)]
pub async fn update_application_status(
    Authorized(session, _): Authorized<ReviewerOrAdmin>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<ZoningApplication>, ApiError> {
    let current = found(repo.get_application(id).await?, "application", id)?;
    if !current.status.can_transition_to(payload.status) {
        return Err(ApiError::invalid_field(
            "status",
            format!(
                "cannot move application {} from {} to {}",
                current.application_no, current.status, payload.status
            ),
        ));
    }

    let updated = found(
        repo.set_application_status(id, current.status, payload.status, payload.remarks)
            .await?,
        "application",
        id,
    )?;
    tracing::info!(
        application_no = %updated.application_no,
        from = %current.status,
        to = %updated.status,
        reviewer_id = %session.user_id,
        "application status changed"
    );
    Ok(Json(updated))
}

/// attach_document
///
/// [Applicant Route] Records the key of an uploaded object in one document slot. The key
/// must come from an upload for this application (or an unassigned one) and this slot.
/// Safe to repeat.
#[utoipa::path(
    put,
    path = "/applications/{id}/documents",
    params(("id" = Uuid, Path, description = "Application ID")),
    request_body = AttachDocumentRequest,
    responses(
        (status = 200, description = "Document attached", body = ZoningApplication),
        (status = 400, description = "Key does not belong to this application and slot"),
        (status = 404, description = "Not Found or not owned")
    )
)]
pub async fn attach_document(
    Authorized(session, _): Authorized<ApplicantOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AttachDocumentRequest>,
) -> Result<Json<ZoningApplication>, ApiError> {
    let application = visible_application(&repo, &session, id).await?;

    // Dot and empty segments would let a key climb out of the checked prefix.
    if sanitize_key(&payload.key) != payload.key {
        return Err(ApiError::invalid_field(
            "key",
            "key must not contain empty, '.' or '..' segments",
        ));
    }

    let slot = payload.field_name.wire_name();
    let own_prefix = format!("applications/{}/{slot}/", application.application_no);
    let unassigned_prefix = format!("applications/{UNASSIGNED}/{slot}/");
    if !payload.key.starts_with(&own_prefix) && !payload.key.starts_with(&unassigned_prefix) {
        return Err(ApiError::invalid_field(
            "key",
            format!("key must start with {own_prefix} or {unassigned_prefix}"),
        ));
    }

    let updated = found(
        repo.attach_document(id, payload.field_name, payload.key).await?,
        "application",
        id,
    )?;
    tracing::info!(application_no = %updated.application_no, field = slot, "document attached");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/applications/{id}",
    params(("id" = Uuid, Path, description = "Application ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_application(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_application(id).await?, "application", id)
}
