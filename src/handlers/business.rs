use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{deleted, found};
use crate::{
    auth::{AdminOnly, ApplicantOrAdmin, Authorized, Session},
    error::{ApiError, ValidatedJson},
    models::{Business, CreateBusinessRequest, Role, UpdateBusinessRequest},
    repository::RepositoryState,
};

/// Applicants only ever see their own businesses; staff see all of them.
fn visible(business: &Business, session: &Session) -> bool {
    session.role.is_staff() || business.owner_id == session.user_id
}

/// list_businesses
///
/// [Authenticated Route] Applicants get their own businesses, staff get every business.
#[utoipa::path(
    get,
    path = "/businesses",
    responses(
        (status = 200, description = "Businesses visible to the caller", body = [Business]),
        (status = 401, description = "No session")
    )
)]
pub async fn list_businesses(
    session: Session,
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<Business>>, ApiError> {
    let owner = (session.role == Role::Applicant).then_some(session.user_id);
    Ok(Json(repo.list_businesses(owner).await?))
}

#[utoipa::path(
    get,
    path = "/businesses/{id}",
    params(("id" = Uuid, Path, description = "Business ID")),
    responses(
        (status = 200, description = "Business", body = Business),
        (status = 404, description = "Not Found or not visible")
    )
)]
pub async fn get_business(
    session: Session,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Business>, ApiError> {
    let business = repo.get_business(id).await?.filter(|b| visible(b, &session));
    Ok(Json(found(business, "business", id)?))
}

/// create_business
///
/// [Applicant/Admin Route] Registers a business owned by the caller.
#[utoipa::path(
    post,
    path = "/businesses",
    request_body = CreateBusinessRequest,
    responses(
        (status = 201, description = "Created", body = Business),
        (status = 403, description = "Role not allowed")
    )
)]
pub async fn create_business(
    Authorized(session, _): Authorized<ApplicantOrAdmin>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<Business>), ApiError> {
    let business = repo.create_business(payload, session.user_id).await?;
    tracing::info!(business_id = %business.id, owner_id = %session.user_id, "business registered");
    Ok((StatusCode::CREATED, Json(business)))
}

/// update_business
///
/// [Applicant/Admin Route] Owners may edit their business; ADMIN may edit any. Another
/// applicant's business is reported as missing.
#[utoipa::path(
    put,
    path = "/businesses/{id}",
    params(("id" = Uuid, Path, description = "Business ID")),
    request_body = UpdateBusinessRequest,
    responses(
        (status = 200, description = "Updated", body = Business),
        (status = 404, description = "Not Found or not owned")
    )
)]
pub async fn update_business(
    Authorized(session, _): Authorized<ApplicantOrAdmin>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateBusinessRequest>,
) -> Result<Json<Business>, ApiError> {
    found(
        repo.get_business(id).await?.filter(|b| visible(b, &session)),
        "business",
        id,
    )?;
    Ok(Json(found(repo.update_business(id, payload).await?, "business", id)?))
}

#[utoipa::path(
    delete,
    path = "/businesses/{id}",
    params(("id" = Uuid, Path, description = "Business ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_business(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_business(id).await?, "business", id)
}
