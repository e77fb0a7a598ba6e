use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{BarangayFilter, deleted, found};
use crate::{
    auth::{AdminOnly, Authorized},
    error::{ApiError, ValidatedJson},
    models::{
        Barangay, BusinessCategory, CreateBarangayRequest, CreateCategoryRequest,
        CreateHazardZoneRequest, CreateZoneRequest, HazardZone, UpdateBarangayRequest,
        UpdateCategoryRequest, UpdateHazardZoneRequest, UpdateZoneRequest, Zone,
    },
    repository::RepositoryState,
};

// Reference data: readable by anyone, maintained by ADMIN.

// --- Barangays ---

#[utoipa::path(
    get,
    path = "/barangays",
    responses((status = 200, description = "All barangays", body = [Barangay]))
)]
pub async fn list_barangays(
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<Barangay>>, ApiError> {
    Ok(Json(repo.list_barangays().await?))
}

#[utoipa::path(
    get,
    path = "/barangays/{id}",
    params(("id" = Uuid, Path, description = "Barangay ID")),
    responses(
        (status = 200, description = "Barangay", body = Barangay),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_barangay(
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Barangay>, ApiError> {
    Ok(Json(found(repo.get_barangay(id).await?, "barangay", id)?))
}

/// create_barangay
///
/// [Admin Route] Adds a barangay to the municipal reference data.
#[utoipa::path(
    post,
    path = "/barangays",
    request_body = CreateBarangayRequest,
    responses(
        (status = 201, description = "Created", body = Barangay),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn create_barangay(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateBarangayRequest>,
) -> Result<(StatusCode, Json<Barangay>), ApiError> {
    let barangay = repo.create_barangay(payload).await?;
    tracing::info!(barangay_id = %barangay.id, "barangay created");
    Ok((StatusCode::CREATED, Json(barangay)))
}

#[utoipa::path(
    put,
    path = "/barangays/{id}",
    params(("id" = Uuid, Path, description = "Barangay ID")),
    request_body = UpdateBarangayRequest,
    responses((status = 200, description = "Updated", body = Barangay))
)]
pub async fn update_barangay(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateBarangayRequest>,
) -> Result<Json<Barangay>, ApiError> {
    Ok(Json(found(repo.update_barangay(id, payload).await?, "barangay", id)?))
}

/// delete_barangay
///
/// [Admin Route] Fails with 409 while applications still reference the barangay.
#[utoipa::path(
    delete,
    path = "/barangays/{id}",
    params(("id" = Uuid, Path, description = "Barangay ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Still referenced")
    )
)]
pub async fn delete_barangay(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_barangay(id).await?, "barangay", id)
}

// --- Business categories ---

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All business categories", body = [BusinessCategory]))
)]
pub async fn list_categories(
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<BusinessCategory>>, ApiError> {
    Ok(Json(repo.list_categories().await?))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category", body = BusinessCategory))
)]
pub async fn get_category(
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessCategory>, ApiError> {
    Ok(Json(found(repo.get_category(id).await?, "category", id)?))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses((status = 201, description = "Created", body = BusinessCategory))
)]
pub async fn create_category(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<BusinessCategory>), ApiError> {
    let category = repo.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses((status = 200, description = "Updated", body = BusinessCategory))
)]
pub async fn update_category(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<BusinessCategory>, ApiError> {
    Ok(Json(found(repo.update_category(id, payload).await?, "category", id)?))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_category(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_category(id).await?, "category", id)
}

// --- Zones ---

#[utoipa::path(
    get,
    path = "/zones",
    params(BarangayFilter),
    responses((status = 200, description = "Zones, optionally for one barangay", body = [Zone]))
)]
pub async fn list_zones(
    State(repo): State<RepositoryState>,
    Query(filter): Query<BarangayFilter>,
) -> Result<Json<Vec<Zone>>, ApiError> {
    Ok(Json(repo.list_zones(filter.barangay_id).await?))
}

#[utoipa::path(
    get,
    path = "/zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    responses((status = 200, description = "Zone", body = Zone))
)]
pub async fn get_zone(
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Zone>, ApiError> {
    Ok(Json(found(repo.get_zone(id).await?, "zone", id)?))
}

#[utoipa::path(
    post,
    path = "/zones",
    request_body = CreateZoneRequest,
    responses((status = 201, description = "Created", body = Zone))
)]
pub async fn create_zone(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateZoneRequest>,
) -> Result<(StatusCode, Json<Zone>), ApiError> {
    let zone = repo.create_zone(payload).await?;
    tracing::info!(zone_id = %zone.id, code = %zone.code, "zone created");
    Ok((StatusCode::CREATED, Json(zone)))
}

#[utoipa::path(
    put,
    path = "/zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    request_body = UpdateZoneRequest,
    responses((status = 200, description = "Updated", body = Zone))
)]
pub async fn update_zone(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateZoneRequest>,
) -> Result<Json<Zone>, ApiError> {
    Ok(Json(found(repo.update_zone(id, payload).await?, "zone", id)?))
}

#[utoipa::path(
    delete,
    path = "/zones/{id}",
    params(("id" = Uuid, Path, description = "Zone ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_zone(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_zone(id).await?, "zone", id)
}

// --- Hazard zones ---

#[utoipa::path(
    get,
    path = "/hazards",
    params(BarangayFilter),
    responses((status = 200, description = "Hazard zones", body = [HazardZone]))
)]
pub async fn list_hazards(
    State(repo): State<RepositoryState>,
    Query(filter): Query<BarangayFilter>,
) -> Result<Json<Vec<HazardZone>>, ApiError> {
    Ok(Json(repo.list_hazards(filter.barangay_id).await?))
}

#[utoipa::path(
    get,
    path = "/hazards/{id}",
    params(("id" = Uuid, Path, description = "Hazard zone ID")),
    responses((status = 200, description = "Hazard zone", body = HazardZone))
)]
pub async fn get_hazard(
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HazardZone>, ApiError> {
    Ok(Json(found(repo.get_hazard(id).await?, "hazard zone", id)?))
}

#[utoipa::path(
    post,
    path = "/hazards",
    request_body = CreateHazardZoneRequest,
    responses((status = 201, description = "Created", body = HazardZone))
)]
pub async fn create_hazard(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    ValidatedJson(payload): ValidatedJson<CreateHazardZoneRequest>,
) -> Result<(StatusCode, Json<HazardZone>), ApiError> {
    let hazard = repo.create_hazard(payload).await?;
    Ok((StatusCode::CREATED, Json(hazard)))
}

#[utoipa::path(
    put,
    path = "/hazards/{id}",
    params(("id" = Uuid, Path, description = "Hazard zone ID")),
    request_body = UpdateHazardZoneRequest,
    responses((status = 200, description = "Updated", body = HazardZone))
)]
pub async fn update_hazard(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateHazardZoneRequest>,
) -> Result<Json<HazardZone>, ApiError> {
    Ok(Json(found(repo.update_hazard(id, payload).await?, "hazard zone", id)?))
}

#[utoipa::path(
    delete,
    path = "/hazards/{id}",
    params(("id" = Uuid, Path, description = "Hazard zone ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_hazard(
    _admin: Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    deleted(repo.delete_hazard(id).await?, "hazard zone", id)
}
