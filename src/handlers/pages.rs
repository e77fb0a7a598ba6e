use axum::{Json, extract::State};

use crate::{
    auth::Session,
    error::ApiError,
    models::{AdminOverview, ApplicationStatus, ZoningApplication},
    repository::{ApplicationFilter, RepositoryState},
};

// Data behind the role pages. The page gate has already checked the role by the time
// these run, so they only shape the query.

/// applicant_dashboard
///
/// [Applicant Page] The caller's own applications, newest first.
#[utoipa::path(
    get,
    path = "/applicant/dashboard",
    responses(
        (status = 200, description = "Own applications", body = [ZoningApplication]),
        (status = 307, description = "Redirect to sign-in or home")
    )
)]
pub async fn applicant_dashboard(
    session: Session,
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<ZoningApplication>>, ApiError> {
    let filter = ApplicationFilter {
        applicant_id: Some(session.user_id),
        ..Default::default()
    };
    Ok(Json(repo.list_applications(filter).await?))
}

/// reviewer_queue
///
/// [Reviewer Page] Applications waiting for or under review.
#[utoipa::path(
    get,
    path = "/reviewer/queue",
    responses(
        (status = 200, description = "Review queue", body = [ZoningApplication]),
        (status = 307, description = "Redirect to sign-in or home")
    )
)]
pub async fn reviewer_queue(
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<ZoningApplication>>, ApiError> {
    let filter = ApplicationFilter {
        statuses: vec![ApplicationStatus::Pending, ApplicationStatus::UnderReview],
        ..Default::default()
    };
    Ok(Json(repo.list_applications(filter).await?))
}

#[utoipa::path(
    get,
    path = "/admin/overview",
    responses(
        (status = 200, description = "Portal counters", body = AdminOverview),
        (status = 307, description = "Redirect to sign-in or home")
    )
)]
pub async fn admin_overview(
    State(repo): State<RepositoryState>,
) -> Result<Json<AdminOverview>, ApiError> {
    Ok(Json(repo.get_overview().await?))
}

/// compliance_approved
///
/// [Compliance Page] Approved applications, the ones compliance officers inspect.
#[utoipa::path(
    get,
    path = "/compliance/approved",
    responses(
        (status = 200, description = "Approved applications", body = [ZoningApplication]),
        (status = 307, description = "Redirect to sign-in or home")
    )
)]
pub async fn compliance_approved(
    State(repo): State<RepositoryState>,
) -> Result<Json<Vec<ZoningApplication>>, ApiError> {
    let filter = ApplicationFilter {
        statuses: vec![ApplicationStatus::Approved],
        ..Default::default()
    };
    Ok(Json(repo.list_applications(filter).await?))
}
