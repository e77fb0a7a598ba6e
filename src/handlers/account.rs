use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::found;
use crate::{
    auth::{AdminOnly, Authorized, Session},
    error::{ApiError, ValidatedJson},
    models::{AssignRoleRequest, RegisterUserRequest, Role, User, UserProfile},
    provider::AuthProvider,
    repository::RepositoryState,
};

/// register_user
///
/// [Public Route] Signs the user up with the external auth provider, then mirrors the
/// returned id into a local profile so both systems share the primary key.
///
/// Self-registration always yields an APPLICANT; staff roles are assigned by an ADMIN.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 400, description = "Rejected by validation or by the auth provider"),
        (status = 409, description = "Profile already exists"),
        (status = 500, description = "Auth provider unreachable or failing")
    )
)]
pub async fn register_user(
    State(repo): State<RepositoryState>,
    State(provider): State<AuthProvider>,
    ValidatedJson(payload): ValidatedJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let provider_user_id = provider.sign_up(&payload.email, &payload.password).await?;

    let user = repo
        .create_user(User {
            id: provider_user_id,
            email: payload.email,
            full_name: payload.full_name,
            role: Role::Applicant,
        })
        .await?;

    tracing::info!(user_id = %user.id, "profile registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// get_me
///
/// [Authenticated Route] The caller's profile, including the role their session carries.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current profile", body = UserProfile),
        (status = 401, description = "No session")
    )
)]
pub async fn get_me(
    session: Session,
    State(repo): State<RepositoryState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = found(repo.get_user(session.user_id).await?, "profile", session.user_id)?;
    Ok(Json(user.into()))
}

/// assign_role
///
/// [Admin Route] Changes a profile's role. Sessions read the role from the profile, so
/// the change applies from the user's next request.
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = UserProfile),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown profile")
    )
)]
pub async fn assign_role(
    Authorized(admin, _): Authorized<AdminOnly>,
    State(repo): State<RepositoryState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignRoleRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = found(repo.set_user_role(id, payload.role).await?, "profile", id)?;
    tracing::info!(user_id = %id, role = %user.role, admin_id = %admin.user_id, "role assigned");
    Ok(Json(user.into()))
}
