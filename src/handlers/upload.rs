use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
};

use crate::{
    AppState,
    auth::Session,
    error::ApiError,
    models::{PresignedUploadRequest, PresignedUploadResponse, UploadResponse},
    upload::{
        PRESIGNED_EXPIRY, authorize_target, build_storage_key, read_upload_form,
        validate_form, validate_presigned,
    },
};

/// get_presigned_url
///
/// [Authenticated Route] Authorizes a direct client-to-storage upload and returns a PUT URL
/// valid for ten minutes. The URL is bound to the validated content type and, when
/// `fileSize` is declared, to that exact length. Nothing is written to storage here.
///
/// The session is checked before the body is parsed, so an anonymous caller gets 401
/// whatever the payload says.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUploadRequest,
    responses(
        (status = 200, description = "Signed upload URL", body = PresignedUploadResponse),
        (status = 400, description = "Missing fields, file type not allowed or file too large", body = crate::error::ErrorResponse),
        (status = 401, description = "No session", body = crate::error::ErrorResponse),
        (status = 403, description = "ownerId is not the caller", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown application", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_presigned_url(
    session: Session,
    State(state): State<AppState>,
    payload: Result<Json<PresignedUploadRequest>, JsonRejection>,
) -> Result<Json<PresignedUploadResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = validate_presigned(payload)?;

    authorize_target(
        state.repo.as_ref(),
        &session,
        request.application_no.as_deref(),
        request.owner_id,
    )
    .await?;

    let storage_key = build_storage_key(
        request.application_no.as_deref(),
        request.field,
        request.content_type,
    );
    let upload_url = state
        .storage
        .presign_put(
            &storage_key,
            request.content_type,
            request.file_size,
            PRESIGNED_EXPIRY,
        )
        .await?;

    tracing::info!(
        user_id = %session.user_id,
        key = %storage_key,
        content_type = request.content_type,
        "presigned upload issued"
    );

    Ok(Json(PresignedUploadResponse {
        access_url: state.storage.object_url(&storage_key),
        storage_key,
        upload_url,
        field_name: request.field.wire_name().to_string(),
        expires_in: PRESIGNED_EXPIRY.as_secs(),
    }))
}

/// upload_file
///
/// [Authenticated Route] Proxied upload: receives `multipart/form-data` with a `file` part
/// and a `fieldName` part (optionally `applicationNo`, `ownerId`), validates it and writes
/// it to storage exactly once.
///
/// The returned key is not attached to any application; the client follows up with
/// `PUT /applications/{id}/documents`.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content_type = "multipart/form-data", description = "Parts: file, fieldName, applicationNo?, ownerId?"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing parts, file type not allowed or file too large", body = crate::error::ErrorResponse),
        (status = 401, description = "No session", body = crate::error::ErrorResponse),
        (status = 403, description = "ownerId is not the caller", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown application", body = crate::error::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_file(
    session: Session,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let form = read_upload_form(&mut multipart).await?;
    let upload = validate_form(form)?;

    authorize_target(
        state.repo.as_ref(),
        &session,
        upload.application_no.as_deref(),
        upload.owner_id,
    )
    .await?;

    let key = build_storage_key(
        upload.application_no.as_deref(),
        upload.field,
        upload.content_type,
    );
    let size = upload.bytes.len();
    let url = state
        .storage
        .put_object(&key, upload.content_type, upload.bytes)
        .await?;

    tracing::info!(user_id = %session.user_id, key = %key, size, "file uploaded");
    Ok(Json(UploadResponse { key, url }))
}
