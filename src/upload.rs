//! Upload authorization.
//!
//! Both upload paths run the same checks in the same order: session, shape, content
//! type, size, ownership. The session check happens in the extractor; everything after
//! it lives here so the presigned and proxied handlers cannot drift apart.

use axum::{
    body::Bytes,
    extract::multipart::{Field, Multipart, MultipartError},
    http::StatusCode,
};
use serde_json::{Map, Value, json};
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Session,
    error::ApiError,
    models::{DocumentField, PresignedUploadRequest, Role},
    repository::Repository,
    storage::sanitize_key,
};

/// Largest accepted object, inclusive.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Room for multipart boundaries and the small text parts on top of the file itself.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
pub const ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "application/pdf"];
pub const PRESIGNED_EXPIRY: Duration = Duration::from_secs(10 * 60);
/// Key segment used when an upload is not tied to an application yet.
pub const UNASSIGNED: &str = "unassigned";

/// Lower-cased media type without parameters (`Image/PNG; q=1` → `image/png`).
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns the canonical allowed entry for `raw`, or the error naming the allowed set.
pub fn validate_content_type(raw: &str) -> Result<&'static str, ApiError> {
    let normalized = normalize_content_type(raw);
    ALLOWED_CONTENT_TYPES
        .into_iter()
        .find(|allowed| *allowed == normalized)
        .ok_or_else(|| ApiError::UnsupportedContentType(ALLOWED_CONTENT_TYPES.join(", ")))
}

pub fn validate_size(size: u64) -> Result<(), ApiError> {
    if size > MAX_UPLOAD_BYTES as u64 {
        return Err(ApiError::PayloadTooLarge);
    }
    Ok(())
}

/// File extension for an allowed content type. The client filename is never consulted.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "application/pdf" => "pdf",
        _ => "jpg",
    }
}

/// `applications/<applicationNo | unassigned>/<fieldName>/<uuid>.<ext>`
pub fn build_storage_key(
    application_no: Option<&str>,
    field: DocumentField,
    content_type: &str,
) -> String {
    let scope = application_no
        .map(str::trim)
        .filter(|no| !no.is_empty())
        .unwrap_or(UNASSIGNED);
    sanitize_key(&format!(
        "applications/{scope}/{}/{}.{}",
        field.wire_name(),
        Uuid::new_v4(),
        extension_for(content_type)
    ))
}

/// authorize_target
///
/// Ownership check shared by both paths. An application the caller cannot see is
/// reported as missing; an explicit `ownerId` must be the caller unless they are ADMIN.
pub async fn authorize_target(
    repo: &dyn Repository,
    session: &Session,
    application_no: Option<&str>,
    owner_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(no) = application_no.map(str::trim).filter(|no| !no.is_empty()) {
        match repo.get_application_by_no(no).await? {
            Some(application) if application.visible_to(session.user_id, session.role) => {}
            _ => return Err(ApiError::NotFound(format!("application {no}"))),
        }
    }

    if let Some(owner) = owner_id {
        if owner != session.user_id && session.role != Role::Admin {
            return Err(ApiError::Forbidden(Role::Admin.to_string()));
        }
    }

    Ok(())
}

// --- Path A: presigned ---

/// ValidatedPresign
///
/// A presigned request that passed the shape, content type and size checks.
#[derive(Debug)]
pub struct ValidatedPresign {
    pub field: DocumentField,
    pub content_type: &'static str,
    pub application_no: Option<String>,
    pub owner_id: Option<Uuid>,
    pub file_size: Option<u64>,
}

pub fn validate_presigned(request: PresignedUploadRequest) -> Result<ValidatedPresign, ApiError> {
    request.validate().map_err(wire_field_names)?;

    let field = request
        .field_name
        .parse::<DocumentField>()
        .map_err(|e| ApiError::invalid_field("fieldName", e.to_string()))?;
    let content_type = validate_content_type(&request.content_type)?;
    if let Some(size) = request.file_size {
        validate_size(size)?;
    }

    Ok(ValidatedPresign {
        field,
        content_type,
        application_no: request.application_no,
        owner_id: request.owner_id,
        file_size: request.file_size,
    })
}

/// `validator` reports struct field names; clients sent camelCase.
fn wire_field_names(errors: validator::ValidationErrors) -> ApiError {
    match ApiError::from(errors) {
        ApiError::Validation(Value::Object(fields)) => ApiError::Validation(Value::Object(
            fields
                .into_iter()
                .map(|(name, messages)| (camel_case(&name), messages))
                .collect(),
        )),
        other => other,
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// --- Path B: proxied multipart ---

/// FilePart
///
/// The `file` part as read from the form. `oversized` is set once more than
/// `MAX_UPLOAD_BYTES` arrived; the buffer then holds only what was read up to that point.
#[derive(Debug, Default)]
pub struct FilePart {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub oversized: bool,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<FilePart>,
    pub field_name: Option<String>,
    pub application_no: Option<String>,
    pub owner_id: Option<String>,
}

/// ValidatedUpload
///
/// A proxied upload that passed the shape, content type and size checks.
#[derive(Debug)]
pub struct ValidatedUpload {
    pub field: DocumentField,
    pub content_type: &'static str,
    pub bytes: Bytes,
    pub application_no: Option<String>,
    pub owner_id: Option<Uuid>,
}

/// read_upload_form
///
/// Collects the known parts of a `multipart/form-data` upload. The file is read chunk by
/// chunk and buffering stops as soon as the ceiling is crossed. Unknown parts are skipped.
/// A truncated body (client abort) surfaces as an error, never as a complete form.
pub async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let (bytes, oversized) = read_capped(&mut field, MAX_UPLOAD_BYTES)
                    .await
                    .map_err(multipart_error)?;
                form.file = Some(FilePart {
                    content_type,
                    bytes,
                    oversized,
                });
            }
            "fieldName" => form.field_name = Some(field.text().await.map_err(multipart_error)?),
            "applicationNo" => {
                form.application_no = Some(field.text().await.map_err(multipart_error)?)
            }
            "ownerId" => form.owner_id = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(part = %other, "ignoring unknown multipart part"),
        }
    }

    Ok(form)
}

async fn read_capped(field: &mut Field<'_>, limit: usize) -> Result<(Vec<u8>, bool), MultipartError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if buffer.len() + chunk.len() > limit {
            return Ok((buffer, true));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok((buffer, false))
}

/// A body cut off by the request limit is still the size error the caller expects.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    ApiError::Validation(json!({ "body": [err.body_text()] }))
}

pub fn validate_form(form: UploadForm) -> Result<ValidatedUpload, ApiError> {
    let mut problems = Map::new();

    let file = form.file.filter(|file| file.oversized || !file.bytes.is_empty());
    if file.is_none() {
        problems.insert("file".into(), json!(["file is required"]));
    }

    let field_name = form
        .field_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let field = match field_name.as_deref().map(str::parse::<DocumentField>) {
        None => {
            problems.insert("fieldName".into(), json!(["fieldName is required"]));
            None
        }
        Some(Err(e)) => {
            problems.insert("fieldName".into(), json!([e.to_string()]));
            None
        }
        Some(Ok(field)) => Some(field),
    };

    let owner_id = match form.owner_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        None => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                problems.insert("ownerId".into(), json!(["ownerId must be a UUID"]));
                None
            }
        },
    };

    let (Some(file), Some(field), true) = (file, field, problems.is_empty()) else {
        return Err(ApiError::Validation(Value::Object(problems)));
    };

    let content_type = validate_content_type(file.content_type.as_deref().unwrap_or_default())?;
    if file.oversized {
        return Err(ApiError::PayloadTooLarge);
    }
    validate_size(file.bytes.len() as u64)?;

    Ok(ValidatedUpload {
        field,
        content_type,
        bytes: Bytes::from(file.bytes),
        application_no: form.application_no.filter(|no| !no.trim().is_empty()),
        owner_id,
    })
}
