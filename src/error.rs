use axum::{
    Json,
    extract::{
        FromRequest, Request,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{repository::RepositoryError, storage::StorageError, upload::MAX_UPLOAD_BYTES};

/// ErrorResponse
///
/// The JSON body of every failed API call: `{ "error": ..., "details": ... }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<Value>,
}

/// ApiError
///
/// Every failure a handler can report. None of them are retried by the service;
/// the status code tells the caller whether retrying makes sense.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: a valid session is required")]
    Unauthenticated,

    #[error("Forbidden: this operation requires one of the roles {0}")]
    Forbidden(String),

    /// Field name → messages, as produced by `validator` or assembled by hand.
    #[error("Validation failed")]
    Validation(Value),

    #[error("Invalid file type. Allowed types: {0}")]
    UnsupportedContentType(String),

    #[error("File too large. Maximum size is {}MB", MAX_UPLOAD_BYTES / 1024 / 1024)]
    PayloadTooLarge,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The original storage error message is returned to the caller in `details`.
    #[error("Failed to upload file")]
    Storage(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_)
            | ApiError::UnsupportedContentType(_)
            | ApiError::PayloadTooLarge => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        ApiError::Validation(json!({ field: [message] }))
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation(fields) => Some(fields.clone()),
            ApiError::Storage(message) => Some(Value::String(message.clone())),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid ({})", e.code))
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect::<serde_json::Map<_, _>>();
        ApiError::Validation(Value::Object(details))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(json!({ "body": [rejection.body_text()] }))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(json!({ "body": [rejection.body_text()] }))
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// ValidatedJson
///
/// JSON body extractor that reports malformed bodies in the `ApiError` shape and runs
/// the payload's `validator` rules before the handler sees it.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state).await?;
        payload.validate()?;
        Ok(ValidatedJson(payload))
    }
}
