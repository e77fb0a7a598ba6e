//! HTTP handlers, one module per resource family.
//!
//! Handlers never check roles by hand: the required roles are part of each signature
//! through `Authorized<P>`, and ownership checks that depend on the record happen after
//! it is loaded.

use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

pub mod account;
pub mod applications;
pub mod business;
pub mod geo;
pub mod pages;
pub mod upload;

pub use account::*;
pub use applications::*;
pub use business::*;
pub use geo::*;
pub use pages::*;
pub use upload::*;

// --- Filter Structs ---

/// BarangayFilter
///
/// Optional `?barangay_id=` narrowing for zone and hazard listings.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BarangayFilter {
    pub barangay_id: Option<Uuid>,
}

/// Turns a missing record into the 404 body.
pub(crate) fn found<T>(record: Option<T>, kind: &str, id: Uuid) -> Result<T, ApiError> {
    record.ok_or_else(|| ApiError::NotFound(format!("{kind} {id}")))
}

pub(crate) fn deleted(removed: bool, kind: &str, id: Uuid) -> Result<StatusCode, ApiError> {
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("{kind} {id}")))
    }
}
