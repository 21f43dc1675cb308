pub mod admin;
pub mod auth;
pub mod catalog;
pub mod leads;

use crate::db::VehicleKind;
use crate::errors::AppErrors;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::str::FromStr;

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Unknown kinds in a path are treated like unknown pages.
pub(crate) fn parse_kind(raw: &str) -> Result<VehicleKind, AppErrors> {
    VehicleKind::from_str(raw).map_err(|_| AppErrors::NotFound)
}
