use crate::app_state::AppState;
use crate::catalog::detail::{vehicle_detail, VehicleDetail};
use crate::catalog::home::home_summary;
use crate::catalog::listing::{list_vehicles, ListingPage};
use crate::catalog::{Audience, QueryParams};
use crate::data_models::HomeSummary;
use crate::db::VehicleKind;
use crate::errors::AppErrors;
use axum::extract::{Path, Query, RawQuery, State};
use axum::response::{Json, Redirect, Result};

pub async fn home(State(state): State<AppState>) -> Result<Json<HomeSummary>, AppErrors> {
    let summary = home_summary(state.db.as_ref()).await?;
    Ok(Json(summary))
}

async fn listing(
    state: &AppState,
    kind: VehicleKind,
    params: QueryParams,
) -> Result<Json<ListingPage>, AppErrors> {
    let page = list_vehicles(
        state.db.as_ref(),
        kind,
        Audience::Public,
        params,
        state.current_year(),
    )
    .await?;
    Ok(Json(page))
}

pub async fn gas_listing(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, AppErrors> {
    listing(&state, VehicleKind::Gas, params).await
}

pub async fn electric_listing(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, AppErrors> {
    listing(&state, VehicleKind::Electric, params).await
}

async fn detail(
    state: &AppState,
    kind: VehicleKind,
    id: &str,
) -> Result<Json<VehicleDetail>, AppErrors> {
    let detail = vehicle_detail(state.db.as_ref(), kind, id)
        .await?
        .ok_or(AppErrors::NotFound)?;
    Ok(Json(detail))
}

pub async fn gas_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleDetail>, AppErrors> {
    detail(&state, VehicleKind::Gas, &id).await
}

pub async fn electric_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleDetail>, AppErrors> {
    detail(&state, VehicleKind::Electric, &id).await
}

/// Old filter links keep their query string.
pub async fn legacy_electric_filter(RawQuery(query): RawQuery) -> Redirect {
    match query.filter(|query| !query.is_empty()) {
        Some(query) => Redirect::permanent(&format!("/electric?{query}")),
        None => Redirect::permanent("/electric"),
    }
}

pub async fn legacy_electric_detail(Path(id): Path<String>) -> Redirect {
    Redirect::permanent(&format!("/electric/booknow/{id}"))
}
