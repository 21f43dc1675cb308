use crate::admin::{
    create_staff, dashboard_counts, delete_staff, read_vehicle_form, store_vehicle, upload_image,
    NewStaffUser,
};
use crate::app_state::AppState;
use crate::auth::CurrentUser;
use crate::catalog::listing::{list_vehicles, ListingPage};
use crate::catalog::{Audience, QueryParams};
use crate::data_models::DashboardCounts;
use crate::db::{FinancingApplication, StaffUser, Vehicle, VehicleStore};
use crate::errors::AppErrors;
use crate::routes::parse_kind;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Json, Result};
use axum::{Extension, Form};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid, AppErrors> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppErrors::NotFound)
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardCounts>, AppErrors> {
    Ok(Json(dashboard_counts(&state.db).await?))
}

pub async fn vehicles(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<ListingPage>, AppErrors> {
    let page = list_vehicles(
        state.db.as_ref(),
        parse_kind(&kind)?,
        Audience::Admin,
        params,
        state.current_year(),
    )
    .await?;
    Ok(Json(page))
}

pub async fn vehicle(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Vehicle>, AppErrors> {
    let vehicle = state
        .db
        .get_vehicle(parse_kind(&kind)?, parse_id(&id)?)
        .await?
        .ok_or(AppErrors::NotFound)?;
    Ok(Json(vehicle))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Vehicle>), AppErrors> {
    let kind = parse_kind(&kind)?;
    let (draft, images) = read_vehicle_form(multipart).await?;
    let vehicle = store_vehicle(&state.db, &state.uploads, kind, draft, images, None).await?;
    info!("{} added {kind} vehicle {}", user.email, vehicle.id);
    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((kind, id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<Json<Vehicle>, AppErrors> {
    let kind = parse_kind(&kind)?;
    let existing = state
        .db
        .get_vehicle(kind, parse_id(&id)?)
        .await?
        .ok_or(AppErrors::NotFound)?;
    let (draft, images) = read_vehicle_form(multipart).await?;
    let vehicle = store_vehicle(
        &state.db,
        &state.uploads,
        kind,
        draft,
        images,
        Some(&existing),
    )
    .await?;
    info!("{} updated {kind} vehicle {}", user.email, vehicle.id);
    Ok(Json(vehicle))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<StatusCode, AppErrors> {
    let kind = parse_kind(&kind)?;
    let id = parse_id(&id)?;
    if !state.db.delete_vehicle(kind, id).await? {
        return Err(AppErrors::NotFound);
    }
    info!("{} deleted {kind} vehicle {id}", user.email);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppErrors> {
    let path = upload_image(multipart, &state.uploads).await?;
    Ok((StatusCode::CREATED, Json(json!({ "path": path }))))
}

pub async fn users(State(state): State<AppState>) -> Result<Json<Vec<StaffUser>>, AppErrors> {
    Ok(Json(state.db.all_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Form(form): Form<NewStaffUser>,
) -> Result<(StatusCode, Json<StaffUser>), AppErrors> {
    let user = create_staff(&state.db, &state.settings.auth, form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(CurrentUser(current)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppErrors> {
    delete_staff(&state.db, &current, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn financing(
    State(state): State<AppState>,
) -> Result<Json<Vec<FinancingApplication>>, AppErrors> {
    Ok(Json(state.db.all_financing().await?))
}
