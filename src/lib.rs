pub mod admin;
pub mod app_state;
pub mod auth;
pub mod catalog;
pub mod configuration;
pub mod data_models;
pub mod db;
pub mod errors;
pub mod leads;
pub mod mailer;
pub mod routes;
pub mod templates;
pub mod uploads;

use crate::app_state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(routes::admin::dashboard))
        .route(
            "/admin/vehicles/:kind",
            get(routes::admin::vehicles).post(routes::admin::create_vehicle),
        )
        .route(
            "/admin/vehicles/:kind/:id",
            get(routes::admin::vehicle)
                .put(routes::admin::update_vehicle)
                .delete(routes::admin::delete_vehicle),
        )
        .route("/admin/images", post(routes::admin::images))
        .route(
            "/admin/users",
            get(routes::admin::users).post(routes::admin::create_user),
        )
        .route(
            "/admin/users/:id",
            axum::routing::delete(routes::admin::delete_user),
        )
        .route("/admin/financing", get(routes::admin::financing))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}

pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.directory());
    let public_prefix = state.uploads.public_prefix().to_string();
    let body_limit = state.settings.uploads.max_body_bytes;

    Router::new()
        .route("/health_check", get(routes::health_check))
        .route("/", get(routes::catalog::home))
        .route("/gas", get(routes::catalog::gas_listing))
        .route("/gas/details/:id", get(routes::catalog::gas_detail))
        .route("/electric", get(routes::catalog::electric_listing))
        .route("/electric/booknow/:id", get(routes::catalog::electric_detail))
        .route("/electric/filter", get(routes::catalog::legacy_electric_filter))
        .route(
            "/electric/filter/booknow/:id",
            get(routes::catalog::legacy_electric_detail),
        )
        .route("/contact/submit", post(routes::leads::contact_submit))
        .route("/send-message", post(routes::leads::modal_message))
        .route("/financing-submit", post(routes::leads::financing_submit))
        .route("/login", post(routes::auth::login))
        .route("/logout", get(routes::auth::logout))
        .merge(admin_routes(state.clone()))
        .nest_service(&public_prefix, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
