use crate::app_state::AppState;
use crate::auth::authenticate;
use crate::auth::session::{cleared_cookie, issue_token, session_cookie};
use crate::errors::AppErrors;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Json, Result};
use axum::Form;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppErrors> {
    let user = authenticate(&state.db, &form.email, &form.password).await?;
    let token = issue_token(&user, &state.settings.auth)?;
    info!("{} signed in", user.email);
    Ok((
        [(SET_COOKIE, session_cookie(&token, &state.settings.auth))],
        Json(json!({ "user": user, "redirect": "/admin" })),
    ))
}

pub async fn logout() -> impl IntoResponse {
    (
        [(SET_COOKIE, cleared_cookie())],
        Json(json!({ "redirect": "/" })),
    )
}
