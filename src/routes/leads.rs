use crate::app_state::AppState;
use crate::data_models::Receipt;
use crate::errors::AppErrors;
use crate::leads::contact::{send_message, submit_contact, ContactForm, ModalMessage};
use crate::leads::financing::{submit_financing, FinancingForm};
use axum::extract::State;
use axum::response::{Json, Result};
use axum::Form;
use chrono::Utc;

pub async fn contact_submit(
    State(state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Result<Json<Receipt>, AppErrors> {
    let receipt = submit_contact(state.mailer.as_ref(), &state.settings.mail, form).await?;
    Ok(Json(receipt))
}

pub async fn modal_message(
    State(state): State<AppState>,
    Json(message): Json<ModalMessage>,
) -> Result<Json<Receipt>, AppErrors> {
    let receipt = send_message(state.mailer.as_ref(), &state.settings.mail, message).await?;
    Ok(Json(receipt))
}

pub async fn financing_submit(
    State(state): State<AppState>,
    Form(form): Form<FinancingForm>,
) -> Result<Json<Receipt>, AppErrors> {
    let receipt = submit_financing(
        &state.db,
        state.mailer.as_ref(),
        &state.settings.mail,
        form,
        Utc::now(),
    )
    .await?;
    Ok(Json(receipt))
}
