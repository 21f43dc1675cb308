use crate::db::DatabaseError;
use crate::mailer::MailError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("socket address parsing error: {0}")]
    SocketAddressParsingError(#[from] std::net::AddrParseError),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    ConfigurationError(#[from] ConfigurationError),
    #[error(transparent)]
    AppErrors(#[from] AppErrors),
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown database type")]
    UnknownDatabaseType,
    #[error("data file for in memory database was not found")]
    DataFileNotFound,
    #[error("relational database settings are incomplete")]
    MissingDatabaseSettings,
    #[error("{0}")]
    UnknownEnvironment(String),
    #[error("auth.session_secret must be set")]
    MissingSessionSecret,
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

#[derive(Error, Debug)]
pub enum AppErrors {
    #[error("not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("admin access required")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("mail error: {0}")]
    MailError(#[from] MailError),
    #[error(transparent)]
    ConfigurationError(#[from] ConfigurationError),
    #[error("mail template failed: {0}")]
    Template(#[from] askama::Error),
    #[error("malformed upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
    #[error("upload failed: {0}")]
    UploadError(#[from] std::io::Error),
    #[error("password hashing failed: {0}")]
    PasswordError(#[from] bcrypt::BcryptError),
    #[error("session token error: {0}")]
    SessionError(#[from] jsonwebtoken::errors::Error),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppErrors {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppErrors::NotFound => (StatusCode::NOT_FOUND, json!({ "error": "Not found" })),
            AppErrors::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Please check your form and try again", "fields": errors }),
            ),
            AppErrors::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppErrors::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Please log in to continue" }),
            ),
            AppErrors::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Invalid email or password" }),
            ),
            AppErrors::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Admin access required" }),
            ),
            AppErrors::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            AppErrors::DatabaseError(DatabaseError::DuplicateEmail) => (
                StatusCode::CONFLICT,
                json!({ "error": "A user with this email already exists" }),
            ),
            AppErrors::Multipart(err) => {
                (StatusCode::BAD_REQUEST, json!({ "error": err.body_text() }))
            }
            AppErrors::MailError(err) => {
                error!("mail delivery failed: {err}");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "Sorry, there was an error sending your message. Please try again later." }),
                )
            }
            AppErrors::DatabaseError(err) => {
                error!("storage failure: {err}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Service temporarily unavailable" }),
                )
            }
            other => {
                error!("internal failure: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Something went wrong" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_hide_details() {
        let response =
            AppErrors::DatabaseError(DatabaseError::LockPoisoned).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_is_not_a_server_error() {
        let response = AppErrors::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn session_errors_map_to_status_codes() {
        assert_eq!(
            AppErrors::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppErrors::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppErrors::Conflict("taken".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppErrors::DatabaseError(DatabaseError::DuplicateEmail)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
    }
}
