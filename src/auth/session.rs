use crate::configuration::AuthSettings;
use crate::db::StaffUser;
use crate::errors::AppErrors;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub admin: bool,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// HS256 token for `user`, valid for the configured ttl.
pub fn issue_token(user: &StaffUser, settings: &AuthSettings) -> Result<String, AppErrors> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        admin: user.is_admin,
        exp: (now + Duration::hours(settings.session_ttl_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.session_secret.as_bytes()),
    )?)
}

pub fn read_token(token: &str, settings: &AuthSettings) -> Result<Claims, AppErrors> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.session_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str, settings: &AuthSettings) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        settings.session_ttl_hours * 3600
    )
}

pub fn cleared_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}
