pub mod password;
pub mod session;

use crate::app_state::AppState;
use crate::configuration::AuthSettings;
use crate::db::staff_user::normalize_email;
use crate::db::{Database, StaffUser};
use crate::errors::AppErrors;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};

/// The signed-in staff member, inserted by `require_admin`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub StaffUser);

pub async fn authenticate(
    db: &Database,
    email: &str,
    password: &str,
) -> Result<StaffUser, AppErrors> {
    let Some(user) = db.find_user_by_email(&normalize_email(email)).await? else {
        warn!("login attempt for unknown account");
        return Err(AppErrors::InvalidCredentials);
    };
    if !password::verify_password(password.to_string(), user.password_hash.clone()).await? {
        warn!("wrong password for {}", user.email);
        return Err(AppErrors::InvalidCredentials);
    }
    Ok(user)
}

/// Rejects requests without a valid admin session. The user is reloaded
/// from storage so deleted accounts lose access immediately.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppErrors> {
    let token = session::token_from_headers(request.headers()).ok_or(AppErrors::Unauthorized)?;
    let claims =
        session::read_token(token, &state.settings.auth).map_err(|_| AppErrors::Unauthorized)?;
    let id = claims.user_id().ok_or(AppErrors::Unauthorized)?;
    let user = state.db.get_user(id).await?.ok_or(AppErrors::Unauthorized)?;
    if !user.is_admin {
        return Err(AppErrors::Forbidden);
    }
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Creates the configured admin account unless that email already exists.
pub async fn ensure_bootstrap_admin(db: &Database, settings: &AuthSettings) -> Result<(), AppErrors> {
    let Some(admin) = &settings.bootstrap_admin else {
        return Ok(());
    };
    if db.find_user_by_email(&normalize_email(&admin.email)).await?.is_some() {
        return Ok(());
    }
    let hash = password::hash_password(admin.password.clone(), settings.bcrypt_cost).await?;
    let user = db
        .insert_user(StaffUser::new(&admin.name, &admin.email, hash, true))
        .await?;
    info!("created bootstrap admin {}", user.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::BootstrapAdmin;
    use crate::db::in_memory::InMemoryDB;

    fn settings() -> AuthSettings {
        AuthSettings {
            session_secret: "secret".to_string(),
            bcrypt_cost: 4,
            bootstrap_admin: Some(BootstrapAdmin {
                name: "Owner".to_string(),
                email: "Owner@Dealer.test".to_string(),
                password: "changeme1".to_string(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_admin_is_created_once() {
        let db = Database::InMemory(Box::default());
        ensure_bootstrap_admin(&db, &settings()).await.expect("Failed to bootstrap");
        ensure_bootstrap_admin(&db, &settings()).await.expect("Failed to bootstrap twice");
        let users = db.all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "owner@dealer.test");
        assert!(users[0].is_admin);
    }

    #[tokio::test]
    async fn login_checks_password_and_ignores_email_case() {
        let db = Database::InMemory(Box::new(InMemoryDB::default()));
        ensure_bootstrap_admin(&db, &settings()).await.unwrap();
        assert!(authenticate(&db, " OWNER@dealer.test", "changeme1").await.is_ok());
        assert!(matches!(
            authenticate(&db, "owner@dealer.test", "nope").await,
            Err(AppErrors::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&db, "ghost@dealer.test", "changeme1").await,
            Err(AppErrors::InvalidCredentials)
        ));
    }
}
