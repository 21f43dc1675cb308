use crate::errors::AppErrors;
use tokio::task::spawn_blocking;

pub async fn hash_password(password: String, cost: u32) -> Result<String, AppErrors> {
    Ok(spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

/// A malformed stored hash never verifies.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppErrors> {
    Ok(spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?)
}
