use thiserror::Error;

#[derive(Error, Debug)]
pub enum DBError {
    #[error(transparent)]
    Relational(#[from] sea_orm::DbErr),
    #[error(transparent)]
    InMemoryError(#[from] InMemoryError),
    #[error("storage lock was poisoned")]
    LockPoisoned,
    #[error("stored record is corrupt: {0}")]
    CorruptRecord(String),
    #[error("email is already registered")]
    DuplicateEmail,
}

#[derive(Error, Debug)]
pub enum InMemoryError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to read with serde: {0}")]
    SerdeError(#[from] serde_json::error::Error),
}

impl<T> From<std::sync::PoisonError<T>> for DBError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        DBError::LockPoisoned
    }
}
