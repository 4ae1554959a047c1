use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened or migrated. Fatal to the store.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Malformed query input, e.g. an unparsable date filter.
    #[error("invalid query input: {0}")]
    Validation(String),
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(String),
    #[error("database lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;
