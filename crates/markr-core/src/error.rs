use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkrError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt stored record: {0}")]
    Corrupt(String),
}

pub type MarkrResult<T> = Result<T, MarkrError>;
