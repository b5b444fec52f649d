use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid session id {0:?}: use a non-empty name without path separators")]
    InvalidSessionId(String),
}

pub type HistoryResult<T> = Result<T, HistoryStoreError>;
