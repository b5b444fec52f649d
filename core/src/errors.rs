use thiserror::Error;

/// Errors raised while talking to the completion provider or loading configuration
#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("API Error: {0}")]
    ApiError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Generation cancelled")]
    Cancelled,

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl PlaygroundError {
    /// True when the provider could not be reached at all (as opposed to answering with an error).
    pub fn is_unreachable(&self) -> bool {
        match self {
            PlaygroundError::RequestError(_) => true,
            PlaygroundError::ReqwestError(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Result type for playground operations
pub type PlaygroundResult<T> = Result<T, PlaygroundError>;
