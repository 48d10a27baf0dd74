use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Price source error: {0}")]
    Source(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Alert not delivered: {0}")]
    AlertNotDelivered(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
