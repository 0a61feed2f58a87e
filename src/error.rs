//! Error types for controller-store

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed database image: {0}")]
    MalformedDatabase(String),

    #[error("Invalid store location: {0}")]
    InvalidLocation(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store not readable after {attempts} attempts: {last}")]
    LoadFailed {
        attempts: u32,
        last: Box<StoreError>,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
