use thiserror::Error;

use crate::facts::ValidationError;

#[derive(Debug, Error)]
pub enum VarclassError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fact bundle: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid variant: {0}")]
    InvalidVariant(String),

    #[error("Invalid evidence code: {0}")]
    InvalidEvidence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, VarclassError>;
