use thiserror::Error;
use varclass_common::ValidationError;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("payload rejected by validator: {0}")]
    Invalid(#[from] ValidationError),

    #[error("payload is not a {expected} bundle")]
    WrongCategory { expected: String },

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
