use reqwest::StatusCode;
use thiserror::Error;
use varclass_common::VarclassError;

/// Failure of one provider call.
///
/// Only `Transient` failures are retried by the fetcher. Both kinds end up as
/// "field unavailable" once the retry budget is spent.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Timeout, connection failure, rate limit or server error.
    #[error("transient: {0}")]
    Transient(String),

    /// The provider has no such variant or the request can never succeed.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            FetchError::Transient(m) | FetchError::Permanent(m) => m,
        }
    }

    /// 408, 429 and 5xx are worth retrying; every other non-success is not.
    pub fn from_status(status: StatusCode, provider: &str) -> Self {
        let msg = format!("{} returned HTTP {}", provider, status.as_u16());
        if status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
        {
            FetchError::Transient(msg)
        } else {
            FetchError::Permanent(msg)
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::from_status(status, "provider");
        }
        if e.is_decode() || e.is_builder() {
            FetchError::Permanent(e.to_string())
        } else {
            FetchError::Transient(e.to_string())
        }
    }
}

impl From<VarclassError> for FetchError {
    fn from(e: VarclassError) -> Self {
        match e {
            VarclassError::Http(e) => e.into(),
            other => FetchError::Permanent(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Permanent(format!("undecodable response: {}", e))
    }
}
