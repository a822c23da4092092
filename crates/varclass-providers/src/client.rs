//! The uniform provider contract plus shared HTTP/JSON helpers.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use varclass_common::{CategoryFacts, FactCategory, Variant};

use crate::error::FetchError;

/// One external data source.
///
/// A client never fails because a field is absent upstream; it returns a
/// bundle with that field left empty.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable name used in priority lists, cache keys and `Sourced::source`.
    fn name(&self) -> &str;

    /// Version tag written into cache keys. Bump when the payload shape changes.
    fn schema_version(&self) -> &str;

    /// Categories this client can fill.
    fn categories(&self) -> &[FactCategory];

    fn supports(&self, category: FactCategory) -> bool {
        self.categories().contains(&category)
    }

    /// Fetch one category for one variant.
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError>;
}

pub(crate) fn unsupported(provider: &str, category: FactCategory) -> FetchError {
    FetchError::Permanent(format!("{} does not provide {} facts", provider, category))
}

/// Send a request and decode a JSON body, mapping HTTP failures onto
/// the transient/permanent split.
pub(crate) async fn send_json(request: RequestBuilder, provider: &str) -> Result<Value, FetchError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::from_status(status, provider));
    }
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Like [`send_json`] but a 404 becomes `None` for endpoints where absence
/// just means "no annotation" rather than "no such variant".
pub(crate) async fn send_json_optional(request: RequestBuilder, provider: &str) -> Result<Option<Value>, FetchError> {
    let resp = request.send().await?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(FetchError::from_status(status, provider));
    }
    let body = resp.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&body)?))
}

/// Read a number that may arrive as a JSON number, a numeric string,
/// or a list of those (per-transcript values). Lists are averaged.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let parts: Vec<f64> = s
                .split(|c| c == ';' || c == ',')
                .filter_map(|p| p.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .collect();
            mean(&parts)
        }
        Value::Array(items) => {
            let parts: Vec<f64> = items.iter().filter_map(numeric).collect();
            mean(&parts)
        }
        _ => None,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Walk a dotted path through nested objects.
pub(crate) fn at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key)).filter(|v| !v.is_null())
}

pub(crate) fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
