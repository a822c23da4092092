//! CADD PHRED score lookup.
//!
//! The service answers either with a list of objects or with a header row
//! followed by value rows; both are handled.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{CategoryFacts, FactCategory, Predictor, PredictorFacts, Sourced, Variant};

use crate::client::{numeric, send_json_optional, unsupported, ProviderClient};
use crate::error::FetchError;

const CADD_URL: &str = "https://cadd.gs.washington.edu/api/v1.0/scores";

pub const NAME: &str = "cadd";

pub struct CaddClient {
    client: AllowlistClient,
    base_url: String,
}

impl CaddClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: CADD_URL.to_string() }
    }
}

fn phred_of(obj: &Value) -> Option<f64> {
    obj.get("PHRED").or_else(|| obj.get("phred")).and_then(numeric)
}

/// Extract the PHRED score for `alt` from a CADD response.
pub fn parse_response(doc: &Value, alt: &str) -> PredictorFacts {
    let phred = match doc {
        Value::Object(_) => phred_of(doc),
        Value::Array(rows) => match rows.first() {
            // Header row plus value rows.
            Some(Value::Array(header)) => {
                let col = |name: &str| header.iter().position(|h| h.as_str() == Some(name));
                let (phred_col, alt_col) = (col("PHRED"), col("Alt"));
                phred_col.and_then(|pc| {
                    rows.iter().skip(1).filter_map(Value::as_array).find_map(|row| {
                        let alt_ok = alt_col
                            .and_then(|ac| row.get(ac))
                            .and_then(Value::as_str)
                            .map(|a| a.eq_ignore_ascii_case(alt))
                            .unwrap_or(true);
                        if alt_ok { row.get(pc).and_then(numeric) } else { None }
                    })
                })
            }
            _ => rows
                .iter()
                .filter(|r| {
                    r.get("Alt")
                        .and_then(Value::as_str)
                        .map(|a| a.eq_ignore_ascii_case(alt))
                        .unwrap_or(true)
                })
                .find_map(phred_of),
        },
        _ => None,
    };

    let mut facts = PredictorFacts::default();
    if let Some(phred) = phred {
        facts.scores.insert(Predictor::CaddPhred, Sourced::new(phred, NAME));
    }
    facts
}

#[async_trait]
impl ProviderClient for CaddClient {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Predictors]
    }

    #[instrument(skip(self, variant), fields(variant = %variant.key()))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        if category != FactCategory::Predictors {
            return Err(unsupported(NAME, category));
        }
        let url = format!(
            "{}/{}-{}-{}-{}",
            self.base_url, variant.chromosome, variant.position, variant.reference, variant.alternate
        );
        let doc = send_json_optional(self.client.get(&url)?, NAME).await?;
        let facts = doc
            .map(|d| parse_response(&d, &variant.alternate))
            .unwrap_or_default();
        Ok(CategoryFacts::Predictors(facts))
    }
}
