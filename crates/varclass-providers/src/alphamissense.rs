//! AlphaMissense pathogenicity lookup.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{CategoryFacts, FactCategory, Predictor, PredictorFacts, Sourced, Variant};

use crate::client::{at_path, numeric, send_json_optional, unsupported, ProviderClient};
use crate::error::FetchError;

const ALPHAMISSENSE_URL: &str = "https://alphamissense.hegelab.org/api/variant";

pub const NAME: &str = "alphamissense";

pub struct AlphaMissenseClient {
    client: AllowlistClient,
    base_url: String,
}

impl AlphaMissenseClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: ALPHAMISSENSE_URL.to_string() }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

pub fn parse_response(doc: &Value) -> PredictorFacts {
    let score = ["am_pathogenicity", "score", "data.am_pathogenicity"]
        .iter()
        .filter_map(|p| at_path(doc, p))
        .find_map(numeric);
    let mut facts = PredictorFacts::default();
    if let Some(score) = score {
        facts.scores.insert(Predictor::AlphaMissense, Sourced::new(score, NAME));
    }
    facts
}

#[async_trait]
impl ProviderClient for AlphaMissenseClient {
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
        // Missense scores only exist for single-nucleotide substitutions.
        if !variant.is_snv() {
            return Ok(CategoryFacts::empty(category));
        }
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.base_url, variant.chromosome, variant.position, variant.reference, variant.alternate
        );
        let doc = send_json_optional(self.client.get(&url)?, NAME).await?;
        Ok(CategoryFacts::Predictors(doc.as_ref().map(parse_response).unwrap_or_default()))
    }
}
