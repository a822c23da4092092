//! ClinVar residue lookup through NCBI E-utilities.
//!
//! `esearch` finds every record at the variant's gene and residue, then
//! `esummary` returns their protein changes and germline classifications.
//! Only substitutions at the same residue with the same reference amino acid
//! are kept.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use varclass_common::facts::{ClinicalAssertion, ClinicalSignificance};
use varclass_common::hgvs::parse_substitution;
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{CategoryFacts, ClinicalFacts, FactCategory, Sourced, Variant};

use crate::client::{send_json, unsupported, ProviderClient};
use crate::error::FetchError;

const EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const MAX_RECORDS: &str = "50";

pub const NAME: &str = "clinvar";

/// Stars for a ClinVar review status string.
pub fn review_stars(status: &str) -> u8 {
    match status.trim().to_lowercase().as_str() {
        "practice guideline" => 4,
        "reviewed by expert panel" => 3,
        "criteria provided, multiple submitters, no conflicts" => 2,
        "criteria provided, single submitter" | "criteria provided, conflicting interpretations"
        | "criteria provided, conflicting classifications" => 1,
        _ => 0,
    }
}

pub struct ClinVarClient {
    client: AllowlistClient,
    base_url: String,
}

impl ClinVarClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: EUTILS_URL.to_string() }
    }

    async fn search(&self, gene: &str, position: u32) -> Result<Vec<String>, FetchError> {
        let term = format!("{}[gene] AND p.{}", gene, position);
        let request = self.client.get(&format!("{}/esearch.fcgi", self.base_url))?.query(&[
            ("db", "clinvar"),
            ("term", term.as_str()),
            ("retmode", "json"),
            ("retmax", MAX_RECORDS),
        ]);
        let doc = send_json(request, NAME).await?;
        Ok(parse_search(&doc))
    }

    async fn summaries(&self, ids: &[String]) -> Result<Value, FetchError> {
        let joined = ids.join(",");
        let request = self
            .client
            .get(&format!("{}/esummary.fcgi", self.base_url))?
            .query(&[("db", "clinvar"), ("id", joined.as_str()), ("retmode", "json")]);
        send_json(request, NAME).await
    }
}

/// Record ids from an `esearch` response.
pub fn parse_search(doc: &Value) -> Vec<String> {
    doc["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Assertions at `position` from an `esummary` response.
///
/// A record lists one or more comma-separated protein changes ("R273H, R134H");
/// only those at `position` with reference residue `ref_aa` are kept. A record
/// whose title names `own_hgvs_c` is the variant itself and is skipped.
pub fn parse_summaries(
    doc: &Value,
    ids: &[String],
    position: u32,
    ref_aa: &str,
    own_hgvs_c: Option<&str>,
) -> Vec<ClinicalAssertion> {
    let mut out = Vec::new();
    for id in ids {
        let record = &doc["result"][id.as_str()];
        if record.is_null() {
            continue;
        }
        let title = record["title"].as_str().unwrap_or_default();
        if own_hgvs_c.is_some_and(|c| title.contains(c)) {
            continue;
        }
        let germline = &record["germline_classification"];
        let significance = ClinicalSignificance::from_description(germline["description"].as_str().unwrap_or_default());
        let review_stars = review_stars(germline["review_status"].as_str().unwrap_or_default());
        let accession = record["accession"].as_str().unwrap_or(id).to_string();

        for change in record["protein_change"].as_str().unwrap_or_default().split(',') {
            let Some(sub) = parse_substitution(change) else { continue };
            let Some(alt) = sub.alt_aa else { continue };
            if sub.position != position || sub.ref_aa != ref_aa {
                continue;
            }
            out.push(ClinicalAssertion {
                accession: accession.clone(),
                protein_change: format!("p.{}{}{}", sub.ref_aa, sub.position, alt),
                significance,
                review_stars,
            });
        }
    }
    out
}

#[async_trait]
impl ProviderClient for ClinVarClient {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Clinical]
    }

    #[instrument(skip(self, variant), fields(variant = %variant.key()))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        if category != FactCategory::Clinical {
            return Err(unsupported(NAME, category));
        }
        let (Some(gene), Some(sub)) = (variant.gene.as_deref(), variant.hgvs_p.as_deref().and_then(parse_substitution))
        else {
            debug!("No gene or protein substitution; residue lookup skipped");
            return Ok(CategoryFacts::empty(category));
        };

        let ids = self.search(gene, sub.position).await?;
        let assertions = if ids.is_empty() {
            Vec::new()
        } else {
            let doc = self.summaries(&ids).await?;
            parse_summaries(&doc, &ids, sub.position, sub.ref_aa, variant.hgvs_c.as_deref())
        };
        debug!(records = ids.len(), kept = assertions.len(), "ClinVar residue lookup done");

        Ok(CategoryFacts::Clinical(ClinicalFacts {
            residue_assertions: Some(Sourced::new(assertions, NAME)),
            constraint: None,
        }))
    }
}
