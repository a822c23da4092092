//! gnomAD GraphQL client for genome allele counts and gene constraint.
//!
//! A variant the dataset has never observed is reported as
//! `af = 0, ac = 0, an = 0` rather than as missing data. Constraint (pLI and
//! LOEUF) is a gene-level lookup and fills the clinical category.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use varclass_common::facts::GeneConstraint;
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{CategoryFacts, ClinicalFacts, FactCategory, GenomeBuild, PopulationFacts, Sourced, Variant};

use crate::client::{at_path, count, numeric, send_json, unsupported, ProviderClient};
use crate::error::FetchError;

const GNOMAD_API_URL: &str = "https://gnomad.broadinstitute.org/api";

pub const NAME: &str = "gnomad";
pub const DEFAULT_DATASET: &str = "gnomad_r4";

const VARIANT_QUERY: &str = r#"
query VariantFrequency($variantId: String!, $dataset: DatasetId!) {
  variant(variantId: $variantId, dataset: $dataset) {
    genome {
      ac
      an
      ac_hom
      ac_hemi
      filters
      faf95 { popmax popmax_population }
    }
  }
}"#;

const CONSTRAINT_QUERY: &str = r#"
query GeneConstraint($gene: String!, $referenceGenome: ReferenceGenomeId!) {
  gene(gene_symbol: $gene, reference_genome: $referenceGenome) {
    gnomad_constraint { pli oe_lof_upper }
  }
}"#;

pub struct GnomadClient {
    client: AllowlistClient,
    api_url: String,
    dataset: String,
}

impl GnomadClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self {
            client,
            api_url: GNOMAD_API_URL.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
        }
    }

    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset = dataset.to_string();
        self
    }

    /// r4 is GRCh38 only; GRCh37 coordinates go to r2.1.
    fn dataset_for(&self, build: GenomeBuild) -> &str {
        match build {
            GenomeBuild::GRCh37 if self.dataset.starts_with("gnomad_r4") || self.dataset.starts_with("gnomad_r3") => {
                "gnomad_r2_1"
            }
            _ => &self.dataset,
        }
    }
}

fn reference_genome(build: GenomeBuild) -> &'static str {
    match build {
        GenomeBuild::GRCh37 => "GRCh37",
        GenomeBuild::GRCh38 => "GRCh38",
    }
}

fn variant_id(variant: &Variant) -> String {
    format!(
        "{}-{}-{}-{}",
        variant.chromosome, variant.position, variant.reference, variant.alternate
    )
}

/// Map a GraphQL response onto population facts.
///
/// GraphQL reports "variant not found" as an error alongside `variant: null`,
/// which is the ordinary absent-from-dataset case. Any other error payload
/// without data is a permanent failure.
pub fn parse_response(doc: &Value) -> Result<PopulationFacts, FetchError> {
    let variant = at_path(doc, "data.variant");
    let errors = doc.get("errors").and_then(Value::as_array).cloned().unwrap_or_default();

    let Some(variant) = variant else {
        let not_found = errors.is_empty()
            || errors.iter().any(|e| {
                e["message"]
                    .as_str()
                    .map(|m| m.to_lowercase().contains("not found"))
                    .unwrap_or(false)
            });
        if !not_found {
            let msg = errors
                .first()
                .and_then(|e| e["message"].as_str())
                .unwrap_or("unknown GraphQL error");
            return Err(FetchError::Permanent(format!("gnomAD: {}", msg)));
        }
        return Ok(absent());
    };

    let Some(genome) = variant.get("genome").filter(|g| !g.is_null()) else {
        return Ok(absent());
    };

    let mut facts = PopulationFacts::default();
    let ac = genome.get("ac").and_then(count);
    let an = genome.get("an").and_then(count);
    facts.allele_count = ac.map(|v| Sourced::new(v, NAME));
    facts.allele_number = an.map(|v| Sourced::new(v, NAME));
    facts.allele_frequency = match (genome.get("af").and_then(numeric), ac, an) {
        (Some(af), _, _) => Some(af),
        (None, Some(ac), Some(an)) if an > 0 => Some(ac as f64 / an as f64),
        (None, Some(0), Some(0)) => Some(0.0),
        _ => None,
    }
    .map(|v| Sourced::new(v, NAME));
    facts.homozygote_count = genome
        .get("ac_hom")
        .or_else(|| genome.get("homozygote_count"))
        .and_then(count)
        .map(|v| Sourced::new(v, NAME));
    facts.popmax_frequency = at_path(genome, "faf95.popmax")
        .and_then(numeric)
        .map(|v| Sourced::new(v, NAME));
    facts.popmax_population = at_path(genome, "faf95.popmax_population")
        .and_then(Value::as_str)
        .map(|v| Sourced::new(v.to_string(), NAME));
    facts.filters = genome.get("filters").and_then(Value::as_array).map(|f| {
        let names = f.iter().filter_map(Value::as_str).map(str::to_string).collect();
        Sourced::new(names, NAME)
    });
    Ok(facts)
}

/// Map a constraint response. An unknown gene or a gene without constraint
/// metrics yields `None`.
pub fn parse_constraint(doc: &Value) -> Result<Option<GeneConstraint>, FetchError> {
    let Some(constraint) = at_path(doc, "data.gene.gnomad_constraint") else {
        if at_path(doc, "data").is_none() {
            if let Some(msg) = doc["errors"][0]["message"].as_str() {
                if !msg.to_lowercase().contains("not found") {
                    return Err(FetchError::Permanent(format!("gnomAD: {}", msg)));
                }
            }
        }
        return Ok(None);
    };
    let pli = constraint.get("pli").and_then(numeric);
    let loeuf = constraint.get("oe_lof_upper").and_then(numeric);
    Ok((pli.is_some() || loeuf.is_some()).then_some(GeneConstraint { pli, loeuf }))
}

fn absent() -> PopulationFacts {
    PopulationFacts {
        allele_frequency: Some(Sourced::new(0.0, NAME)),
        allele_count: Some(Sourced::new(0, NAME)),
        allele_number: Some(Sourced::new(0, NAME)),
        ..Default::default()
    }
}

#[async_trait]
impl ProviderClient for GnomadClient {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Population, FactCategory::Clinical]
    }

    #[instrument(skip(self, variant), fields(variant = %variant.key()))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        match category {
            FactCategory::Population => self.fetch_frequency(variant).await,
            FactCategory::Clinical => self.fetch_constraint(variant).await,
            other => Err(unsupported(NAME, other)),
        }
    }
}

impl GnomadClient {
    async fn fetch_frequency(&self, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        let dataset = self.dataset_for(variant.build);
        let body = json!({
            "query": VARIANT_QUERY,
            "variables": { "variantId": variant_id(variant), "dataset": dataset },
        });
        let request = self.client.post(&self.api_url)?.json(&body);
        let doc = send_json(request, NAME).await?;
        let facts = parse_response(&doc)?;
        debug!(dataset, af = ?facts.allele_frequency.as_ref().map(|s| s.value), "gnomAD lookup done");
        Ok(CategoryFacts::Population(facts))
    }

    async fn fetch_constraint(&self, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        let Some(gene) = variant.gene.as_deref() else {
            debug!("No gene; constraint lookup skipped");
            return Ok(CategoryFacts::empty(FactCategory::Clinical));
        };
        let body = json!({
            "query": CONSTRAINT_QUERY,
            "variables": { "gene": gene, "referenceGenome": reference_genome(variant.build) },
        });
        let request = self.client.post(&self.api_url)?.json(&body);
        let doc = send_json(request, NAME).await?;
        let constraint = parse_constraint(&doc)?;
        debug!(gene, ?constraint, "gnomAD constraint lookup done");
        Ok(CategoryFacts::Clinical(ClinicalFacts {
            residue_assertions: None,
            constraint: constraint.map(|c| Sourced::new(c, NAME)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::facts::FactBundle;

    #[test]
    fn test_parse_observed_variant() {
        let doc = json!({
            "data": { "variant": { "genome": {
                "ac": 12, "an": 150000, "ac_hom": 1, "ac_hemi": 0,
                "filters": [],
                "faf95": { "popmax": 0.0002, "popmax_population": "nfe" }
            } } }
        });
        let facts = parse_response(&doc).unwrap();
        assert_eq!(facts.allele_count.as_ref().map(|s| s.value), Some(12));
        assert!((facts.allele_frequency.as_ref().unwrap().value - 0.00008).abs() < 1e-12);
        assert_eq!(facts.popmax_population.as_ref().map(|s| s.value.as_str()), Some("nfe"));
        assert_eq!(facts.homozygote_count.as_ref().map(|s| s.value), Some(1));
        assert!(facts.validate().is_ok());
    }

    #[test]
    fn test_absent_variant_is_zero_frequency() {
        let doc = json!({
            "data": { "variant": null },
            "errors": [{ "message": "Variant not found" }]
        });
        let facts = parse_response(&doc).unwrap();
        assert_eq!(facts.allele_frequency.map(|s| s.value), Some(0.0));
        assert_eq!(facts.allele_number.map(|s| s.value), Some(0));
    }

    #[test]
    fn test_other_graphql_errors_are_permanent() {
        let doc = json!({ "errors": [{ "message": "Unknown dataset" }] });
        assert!(matches!(parse_response(&doc), Err(FetchError::Permanent(_))));
    }

    #[test]
    fn test_parse_constraint() {
        let doc = json!({ "data": { "gene": { "gnomad_constraint": { "pli": 0.998, "oe_lof_upper": 0.27 } } } });
        let c = parse_constraint(&doc).unwrap().unwrap();
        assert_eq!(c.pli, Some(0.998));
        assert_eq!(c.loeuf, Some(0.27));

        let no_metrics = json!({ "data": { "gene": { "gnomad_constraint": null } } });
        assert_eq!(parse_constraint(&no_metrics).unwrap(), None);

        let unknown = json!({ "data": { "gene": null }, "errors": [{ "message": "Gene not found" }] });
        assert_eq!(parse_constraint(&unknown).unwrap(), None);

        let broken = json!({ "errors": [{ "message": "Unknown reference genome" }] });
        assert!(matches!(parse_constraint(&broken), Err(FetchError::Permanent(_))));
    }

    #[test]
    fn test_grch37_routes_to_r2() {
        let client = GnomadClient::new(AllowlistClient::new().unwrap());
        assert_eq!(client.dataset_for(GenomeBuild::GRCh37), "gnomad_r2_1");
        assert_eq!(client.dataset_for(GenomeBuild::GRCh38), "gnomad_r4");
    }
}
