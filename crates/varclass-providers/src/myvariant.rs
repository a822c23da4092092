//! MyVariant.info client: dbNSFP predictor scores and gnomAD genome counts.
//!
//! Endpoint: https://myvariant.info/v1/variant/chr{c}:g.{pos}{ref}>{alt}

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{
    CategoryFacts, FactCategory, GenomeBuild, PopulationFacts, Predictor, PredictorFacts, Sourced, Variant,
};

use crate::client::{at_path, count, numeric, send_json_optional, unsupported, ProviderClient};
use crate::error::FetchError;

const MYVARIANT_URL: &str = "https://myvariant.info/v1/variant";
const FIELDS: &str = "dbnsfp,cadd.phred,gnomad_genome";

pub const NAME: &str = "myvariant";

/// dbNSFP paths tried in order for each predictor.
fn predictor_paths(predictor: Predictor) -> &'static [&'static str] {
    match predictor {
        Predictor::Revel => &["dbnsfp.revel.score", "dbnsfp.revel.rankscore"],
        Predictor::CaddPhred => &["dbnsfp.cadd.phred", "cadd.phred"],
        Predictor::AlphaMissense => &["dbnsfp.alphamissense.am_pathogenicity", "dbnsfp.alphamissense.score"],
        Predictor::Sift => &["dbnsfp.sift.score", "dbnsfp.sift4g.score"],
        Predictor::Polyphen2 => &["dbnsfp.polyphen2.hdiv.score", "dbnsfp.polyphen2.hvar.score"],
        Predictor::MetaSvm => &["dbnsfp.metasvm.score"],
        Predictor::Vest4 => &["dbnsfp.vest4.score"],
        Predictor::Fathmm => &["dbnsfp.fathmm.score"],
    }
}

pub struct MyVariantClient {
    client: AllowlistClient,
    base_url: String,
}

impl MyVariantClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: MYVARIANT_URL.to_string() }
    }

    /// HGVS genomic id as MyVariant expects it. Only SNVs are addressable this way.
    fn hgvs_id(variant: &Variant) -> Option<String> {
        if !variant.is_snv() {
            return None;
        }
        Some(format!(
            "chr{}:g.{}{}>{}",
            variant.chromosome, variant.position, variant.reference, variant.alternate
        ))
    }

    async fn lookup(&self, variant: &Variant) -> Result<Option<Value>, FetchError> {
        let Some(id) = Self::hgvs_id(variant) else {
            debug!(variant = %variant.key(), "MyVariant only indexes SNVs by HGVS id");
            return Ok(None);
        };
        let url = format!("{}/{}", self.base_url, id);
        let mut params = vec![("fields", FIELDS)];
        if variant.build == GenomeBuild::GRCh38 {
            params.push(("assembly", "hg38"));
        }
        let request = self.client.get(&url)?.query(&params);
        send_json_optional(request, NAME).await
    }
}

/// Map a MyVariant document onto predictor facts.
pub fn parse_predictors(doc: &Value) -> PredictorFacts {
    let mut facts = PredictorFacts::default();
    for predictor in Predictor::ALL {
        let score = predictor_paths(predictor)
            .iter()
            .filter_map(|path| at_path(doc, path))
            .find_map(numeric);
        if let Some(score) = score {
            facts.scores.insert(predictor, Sourced::new(score, NAME));
        }
    }
    facts
}

/// Map the `gnomad_genome` block onto population facts.
pub fn parse_population(doc: &Value) -> PopulationFacts {
    let mut facts = PopulationFacts::default();
    let Some(g) = at_path(doc, "gnomad_genome") else {
        return facts;
    };
    // Fields are either `{"af": {"af": 0.1, "af_afr": ...}}` or flat numbers.
    let field = |name: &str| at_path(g, &format!("{}.{}", name, name)).or_else(|| g.get(name));

    facts.allele_frequency = field("af").and_then(numeric).map(|v| Sourced::new(v, NAME));
    facts.allele_count = field("ac").and_then(count).map(|v| Sourced::new(v, NAME));
    facts.allele_number = field("an").and_then(count).map(|v| Sourced::new(v, NAME));
    facts.homozygote_count = field("hom").and_then(count).map(|v| Sourced::new(v, NAME));
    facts
}

#[async_trait]
impl ProviderClient for MyVariantClient {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Predictors, FactCategory::Population]
    }

    #[instrument(skip(self, variant), fields(variant = %variant.key()))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        let doc = self.lookup(variant).await?;
        let facts = match (category, doc) {
            (FactCategory::Predictors, Some(doc)) => CategoryFacts::Predictors(parse_predictors(&doc)),
            (FactCategory::Population, Some(doc)) => CategoryFacts::Population(parse_population(&doc)),
            (FactCategory::Predictors | FactCategory::Population, None) => CategoryFacts::empty(category),
            _ => return Err(unsupported(NAME, category)),
        };
        debug!(category = %category, fields = facts.populated_fields().len(), "MyVariant lookup done");
        Ok(facts)
    }
}
