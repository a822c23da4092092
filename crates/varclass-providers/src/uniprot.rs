//! UniProt feature lookup for human proteins.
//!
//! Two calls: resolve the gene symbol to a reviewed accession, then read the
//! entry's sequence features.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use varclass_common::sandbox::AllowlistClient;
use varclass_common::facts::{ProteinRegion, RegionKind};
use varclass_common::{CategoryFacts, DomainFacts, FactCategory, Sourced, Variant};

use crate::client::{at_path, count, send_json, send_json_optional, unsupported, ProviderClient};
use crate::error::FetchError;

const UNIPROT_URL: &str = "https://rest.uniprot.org/uniprotkb";
const HUMAN_TAXON: &str = "9606";

pub const NAME: &str = "uniprot";

/// Evidence tier attached to each feature kind.
pub fn region_tier(kind: RegionKind) -> f64 {
    match kind {
        RegionKind::Domain | RegionKind::ActiveSite | RegionKind::BindingSite => 0.80,
        RegionKind::Region | RegionKind::Motif => 0.60,
        RegionKind::Hotspot => 0.95,
        RegionKind::Repeat | RegionKind::CompositionalBias => 0.20,
    }
}

pub struct UniProtClient {
    client: AllowlistClient,
    base_url: String,
}

impl UniProtClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: UNIPROT_URL.to_string() }
    }

    async fn accession(&self, gene: &str) -> Result<Option<String>, FetchError> {
        let query = format!("gene_exact:{} AND organism_id:{} AND reviewed:true", gene, HUMAN_TAXON);
        let request = self
            .client
            .get(&format!("{}/search", self.base_url))?
            .query(&[("query", query.as_str()), ("format", "json"), ("size", "1")]);
        let doc = send_json(request, NAME).await?;
        Ok(doc["results"]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|r| r["primaryAccession"].as_str())
            .map(str::to_string))
    }
}

/// Map a UniProtKB entry's `features` onto protein regions.
pub fn parse_features(entry: &Value) -> Vec<ProteinRegion> {
    let features = entry["features"].as_array().cloned().unwrap_or_default();
    features
        .iter()
        .filter_map(|f| {
            let kind = RegionKind::from_uniprot(f["type"].as_str()?)?;
            let start = at_path(f, "location.start.value").and_then(count)?;
            let end = at_path(f, "location.end.value").and_then(count)?;
            let (start, end) = (u32::try_from(start).ok()?, u32::try_from(end).ok()?);
            if start == 0 || start > end {
                return None;
            }
            let name = f["description"]
                .as_str()
                .filter(|d| !d.is_empty())
                .unwrap_or(kind.as_str())
                .to_string();
            Some(ProteinRegion { name, kind, start, end, tier: region_tier(kind) })
        })
        .collect()
}

#[async_trait]
impl ProviderClient for UniProtClient {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Domain]
    }

    #[instrument(skip(self, variant), fields(variant = %variant.key()))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        if category != FactCategory::Domain {
            return Err(unsupported(NAME, category));
        }
        let Some(gene) = variant.gene.as_deref() else {
            return Ok(CategoryFacts::empty(category));
        };
        let Some(accession) = self.accession(gene).await? else {
            debug!(gene, "No reviewed UniProt entry");
            return Ok(CategoryFacts::empty(category));
        };

        let url = format!("{}/{}.json", self.base_url, accession);
        let entry = send_json_optional(self.client.get(&url)?, NAME).await?;
        let Some(entry) = entry else {
            return Ok(CategoryFacts::empty(category));
        };
        let regions = parse_features(&entry);
        debug!(gene, accession = %accession, regions = regions.len(), "UniProt features parsed");

        Ok(CategoryFacts::Domain(DomainFacts {
            hotspots: None,
            regions: Some(Sourced::new(regions, NAME)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_features() {
        let entry = json!({
            "primaryAccession": "P04637",
            "features": [
                { "type": "Domain", "description": "",
                  "location": { "start": { "value": 102 }, "end": { "value": 292 } } },
                { "type": "Region", "description": "Interaction with DNA",
                  "location": { "start": { "value": 102 }, "end": { "value": 292 } } },
                { "type": "Compositional bias", "description": "Pro residues",
                  "location": { "start": { "value": 64 }, "end": { "value": 92 } } },
                { "type": "Modified residue", "description": "Phosphoserine",
                  "location": { "start": { "value": 15 }, "end": { "value": 15 } } },
                { "type": "Domain", "description": "broken",
                  "location": { "start": { "value": 50 }, "end": { "value": 10 } } }
            ]
        });
        let regions = parse_features(&entry);
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].name, "domain");
        assert_eq!(regions[0].tier, 0.80);
        assert_eq!(regions[1].tier, 0.60);
        assert!(regions[2].kind.is_non_critical());
    }
}
