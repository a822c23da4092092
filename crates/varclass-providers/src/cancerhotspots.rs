//! Cancer Hotspots residue lookup.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use varclass_common::sandbox::AllowlistClient;
use varclass_common::facts::HotspotRecord;
use varclass_common::{CategoryFacts, DomainFacts, FactCategory, Sourced, Variant};

use crate::client::{count, send_json_optional, unsupported, ProviderClient};
use crate::error::FetchError;

const HOTSPOTS_URL: &str = "https://www.cancerhotspots.org/api/hotspots/single";

pub const NAME: &str = "cancerhotspots";

/// Evidence tier for a residue mutated in `tumor_count` tumours.
pub fn hotspot_tier(tumor_count: u32) -> f64 {
    match tumor_count {
        n if n >= 10 => 0.95,
        n if n >= 3 => 0.75,
        _ => 0.50,
    }
}

pub struct CancerHotspotsClient {
    client: AllowlistClient,
    base_url: String,
}

impl CancerHotspotsClient {
    pub fn new(client: AllowlistClient) -> Self {
        Self { client, base_url: HOTSPOTS_URL.to_string() }
    }
}

/// Parse hotspot records at `position`. An empty list is a definite
/// "no hotspot here" and is kept as such.
pub fn parse_response(doc: &Value, position: u32) -> Vec<HotspotRecord> {
    let rows = doc
        .as_array()
        .or_else(|| doc.get("data").and_then(Value::as_array))
        .cloned()
        .unwrap_or_default();

    rows.iter()
        .filter_map(|row| {
            let tumor_count = row
                .get("tumorCount")
                .or_else(|| row.get("tumor_count"))
                .and_then(count)?;
            let mutation_count = row
                .get("count")
                .or_else(|| row.get("mutationCount"))
                .and_then(count)
                .unwrap_or(tumor_count);
            let tumor_count = u32::try_from(tumor_count).unwrap_or(u32::MAX);
            Some(HotspotRecord {
                position,
                tumor_count,
                mutation_count: u32::try_from(mutation_count).unwrap_or(u32::MAX),
                tier: hotspot_tier(tumor_count),
            })
        })
        .collect()
}

#[async_trait]
impl ProviderClient for CancerHotspotsClient {
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
        let (Some(gene), Some(position)) = (variant.gene.as_deref(), variant.amino_acid_position()) else {
            debug!("No gene or protein position; hotspot lookup skipped");
            return Ok(CategoryFacts::empty(category));
        };

        let url = format!("{}/{}/{}", self.base_url, gene, position);
        let doc = send_json_optional(self.client.get(&url)?, NAME).await?;
        let records = doc.map(|d| parse_response(&d, position)).unwrap_or_default();

        Ok(CategoryFacts::Domain(DomainFacts {
            hotspots: Some(Sourced::new(records, NAME)),
            regions: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tiers() {
        assert_eq!(hotspot_tier(42), 0.95);
        assert_eq!(hotspot_tier(3), 0.75);
        assert_eq!(hotspot_tier(1), 0.50);
    }

    #[test]
    fn test_parse_records() {
        let doc = json!([{ "hugoSymbol": "TP53", "residue": "R273", "tumorCount": 1290, "count": 1310 }]);
        let records = parse_response(&doc, 273);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tumor_count, 1290);
        assert_eq!(records[0].mutation_count, 1310);
        assert_eq!(records[0].tier, 0.95);
    }

    #[test]
    fn test_empty_list_is_no_hotspot() {
        assert!(parse_response(&json!([]), 10).is_empty());
        assert!(parse_response(&json!({ "message": "none" }), 10).is_empty());
    }
}
