//! Gene → phenotype associations from a local JSON file.
//!
//! Format: `{ "GENE": { "hpo_terms": [...], "disease": "...", "inheritance": "AD" } }`.
//! The file is read once, on first use.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{info, instrument};
use varclass_common::facts::normalise_phenotype_term;
use varclass_common::{CategoryFacts, FactCategory, PhenotypeFacts, Sourced, Variant};

use crate::client::{unsupported, ProviderClient};
use crate::error::FetchError;

pub const NAME: &str = "gene_phenotypes";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneEntry {
    #[serde(default)]
    pub hpo_terms: Vec<String>,
    pub disease: Option<String>,
    pub inheritance: Option<String>,
}

pub struct GenePhenotypeFile {
    path: PathBuf,
    table: OnceCell<HashMap<String, GeneEntry>>,
}

impl GenePhenotypeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), table: OnceCell::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn table(&self) -> Result<&HashMap<String, GeneEntry>, FetchError> {
        self.table
            .get_or_try_init(|| async {
                let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                    FetchError::Permanent(format!("cannot read {}: {}", self.path.display(), e))
                })?;
                let parsed: HashMap<String, GeneEntry> = serde_json::from_str(&raw)?;
                let table: HashMap<String, GeneEntry> = parsed
                    .into_iter()
                    .map(|(gene, entry)| (gene.trim().to_uppercase(), entry))
                    .collect();
                info!(path = %self.path.display(), genes = table.len(), "Loaded gene phenotype table");
                Ok::<_, FetchError>(table)
            })
            .await
    }
}

/// Build phenotype facts for one table entry. Malformed terms are dropped.
pub fn facts_for(entry: &GeneEntry) -> PhenotypeFacts {
    let terms: BTreeSet<String> = entry
        .hpo_terms
        .iter()
        .filter_map(|t| normalise_phenotype_term(t))
        .collect();
    PhenotypeFacts {
        gene_terms: (!terms.is_empty()).then(|| Sourced::new(terms, NAME)),
        disease: entry
            .disease
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(|d| Sourced::new(d.trim().to_string(), NAME)),
        inheritance: entry
            .inheritance
            .as_deref()
            .filter(|i| !i.trim().is_empty())
            .map(|i| Sourced::new(i.trim().to_string(), NAME)),
    }
}

#[async_trait]
impl ProviderClient for GenePhenotypeFile {
    fn name(&self) -> &str {
        NAME
    }

    fn schema_version(&self) -> &str {
        "1"
    }

    fn categories(&self) -> &[FactCategory] {
        &[FactCategory::Phenotype]
    }

    #[instrument(skip(self, variant), fields(gene = ?variant.gene))]
    async fn fetch(&self, category: FactCategory, variant: &Variant) -> Result<CategoryFacts, FetchError> {
        if category != FactCategory::Phenotype {
            return Err(unsupported(NAME, category));
        }
        let Some(gene) = variant.gene.as_deref() else {
            return Ok(CategoryFacts::empty(category));
        };
        let table = self.table().await?;
        let facts = table.get(gene).map(facts_for).unwrap_or_default();
        Ok(CategoryFacts::Phenotype(facts))
    }
}
