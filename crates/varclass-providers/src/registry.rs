//! Construction of the built-in provider set from settings.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use varclass_common::sandbox::AllowlistClient;

use crate::alphamissense::{self, AlphaMissenseClient};
use crate::cadd::{self, CaddClient};
use crate::cancerhotspots::{self, CancerHotspotsClient};
use crate::client::ProviderClient;
use crate::clinvar::{self, ClinVarClient};
use crate::fetcher::SourcePriority;
use crate::gene_phenotypes::{self, GenePhenotypeFile};
use crate::gnomad::{self, GnomadClient};
use crate::myvariant::{self, MyVariantClient};
use crate::uniprot::{self, UniProtClient};

/// Names of the built-in providers.
pub const KNOWN_PROVIDERS: [&str; 8] = [
    myvariant::NAME,
    alphamissense::NAME,
    cadd::NAME,
    gnomad::NAME,
    cancerhotspots::NAME,
    uniprot::NAME,
    gene_phenotypes::NAME,
    clinvar::NAME,
];

pub fn is_known_provider(name: &str) -> bool {
    KNOWN_PROVIDERS.contains(&name)
}

/// `[providers]` settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub priority: SourcePriority,
    #[serde(default = "default_gnomad_dataset")]
    pub gnomad_dataset: String,
    /// Local gene → phenotype table; the phenotype provider is disabled without it.
    #[serde(default)]
    pub gene_phenotype_file: Option<PathBuf>,
}

fn default_gnomad_dataset() -> String {
    gnomad::DEFAULT_DATASET.to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            priority: SourcePriority::default(),
            gnomad_dataset: default_gnomad_dataset(),
            gene_phenotype_file: None,
        }
    }
}

/// Instantiate every built-in provider the settings enable.
pub fn build_providers(http: &AllowlistClient, settings: &ProviderSettings) -> Vec<Arc<dyn ProviderClient>> {
    let mut providers: Vec<Arc<dyn ProviderClient>> = vec![
        Arc::new(MyVariantClient::new(http.clone())),
        Arc::new(AlphaMissenseClient::new(http.clone())),
        Arc::new(CaddClient::new(http.clone())),
        Arc::new(GnomadClient::new(http.clone()).with_dataset(&settings.gnomad_dataset)),
        Arc::new(CancerHotspotsClient::new(http.clone())),
        Arc::new(UniProtClient::new(http.clone())),
        Arc::new(ClinVarClient::new(http.clone())),
    ];
    match &settings.gene_phenotype_file {
        Some(path) => providers.push(Arc::new(GenePhenotypeFile::new(path.clone()))),
        None => warn!("No gene phenotype file configured; phenotype facts must be supplied with the request"),
    }
    info!(count = providers.len(), "Providers registered");
    providers
}
