//! varclass-providers — Provider clients and the source-priority fetcher.
//!
//! Every external source implements [`ProviderClient`]: fetch one fact
//! category for one variant, failing with a [`FetchError`] that says whether
//! a retry could help. The [`SourcePriorityFetcher`] walks the configured
//! providers per category through the validated cache and merges their
//! bundles first-source-wins.

pub mod alphamissense;
pub mod cadd;
pub mod cancerhotspots;
pub mod client;
pub mod clinvar;
pub mod error;
pub mod fetcher;
pub mod gene_phenotypes;
pub mod gnomad;
pub mod mock;
pub mod myvariant;
pub mod registry;
pub mod uniprot;

pub use client::ProviderClient;
pub use error::FetchError;
pub use fetcher::{
    CategoryReport, FetchReport, RetryPolicy, SourceAttempt, SourcePriority, SourcePriorityFetcher, SourceStatus,
    SEED_SOURCE,
};
pub use mock::MockProvider;
pub use registry::{build_providers, is_known_provider, ProviderSettings, KNOWN_PROVIDERS};
