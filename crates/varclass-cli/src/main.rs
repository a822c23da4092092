//! varclass — classify sequence variants from the command line.
//!
//! Reads classification requests as JSON, resolves facts through the
//! configured providers and the on-disk cache, and prints one report per
//! request to stdout. Logs go to stderr; set RUST_LOG to change the level.

mod input;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use varclass_cache::CacheKey;
use varclass_classifier::{ClassificationPipeline, ClassificationRequest};
use varclass_common::sandbox::AllowlistClient;
use varclass_common::{Consequence, FactCategory, GuidelineVersion};
use varclass_config::Config;
use varclass_providers::{build_providers, SourcePriorityFetcher};

use crate::input::{parse_build, parse_locus, read_requests};

#[derive(Parser)]
#[command(name = "varclass", about = "Variant pathogenicity classifier", version)]
struct Cli {
    /// Config file (default: $VARCLASS_CONFIG, then ./varclass.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify requests from a JSON file ("-" for stdin)
    Classify {
        input: PathBuf,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Classify a single variant given on the command line
    Variant {
        /// CHROM-POS-REF-ALT, e.g. 17-7673802-C-T
        locus: String,

        #[arg(long, default_value = "GRCh38")]
        build: String,

        #[arg(short, long)]
        gene: Option<String>,

        #[arg(long)]
        hgvs_c: Option<String>,

        #[arg(long)]
        hgvs_p: Option<String>,

        /// e.g. missense_variant, stop_gained
        #[arg(long)]
        consequence: Option<String>,

        /// Observed HPO term or free text; repeatable
        #[arg(short, long = "phenotype")]
        phenotypes: Vec<String>,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Inspect or invalidate the provider cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },

    /// Load and validate the configuration, then print the effective profile
    CheckConfig,
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Entry counts per category
    Stats,

    /// Drop one entry, or a whole category when no variant is given
    Invalidate {
        category: String,

        #[arg(long)]
        variant: Option<String>,

        /// Provider name; required with --variant
        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value = "GRCh38")]
        build: String,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Override the configured guideline version (2015 or 2023)
    #[arg(long)]
    guideline: Option<String>,

    /// Serve facts from the cache and the request only; no provider calls
    #[arg(long)]
    offline: bool,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("varclass=info,warn")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Classify { input, run } => {
            let batch = if input.as_os_str() == "-" {
                read_requests(io::stdin().lock())?
            } else {
                let file = File::open(&input).with_context(|| format!("cannot open {}", input.display()))?;
                read_requests(file)?
            };
            let pipeline = build_pipeline(&config, &run)?;
            info!(requests = batch.requests.len(), version = %pipeline.profile().version, "Classifying");

            if batch.single {
                let Some(request) = batch.requests.into_iter().next() else {
                    bail!("empty input");
                };
                emit(&pipeline.classify(request).await, &run)?;
            } else {
                emit(&pipeline.classify_batch(batch.requests).await, &run)?;
            }
        }

        Commands::Variant { locus, build, gene, hgvs_c, hgvs_p, consequence, phenotypes, run } => {
            let mut variant = parse_locus(&locus, parse_build(&build)?)?;
            if let Some(gene) = gene {
                variant = variant.with_gene(&gene);
            }
            if let Some(hgvs_c) = hgvs_c {
                variant = variant.with_hgvs_c(&hgvs_c);
            }
            if let Some(hgvs_p) = hgvs_p {
                variant = variant.with_hgvs_p(&hgvs_p);
            }
            if let Some(consequence) = consequence {
                variant = variant.with_consequence(Consequence::from_str(&consequence));
            }

            let pipeline = build_pipeline(&config, &run)?;
            let request = ClassificationRequest::new(variant).with_phenotypes(phenotypes);
            emit(&pipeline.classify(request).await, &run)?;
        }

        Commands::Cache { action } => run_cache(&config, action).await?,

        Commands::CheckConfig => {
            let profile = config.profile()?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
            println!("cache: {}", config.cache_dir().display());
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config, run: &RunOptions) -> Result<ClassificationPipeline> {
    let mut profile = config.profile()?;
    if let Some(version) = &run.guideline {
        profile.version = GuidelineVersion::from_str(version)
            .with_context(|| format!("unknown guideline version {:?} (expected 2015 or 2023)", version))?;
    }

    // Providers are registered offline too: their names and schema versions key the cache.
    let http = AllowlistClient::new()?;
    let mut fetcher = SourcePriorityFetcher::new(Arc::new(config.build_cache()))
        .with_priority(config.providers.priority.clone())
        .with_retry(config.fetch)
        .with_providers(build_providers(&http, &config.providers));
    if run.offline {
        info!("Offline: cache only, no provider calls");
        fetcher = fetcher.cache_only();
    }

    Ok(ClassificationPipeline::new(Arc::new(fetcher), profile)
        .with_concurrency(config.classification.batch_concurrency))
}

fn emit<T: Serialize>(report: &T, run: &RunOptions) -> Result<()> {
    let json = if run.pretty { serde_json::to_string_pretty(report)? } else { serde_json::to_string(report)? };
    match &run.output {
        Some(path) => {
            std::fs::write(path, json + "\n").with_context(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

async fn run_cache(config: &Config, action: CacheCommand) -> Result<()> {
    let cache = config.build_cache();
    match action {
        CacheCommand::Stats => {
            let stats = cache.stats().await?;
            println!("cache: {}", cache.root().display());
            for (category, count) in &stats.entries {
                println!("  {:<12} {}", category.as_str(), count);
            }
            println!("  {:<12} {}", "total", stats.total);
        }

        CacheCommand::Invalidate { category, variant, source, build } => {
            let category = FactCategory::from_str(&category)
                .with_context(|| format!("unknown category {:?}", category))?;
            match variant {
                None => {
                    let removed = cache.invalidate_category(category).await?;
                    println!("removed {} {} entries", removed, category);
                }
                Some(locus) => {
                    let Some(source) = source else {
                        bail!("--source is required with --variant");
                    };
                    let http = AllowlistClient::new()?;
                    let Some(provider) = build_providers(&http, &config.providers)
                        .into_iter()
                        .find(|p| p.name() == source)
                    else {
                        bail!("unknown provider {:?}", source);
                    };
                    let variant = parse_locus(&locus, parse_build(&build)?)?;
                    let key = CacheKey::new(category, provider.name(), &variant.id(), provider.schema_version());
                    let removed = cache.invalidate(&key).await?;
                    println!("{}", if removed { "removed 1 entry" } else { "no entry" });
                }
            }
        }
    }
    Ok(())
}
