//! Shared fixtures for varclass tests.

use std::collections::BTreeSet;

use tempfile::TempDir;
use varclass_cache::ValidatedCache;
use varclass_common::facts::{
    ClinicalAssertion, ClinicalSignificance, GeneConstraint, HotspotRecord, ProteinRegion, RegionKind,
};
use varclass_common::{
    ClinicalFacts, ConfidenceLabel, Consequence, Criterion, DomainFacts, EvidenceCode, GenomeBuild, PhenotypeFacts,
    PopulationFacts, Predictor, PredictorFacts, Sourced, Strength, Variant,
};

/// TP53 p.Arg273His (GRCh38), a well-known DNA-binding-domain hotspot.
pub fn tp53_missense() -> Variant {
    Variant::new("17", 7673802, "C", "T", GenomeBuild::GRCh38)
        .expect("valid fixture variant")
        .with_gene("TP53")
        .with_hgvs_c("c.818G>A")
        .with_hgvs_p("p.Arg273His")
        .with_consequence(Consequence::Missense)
}

/// BRCA1 p.Gln1756ProfsTer74 style truncation, declared as a frameshift.
pub fn brca1_frameshift() -> Variant {
    Variant::new("17", 43057062, "TG", "T", GenomeBuild::GRCh38)
        .expect("valid fixture variant")
        .with_gene("BRCA1")
        .with_hgvs_p("p.Gln1756fs")
        .with_consequence(Consequence::Frameshift)
}

/// Three-base deletion removing one residue inside a gene's repeat region.
pub fn in_frame_deletion(gene: &str, residue: &str) -> Variant {
    Variant::new("2", 178_600_000, "ATTG", "A", GenomeBuild::GRCh38)
        .expect("valid fixture variant")
        .with_gene(gene)
        .with_hgvs_p(residue)
        .with_consequence(Consequence::InFrameDeletion)
}

/// A variant with no descriptive annotation at all.
pub fn bare_variant() -> Variant {
    Variant::new("1", 1_000_000, "A", "G", GenomeBuild::GRCh38).expect("valid fixture variant")
}

pub fn population(af: f64, source: &str) -> PopulationFacts {
    PopulationFacts {
        allele_frequency: Some(Sourced::new(af, source)),
        ..Default::default()
    }
}

/// All eight predictors at strongly damaging values.
pub fn damaging_predictors(source: &str) -> PredictorFacts {
    PredictorFacts::default()
        .with(Predictor::Revel, 0.95, source)
        .with(Predictor::CaddPhred, 32.0, source)
        .with(Predictor::AlphaMissense, 0.98, source)
        .with(Predictor::Sift, 0.0, source)
        .with(Predictor::Polyphen2, 1.0, source)
        .with(Predictor::MetaSvm, 0.9, source)
        .with(Predictor::Vest4, 0.93, source)
        .with(Predictor::Fathmm, -5.0, source)
}

/// All eight predictors at clearly tolerated values.
pub fn benign_predictors(source: &str) -> PredictorFacts {
    PredictorFacts::default()
        .with(Predictor::Revel, 0.05, source)
        .with(Predictor::CaddPhred, 2.0, source)
        .with(Predictor::AlphaMissense, 0.08, source)
        .with(Predictor::Sift, 0.8, source)
        .with(Predictor::Polyphen2, 0.01, source)
        .with(Predictor::MetaSvm, 0.05, source)
        .with(Predictor::Vest4, 0.1, source)
        .with(Predictor::Fathmm, 4.0, source)
}

pub fn hotspot_at(position: u32, tumor_count: u32, tier: f64, source: &str) -> DomainFacts {
    DomainFacts {
        hotspots: Some(Sourced::new(
            vec![HotspotRecord { position, tumor_count, mutation_count: tumor_count, tier }],
            source,
        )),
        regions: None,
    }
}

pub fn region(name: &str, kind: RegionKind, start: u32, end: u32, tier: f64) -> ProteinRegion {
    ProteinRegion { name: name.to_string(), kind, start, end, tier }
}

pub fn regions(items: Vec<ProteinRegion>, source: &str) -> DomainFacts {
    DomainFacts { hotspots: None, regions: Some(Sourced::new(items, source)) }
}

pub fn gene_terms(terms: &[&str], source: &str) -> PhenotypeFacts {
    PhenotypeFacts {
        gene_terms: Some(Sourced::new(terms.iter().map(|t| t.to_string()).collect(), source)),
        ..Default::default()
    }
}

pub fn observed(terms: &[&str]) -> BTreeSet<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

pub fn assertion(protein_change: &str, significance: ClinicalSignificance, review_stars: u8) -> ClinicalAssertion {
    ClinicalAssertion {
        accession: format!("VCV-{}", protein_change),
        protein_change: protein_change.to_string(),
        significance,
        review_stars,
    }
}

pub fn residue_assertions(items: Vec<ClinicalAssertion>, source: &str) -> ClinicalFacts {
    ClinicalFacts { residue_assertions: Some(Sourced::new(items, source)), constraint: None }
}

pub fn constraint(pli: Option<f64>, loeuf: Option<f64>, source: &str) -> ClinicalFacts {
    ClinicalFacts { residue_assertions: None, constraint: Some(Sourced::new(GeneConstraint { pli, loeuf }, source)) }
}

/// Evidence code at an explicit strength; panics on an illegal combination.
pub fn code(criterion: Criterion, strength: Strength) -> EvidenceCode {
    EvidenceCode::new(criterion, strength, ConfidenceLabel::High, "fixture", "test")
        .expect("legal fixture strength")
}

/// Evidence code at the criterion's default strength.
pub fn default_code(criterion: Criterion) -> EvidenceCode {
    EvidenceCode::at_default(criterion, ConfidenceLabel::High, "fixture", "test")
}

/// A cache in a fresh temporary directory. Keep the `TempDir` alive.
pub fn temp_cache() -> (TempDir, ValidatedCache) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let cache = ValidatedCache::new(dir.path());
    (dir, cache)
}
