//! Fact bundles: the typed, per-category facts resolved for one variant.
//!
//! Every field is an `Option<Sourced<T>>` so absence is a typed state and
//! each populated value carries the provider that supplied it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hgvs::parse_substitution;

lazy_static! {
    static ref RE_HPO_ID: Regex = Regex::new(r"^HP:\d{7}$").unwrap();
}

/// Structural or range violation in a fact bundle.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{category} field `{field}`: {reason}")]
pub struct ValidationError {
    pub category: FactCategory,
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(category: FactCategory, field: &str, reason: impl Into<String>) -> Self {
        Self { category, field: field.to_string(), reason: reason.into() }
    }
}

/// Independent data categories resolved per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCategory {
    Population,
    Predictors,
    Domain,
    Phenotype,
    Clinical,
}

impl FactCategory {
    pub const ALL: [FactCategory; 5] = [
        FactCategory::Population,
        FactCategory::Predictors,
        FactCategory::Domain,
        FactCategory::Phenotype,
        FactCategory::Clinical,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "population" => Some(FactCategory::Population),
            "predictors" | "predictor" => Some(FactCategory::Predictors),
            "domain" => Some(FactCategory::Domain),
            "phenotype" => Some(FactCategory::Phenotype),
            "clinical" => Some(FactCategory::Clinical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FactCategory::Population => "population",
            FactCategory::Predictors => "predictors",
            FactCategory::Domain => "domain",
            FactCategory::Phenotype => "phenotype",
            FactCategory::Clinical => "clinical",
        }
    }
}

impl fmt::Display for FactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value tagged with the provider that supplied it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: String,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: &str) -> Self {
        Self { value, source: source.to_string() }
    }
}

/// Fill `slot` from `other` only if it is still empty. Returns true if filled.
fn fill<T>(slot: &mut Option<T>, other: Option<T>) -> bool {
    if slot.is_none() && other.is_some() {
        *slot = other;
        true
    } else {
        false
    }
}

/// Common behaviour of the fact bundles.
pub trait FactBundle: Default + Clone + Serialize + DeserializeOwned {
    const CATEGORY: FactCategory;

    /// Every field the category defines.
    fn field_names() -> Vec<&'static str>;

    /// Names of fields currently populated.
    fn populated_fields(&self) -> Vec<&'static str>;

    /// Copy fields from `other` that are still missing here.
    /// Fields already populated are never overwritten.
    /// Returns the names of fields that were filled.
    fn merge_missing(&mut self, other: Self) -> Vec<&'static str>;

    /// Structural and range checks.
    fn validate(&self) -> Result<(), ValidationError>;

    fn missing_fields(&self) -> Vec<&'static str> {
        let populated = self.populated_fields();
        Self::field_names()
            .into_iter()
            .filter(|f| !populated.contains(f))
            .collect()
    }

    fn is_complete(&self) -> bool {
        self.populated_fields().len() == Self::field_names().len()
    }

    fn is_empty(&self) -> bool {
        self.populated_fields().is_empty()
    }

    /// Distinct providers that contributed at least one field.
    fn sources(&self) -> BTreeSet<String>;
}

// ── Population ──────────────────────────────────────────────────────────────

/// Allele statistics from population databases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationFacts {
    pub allele_frequency: Option<Sourced<f64>>,
    pub allele_count: Option<Sourced<u64>>,
    pub allele_number: Option<Sourced<u64>>,
    pub homozygote_count: Option<Sourced<u64>>,
    /// Filtering allele frequency of the highest sub-population.
    pub popmax_frequency: Option<Sourced<f64>>,
    pub popmax_population: Option<Sourced<String>>,
    pub filters: Option<Sourced<Vec<String>>>,
}

impl PopulationFacts {
    /// Frequency used by the threshold ladder: the larger of overall and popmax.
    pub fn effective_frequency(&self) -> Option<f64> {
        let af = self.allele_frequency.as_ref().map(|s| s.value);
        let popmax = self.popmax_frequency.as_ref().map(|s| s.value);
        match (af, popmax) {
            (Some(a), Some(p)) => Some(a.max(p)),
            (a, p) => a.or(p),
        }
    }
}

impl FactBundle for PopulationFacts {
    const CATEGORY: FactCategory = FactCategory::Population;

    fn field_names() -> Vec<&'static str> {
        vec![
            "allele_frequency",
            "allele_count",
            "allele_number",
            "homozygote_count",
            "popmax_frequency",
            "popmax_population",
            "filters",
        ]
    }

    fn populated_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.allele_frequency.is_some() { out.push("allele_frequency"); }
        if self.allele_count.is_some() { out.push("allele_count"); }
        if self.allele_number.is_some() { out.push("allele_number"); }
        if self.homozygote_count.is_some() { out.push("homozygote_count"); }
        if self.popmax_frequency.is_some() { out.push("popmax_frequency"); }
        if self.popmax_population.is_some() { out.push("popmax_population"); }
        if self.filters.is_some() { out.push("filters"); }
        out
    }

    fn merge_missing(&mut self, other: Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if fill(&mut self.allele_frequency, other.allele_frequency) { filled.push("allele_frequency"); }
        if fill(&mut self.allele_count, other.allele_count) { filled.push("allele_count"); }
        if fill(&mut self.allele_number, other.allele_number) { filled.push("allele_number"); }
        if fill(&mut self.homozygote_count, other.homozygote_count) { filled.push("homozygote_count"); }
        if fill(&mut self.popmax_frequency, other.popmax_frequency) { filled.push("popmax_frequency"); }
        if fill(&mut self.popmax_population, other.popmax_population) { filled.push("popmax_population"); }
        if fill(&mut self.filters, other.filters) { filled.push("filters"); }
        filled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let cat = Self::CATEGORY;
        for (name, freq) in [
            ("allele_frequency", &self.allele_frequency),
            ("popmax_frequency", &self.popmax_frequency),
        ] {
            if let Some(f) = freq {
                if !f.value.is_finite() || !(0.0..=1.0).contains(&f.value) {
                    return Err(ValidationError::new(cat, name, format!("{} outside [0, 1]", f.value)));
                }
            }
        }

        let ac = self.allele_count.as_ref().map(|s| s.value);
        let an = self.allele_number.as_ref().map(|s| s.value);
        if let (Some(ac), Some(an)) = (ac, an) {
            if ac > an {
                return Err(ValidationError::new(cat, "allele_count", format!("{} exceeds allele number {}", ac, an)));
            }
        }
        if let (Some(ac), Some(0)) = (ac, an) {
            if ac > 0 {
                return Err(ValidationError::new(cat, "allele_number", "zero while allele count is positive"));
            }
        }
        Ok(())
    }

    fn sources(&self) -> BTreeSet<String> {
        let mut s = BTreeSet::new();
        if let Some(v) = &self.allele_frequency { s.insert(v.source.clone()); }
        if let Some(v) = &self.allele_count { s.insert(v.source.clone()); }
        if let Some(v) = &self.allele_number { s.insert(v.source.clone()); }
        if let Some(v) = &self.homozygote_count { s.insert(v.source.clone()); }
        if let Some(v) = &self.popmax_frequency { s.insert(v.source.clone()); }
        if let Some(v) = &self.popmax_population { s.insert(v.source.clone()); }
        if let Some(v) = &self.filters { s.insert(v.source.clone()); }
        s
    }
}

// ── Predictors ──────────────────────────────────────────────────────────────

/// Computational predictors the composite evaluator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predictor {
    Revel,
    CaddPhred,
    #[serde(rename = "alphamissense")]
    AlphaMissense,
    Sift,
    Polyphen2,
    #[serde(rename = "metasvm")]
    MetaSvm,
    Vest4,
    Fathmm,
}

impl Predictor {
    pub const ALL: [Predictor; 8] = [
        Predictor::Revel,
        Predictor::CaddPhred,
        Predictor::AlphaMissense,
        Predictor::Sift,
        Predictor::Polyphen2,
        Predictor::MetaSvm,
        Predictor::Vest4,
        Predictor::Fathmm,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "revel" => Some(Predictor::Revel),
            "cadd_phred" | "cadd" => Some(Predictor::CaddPhred),
            "alphamissense" => Some(Predictor::AlphaMissense),
            "sift" => Some(Predictor::Sift),
            "polyphen2" | "polyphen" => Some(Predictor::Polyphen2),
            "metasvm" => Some(Predictor::MetaSvm),
            "vest4" => Some(Predictor::Vest4),
            "fathmm" => Some(Predictor::Fathmm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Predictor::Revel => "revel",
            Predictor::CaddPhred => "cadd_phred",
            Predictor::AlphaMissense => "alphamissense",
            Predictor::Sift => "sift",
            Predictor::Polyphen2 => "polyphen2",
            Predictor::MetaSvm => "metasvm",
            Predictor::Vest4 => "vest4",
            Predictor::Fathmm => "fathmm",
        }
    }

    /// Native value range accepted by the validator.
    pub fn valid_range(&self) -> (f64, f64) {
        match self {
            Predictor::CaddPhred => (0.0, 99.0),
            Predictor::Fathmm => (-20.0, 20.0),
            _ => (0.0, 1.0),
        }
    }

    /// Lower native score means more damaging.
    pub fn is_inverted(&self) -> bool {
        matches!(self, Predictor::Sift | Predictor::Fathmm)
    }
}

/// One score per predictor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorFacts {
    pub scores: BTreeMap<Predictor, Sourced<f64>>,
}

impl PredictorFacts {
    pub fn with(mut self, predictor: Predictor, value: f64, source: &str) -> Self {
        self.scores.insert(predictor, Sourced::new(value, source));
        self
    }

    pub fn get(&self, predictor: Predictor) -> Option<f64> {
        self.scores.get(&predictor).map(|s| s.value)
    }
}

impl FactBundle for PredictorFacts {
    const CATEGORY: FactCategory = FactCategory::Predictors;

    fn field_names() -> Vec<&'static str> {
        Predictor::ALL.iter().map(|p| p.as_str()).collect()
    }

    fn populated_fields(&self) -> Vec<&'static str> {
        self.scores.keys().map(|p| p.as_str()).collect()
    }

    fn merge_missing(&mut self, other: Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        for (predictor, score) in other.scores {
            if !self.scores.contains_key(&predictor) {
                self.scores.insert(predictor, score);
                filled.push(predictor.as_str());
            }
        }
        filled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (predictor, score) in &self.scores {
            let (lo, hi) = predictor.valid_range();
            if !score.value.is_finite() || score.value < lo || score.value > hi {
                return Err(ValidationError::new(
                    Self::CATEGORY,
                    predictor.as_str(),
                    format!("{} outside [{}, {}]", score.value, lo, hi),
                ));
            }
        }
        Ok(())
    }

    fn sources(&self) -> BTreeSet<String> {
        self.scores.values().map(|s| s.source.clone()).collect()
    }
}

// ── Domain / hotspot ────────────────────────────────────────────────────────

/// Kind of annotated protein region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Hotspot,
    Domain,
    ActiveSite,
    BindingSite,
    Region,
    Motif,
    Repeat,
    CompositionalBias,
}

impl RegionKind {
    /// Map a UniProt feature type.
    pub fn from_uniprot(feature_type: &str) -> Option<Self> {
        match feature_type {
            "Domain" => Some(RegionKind::Domain),
            "Active site" => Some(RegionKind::ActiveSite),
            "Binding site" => Some(RegionKind::BindingSite),
            "Region" => Some(RegionKind::Region),
            "Motif" => Some(RegionKind::Motif),
            "Repeat" => Some(RegionKind::Repeat),
            "Compositional bias" => Some(RegionKind::CompositionalBias),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Hotspot => "hotspot",
            RegionKind::Domain => "domain",
            RegionKind::ActiveSite => "active_site",
            RegionKind::BindingSite => "binding_site",
            RegionKind::Region => "region",
            RegionKind::Motif => "motif",
            RegionKind::Repeat => "repeat",
            RegionKind::CompositionalBias => "compositional_bias",
        }
    }

    /// Repetitive or low-complexity stretches with no known function.
    pub fn is_non_critical(&self) -> bool {
        matches!(self, RegionKind::Repeat | RegionKind::CompositionalBias)
    }
}

/// A named protein region with amino acid boundaries and an evidence tier in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinRegion {
    pub name: String,
    pub kind: RegionKind,
    pub start: u32,
    pub end: u32,
    pub tier: f64,
}

impl ProteinRegion {
    pub fn contains(&self, position: u32) -> bool {
        self.start <= position && position <= self.end
    }
}

/// A recurrently mutated residue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotRecord {
    pub position: u32,
    pub tumor_count: u32,
    pub mutation_count: u32,
    pub tier: f64,
}

impl HotspotRecord {
    pub fn as_region(&self, gene: &str) -> ProteinRegion {
        ProteinRegion {
            name: format!("{} residue {} hotspot", gene, self.position),
            kind: RegionKind::Hotspot,
            start: self.position,
            end: self.position,
            tier: self.tier,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainFacts {
    pub hotspots: Option<Sourced<Vec<HotspotRecord>>>,
    pub regions: Option<Sourced<Vec<ProteinRegion>>>,
}

impl FactBundle for DomainFacts {
    const CATEGORY: FactCategory = FactCategory::Domain;

    fn field_names() -> Vec<&'static str> {
        vec!["hotspots", "regions"]
    }

    fn populated_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.hotspots.is_some() { out.push("hotspots"); }
        if self.regions.is_some() { out.push("regions"); }
        out
    }

    fn merge_missing(&mut self, other: Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if fill(&mut self.hotspots, other.hotspots) { filled.push("hotspots"); }
        if fill(&mut self.regions, other.regions) { filled.push("regions"); }
        filled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let cat = Self::CATEGORY;
        if let Some(hotspots) = &self.hotspots {
            for h in &hotspots.value {
                if h.position == 0 {
                    return Err(ValidationError::new(cat, "hotspots", "position must be >= 1"));
                }
                if !h.tier.is_finite() || !(0.0..=1.0).contains(&h.tier) {
                    return Err(ValidationError::new(cat, "hotspots", format!("tier {} outside [0, 1]", h.tier)));
                }
            }
        }
        if let Some(regions) = &self.regions {
            for r in &regions.value {
                if r.start == 0 || r.start > r.end {
                    return Err(ValidationError::new(
                        cat,
                        "regions",
                        format!("bad boundary {}..{} for {}", r.start, r.end, r.name),
                    ));
                }
                if !r.tier.is_finite() || !(0.0..=1.0).contains(&r.tier) {
                    return Err(ValidationError::new(cat, "regions", format!("tier {} outside [0, 1]", r.tier)));
                }
            }
        }
        Ok(())
    }

    fn sources(&self) -> BTreeSet<String> {
        let mut s = BTreeSet::new();
        if let Some(v) = &self.hotspots { s.insert(v.source.clone()); }
        if let Some(v) = &self.regions { s.insert(v.source.clone()); }
        s
    }
}

// ── Phenotype ───────────────────────────────────────────────────────────────

/// True for `HP:0000000` identifiers and `TEXT:` tokens.
pub fn is_phenotype_term(term: &str) -> bool {
    RE_HPO_ID.is_match(term) || (term.starts_with("TEXT:") && term.len() > 5)
}

/// Normalise one observed phenotype: HPO ids are upper-cased, free text
/// becomes a `TEXT:` token.
pub fn normalise_phenotype_term(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let upper = trimmed.to_uppercase();
    if RE_HPO_ID.is_match(&upper) {
        return Some(upper);
    }
    // An already-prefixed token keeps only its body; the prefix is matched case-insensitively.
    let body = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("TEXT:") => &trimmed[5..],
        _ => trimmed,
    };
    let token: Vec<String> = body
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    if token.is_empty() {
        None
    } else {
        Some(format!("TEXT:{}", token.join("_")))
    }
}

/// Phenotypes associated with the variant's gene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeFacts {
    pub gene_terms: Option<Sourced<BTreeSet<String>>>,
    pub disease: Option<Sourced<String>>,
    pub inheritance: Option<Sourced<String>>,
}

impl FactBundle for PhenotypeFacts {
    const CATEGORY: FactCategory = FactCategory::Phenotype;

    fn field_names() -> Vec<&'static str> {
        vec!["gene_terms", "disease", "inheritance"]
    }

    fn populated_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.gene_terms.is_some() { out.push("gene_terms"); }
        if self.disease.is_some() { out.push("disease"); }
        if self.inheritance.is_some() { out.push("inheritance"); }
        out
    }

    fn merge_missing(&mut self, other: Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if fill(&mut self.gene_terms, other.gene_terms) { filled.push("gene_terms"); }
        if fill(&mut self.disease, other.disease) { filled.push("disease"); }
        if fill(&mut self.inheritance, other.inheritance) { filled.push("inheritance"); }
        filled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(terms) = &self.gene_terms {
            if let Some(bad) = terms.value.iter().find(|t| !is_phenotype_term(t)) {
                return Err(ValidationError::new(
                    Self::CATEGORY,
                    "gene_terms",
                    format!("malformed term {:?}", bad),
                ));
            }
        }
        Ok(())
    }

    fn sources(&self) -> BTreeSet<String> {
        let mut s = BTreeSet::new();
        if let Some(v) = &self.gene_terms { s.insert(v.source.clone()); }
        if let Some(v) = &self.disease { s.insert(v.source.clone()); }
        if let Some(v) = &self.inheritance { s.insert(v.source.clone()); }
        s
    }
}

// ── Clinical assertions and gene constraint ─────────────────────────────────

/// Germline significance of a previously submitted assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificance {
    Pathogenic,
    LikelyPathogenic,
    Uncertain,
    LikelyBenign,
    Benign,
    Conflicting,
    Other,
}

impl ClinicalSignificance {
    /// Map a free-text classification description ("Pathogenic/Likely pathogenic", ...).
    pub fn from_description(description: &str) -> Self {
        let d = description.trim().to_lowercase();
        if d.contains("conflicting") {
            ClinicalSignificance::Conflicting
        } else if d.contains("pathogenic") && !d.contains("benign") {
            if d.starts_with("likely") {
                ClinicalSignificance::LikelyPathogenic
            } else {
                ClinicalSignificance::Pathogenic
            }
        } else if d.contains("benign") && !d.contains("pathogenic") {
            if d.starts_with("likely") {
                ClinicalSignificance::LikelyBenign
            } else {
                ClinicalSignificance::Benign
            }
        } else if d.contains("uncertain") {
            ClinicalSignificance::Uncertain
        } else {
            ClinicalSignificance::Other
        }
    }

    pub fn is_pathogenic(&self) -> bool {
        matches!(self, ClinicalSignificance::Pathogenic | ClinicalSignificance::LikelyPathogenic)
    }
}

/// One submitted classification of a protein change at the variant's residue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalAssertion {
    pub accession: String,
    /// Protein HGVS of the asserted change, e.g. `p.Arg273His`.
    pub protein_change: String,
    pub significance: ClinicalSignificance,
    /// Review status in stars, 0 to 4.
    pub review_stars: u8,
}

/// Loss-of-function intolerance of the gene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneConstraint {
    pub pli: Option<f64>,
    /// Upper bound of the observed/expected LoF ratio.
    pub loeuf: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalFacts {
    /// Assertions at the same residue. An empty list means "none submitted".
    pub residue_assertions: Option<Sourced<Vec<ClinicalAssertion>>>,
    pub constraint: Option<Sourced<GeneConstraint>>,
}

impl FactBundle for ClinicalFacts {
    const CATEGORY: FactCategory = FactCategory::Clinical;

    fn field_names() -> Vec<&'static str> {
        vec!["residue_assertions", "constraint"]
    }

    fn populated_fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.residue_assertions.is_some() { out.push("residue_assertions"); }
        if self.constraint.is_some() { out.push("constraint"); }
        out
    }

    fn merge_missing(&mut self, other: Self) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if fill(&mut self.residue_assertions, other.residue_assertions) { filled.push("residue_assertions"); }
        if fill(&mut self.constraint, other.constraint) { filled.push("constraint"); }
        filled
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let cat = Self::CATEGORY;
        if let Some(assertions) = &self.residue_assertions {
            for a in &assertions.value {
                if a.review_stars > 4 {
                    return Err(ValidationError::new(
                        cat,
                        "residue_assertions",
                        format!("{} has {} review stars", a.accession, a.review_stars),
                    ));
                }
                if parse_substitution(&a.protein_change).is_none() {
                    return Err(ValidationError::new(
                        cat,
                        "residue_assertions",
                        format!("unparseable protein change {:?}", a.protein_change),
                    ));
                }
            }
        }
        if let Some(constraint) = &self.constraint {
            if let Some(pli) = constraint.value.pli {
                if !pli.is_finite() || !(0.0..=1.0).contains(&pli) {
                    return Err(ValidationError::new(cat, "constraint", format!("pLI {} outside [0, 1]", pli)));
                }
            }
            if let Some(loeuf) = constraint.value.loeuf {
                if !loeuf.is_finite() || loeuf < 0.0 {
                    return Err(ValidationError::new(cat, "constraint", format!("LOEUF {} is negative", loeuf)));
                }
            }
        }
        Ok(())
    }

    fn sources(&self) -> BTreeSet<String> {
        let mut s = BTreeSet::new();
        if let Some(v) = &self.residue_assertions { s.insert(v.source.clone()); }
        if let Some(v) = &self.constraint { s.insert(v.source.clone()); }
        s
    }
}

// ── Category-erased bundle ──────────────────────────────────────────────────

/// A bundle of any category, as stored in the cache and returned by providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "facts", rename_all = "snake_case")]
pub enum CategoryFacts {
    Population(PopulationFacts),
    Predictors(PredictorFacts),
    Domain(DomainFacts),
    Phenotype(PhenotypeFacts),
    Clinical(ClinicalFacts),
}

impl CategoryFacts {
    pub fn empty(category: FactCategory) -> Self {
        match category {
            FactCategory::Population => CategoryFacts::Population(PopulationFacts::default()),
            FactCategory::Predictors => CategoryFacts::Predictors(PredictorFacts::default()),
            FactCategory::Domain => CategoryFacts::Domain(DomainFacts::default()),
            FactCategory::Phenotype => CategoryFacts::Phenotype(PhenotypeFacts::default()),
            FactCategory::Clinical => CategoryFacts::Clinical(ClinicalFacts::default()),
        }
    }

    pub fn category(&self) -> FactCategory {
        match self {
            CategoryFacts::Population(_) => FactCategory::Population,
            CategoryFacts::Predictors(_) => FactCategory::Predictors,
            CategoryFacts::Domain(_) => FactCategory::Domain,
            CategoryFacts::Phenotype(_) => FactCategory::Phenotype,
            CategoryFacts::Clinical(_) => FactCategory::Clinical,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            CategoryFacts::Population(f) => f.validate(),
            CategoryFacts::Predictors(f) => f.validate(),
            CategoryFacts::Domain(f) => f.validate(),
            CategoryFacts::Phenotype(f) => f.validate(),
            CategoryFacts::Clinical(f) => f.validate(),
        }
    }

    pub fn populated_fields(&self) -> Vec<&'static str> {
        match self {
            CategoryFacts::Population(f) => f.populated_fields(),
            CategoryFacts::Predictors(f) => f.populated_fields(),
            CategoryFacts::Domain(f) => f.populated_fields(),
            CategoryFacts::Phenotype(f) => f.populated_fields(),
            CategoryFacts::Clinical(f) => f.populated_fields(),
        }
    }

    /// Every field the bundle's category defines.
    pub fn field_names(&self) -> Vec<&'static str> {
        match self {
            CategoryFacts::Population(_) => PopulationFacts::field_names(),
            CategoryFacts::Predictors(_) => PredictorFacts::field_names(),
            CategoryFacts::Domain(_) => DomainFacts::field_names(),
            CategoryFacts::Phenotype(_) => PhenotypeFacts::field_names(),
            CategoryFacts::Clinical(_) => ClinicalFacts::field_names(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.field_names().len()
    }

    pub fn is_complete(&self) -> bool {
        self.populated_fields().len() == self.field_count()
    }

    /// Merge fields still missing here. A bundle of another category is ignored.
    pub fn merge_missing(&mut self, other: CategoryFacts) -> Vec<&'static str> {
        match (self, other) {
            (CategoryFacts::Population(a), CategoryFacts::Population(b)) => a.merge_missing(b),
            (CategoryFacts::Predictors(a), CategoryFacts::Predictors(b)) => a.merge_missing(b),
            (CategoryFacts::Domain(a), CategoryFacts::Domain(b)) => a.merge_missing(b),
            (CategoryFacts::Phenotype(a), CategoryFacts::Phenotype(b)) => a.merge_missing(b),
            (CategoryFacts::Clinical(a), CategoryFacts::Clinical(b)) => a.merge_missing(b),
            _ => Vec::new(),
        }
    }
}

/// Every bundle for one classification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactSet {
    #[serde(default)]
    pub population: PopulationFacts,
    #[serde(default)]
    pub predictors: PredictorFacts,
    #[serde(default)]
    pub domain: DomainFacts,
    #[serde(default)]
    pub phenotype: PhenotypeFacts,
    #[serde(default)]
    pub clinical: ClinicalFacts,
}

impl FactSet {
    pub fn get(&self, category: FactCategory) -> CategoryFacts {
        match category {
            FactCategory::Population => CategoryFacts::Population(self.population.clone()),
            FactCategory::Predictors => CategoryFacts::Predictors(self.predictors.clone()),
            FactCategory::Domain => CategoryFacts::Domain(self.domain.clone()),
            FactCategory::Phenotype => CategoryFacts::Phenotype(self.phenotype.clone()),
            FactCategory::Clinical => CategoryFacts::Clinical(self.clinical.clone()),
        }
    }

    pub fn set(&mut self, facts: CategoryFacts) {
        match facts {
            CategoryFacts::Population(f) => self.population = f,
            CategoryFacts::Predictors(f) => self.predictors = f,
            CategoryFacts::Domain(f) => self.domain = f,
            CategoryFacts::Phenotype(f) => self.phenotype = f,
            CategoryFacts::Clinical(f) => self.clinical = f,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.population.validate()?;
        self.predictors.validate()?;
        self.domain.validate()?;
        self.phenotype.validate()?;
        self.clinical.validate()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
