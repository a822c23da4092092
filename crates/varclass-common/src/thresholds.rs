//! Threshold tables consumed by the evaluators.
//!
//! Defaults follow ACMG/AMP 2015 with the ClinGen SVI refinements used for
//! the 2023 profile. All tables deserialize from the `[thresholds]` config
//! section with per-field defaults.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evidence::Strength;

/// Which guideline edition selects thresholds and strengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuidelineVersion {
    #[serde(rename = "2015")]
    Acmg2015,
    #[serde(rename = "2023")]
    Acmg2023,
}

impl GuidelineVersion {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().trim_start_matches("acmg").trim_start_matches(['_', '-', ' ']) {
            "2015" => Some(GuidelineVersion::Acmg2015),
            "2023" => Some(GuidelineVersion::Acmg2023),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GuidelineVersion::Acmg2015 => "2015",
            GuidelineVersion::Acmg2023 => "2023",
        }
    }

    /// PM2 is downgraded to supporting under the 2023 refinements.
    pub fn pm2_strength(&self) -> Strength {
        match self {
            GuidelineVersion::Acmg2015 => Strength::Moderate,
            GuidelineVersion::Acmg2023 => Strength::Supporting,
        }
    }
}

impl Default for GuidelineVersion {
    fn default() -> Self {
        GuidelineVersion::Acmg2015
    }
}

impl fmt::Display for GuidelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Population ───────────────────────────────────────────────────────────────

/// Allele frequency ladder for one gene (or the default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyThresholds {
    /// Stand-alone benign at or above
    #[serde(default = "default_ba1")]
    pub ba1: f64,
    /// Strong benign at or above
    #[serde(default = "default_bs1")]
    pub bs1: f64,
    /// Pathogenic rarity at or below
    #[serde(default = "default_pm2")]
    pub pm2: f64,
}

fn default_ba1() -> f64 { 0.05 }
fn default_bs1() -> f64 { 0.01 }
fn default_pm2() -> f64 { 0.0001 }

impl Default for FrequencyThresholds {
    fn default() -> Self {
        Self { ba1: default_ba1(), bs1: default_bs1(), pm2: default_pm2() }
    }
}

impl FrequencyThresholds {
    /// Ladder must be strictly ordered: pm2 < bs1 < ba1, all in (0, 1].
    pub fn is_ordered(&self) -> bool {
        let in_range = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
        in_range(self.ba1) && in_range(self.bs1) && in_range(self.pm2)
            && self.pm2 < self.bs1
            && self.bs1 < self.ba1
    }
}

/// Default ladder plus gene-specific overrides keyed by upper-case symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationThresholds {
    #[serde(default)]
    pub default: FrequencyThresholds,
    #[serde(default = "default_gene_overrides")]
    pub genes: HashMap<String, FrequencyThresholds>,
}

/// Genes with high background variation tolerate higher frequencies.
fn default_gene_overrides() -> HashMap<String, FrequencyThresholds> {
    let tolerant = FrequencyThresholds { ba1: 0.10, bs1: 0.05, pm2: 0.001 };
    ["TTN", "MUC16", "OBSCN"]
        .iter()
        .map(|g| (g.to_string(), tolerant))
        .collect()
}

impl Default for PopulationThresholds {
    fn default() -> Self {
        Self { default: FrequencyThresholds::default(), genes: default_gene_overrides() }
    }
}

impl PopulationThresholds {
    pub fn for_gene(&self, gene: Option<&str>) -> FrequencyThresholds {
        gene.and_then(|g| self.genes.get(&g.to_uppercase()))
            .copied()
            .unwrap_or(self.default)
    }
}

// ── Computational composite ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeThresholds {
    /// Composite at or above emits PP3
    #[serde(default = "default_damaging")]
    pub damaging: f64,
    /// Composite at or below emits BP4
    #[serde(default = "default_benign")]
    pub benign: f64,
    /// Predictors needed before confidence rises above low
    #[serde(default = "default_min_predictors")]
    pub min_predictors: usize,
    /// Predictors needed for high confidence
    #[serde(default = "default_high_confidence_predictors")]
    pub high_confidence_predictors: usize,
}

fn default_damaging() -> f64 { 0.60 }
fn default_benign() -> f64 { 0.40 }
fn default_min_predictors() -> usize { 3 }
fn default_high_confidence_predictors() -> usize { 6 }

impl Default for CompositeThresholds {
    fn default() -> Self {
        Self {
            damaging: default_damaging(),
            benign: default_benign(),
            min_predictors: default_min_predictors(),
            high_confidence_predictors: default_high_confidence_predictors(),
        }
    }
}

// ── Domain / hotspot ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainThresholds {
    /// Tier at or above emits PM1 at moderate strength
    #[serde(default = "default_pm1_moderate")]
    pub moderate_min_tier: f64,
    /// Tier at or above emits PM1 at supporting strength
    #[serde(default = "default_pm1_supporting")]
    pub supporting_min_tier: f64,
}

fn default_pm1_moderate() -> f64 { 0.85 }
fn default_pm1_supporting() -> f64 { 0.60 }

impl Default for DomainThresholds {
    fn default() -> Self {
        Self {
            moderate_min_tier: default_pm1_moderate(),
            supporting_min_tier: default_pm1_supporting(),
        }
    }
}

// ── Phenotype ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeThresholds {
    /// Similarity at or above emits PP4
    #[serde(default = "default_pp4")]
    pub high_similarity: f64,
    /// Similarity at or below emits BP5
    #[serde(default = "default_bp5")]
    pub low_similarity: f64,
    /// Minimum distinct terms across both sets
    #[serde(default = "default_min_terms")]
    pub min_terms: usize,
    /// Weight of uninformative terms and free-text tokens
    #[serde(default = "default_low_info_weight")]
    pub low_information_weight: f64,
    #[serde(default = "default_low_info_terms")]
    pub low_information_terms: Vec<String>,
    /// Free-text phenotype → HPO id, applied before similarity is computed
    #[serde(default = "default_synonyms")]
    pub synonyms: BTreeMap<String, String>,
}

fn default_pp4() -> f64 { 0.80 }
fn default_bp5() -> f64 { 0.20 }
fn default_min_terms() -> usize { 3 }
fn default_low_info_weight() -> f64 { 0.3 }
fn default_low_info_terms() -> Vec<String> {
    // Neoplasm, Phenotypic abnormality
    vec!["HP:0002664".to_string(), "HP:0000118".to_string()]
}
fn default_synonyms() -> BTreeMap<String, String> {
    [
        ("breast cancer", "HP:0003002"),
        ("breast carcinoma", "HP:0003002"),
        ("ovarian cancer", "HP:0100615"),
        ("colorectal cancer", "HP:0003003"),
        ("seizure", "HP:0001250"),
        ("epilepsy", "HP:0001250"),
        ("intellectual disability", "HP:0001249"),
        ("developmental delay", "HP:0001263"),
        ("hypertrophic cardiomyopathy", "HP:0001639"),
        ("microcephaly", "HP:0000252"),
    ]
    .iter()
    .map(|(text, id)| (text.to_string(), id.to_string()))
    .collect()
}

impl Default for PhenotypeThresholds {
    fn default() -> Self {
        Self {
            high_similarity: default_pp4(),
            low_similarity: default_bp5(),
            min_terms: default_min_terms(),
            low_information_weight: default_low_info_weight(),
            low_information_terms: default_low_info_terms(),
            synonyms: default_synonyms(),
        }
    }
}

// ── Clinical assertions / constraint ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalThresholds {
    /// pLI at or above counts as loss-of-function intolerant
    #[serde(default = "default_pvs1_min_pli")]
    pub pvs1_min_pli: f64,
    /// LOEUF at or below counts as loss-of-function intolerant
    #[serde(default = "default_pvs1_max_loeuf")]
    pub pvs1_max_loeuf: f64,
    /// Assertions with fewer review stars are ignored for PS1/PM5
    #[serde(default = "default_min_review_stars")]
    pub min_review_stars: u8,
}

fn default_pvs1_min_pli() -> f64 { 0.9 }
fn default_pvs1_max_loeuf() -> f64 { 0.35 }
fn default_min_review_stars() -> u8 { 1 }

impl Default for ClinicalThresholds {
    fn default() -> Self {
        Self {
            pvs1_min_pli: default_pvs1_min_pli(),
            pvs1_max_loeuf: default_pvs1_max_loeuf(),
            min_review_stars: default_min_review_stars(),
        }
    }
}

/// All evaluator thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default)]
    pub population: PopulationThresholds,
    #[serde(default)]
    pub composite: CompositeThresholds,
    #[serde(default)]
    pub domain: DomainThresholds,
    #[serde(default)]
    pub phenotype: PhenotypeThresholds,
    #[serde(default)]
    pub clinical: ClinicalThresholds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_override_lookup() {
        let t = PopulationThresholds::default();
        assert_eq!(t.for_gene(Some("ttn")).ba1, 0.10);
        assert_eq!(t.for_gene(Some("BRCA1")).ba1, 0.05);
        assert_eq!(t.for_gene(None).pm2, 0.0001);
    }

    #[test]
    fn test_default_ladder_is_ordered() {
        assert!(FrequencyThresholds::default().is_ordered());
        let broken = FrequencyThresholds { ba1: 0.01, bs1: 0.05, pm2: 0.0001 };
        assert!(!broken.is_ordered());
    }

    #[test]
    fn test_guideline_version_parsing() {
        assert_eq!(GuidelineVersion::from_str("2015"), Some(GuidelineVersion::Acmg2015));
        assert_eq!(GuidelineVersion::from_str("ACMG-2023"), Some(GuidelineVersion::Acmg2023));
        assert_eq!(GuidelineVersion::from_str("2019"), None);
        assert_eq!(GuidelineVersion::Acmg2023.pm2_strength(), Strength::Supporting);
    }
}
