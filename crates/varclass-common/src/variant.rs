//! Variant identity and descriptive annotations.
//!
//! Identity is (chromosome, position, ref, alt, build). Gene symbol and
//! HGVS strings ride along for the evaluators but never take part in
//! equality or cache keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VarclassError};
use crate::hgvs::{parse_substitution, protein_position};

/// Reference assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenomeBuild {
    #[serde(alias = "hg19", alias = "GRCH37", alias = "grch37")]
    GRCh37,
    #[serde(alias = "hg38", alias = "GRCH38", alias = "grch38")]
    GRCh38,
}

impl GenomeBuild {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "grch37" | "hg19" | "37" => Some(GenomeBuild::GRCh37),
            "grch38" | "hg38" | "38" => Some(GenomeBuild::GRCh38),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenomeBuild::GRCh37 => "GRCh37",
            GenomeBuild::GRCh38 => "GRCh38",
        }
    }
}

impl Default for GenomeBuild {
    fn default() -> Self {
        GenomeBuild::GRCh38
    }
}

/// Predicted molecular consequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Consequence {
    Missense,
    Nonsense,
    Frameshift,
    InFrameDeletion,
    InFrameInsertion,
    SpliceSite,
    Synonymous,
    Intronic,
    Other,
}

impl Consequence {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "missense" | "missense_variant" => Consequence::Missense,
            "nonsense" | "stop_gained" => Consequence::Nonsense,
            "frameshift" | "frameshift_variant" => Consequence::Frameshift,
            "inframe_deletion" | "in_frame_deletion" => Consequence::InFrameDeletion,
            "inframe_insertion" | "in_frame_insertion" => Consequence::InFrameInsertion,
            "splice_site" | "splice_donor_variant" | "splice_acceptor_variant" => Consequence::SpliceSite,
            "synonymous" | "synonymous_variant" => Consequence::Synonymous,
            "intronic" | "intron_variant" => Consequence::Intronic,
            _ => Consequence::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Consequence::Missense => "missense",
            Consequence::Nonsense => "nonsense",
            Consequence::Frameshift => "frameshift",
            Consequence::InFrameDeletion => "inframe_deletion",
            Consequence::InFrameInsertion => "inframe_insertion",
            Consequence::SpliceSite => "splice_site",
            Consequence::Synonymous => "synonymous",
            Consequence::Intronic => "intronic",
            Consequence::Other => "other",
        }
    }
}

/// The identity part of a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId {
    pub chromosome: String,
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub build: GenomeBuild,
}

impl VariantId {
    /// Stable key used in cache paths and logs, e.g. `GRCh38:17-7675088-C-T`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}-{}-{}-{}",
            self.build.as_str(),
            self.chromosome,
            self.position,
            self.reference,
            self.alternate
        )
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A single sequence variant submitted for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub chromosome: String,
    /// 1-based genomic position
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    #[serde(default)]
    pub build: GenomeBuild,

    pub gene: Option<String>,
    /// Transcript-level change, e.g. "c.743G>A"
    pub hgvs_c: Option<String>,
    /// Protein change, e.g. "p.Arg248Gln"
    pub hgvs_p: Option<String>,
    pub consequence: Option<Consequence>,
    /// Explicit amino acid position; wins over the one parsed from `hgvs_p`.
    pub protein_position: Option<u32>,
}

impl Variant {
    /// Build a variant with normalised identity fields.
    pub fn new(
        chromosome: &str,
        position: u64,
        reference: &str,
        alternate: &str,
        build: GenomeBuild,
    ) -> Result<Self> {
        let chromosome = normalise_chromosome(chromosome);
        let reference = reference.trim().to_uppercase();
        let alternate = alternate.trim().to_uppercase();

        if chromosome.is_empty() {
            return Err(VarclassError::InvalidVariant("empty chromosome".to_string()));
        }
        if position == 0 {
            return Err(VarclassError::InvalidVariant("position is 1-based".to_string()));
        }
        if !is_allele(&reference) || !is_allele(&alternate) {
            return Err(VarclassError::InvalidVariant(format!(
                "alleles must be A/C/G/T/N: {}>{}",
                reference, alternate
            )));
        }
        if reference == alternate {
            return Err(VarclassError::InvalidVariant("reference equals alternate".to_string()));
        }

        Ok(Self {
            chromosome,
            position,
            reference,
            alternate,
            build,
            gene: None,
            hgvs_c: None,
            hgvs_p: None,
            consequence: None,
            protein_position: None,
        })
    }

    pub fn with_gene(mut self, gene: &str) -> Self {
        self.gene = Some(gene.trim().to_uppercase());
        self
    }

    pub fn with_hgvs_c(mut self, hgvs_c: &str) -> Self {
        self.hgvs_c = Some(hgvs_c.to_string());
        self
    }

    pub fn with_hgvs_p(mut self, hgvs_p: &str) -> Self {
        self.hgvs_p = Some(hgvs_p.to_string());
        self
    }

    pub fn with_consequence(mut self, consequence: Consequence) -> Self {
        self.consequence = Some(consequence);
        self
    }

    /// Re-apply identity normalisation after deserialising untrusted input.
    pub fn normalised(self) -> Result<Self> {
        let mut v = Variant::new(
            &self.chromosome,
            self.position,
            &self.reference,
            &self.alternate,
            self.build,
        )?;
        v.gene = self.gene.map(|g| g.trim().to_uppercase()).filter(|g| !g.is_empty());
        v.hgvs_c = self.hgvs_c;
        v.hgvs_p = self.hgvs_p;
        v.consequence = self.consequence;
        v.protein_position = self.protein_position;
        Ok(v)
    }

    pub fn id(&self) -> VariantId {
        VariantId {
            chromosome: self.chromosome.clone(),
            position: self.position,
            reference: self.reference.clone(),
            alternate: self.alternate.clone(),
            build: self.build,
        }
    }

    pub fn key(&self) -> String {
        self.id().key()
    }

    /// Amino acid position, if known.
    pub fn amino_acid_position(&self) -> Option<u32> {
        self.protein_position
            .or_else(|| self.hgvs_p.as_deref().and_then(protein_position))
    }

    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternate.len() == 1
    }

    /// Declared consequence, else one inferred from a protein substitution.
    pub fn effective_consequence(&self) -> Option<Consequence> {
        if self.consequence.is_some() {
            return self.consequence;
        }
        let sub = self.hgvs_p.as_deref().and_then(parse_substitution)?;
        Some(match sub.alt_aa {
            None => Consequence::Synonymous,
            Some("Ter") => Consequence::Nonsense,
            Some(_) => Consequence::Missense,
        })
    }

    /// Loss-of-function style consequence (nonsense, frameshift, canonical splice).
    pub fn is_null_variant(&self) -> bool {
        matches!(
            self.effective_consequence(),
            Some(Consequence::Nonsense | Consequence::Frameshift | Consequence::SpliceSite)
        )
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Variant {}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

fn normalise_chromosome(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..3) {
        Some(prefix) if trimmed.len() > 3 && prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };
    let upper = stripped.to_uppercase();
    if upper == "M" { "MT".to_string() } else { upper }
}

fn is_allele(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
}

// ── Tests ───────────────────────────────────────────────────────────────────
