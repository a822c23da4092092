//! Evidence codes: one graded finding tied to a named criterion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VarclassError};

/// Which way a criterion pushes the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Pathogenic,
    Benign,
}

/// Magnitude class of an evidence code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    VeryStrong,
    Strong,
    Moderate,
    Supporting,
    /// Benign only; decides the tier by itself.
    StandAlone,
}

impl Strength {
    /// Unsigned point weight of the class.
    pub fn points(&self) -> i32 {
        match self {
            Strength::VeryStrong => 8,
            Strength::Strong => 4,
            Strength::Moderate => 2,
            Strength::Supporting => 1,
            Strength::StandAlone => 8,
        }
    }

    pub fn is_strong_or_above(&self) -> bool {
        matches!(self, Strength::VeryStrong | Strength::Strong | Strength::StandAlone)
    }

    /// Legal strength classes per direction.
    pub fn allowed_for(&self, direction: Direction) -> bool {
        match direction {
            Direction::Pathogenic => !matches!(self, Strength::StandAlone),
            Direction::Benign => matches!(self, Strength::StandAlone | Strength::Strong | Strength::Supporting),
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "very_strong" | "verystrong" => Some(Strength::VeryStrong),
            "strong" => Some(Strength::Strong),
            "moderate" => Some(Strength::Moderate),
            "supporting" => Some(Strength::Supporting),
            "stand_alone" | "standalone" => Some(Strength::StandAlone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::VeryStrong => "very_strong",
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Supporting => "supporting",
            Strength::StandAlone => "stand_alone",
        }
    }
}

/// The ACMG/AMP criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criterion {
    PVS1,
    PS1, PS2, PS3, PS4,
    PM1, PM2, PM3, PM4, PM5, PM6,
    PP1, PP2, PP3, PP4, PP5,
    BA1,
    BS1, BS2, BS3, BS4,
    BP1, BP2, BP3, BP4, BP5, BP6, BP7,
}

impl Criterion {
    pub const ALL: [Criterion; 28] = [
        Criterion::PVS1,
        Criterion::PS1, Criterion::PS2, Criterion::PS3, Criterion::PS4,
        Criterion::PM1, Criterion::PM2, Criterion::PM3, Criterion::PM4, Criterion::PM5, Criterion::PM6,
        Criterion::PP1, Criterion::PP2, Criterion::PP3, Criterion::PP4, Criterion::PP5,
        Criterion::BA1,
        Criterion::BS1, Criterion::BS2, Criterion::BS3, Criterion::BS4,
        Criterion::BP1, Criterion::BP2, Criterion::BP3, Criterion::BP4, Criterion::BP5, Criterion::BP6, Criterion::BP7,
    ];

    pub fn direction(&self) -> Direction {
        if self.as_str().starts_with('P') { Direction::Pathogenic } else { Direction::Benign }
    }

    /// Strength the criterion carries when not modified.
    pub fn default_strength(&self) -> Strength {
        match self.as_str().get(..2).unwrap_or("") {
            "PV" => Strength::VeryStrong,
            "PS" | "BS" => Strength::Strong,
            "PM" => Strength::Moderate,
            "BA" => Strength::StandAlone,
            _ => Strength::Supporting,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Criterion::ALL.iter().copied().find(|c| c.as_str() == upper)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::PVS1 => "PVS1",
            Criterion::PS1 => "PS1", Criterion::PS2 => "PS2", Criterion::PS3 => "PS3", Criterion::PS4 => "PS4",
            Criterion::PM1 => "PM1", Criterion::PM2 => "PM2", Criterion::PM3 => "PM3",
            Criterion::PM4 => "PM4", Criterion::PM5 => "PM5", Criterion::PM6 => "PM6",
            Criterion::PP1 => "PP1", Criterion::PP2 => "PP2", Criterion::PP3 => "PP3",
            Criterion::PP4 => "PP4", Criterion::PP5 => "PP5",
            Criterion::BA1 => "BA1",
            Criterion::BS1 => "BS1", Criterion::BS2 => "BS2", Criterion::BS3 => "BS3", Criterion::BS4 => "BS4",
            Criterion::BP1 => "BP1", Criterion::BP2 => "BP2", Criterion::BP3 => "BP3", Criterion::BP4 => "BP4",
            Criterion::BP5 => "BP5", Criterion::BP6 => "BP6", Criterion::BP7 => "BP7",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative confidence. Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// Representative probability used when aggregating labels.
    pub fn as_probability(&self) -> f64 {
        match self {
            ConfidenceLabel::VeryLow => 0.20,
            ConfidenceLabel::Low => 0.45,
            ConfidenceLabel::Medium => 0.70,
            ConfidenceLabel::High => 0.90,
        }
    }

    /// Band a [0, 1] confidence value.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            ConfidenceLabel::High
        } else if score >= 0.50 {
            ConfidenceLabel::Medium
        } else if score >= 0.25 {
            ConfidenceLabel::Low
        } else {
            ConfidenceLabel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::VeryLow => "very_low",
            ConfidenceLabel::Low => "low",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::High => "high",
        }
    }
}

/// Who produced an evidence code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceOrigin {
    /// Derived by an evaluator from fetched facts.
    Automatic,
    /// Supplied by the literature-review collaborator.
    Interactive,
}

/// Wire shape of an evidence code; converted through [`EvidenceCode::new`].
#[derive(Deserialize)]
struct RawEvidenceCode {
    criterion: Criterion,
    strength: Option<Strength>,
    confidence: ConfidenceLabel,
    rationale: String,
    source: String,
    #[serde(default = "default_origin")]
    origin: EvidenceOrigin,
}

fn default_origin() -> EvidenceOrigin {
    EvidenceOrigin::Interactive
}

impl TryFrom<RawEvidenceCode> for EvidenceCode {
    type Error = VarclassError;

    fn try_from(raw: RawEvidenceCode) -> Result<Self> {
        let strength = raw.strength.unwrap_or_else(|| raw.criterion.default_strength());
        EvidenceCode::new(raw.criterion, strength, raw.confidence, raw.rationale, raw.source)
            .map(|c| c.with_origin(raw.origin))
    }
}

/// One immutable, graded finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvidenceCode")]
pub struct EvidenceCode {
    criterion: Criterion,
    strength: Strength,
    confidence: ConfidenceLabel,
    rationale: String,
    source: String,
    origin: EvidenceOrigin,
}

impl EvidenceCode {
    /// Build a code, rejecting strength classes illegal for the criterion's direction.
    pub fn new(
        criterion: Criterion,
        strength: Strength,
        confidence: ConfidenceLabel,
        rationale: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self> {
        if !strength.allowed_for(criterion.direction()) {
            return Err(VarclassError::InvalidEvidence(format!(
                "{} cannot be applied at {} strength",
                criterion,
                strength.as_str()
            )));
        }
        if criterion == Criterion::BA1 && strength != Strength::StandAlone {
            return Err(VarclassError::InvalidEvidence("BA1 is stand-alone only".to_string()));
        }
        Ok(Self {
            criterion,
            strength,
            confidence,
            rationale: rationale.into(),
            source: source.into(),
            origin: EvidenceOrigin::Automatic,
        })
    }

    /// Code at the criterion's default strength.
    pub fn at_default(
        criterion: Criterion,
        confidence: ConfidenceLabel,
        rationale: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            criterion,
            strength: criterion.default_strength(),
            confidence,
            rationale: rationale.into(),
            source: source.into(),
            origin: EvidenceOrigin::Automatic,
        }
    }

    pub fn with_origin(mut self, origin: EvidenceOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn criterion(&self) -> Criterion { self.criterion }
    pub fn strength(&self) -> Strength { self.strength }
    pub fn confidence(&self) -> ConfidenceLabel { self.confidence }
    pub fn rationale(&self) -> &str { &self.rationale }
    pub fn source(&self) -> &str { &self.source }
    pub fn origin(&self) -> EvidenceOrigin { self.origin }

    pub fn direction(&self) -> Direction {
        self.criterion.direction()
    }

    /// Signed point weight; derived solely from the strength class.
    pub fn points(&self) -> i32 {
        match self.direction() {
            Direction::Pathogenic => self.strength.points(),
            Direction::Benign => -self.strength.points(),
        }
    }

    /// Display label such as "PP1_strong" when the strength is modified.
    pub fn label(&self) -> String {
        if self.strength == self.criterion.default_strength() {
            self.criterion.to_string()
        } else {
            format!("{}_{}", self.criterion, self.strength.as_str())
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strengths() {
        assert_eq!(Criterion::PVS1.default_strength(), Strength::VeryStrong);
        assert_eq!(Criterion::PS3.default_strength(), Strength::Strong);
        assert_eq!(Criterion::PM2.default_strength(), Strength::Moderate);
        assert_eq!(Criterion::PP3.default_strength(), Strength::Supporting);
        assert_eq!(Criterion::BA1.default_strength(), Strength::StandAlone);
        assert_eq!(Criterion::BS1.default_strength(), Strength::Strong);
        assert_eq!(Criterion::BP4.default_strength(), Strength::Supporting);
    }

    #[test]
    fn test_signed_points() {
        let pvs1 = EvidenceCode::at_default(Criterion::PVS1, ConfidenceLabel::High, "null variant", "user");
        let ba1 = EvidenceCode::at_default(Criterion::BA1, ConfidenceLabel::High, "common", "gnomad");
        let bp4 = EvidenceCode::at_default(Criterion::BP4, ConfidenceLabel::Low, "benign in silico", "dbnsfp");
        assert_eq!(pvs1.points(), 8);
        assert_eq!(ba1.points(), -8);
        assert_eq!(bp4.points(), -1);
    }

    #[test]
    fn test_illegal_strength_rejected() {
        assert!(EvidenceCode::new(Criterion::PS3, Strength::StandAlone, ConfidenceLabel::Low, "", "user").is_err());
        assert!(EvidenceCode::new(Criterion::BS3, Strength::Moderate, ConfidenceLabel::Low, "", "user").is_err());
        assert!(EvidenceCode::new(Criterion::BA1, Strength::Strong, ConfidenceLabel::Low, "", "user").is_err());
        let pp1 = EvidenceCode::new(Criterion::PP1, Strength::Strong, ConfidenceLabel::Medium, "LOD 5.2", "user").unwrap();
        assert_eq!(pp1.points(), 4);
        assert_eq!(pp1.label(), "PP1_strong");
    }

    #[test]
    fn test_deserialize_defaults_to_interactive() {
        let json = r#"{"criterion":"PS3","confidence":"medium","rationale":"functional assay","source":"literature"}"#;
        let code: EvidenceCode = serde_json::from_str(json).unwrap();
        assert_eq!(code.strength(), Strength::Strong);
        assert_eq!(code.origin(), EvidenceOrigin::Interactive);

        let bad = r#"{"criterion":"BS1","strength":"very_strong","confidence":"low","rationale":"","source":"x"}"#;
        assert!(serde_json::from_str::<EvidenceCode>(bad).is_err());
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceLabel::VeryLow < ConfidenceLabel::Low);
        assert!(ConfidenceLabel::Medium < ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.8), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.1), ConfidenceLabel::VeryLow);
    }
}
