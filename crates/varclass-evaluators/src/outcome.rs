use serde::{Deserialize, Serialize};
use varclass_common::{EvidenceCode, InputCoverage};

/// What one evaluator produced: at most one code, plus how much of its
/// expected input it actually had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorOutcome {
    pub evidence: Option<EvidenceCode>,
    pub coverage: InputCoverage,
    /// Why no code was emitted, or extra detail on the one that was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EvaluatorOutcome {
    pub fn emitted(code: EvidenceCode, coverage: InputCoverage) -> Self {
        Self { evidence: Some(code), coverage, note: None }
    }

    pub fn silent(coverage: InputCoverage, note: impl Into<String>) -> Self {
        Self { evidence: None, coverage, note: Some(note.into()) }
    }
}
