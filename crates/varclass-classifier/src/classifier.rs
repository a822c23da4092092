use tracing::{debug, warn};
use varclass_common::{ClassificationResult, ConfidenceLabel, EvidenceCode, GuidelineVersion, InputCoverage, Tier};

use crate::confidence::confidence_label;
use crate::conflict::resolve_conflicts;
use crate::merge::merge_evidence;
use crate::rules::combining_rules_tier;
use crate::scoring::tier_for;
use crate::suggestions::suggestions;

/// Turns an evidence list into a [`ClassificationResult`]. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    version: GuidelineVersion,
}

impl Classifier {
    pub fn new(version: GuidelineVersion) -> Self {
        Self { version }
    }

    /// Classify from automatic and interactive codes together. Duplicate
    /// criteria are merged first, so the result depends only on the set of
    /// codes and never on their order.
    pub fn classify(&self, evidence: Vec<EvidenceCode>, coverage: Vec<InputCoverage>) -> ClassificationResult {
        let merged = merge_evidence(evidence);
        if merged.is_empty() {
            debug!("no evidence codes; returning uncertain");
            return ClassificationResult {
                tier: Tier::Uncertain,
                total_points: 0,
                evidence: Vec::new(),
                set_aside: Vec::new(),
                confidence: ConfidenceLabel::VeryLow,
                conflict: None,
                combining_rules_tier: Tier::Uncertain,
                suggestions: suggestions(Tier::Uncertain, &[], &coverage, None),
                coverage,
                guideline_version: self.version,
            };
        }

        let resolved = resolve_conflicts(&merged);
        if let Some(conflict) = &resolved.conflict {
            if conflict.needs_review() {
                warn!(
                    kind = ?conflict.kind,
                    pathogenic = conflict.pathogenic_points,
                    benign = conflict.benign_points,
                    "{}",
                    conflict.message
                );
            } else {
                debug!(kind = ?conflict.kind, "{}", conflict.message);
            }
        }

        let (tier, total_points) = tier_for(&resolved.scored);
        let needs_review = resolved.conflict.as_ref().map(|c| c.needs_review()).unwrap_or(false);
        let confidence = confidence_label(&resolved.scored, &coverage, needs_review);
        let rules_tier = combining_rules_tier(&merged);
        if rules_tier != tier {
            debug!(points = %tier, rules = %rules_tier, "combining rules disagree with points tier");
        }

        ClassificationResult {
            tier,
            total_points,
            suggestions: suggestions(tier, &merged, &coverage, resolved.conflict.as_ref()),
            evidence: resolved.scored,
            set_aside: resolved.set_aside,
            confidence,
            conflict: resolved.conflict,
            combining_rules_tier: rules_tier,
            coverage,
            guideline_version: self.version,
        }
    }
}
