//! Conflict resolution between pathogenic and benign evidence.
//!
//! Precedence, first match wins:
//! 1. Stand-alone benign (BA1) with any pathogenic code: the pathogenic
//!    side is set aside and the result is flagged.
//! 2. Strong-or-above on both sides: everything is scored, nothing is
//!    set aside, and the result is flagged for manual review.
//! 3. Strong-or-above on one side only: the weaker side is set aside and
//!    the result is flagged.
//! 4. Moderate/supporting on both sides: scored as-is, recorded as minor.

use serde::{Deserialize, Serialize};
use varclass_common::{ConflictKind, ConflictResolution, Criterion, Direction, EvidenceCode, EvidenceConflict, Strength};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictOutcome {
    /// Codes that count toward the total.
    pub scored: Vec<EvidenceCode>,
    pub set_aside: Vec<EvidenceCode>,
    pub conflict: Option<EvidenceConflict>,
}

fn side_points(codes: &[&EvidenceCode]) -> i32 {
    codes.iter().map(|c| c.points()).sum()
}

fn labels(codes: &[&EvidenceCode]) -> String {
    codes.iter().map(|c| c.label()).collect::<Vec<_>>().join(", ")
}

pub fn resolve_conflicts(codes: &[EvidenceCode]) -> ConflictOutcome {
    let (pathogenic, benign): (Vec<&EvidenceCode>, Vec<&EvidenceCode>) =
        codes.iter().partition(|c| c.direction() == Direction::Pathogenic);

    if pathogenic.is_empty() || benign.is_empty() {
        return ConflictOutcome { scored: codes.to_vec(), set_aside: Vec::new(), conflict: None };
    }

    let p_points = side_points(&pathogenic);
    let b_points = side_points(&benign);
    let conflict = |kind, resolution, message: String| EvidenceConflict {
        kind,
        resolution,
        pathogenic_points: p_points,
        benign_points: b_points,
        message,
    };
    let keep = |side: Direction| -> (Vec<EvidenceCode>, Vec<EvidenceCode>) {
        let (kept, dropped): (Vec<&EvidenceCode>, Vec<&EvidenceCode>) =
            codes.iter().partition(|c| c.direction() == side);
        (kept.into_iter().cloned().collect(), dropped.into_iter().cloned().collect())
    };

    let stand_alone = benign
        .iter()
        .any(|c| c.criterion() == Criterion::BA1 || c.strength() == Strength::StandAlone);
    if stand_alone {
        let (scored, set_aside) = keep(Direction::Benign);
        return ConflictOutcome {
            scored,
            set_aside,
            conflict: Some(conflict(
                ConflictKind::StandAloneBenign,
                ConflictResolution::LeanedWithReview,
                format!("stand-alone benign evidence overrides pathogenic evidence ({})", labels(&pathogenic)),
            )),
        };
    }

    let strong_p = pathogenic.iter().any(|c| c.strength().is_strong_or_above());
    let strong_b = benign.iter().any(|c| c.strength().is_strong_or_above());

    match (strong_p, strong_b) {
        (true, true) => ConflictOutcome {
            scored: codes.to_vec(),
            set_aside: Vec::new(),
            conflict: Some(conflict(
                ConflictKind::StrongOpposition,
                ConflictResolution::ManualReview,
                format!(
                    "evidence conflict: strong pathogenic ({}) against strong benign ({}); manual review required",
                    labels(&pathogenic),
                    labels(&benign),
                ),
            )),
        },
        (true, false) => {
            let (scored, set_aside) = keep(Direction::Pathogenic);
            ConflictOutcome {
                scored,
                set_aside,
                conflict: Some(conflict(
                    ConflictKind::LeanPathogenic,
                    ConflictResolution::LeanedWithReview,
                    format!(
                        "evidence conflict: lean pathogenic, weaker benign evidence ({}) set aside; flag for review",
                        labels(&benign),
                    ),
                )),
            }
        }
        (false, true) => {
            let (scored, set_aside) = keep(Direction::Benign);
            ConflictOutcome {
                scored,
                set_aside,
                conflict: Some(conflict(
                    ConflictKind::LeanBenign,
                    ConflictResolution::LeanedWithReview,
                    format!(
                        "evidence conflict: lean benign, weaker pathogenic evidence ({}) set aside; flag for review",
                        labels(&pathogenic),
                    ),
                )),
            }
        }
        (false, false) => ConflictOutcome {
            scored: codes.to_vec(),
            set_aside: Vec::new(),
            conflict: Some(conflict(
                ConflictKind::Minor,
                ConflictResolution::Resolved,
                format!("minor conflict between {} and {}", labels(&pathogenic), labels(&benign)),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_test_utils::{code, default_code};

    #[test]
    fn test_one_sided_evidence_has_no_conflict() {
        let codes = vec![default_code(Criterion::PVS1), default_code(Criterion::PM2)];
        let out = resolve_conflicts(&codes);
        assert_eq!(out.scored, codes);
        assert!(out.conflict.is_none());
    }

    #[test]
    fn test_strong_against_strong_is_flagged_not_set_aside() {
        let codes = vec![default_code(Criterion::PS3), default_code(Criterion::BS3)];
        let out = resolve_conflicts(&codes);
        let conflict = out.conflict.unwrap();
        assert_eq!(conflict.kind, ConflictKind::StrongOpposition);
        assert_eq!(conflict.resolution, ConflictResolution::ManualReview);
        assert_eq!((conflict.pathogenic_points, conflict.benign_points), (4, -4));
        assert_eq!(out.scored.len(), 2);
        assert!(out.set_aside.is_empty());
    }

    #[test]
    fn test_strong_pathogenic_leans_over_supporting_benign() {
        let codes = vec![default_code(Criterion::PS1), default_code(Criterion::BP4)];
        let out = resolve_conflicts(&codes);
        assert_eq!(out.conflict.as_ref().unwrap().kind, ConflictKind::LeanPathogenic);
        assert_eq!(out.scored, vec![default_code(Criterion::PS1)]);
        assert_eq!(out.set_aside, vec![default_code(Criterion::BP4)]);
    }

    #[test]
    fn test_strong_benign_leans_over_moderate_pathogenic() {
        let codes = vec![default_code(Criterion::PM1), default_code(Criterion::BS1)];
        let out = resolve_conflicts(&codes);
        assert_eq!(out.conflict.unwrap().kind, ConflictKind::LeanBenign);
        assert_eq!(out.scored, vec![default_code(Criterion::BS1)]);
    }

    #[test]
    fn test_stand_alone_benign_overrides() {
        let codes = vec![code(Criterion::PVS1, Strength::VeryStrong), default_code(Criterion::BA1)];
        let out = resolve_conflicts(&codes);
        assert_eq!(out.conflict.unwrap().kind, ConflictKind::StandAloneBenign);
        assert_eq!(out.scored, vec![default_code(Criterion::BA1)]);
    }

    #[test]
    fn test_weak_on_both_sides_is_minor() {
        let codes = vec![default_code(Criterion::PP3), default_code(Criterion::BP1)];
        let out = resolve_conflicts(&codes);
        let conflict = out.conflict.unwrap();
        assert_eq!(conflict.kind, ConflictKind::Minor);
        assert!(!conflict.needs_review());
        assert_eq!(out.scored.len(), 2);
    }
}
