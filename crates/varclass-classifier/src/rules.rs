//! Count-based combining rules (ACMG/AMP 2015, Table 5).
//!
//! Reported alongside the points tier as a cross-check. Codes count at
//! their applied strength, so PP1 at strong counts as a strong criterion.

use varclass_common::{Direction, EvidenceCode, Strength, Tier};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    very_strong: usize,
    strong: usize,
    moderate: usize,
    supporting: usize,
    stand_alone: usize,
}

fn count(codes: &[EvidenceCode], direction: Direction) -> Counts {
    let mut c = Counts::default();
    for code in codes.iter().filter(|c| c.direction() == direction) {
        match code.strength() {
            Strength::VeryStrong => c.very_strong += 1,
            Strength::Strong => c.strong += 1,
            Strength::Moderate => c.moderate += 1,
            Strength::Supporting => c.supporting += 1,
            Strength::StandAlone => c.stand_alone += 1,
        }
    }
    c
}

fn pathogenic(p: &Counts) -> bool {
    let (pvs, ps, pm, pp) = (p.very_strong, p.strong, p.moderate, p.supporting);
    (pvs >= 1 && (ps >= 1 || pm >= 2 || (pm == 1 && pp >= 1) || pp >= 2))
        || ps >= 2
        || (ps == 1 && (pm >= 3 || (pm == 2 && pp >= 2) || (pm == 1 && pp >= 4)))
}

fn likely_pathogenic(p: &Counts) -> bool {
    let (pvs, ps, pm, pp) = (p.very_strong, p.strong, p.moderate, p.supporting);
    (pvs >= 1 && pm == 1)
        || (ps == 1 && (1..=2).contains(&pm))
        || (ps == 1 && pp >= 2)
        || pm >= 3
        || (pm == 2 && pp >= 2)
        || (pm == 1 && pp >= 4)
}

fn benign(b: &Counts) -> bool {
    b.stand_alone >= 1 || b.strong >= 2
}

fn likely_benign(b: &Counts) -> bool {
    (b.strong == 1 && b.supporting >= 1) || b.supporting >= 2
}

/// Tier under the combining rules. Criteria met on both sides give uncertain.
pub fn combining_rules_tier(codes: &[EvidenceCode]) -> Tier {
    let p = count(codes, Direction::Pathogenic);
    let b = count(codes, Direction::Benign);

    let path_tier = if pathogenic(&p) {
        Some(Tier::Pathogenic)
    } else if likely_pathogenic(&p) {
        Some(Tier::LikelyPathogenic)
    } else {
        None
    };
    let benign_tier = if benign(&b) {
        Some(Tier::Benign)
    } else if likely_benign(&b) {
        Some(Tier::LikelyBenign)
    } else {
        None
    };

    match (path_tier, benign_tier) {
        (Some(t), None) | (None, Some(t)) => t,
        _ => Tier::Uncertain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::Criterion;
    use varclass_test_utils::{code, default_code};

    fn tier(criteria: &[Criterion]) -> Tier {
        let codes: Vec<EvidenceCode> = criteria.iter().map(|&c| default_code(c)).collect();
        combining_rules_tier(&codes)
    }

    #[test]
    fn test_pathogenic_combinations() {
        assert_eq!(tier(&[Criterion::PVS1, Criterion::PS3]), Tier::Pathogenic);
        assert_eq!(tier(&[Criterion::PVS1, Criterion::PM2, Criterion::PM1]), Tier::Pathogenic);
        assert_eq!(tier(&[Criterion::PS1, Criterion::PS3]), Tier::Pathogenic);
        assert_eq!(
            tier(&[Criterion::PS3, Criterion::PM1, Criterion::PM2, Criterion::PM5]),
            Tier::Pathogenic
        );
    }

    #[test]
    fn test_likely_pathogenic_combinations() {
        assert_eq!(tier(&[Criterion::PVS1, Criterion::PM2]), Tier::LikelyPathogenic);
        assert_eq!(tier(&[Criterion::PS3, Criterion::PM2]), Tier::LikelyPathogenic);
        assert_eq!(tier(&[Criterion::PM1, Criterion::PM2, Criterion::PM5]), Tier::LikelyPathogenic);
        assert_eq!(
            tier(&[Criterion::PM1, Criterion::PP1, Criterion::PP2, Criterion::PP3, Criterion::PP4]),
            Tier::LikelyPathogenic
        );
    }

    #[test]
    fn test_benign_combinations() {
        assert_eq!(tier(&[Criterion::BA1]), Tier::Benign);
        assert_eq!(tier(&[Criterion::BS1, Criterion::BS2]), Tier::Benign);
        assert_eq!(tier(&[Criterion::BS1, Criterion::BP4]), Tier::LikelyBenign);
        assert_eq!(tier(&[Criterion::BP4, Criterion::BP7]), Tier::LikelyBenign);
    }

    #[test]
    fn test_modified_strength_counts_at_applied_class() {
        let codes = vec![code(Criterion::PP1, Strength::Strong), default_code(Criterion::PS3)];
        assert_eq!(combining_rules_tier(&codes), Tier::Pathogenic);
    }

    #[test]
    fn test_insufficient_or_contradictory_is_uncertain() {
        assert_eq!(tier(&[Criterion::PM2]), Tier::Uncertain);
        assert_eq!(tier(&[Criterion::PS1, Criterion::PS3, Criterion::BS1, Criterion::BS2]), Tier::Uncertain);
        assert_eq!(tier(&[]), Tier::Uncertain);
    }
}
