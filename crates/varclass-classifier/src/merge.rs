//! Combine automatic and interactive evidence into one list per criterion.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use varclass_common::{Criterion, EvidenceCode, EvidenceOrigin};

/// Total order used to pick one code among duplicates; higher wins.
/// Never depends on input position.
fn precedence(a: &EvidenceCode, b: &EvidenceCode) -> Ordering {
    let origin_rank = |c: &EvidenceCode| match c.origin() {
        EvidenceOrigin::Interactive => 1,
        EvidenceOrigin::Automatic => 0,
    };
    origin_rank(a)
        .cmp(&origin_rank(b))
        .then_with(|| a.strength().points().cmp(&b.strength().points()))
        .then_with(|| a.confidence().cmp(&b.confidence()))
        .then_with(|| b.source().cmp(a.source()))
        .then_with(|| b.rationale().cmp(a.rationale()))
}

/// One code per criterion, in criterion order.
///
/// An interactive code replaces any automatic code for the same criterion.
/// Remaining duplicates collapse to the strongest.
pub fn merge_evidence(codes: impl IntoIterator<Item = EvidenceCode>) -> Vec<EvidenceCode> {
    let mut best: BTreeMap<Criterion, EvidenceCode> = BTreeMap::new();
    for code in codes {
        match best.get(&code.criterion()) {
            Some(current) if precedence(&code, current) != Ordering::Greater => {}
            _ => {
                best.insert(code.criterion(), code);
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use varclass_common::{ConfidenceLabel, Strength};
    use varclass_test_utils::code;

    #[test]
    fn test_interactive_replaces_automatic() {
        let automatic = code(Criterion::PM1, Strength::Moderate);
        let reviewed = code(Criterion::PM1, Strength::Supporting).with_origin(EvidenceOrigin::Interactive);
        let merged = merge_evidence(vec![automatic, reviewed.clone()]);
        assert_eq!(merged, vec![reviewed]);
    }

    #[test]
    fn test_duplicates_collapse_to_strongest() {
        let weak = code(Criterion::PP1, Strength::Supporting);
        let strong = code(Criterion::PP1, Strength::Strong);
        assert_eq!(merge_evidence(vec![weak.clone(), strong.clone()]), vec![strong.clone()]);
        assert_eq!(merge_evidence(vec![strong.clone(), weak]), vec![strong]);
    }

    #[test]
    fn test_tie_break_is_order_independent() {
        let a = EvidenceCode::new(Criterion::PS3, Strength::Strong, ConfidenceLabel::High, "assay a", "lab-a").unwrap();
        let b = EvidenceCode::new(Criterion::PS3, Strength::Strong, ConfidenceLabel::High, "assay b", "lab-b").unwrap();
        assert_eq!(merge_evidence(vec![a.clone(), b.clone()]), merge_evidence(vec![b, a]));
    }

    #[test]
    fn test_output_is_in_criterion_order() {
        let merged = merge_evidence(vec![
            code(Criterion::BP4, Strength::Supporting),
            code(Criterion::PVS1, Strength::VeryStrong),
            code(Criterion::PM2, Strength::Moderate),
        ]);
        let order: Vec<Criterion> = merged.iter().map(|c| c.criterion()).collect();
        assert_eq!(order, vec![Criterion::PVS1, Criterion::PM2, Criterion::BP4]);
    }
}
