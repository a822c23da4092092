//! Points scoring and tier mapping.

use varclass_common::{Criterion, EvidenceCode, Strength, Tier};

/// Sum of signed point weights. Order-independent.
pub fn total_points(codes: &[EvidenceCode]) -> i32 {
    codes.iter().map(EvidenceCode::points).sum()
}

fn has_stand_alone(codes: &[EvidenceCode]) -> bool {
    codes
        .iter()
        .any(|c| c.criterion() == Criterion::BA1 || c.strength() == Strength::StandAlone)
}

/// Tier from the scored codes. Stand-alone benign decides the tier by itself.
pub fn tier_for(codes: &[EvidenceCode]) -> (Tier, i32) {
    let total = total_points(codes);
    if has_stand_alone(codes) {
        return (Tier::Benign, total);
    }
    (Tier::from_points(total), total)
}
