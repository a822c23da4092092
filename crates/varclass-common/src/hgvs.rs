//! HGVS protein notation helpers.
//!
//! Only what the domain evaluator and hotspot lookups need: the amino acid
//! position, and the reference/alternate residues when they are spelled out
//! (e.g. "p.Arg248Gln", "p.R248Q", "p.Arg248*").

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // p.Arg248Gln, p.R248Q, p.Arg248*, p.248
    static ref RE_POSITION: Regex = Regex::new(r"p\.(?:[A-Za-z]{1,3})?(\d+)").unwrap();
    // p.Arg248Gln or p.R248Q with explicit residues
    static ref RE_SUBSTITUTION: Regex = Regex::new(
        r"^(?:p\.)?\(?([A-Z][a-z]{2}|[A-Z])(\d+)([A-Z][a-z]{2}|[A-Z\*=]|Ter)\)?$"
    ).unwrap();
}

/// Single-letter → three-letter amino acid map.
fn aa1_to_aa3(aa: &str) -> Option<&'static str> {
    match aa.to_uppercase().as_str() {
        "A" => Some("Ala"), "C" => Some("Cys"), "D" => Some("Asp"),
        "E" => Some("Glu"), "F" => Some("Phe"), "G" => Some("Gly"),
        "H" => Some("His"), "I" => Some("Ile"), "K" => Some("Lys"),
        "L" => Some("Leu"), "M" => Some("Met"), "N" => Some("Asn"),
        "P" => Some("Pro"), "Q" => Some("Gln"), "R" => Some("Arg"),
        "S" => Some("Ser"), "T" => Some("Thr"), "V" => Some("Val"),
        "W" => Some("Trp"), "Y" => Some("Tyr"), "*" => Some("Ter"),
        _ => None,
    }
}

fn canonical_aa3(aa: &str) -> Option<&'static str> {
    if aa.len() == 1 {
        return aa1_to_aa3(aa);
    }
    match aa.to_lowercase().as_str() {
        "ala" => Some("Ala"), "cys" => Some("Cys"), "asp" => Some("Asp"),
        "glu" => Some("Glu"), "phe" => Some("Phe"), "gly" => Some("Gly"),
        "his" => Some("His"), "ile" => Some("Ile"), "lys" => Some("Lys"),
        "leu" => Some("Leu"), "met" => Some("Met"), "asn" => Some("Asn"),
        "pro" => Some("Pro"), "gln" => Some("Gln"), "arg" => Some("Arg"),
        "ser" => Some("Ser"), "thr" => Some("Thr"), "val" => Some("Val"),
        "trp" => Some("Trp"), "tyr" => Some("Tyr"), "ter" => Some("Ter"),
        _ => None,
    }
}

/// Extract the amino acid position from protein HGVS notation.
pub fn protein_position(hgvs_p: &str) -> Option<u32> {
    RE_POSITION
        .captures(hgvs_p)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&pos| pos > 0)
}

/// A parsed single-residue substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinSubstitution {
    pub ref_aa: &'static str,
    pub position: u32,
    /// `None` for synonymous ("=") changes.
    pub alt_aa: Option<&'static str>,
}

/// Parse "p.Arg248Gln" / "p.R248Q" style substitutions into 3-letter residues.
pub fn parse_substitution(hgvs_p: &str) -> Option<ProteinSubstitution> {
    let caps = RE_SUBSTITUTION.captures(hgvs_p.trim())?;
    let ref_aa = canonical_aa3(caps.get(1)?.as_str())?;
    let position = caps.get(2)?.as_str().parse().ok()?;
    let alt_raw = caps.get(3)?.as_str();
    let alt_aa = if alt_raw == "=" { None } else { Some(canonical_aa3(alt_raw)?) };
    Some(ProteinSubstitution { ref_aa, position, alt_aa })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_three_letter() {
        assert_eq!(protein_position("p.Arg248Gln"), Some(248));
    }

    #[test]
    fn test_position_single_letter_and_nonsense() {
        assert_eq!(protein_position("p.R175H"), Some(175));
        assert_eq!(protein_position("p.Arg213*"), Some(213));
        assert_eq!(protein_position("NP_000537.3:p.Gly245Ser"), Some(245));
    }

    #[test]
    fn test_position_missing() {
        assert_eq!(protein_position("c.743G>A"), None);
        assert_eq!(protein_position(""), None);
    }

    #[test]
    fn test_parse_substitution() {
        let s = parse_substitution("p.R248Q").unwrap();
        assert_eq!(s.ref_aa, "Arg");
        assert_eq!(s.position, 248);
        assert_eq!(s.alt_aa, Some("Gln"));

        let syn = parse_substitution("p.Gly12=").unwrap();
        assert_eq!(syn.alt_aa, None);
    }
}
