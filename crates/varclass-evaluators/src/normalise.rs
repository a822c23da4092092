//! Predictor score normalisation onto a common 0–1 pathogenicity scale.

use varclass_common::Predictor;

/// CADD PHRED treated as maximally damaging at and above this value.
const CADD_PHRED_CEILING: f64 = 40.0;

/// Min-max normalisation within [min_val, max_val], clamped to [0, 1].
pub fn minmax_normalise(value: f64, min_val: f64, max_val: f64) -> f64 {
    if (max_val - min_val).abs() < 1e-10 {
        return 0.5; // degenerate case
    }
    ((value - min_val) / (max_val - min_val)).clamp(0.0, 1.0)
}

/// Map a native predictor score to [0, 1] where higher means more damaging.
pub fn normalise_predictor(predictor: Predictor, value: f64) -> f64 {
    match predictor {
        Predictor::CaddPhred => minmax_normalise(value, 0.0, CADD_PHRED_CEILING),
        // SIFT: 0 = deleterious
        Predictor::Sift => 1.0 - value.clamp(0.0, 1.0),
        // FATHMM: below about -1.5 is damaging; map [5, -5] onto [0, 1]
        Predictor::Fathmm => ((5.0 - value) / 10.0).clamp(0.0, 1.0),
        _ => value.clamp(0.0, 1.0),
    }
}
