//! Confidence arithmetic shared by the evaluators and the classifier.

/// Fraction of expected inputs that were present, in [0.0, 1.0].
pub fn coverage_ratio(present: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    (present as f64 / expected as f64).min(1.0)
}

/// Aggregate confidence from multiple independent evidence sources
/// using the noisy-OR model: p = 1 - Π(1 - p_i)
pub fn aggregate_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    let product: f64 = confidences.iter().map(|&p| 1.0 - p.clamp(0.0, 1.0)).product();
    1.0 - product
}

/// Apply the contradiction penalty (×0.70) to a confidence value.
pub fn contradiction_penalty(confidence: f64) -> f64 {
    (confidence * 0.70).clamp(0.0, 1.0)
}

/// Weighted mean of (value, weight) pairs; None when total weight is zero.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    let total: f64 = pairs.iter().map(|&(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }
    Some(pairs.iter().map(|&(v, w)| v * w).sum::<f64>() / total)
}
