//! Per-predictor weight table for the computational composite.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use varclass_common::Predictor;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("weight for {predictor} must be finite and non-negative, got {value}")]
    Invalid { predictor: &'static str, value: f64 },
    #[error("predictor weights sum to zero")]
    ZeroSum,
}

/// The 8-component predictor weight vector.
/// Only the present predictors' weights are used, renormalised per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictorWeights {
    /// Ensemble missense score; strongest single predictor
    #[serde(default = "default_revel")]
    pub revel: f64,
    #[serde(default = "default_cadd_phred")]
    pub cadd_phred: f64,
    #[serde(default = "default_alphamissense")]
    pub alphamissense: f64,
    #[serde(default = "default_sift")]
    pub sift: f64,
    #[serde(default = "default_polyphen2")]
    pub polyphen2: f64,
    #[serde(default = "default_metasvm")]
    pub metasvm: f64,
    #[serde(default = "default_vest4")]
    pub vest4: f64,
    #[serde(default = "default_fathmm")]
    pub fathmm: f64,
}

fn default_revel() -> f64 { 0.25 }
fn default_cadd_phred() -> f64 { 0.20 }
fn default_alphamissense() -> f64 { 0.15 }
fn default_sift() -> f64 { 0.10 }
fn default_polyphen2() -> f64 { 0.10 }
fn default_metasvm() -> f64 { 0.10 }
fn default_vest4() -> f64 { 0.05 }
fn default_fathmm() -> f64 { 0.05 }

impl Default for PredictorWeights {
    fn default() -> Self {
        Self {
            revel:         default_revel(),
            cadd_phred:    default_cadd_phred(),
            alphamissense: default_alphamissense(),
            sift:          default_sift(),
            polyphen2:     default_polyphen2(),
            metasvm:       default_metasvm(),
            vest4:         default_vest4(),
            fathmm:        default_fathmm(),
        }
    }
}

impl PredictorWeights {
    pub fn get(&self, predictor: Predictor) -> f64 {
        match predictor {
            Predictor::Revel => self.revel,
            Predictor::CaddPhred => self.cadd_phred,
            Predictor::AlphaMissense => self.alphamissense,
            Predictor::Sift => self.sift,
            Predictor::Polyphen2 => self.polyphen2,
            Predictor::MetaSvm => self.metasvm,
            Predictor::Vest4 => self.vest4,
            Predictor::Fathmm => self.fathmm,
        }
    }

    /// In `Predictor::ALL` order.
    pub fn as_array(&self) -> [f64; 8] {
        Predictor::ALL.map(|p| self.get(p))
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Whether the weights sum to ~1.0
    pub fn sums_to_one(&self) -> bool {
        (self.sum() - 1.0).abs() < 1e-6
    }

    /// Renormalise weights so they sum to 1.0
    pub fn normalise(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            self.revel         /= sum;
            self.cadd_phred    /= sum;
            self.alphamissense /= sum;
            self.sift          /= sum;
            self.polyphen2     /= sum;
            self.metasvm       /= sum;
            self.vest4         /= sum;
            self.fathmm        /= sum;
        }
    }

    /// Every weight finite and non-negative, and not all zero.
    pub fn validate(&self) -> Result<(), WeightError> {
        for predictor in Predictor::ALL {
            let value = self.get(predictor);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightError::Invalid { predictor: predictor.as_str(), value });
            }
        }
        if self.sum() <= 0.0 {
            return Err(WeightError::ZeroSum);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = PredictorWeights::default();
        assert!(w.sums_to_one(), "Default weights must sum to 1.0");
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_normalise_restores_sum() {
        let mut w = PredictorWeights::default();
        w.revel += 0.10;
        assert!(!w.sums_to_one());
        w.normalise();
        assert!(w.sums_to_one());
    }

    #[test]
    fn test_validate_rejects_negative_and_zero() {
        let mut w = PredictorWeights::default();
        w.sift = -0.1;
        assert!(matches!(w.validate(), Err(WeightError::Invalid { predictor: "sift", .. })));

        let zero = PredictorWeights {
            revel: 0.0, cadd_phred: 0.0, alphamissense: 0.0, sift: 0.0,
            polyphen2: 0.0, metasvm: 0.0, vest4: 0.0, fathmm: 0.0,
        };
        assert_eq!(zero.validate(), Err(WeightError::ZeroSum));
    }
}
