use serde_json::Value;
use varclass_common::{CategoryFacts, FactCategory};

use crate::error::CacheError;

/// Structural and range check run on every payload before it is stored and
/// again before it is served.
pub trait PayloadValidator: Send + Sync {
    fn validate(&self, category: FactCategory, payload: &Value) -> Result<(), CacheError>;
}

/// Validates payloads as serialized [`CategoryFacts`] of the key's category.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactValidator;

impl PayloadValidator for FactValidator {
    fn validate(&self, category: FactCategory, payload: &Value) -> Result<(), CacheError> {
        let facts: CategoryFacts = serde_json::from_value(payload.clone())?;
        if facts.category() != category {
            return Err(CacheError::WrongCategory { expected: category.to_string() });
        }
        facts.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use varclass_common::{Predictor, PredictorFacts};

    #[test]
    fn test_accepts_valid_bundle() {
        let facts = CategoryFacts::Predictors(PredictorFacts::default().with(Predictor::Revel, 0.8, "myvariant"));
        let payload = serde_json::to_value(&facts).unwrap();
        assert!(FactValidator.validate(FactCategory::Predictors, &payload).is_ok());
    }

    #[test]
    fn test_rejects_wrong_category() {
        let facts = CategoryFacts::Predictors(PredictorFacts::default());
        let payload = serde_json::to_value(&facts).unwrap();
        assert!(matches!(
            FactValidator.validate(FactCategory::Population, &payload),
            Err(CacheError::WrongCategory { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_and_garbage() {
        let payload = json!({
            "category": "predictors",
            "facts": { "scores": { "revel": { "value": 7.0, "source": "x" } } }
        });
        assert!(FactValidator.validate(FactCategory::Predictors, &payload).is_err());
        assert!(FactValidator.validate(FactCategory::Predictors, &json!("nope")).is_err());
    }
}
