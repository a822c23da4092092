//! varclass-evaluators — Evidence evaluators over resolved fact bundles.
//!
//! Each evaluator is a pure function of the variant, one typed fact bundle
//! and the evaluation profile. It emits at most one evidence code and
//! always reports how much of its expected input was present.

pub mod weights;
pub mod normalise;
pub mod profile;
pub mod outcome;
pub mod population;
pub mod composite;
pub mod domain;
pub mod phenotype;
pub mod clinical;
pub mod registry;

pub use outcome::EvaluatorOutcome;
pub use profile::EvaluationProfile;
pub use registry::{evaluate_all, registry, EvaluationInput, EvaluationSummary, EvaluatorFn, EvaluatorKind};
pub use weights::{PredictorWeights, WeightError};
