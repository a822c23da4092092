//! varclass-common — Shared data model, errors, and helpers used across all varclass crates.

pub mod error;
pub mod variant;
pub mod hgvs;
pub mod facts;
pub mod evidence;
pub mod confidence;
pub mod thresholds;
pub mod result;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, VarclassError};
pub use variant::{Consequence, GenomeBuild, Variant, VariantId};
pub use facts::{
    CategoryFacts, ClinicalFacts, DomainFacts, FactBundle, FactCategory, FactSet, PhenotypeFacts,
    PopulationFacts, Predictor, PredictorFacts, Sourced, ValidationError,
};
pub use evidence::{ConfidenceLabel, Criterion, Direction, EvidenceCode, EvidenceOrigin, Strength};
pub use thresholds::{GuidelineVersion, Thresholds};
pub use result::{ClassificationResult, ConflictKind, ConflictResolution, EvidenceConflict, InputCoverage, Tier};
