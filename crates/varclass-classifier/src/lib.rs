//! varclass-classifier — Conflict resolution, points scoring and the
//! end-to-end classification pipeline.

pub mod merge;
pub mod conflict;
pub mod scoring;
pub mod rules;
pub mod confidence;
pub mod suggestions;
pub mod classifier;
pub mod pipeline;

pub use classifier::Classifier;
pub use conflict::{resolve_conflicts, ConflictOutcome};
pub use merge::merge_evidence;
pub use pipeline::{ClassificationPipeline, ClassificationReport, ClassificationRequest};
pub use rules::combining_rules_tier;
pub use scoring::{tier_for, total_points};
