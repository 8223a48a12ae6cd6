//! Zone risk analysis.
//!
//! The analyzer itself is synchronous and pure apart from the confidence
//! draw; [`batch`] runs independent batches concurrently.

pub mod aggregator;
pub mod analyzer;
pub mod batch;
pub mod confidence;
pub mod rules;

pub use aggregator::*;
pub use analyzer::ZoneRiskAnalyzer;
pub use confidence::{ConfidenceEstimator, FixedConfidence, RandomConfidence};
pub use rules::{AnalyzerConfig, CategoryRule, Profile};
