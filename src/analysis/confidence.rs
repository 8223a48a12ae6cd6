//! Confidence scores attached to analysis runs.
//!
//! The score is presentational. It is not derived from the readings
//! and carries no statistical meaning.

use crate::models::ZoneReading;
use rand::Rng;

/// Produces the confidence value for one analysis run.
pub trait ConfidenceEstimator: Send + Sync {
    /// Confidence for a non-empty batch of readings.
    fn estimate(&self, readings: &[ZoneReading]) -> u8;
}

/// Draws a uniform integer from an inclusive range on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomConfidence {
    min: u8,
    max: u8,
}

impl RandomConfidence {
    /// Bounds are reordered if given backwards.
    pub fn new(min: u8, max: u8) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }
}

impl Default for RandomConfidence {
    fn default() -> Self {
        Self::new(85, 95)
    }
}

impl ConfidenceEstimator for RandomConfidence {
    fn estimate(&self, _readings: &[ZoneReading]) -> u8 {
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

/// Always reports the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedConfidence(pub u8);

impl ConfidenceEstimator for FixedConfidence {
    fn estimate(&self, _readings: &[ZoneReading]) -> u8 {
        self.0
    }
}
