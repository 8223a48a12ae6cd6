//! The zone risk analyzer.
//!
//! Turns a batch of zone readings into city-wide aggregates and a
//! severity-tagged issue list per zone.

use crate::analysis::confidence::{ConfidenceEstimator, RandomConfidence};
use crate::analysis::rules::AnalyzerConfig;
use crate::models::{
    AnalysisResult, AnalysisSummary, IssueCategory, Issue, ZoneInsight, ZoneReading,
};
use tracing::debug;

/// Rule-based classifier for zone readings.
///
/// Missing or non-finite metrics count as zero everywhere: in the
/// aggregates and in every category check.
pub struct ZoneRiskAnalyzer {
    config: AnalyzerConfig,
    confidence: Box<dyn ConfidenceEstimator>,
}

impl ZoneRiskAnalyzer {
    pub fn new(config: AnalyzerConfig, confidence: Box<dyn ConfidenceEstimator>) -> Self {
        Self { config, confidence }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one batch of readings.
    pub fn analyze(&self, readings: &[ZoneReading]) -> AnalysisResult {
        if readings.is_empty() {
            debug!("No readings supplied, returning empty analysis");
            return AnalysisResult::empty();
        }

        let count = readings.len() as f64;
        let profile = self.config.profile;

        let avg_waste =
            readings.iter().map(|r| metric(r, IssueCategory::Waste)).sum::<f64>() / count;
        let avg_traffic =
            readings.iter().map(|r| metric(r, IssueCategory::Traffic)).sum::<f64>() / count;
        let total_light_failures =
            readings.iter().map(|r| u64::from(r.street_lights)).sum::<u64>();
        let avg_air_quality =
            readings.iter().map(|r| metric(r, IssueCategory::AirQuality)).sum::<f64>() / count;

        let insights: Vec<ZoneInsight> = readings.iter().map(|r| self.classify(r)).collect();

        let summary = AnalysisSummary {
            avg_waste: profile.round_average(avg_waste),
            avg_traffic: profile.round_average(avg_traffic),
            total_light_failures,
            avg_complaint_resolution: self.config.complaint_resolution,
            air_quality: profile.round_air_quality(avg_air_quality),
        };

        debug!(
            "Analyzed {} zones with {} profile: {} issues",
            readings.len(),
            profile,
            insights.iter().map(|i| i.issues.len()).sum::<usize>()
        );

        AnalysisResult {
            summary,
            insights,
            confidence: self.confidence.estimate(readings),
        }
    }

    /// Classify a single reading against every active rule.
    pub fn classify(&self, reading: &ZoneReading) -> ZoneInsight {
        let profile = self.config.profile;

        let issues = self
            .config
            .rules()
            .iter()
            .filter_map(|rule| {
                let severity = rule.classify(metric(reading, rule.category))?;
                Some(Issue {
                    kind: profile.label(rule.category).to_string(),
                    severity,
                    details: profile.details(rule.category, severity, reading),
                })
            })
            .collect();

        ZoneInsight {
            zone: reading.name.clone(),
            issues,
        }
    }
}

impl Default for ZoneRiskAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default(), Box::new(RandomConfidence::default()))
    }
}

/// The value a category is classified on, with non-finite values as zero.
fn metric(reading: &ZoneReading, category: IssueCategory) -> f64 {
    let value = match category {
        IssueCategory::Waste => reading.waste,
        IssueCategory::Traffic => reading.traffic.congestion,
        IssueCategory::StreetLights => f64::from(reading.street_lights),
        IssueCategory::AirQuality => reading.air_quality,
    };

    if value.is_finite() {
        value
    } else {
        0.0
    }
}
