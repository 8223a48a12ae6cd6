//! Threshold rules and analyzer profiles.
//!
//! The minimal and extended analyzers differ only in which categories
//! they evaluate, how issues are labelled, and how the summary is rounded.
//! Both are expressed as an [`AnalyzerConfig`] driving the same engine.

use crate::models::{IssueCategory, Severity, ZoneReading};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Placeholder complaint resolution time until a complaints feed exists.
pub const DEFAULT_COMPLAINT_RESOLUTION: f64 = 2.5;

/// Errors raised when a rule set is inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("{category}: warning threshold {warning} is above critical threshold {critical}")]
    InvertedThresholds {
        category: IssueCategory,
        warning: f64,
        critical: f64,
    },

    #[error("{0}: thresholds must be finite numbers")]
    NonFinite(IssueCategory),
}

/// Analyzer variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Four categories, descriptive labels, rounded summary
    #[default]
    Extended,
    /// Three categories, short labels, unrounded averages
    Minimal,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Extended => write!(f, "extended"),
            Profile::Minimal => write!(f, "minimal"),
        }
    }
}

impl Profile {
    /// Issue `type` label for a category.
    pub fn label(&self, category: IssueCategory) -> &'static str {
        match self {
            Profile::Extended => category.descriptive_label(),
            Profile::Minimal => category.short_label(),
        }
    }

    /// Build the `details` text for an issue raised on `reading`.
    pub fn details(&self, category: IssueCategory, severity: Severity, reading: &ZoneReading) -> String {
        match self {
            Profile::Extended => descriptive_details(category, severity, reading),
            Profile::Minimal => short_details(category, severity).to_string(),
        }
    }

    /// Rounds the waste and traffic averages.
    pub fn round_average(&self, value: f64) -> f64 {
        match self {
            Profile::Extended => round_to(value, 1),
            Profile::Minimal => value,
        }
    }

    /// Rounds the air quality average.
    pub fn round_air_quality(&self, value: f64) -> f64 {
        match self {
            Profile::Extended => value.round(),
            Profile::Minimal => round_to(value, 1),
        }
    }
}

fn descriptive_details(category: IssueCategory, severity: Severity, reading: &ZoneReading) -> String {
    match (category, severity) {
        (IssueCategory::Waste, Severity::Critical) => format!(
            "Critical waste level at {}%. Immediate collection required.",
            reading.waste
        ),
        (IssueCategory::Waste, Severity::Warning) => format!(
            "High waste level at {}%. Schedule collection within 24-48 hours.",
            reading.waste
        ),
        (IssueCategory::Traffic, Severity::Critical) => format!(
            "Severe congestion at {}% with {} accidents. Deploy traffic control.",
            reading.traffic.congestion, reading.traffic.accidents
        ),
        (IssueCategory::Traffic, Severity::Warning) => format!(
            "High traffic congestion at {}%. Monitor closely.",
            reading.traffic.congestion
        ),
        (IssueCategory::StreetLights, Severity::Critical) => format!(
            "{} streetlight failures detected. Safety hazard - urgent repair needed.",
            reading.street_lights
        ),
        (IssueCategory::StreetLights, Severity::Warning) => format!(
            "{} streetlight failures. Schedule maintenance within 72 hours.",
            reading.street_lights
        ),
        (IssueCategory::AirQuality, Severity::Critical) => format!(
            "Poor air quality (AQI: {}). Health advisory recommended.",
            reading.air_quality
        ),
        (IssueCategory::AirQuality, Severity::Warning) => format!(
            "Moderate air pollution (AQI: {}). Sensitive groups advised.",
            reading.air_quality
        ),
    }
}

fn short_details(category: IssueCategory, severity: Severity) -> &'static str {
    match (category, severity) {
        (IssueCategory::Waste, Severity::Critical) => "High waste level",
        (IssueCategory::Waste, Severity::Warning) => "Moderate waste level",
        (IssueCategory::Traffic, Severity::Critical) => "Severe congestion",
        (IssueCategory::Traffic, Severity::Warning) => "High congestion",
        (IssueCategory::StreetLights, Severity::Critical) => "Multiple failures",
        (IssueCategory::StreetLights, Severity::Warning) => "Some failures",
        (IssueCategory::AirQuality, Severity::Critical) => "Poor air quality",
        (IssueCategory::AirQuality, Severity::Warning) => "Moderate air pollution",
    }
}

/// Round `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Warning and critical cut points for one category.
///
/// Both comparisons are strict: a value equal to a threshold does not trip it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: IssueCategory,
    pub warning_above: f64,
    pub critical_above: f64,
}

impl CategoryRule {
    pub fn new(category: IssueCategory, warning_above: f64, critical_above: f64) -> Self {
        Self {
            category,
            warning_above,
            critical_above,
        }
    }

    /// Default cut points for a category.
    pub fn standard(category: IssueCategory) -> Self {
        match category {
            IssueCategory::Waste => Self::new(category, 60.0, 80.0),
            IssueCategory::Traffic => Self::new(category, 60.0, 80.0),
            IssueCategory::StreetLights => Self::new(category, 1.0, 3.0),
            IssueCategory::AirQuality => Self::new(category, 75.0, 90.0),
        }
    }

    /// Classify a metric value. Critical is checked first.
    pub fn classify(&self, value: f64) -> Option<Severity> {
        if value > self.critical_above {
            Some(Severity::Critical)
        } else if value > self.warning_above {
            Some(Severity::Warning)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), RuleError> {
        if !self.warning_above.is_finite() || !self.critical_above.is_finite() {
            return Err(RuleError::NonFinite(self.category));
        }
        if self.warning_above > self.critical_above {
            return Err(RuleError::InvertedThresholds {
                category: self.category,
                warning: self.warning_above,
                critical: self.critical_above,
            });
        }
        Ok(())
    }
}

/// Configuration of a [`ZoneRiskAnalyzer`](super::ZoneRiskAnalyzer).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub profile: Profile,
    /// Rules in category evaluation order, at most one per category.
    rules: Vec<CategoryRule>,
    pub complaint_resolution: f64,
}

impl AnalyzerConfig {
    /// All four categories with descriptive labels.
    pub fn extended() -> Self {
        Self {
            profile: Profile::Extended,
            rules: IssueCategory::ALL
                .iter()
                .map(|c| CategoryRule::standard(*c))
                .collect(),
            complaint_resolution: DEFAULT_COMPLAINT_RESOLUTION,
        }
    }

    /// Waste, traffic and streetlights with short labels.
    pub fn minimal() -> Self {
        Self {
            profile: Profile::Minimal,
            rules: vec![
                CategoryRule::standard(IssueCategory::Waste),
                CategoryRule::standard(IssueCategory::Traffic),
                CategoryRule::standard(IssueCategory::StreetLights),
            ],
            complaint_resolution: DEFAULT_COMPLAINT_RESOLUTION,
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Extended => Self::extended(),
            Profile::Minimal => Self::minimal(),
        }
    }

    /// Active rules in evaluation order.
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn rule(&self, category: IssueCategory) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.category == category)
    }

    /// Add or replace the rule for `rule.category`.
    pub fn with_rule(mut self, rule: CategoryRule) -> Self {
        self.rules.retain(|r| r.category != rule.category);
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.category);
        self
    }

    /// Stop evaluating `category`.
    pub fn without(mut self, category: IssueCategory) -> Self {
        self.rules.retain(|r| r.category != category);
        self
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        self.rules.iter().try_for_each(CategoryRule::validate)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::extended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneId;

    #[test]
    fn test_classify_is_strict() {
        let rule = CategoryRule::standard(IssueCategory::Waste);
        assert_eq!(rule.classify(60.0), None);
        assert_eq!(rule.classify(61.0), Some(Severity::Warning));
        assert_eq!(rule.classify(80.0), Some(Severity::Warning));
        assert_eq!(rule.classify(81.0), Some(Severity::Critical));
    }

    #[test]
    fn test_streetlight_thresholds() {
        let rule = CategoryRule::standard(IssueCategory::StreetLights);
        assert_eq!(rule.classify(1.0), None);
        assert_eq!(rule.classify(2.0), Some(Severity::Warning));
        assert_eq!(rule.classify(3.0), Some(Severity::Warning));
        assert_eq!(rule.classify(4.0), Some(Severity::Critical));
    }

    #[test]
    fn test_profiles() {
        let extended = AnalyzerConfig::extended();
        assert_eq!(extended.rules().len(), 4);
        assert!(extended.rule(IssueCategory::AirQuality).is_some());

        let minimal = AnalyzerConfig::minimal();
        assert_eq!(minimal.rules().len(), 3);
        assert!(minimal.rule(IssueCategory::AirQuality).is_none());
        assert_eq!(minimal.profile.label(IssueCategory::StreetLights), "Streetlights");
    }

    #[test]
    fn test_with_rule_keeps_evaluation_order() {
        let config = AnalyzerConfig::minimal()
            .with_rule(CategoryRule::new(IssueCategory::AirQuality, 50.0, 70.0))
            .with_rule(CategoryRule::new(IssueCategory::Waste, 40.0, 50.0));

        let order: Vec<_> = config.rules().iter().map(|r| r.category).collect();
        assert_eq!(order, IssueCategory::ALL.to_vec());
        assert_eq!(
            config.rule(IssueCategory::Waste).map(|r| r.warning_above),
            Some(40.0)
        );
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = AnalyzerConfig::extended()
            .with_rule(CategoryRule::new(IssueCategory::Traffic, 90.0, 80.0));
        assert!(matches!(
            config.validate(),
            Err(RuleError::InvertedThresholds { .. })
        ));

        let config = AnalyzerConfig::extended()
            .with_rule(CategoryRule::new(IssueCategory::Waste, f64::NAN, 80.0));
        assert_eq!(
            config.validate(),
            Err(RuleError::NonFinite(IssueCategory::Waste))
        );
    }

    #[test]
    fn test_descriptive_details_interpolate_values() {
        let mut reading = ZoneReading::new(ZoneId::Number(2), "Zone-B");
        reading.traffic.congestion = 85.0;
        reading.traffic.accidents = 3;

        let text = Profile::Extended.details(IssueCategory::Traffic, Severity::Critical, &reading);
        assert_eq!(
            text,
            "Severe congestion at 85% with 3 accidents. Deploy traffic control."
        );

        let short = Profile::Minimal.details(IssueCategory::Traffic, Severity::Critical, &reading);
        assert_eq!(short, "Severe congestion");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to(60.04, 1), 60.0);
        assert_eq!(round_to(66.66, 1), 66.7);
        assert_eq!(Profile::Extended.round_air_quality(78.6), 79.0);
        assert_eq!(Profile::Minimal.round_air_quality(78.66), 78.7);
        assert_eq!(Profile::Minimal.round_average(66.666), 66.666);
    }
}
