//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cityinsights.toml` files.

use crate::analysis::{
    AnalyzerConfig, CategoryRule, ConfidenceEstimator, FixedConfidence, Profile, RandomConfidence,
};
use crate::models::IssueCategory;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".cityinsights.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analyzer settings.
    #[serde(default)]
    pub analyzer: AnalyzerSettings,

    /// Per-category threshold overrides.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    /// Confidence score settings.
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Number of batches analyzed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// JSON-lines file receiving one snapshot per analyzed batch.
    #[serde(default)]
    pub history: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            concurrency: default_concurrency(),
            history: None,
        }
    }
}

fn default_output() -> String {
    "city_insights.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Base rule set: "extended" or "minimal".
    #[serde(default)]
    pub profile: Profile,

    /// Reported as avgComplaintResolution until complaints are tracked.
    #[serde(default = "default_complaint_resolution")]
    pub complaint_resolution_placeholder: f64,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            complaint_resolution_placeholder: default_complaint_resolution(),
        }
    }
}

fn default_complaint_resolution() -> f64 {
    crate::analysis::rules::DEFAULT_COMPLAINT_RESOLUTION
}

/// Threshold overrides, one optional table per category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default)]
    pub waste: Option<ThresholdOverride>,
    #[serde(default)]
    pub traffic: Option<ThresholdOverride>,
    #[serde(default)]
    pub street_lights: Option<ThresholdOverride>,
    #[serde(default)]
    pub air_quality: Option<ThresholdOverride>,
}

impl ThresholdsConfig {
    fn get(&self, category: IssueCategory) -> Option<&ThresholdOverride> {
        match category {
            IssueCategory::Waste => self.waste.as_ref(),
            IssueCategory::Traffic => self.traffic.as_ref(),
            IssueCategory::StreetLights => self.street_lights.as_ref(),
            IssueCategory::AirQuality => self.air_quality.as_ref(),
        }
    }
}

/// Override for one category. Unset fields keep the profile default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdOverride {
    #[serde(default)]
    pub warning_above: Option<f64>,
    #[serde(default)]
    pub critical_above: Option<f64>,
    /// Force the category on or off regardless of profile.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// How the confidence score is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceMode {
    #[default]
    Random,
    Fixed,
}

/// Confidence score settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default)]
    pub mode: ConfidenceMode,

    /// Lower bound for random mode.
    #[serde(default = "default_confidence_min")]
    pub min: u8,

    /// Upper bound for random mode.
    #[serde(default = "default_confidence_max")]
    pub max: u8,

    /// Value reported in fixed mode.
    #[serde(default = "default_confidence_value")]
    pub value: u8,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            mode: ConfidenceMode::default(),
            min: default_confidence_min(),
            max: default_confidence_max(),
            value: default_confidence_value(),
        }
    }
}

fn default_confidence_min() -> u8 {
    85
}

fn default_confidence_max() -> u8 {
    95
}

fn default_confidence_value() -> u8 {
    90
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the per-zone risk table.
    #[serde(default = "default_true")]
    pub include_zone_table: bool,

    /// Number of zones listed as most at risk.
    #[serde(default = "default_top_zones")]
    pub top_zones: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_zone_table: true,
            top_zones: default_top_zones(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_zones() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load [`CONFIG_FILE`] from `dir`, if present.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(profile) = args.profile {
            self.analyzer.profile = profile;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(ref history) = args.history {
            self.general.history = Some(history.display().to_string());
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        // A CLI confidence pins the score
        if let Some(value) = args.confidence {
            self.confidence.mode = ConfidenceMode::Fixed;
            self.confidence.value = value;
        }
    }

    /// Check settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            bail!("general.concurrency must be at least 1");
        }

        if self.confidence.min > self.confidence.max {
            bail!(
                "confidence.min ({}) is above confidence.max ({})",
                self.confidence.min,
                self.confidence.max
            );
        }

        if self.confidence.max > 100 || self.confidence.value > 100 {
            bail!("confidence values must be between 0 and 100");
        }

        if !self.analyzer.complaint_resolution_placeholder.is_finite() {
            bail!("analyzer.complaint_resolution_placeholder must be a finite number");
        }

        self.analyzer_config()?;
        Ok(())
    }

    /// Build the analyzer rule set: the profile defaults with overrides applied.
    pub fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let mut config = AnalyzerConfig::for_profile(self.analyzer.profile);
        config.complaint_resolution = self.analyzer.complaint_resolution_placeholder;

        for category in IssueCategory::ALL {
            let Some(over) = self.thresholds.get(category) else {
                continue;
            };

            let base = config
                .rule(category)
                .copied()
                .unwrap_or_else(|| CategoryRule::standard(category));
            let enabled = over.enabled.unwrap_or(config.rule(category).is_some());

            config = if enabled {
                config.with_rule(CategoryRule::new(
                    category,
                    over.warning_above.unwrap_or(base.warning_above),
                    over.critical_above.unwrap_or(base.critical_above),
                ))
            } else {
                config.without(category)
            };
        }

        config
            .validate()
            .context("Invalid threshold configuration")?;

        Ok(config)
    }

    /// Build the confidence estimator.
    pub fn confidence_estimator(&self) -> Box<dyn ConfidenceEstimator> {
        match self.confidence.mode {
            ConfidenceMode::Random => {
                Box::new(RandomConfidence::new(self.confidence.min, self.confidence.max))
            }
            ConfidenceMode::Fixed => Box::new(FixedConfidence(self.confidence.value)),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(temp_dir.path().join(CONFIG_FILE), "[analyzer]\nprofile = \"minimal\"\n")
            .unwrap();
        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.analyzer.profile, Profile::Minimal);
    }

    #[test]
    fn test_broken_config_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE), "[thresholds.waste\nwarning_above = 50\n")
            .unwrap();

        let err = Config::load_from_dir(temp_dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analyzer.profile, Profile::Extended);
        assert_eq!(config.analyzer.complaint_resolution_placeholder, 2.5);
        assert_eq!(config.confidence.mode, ConfidenceMode::Random);
        assert_eq!(config.general.concurrency, 4);
        assert!(config.validate().is_ok());
        assert_eq!(config.analyzer_config().unwrap(), AnalyzerConfig::extended());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "zones.md"
history = "history.jsonl"

[analyzer]
profile = "minimal"

[thresholds.waste]
warning_above = 50
critical_above = 70

[thresholds.air_quality]
enabled = true

[confidence]
mode = "fixed"
value = 80
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "zones.md");
        assert_eq!(config.general.history.as_deref(), Some("history.jsonl"));
        assert_eq!(config.analyzer.profile, Profile::Minimal);
        assert_eq!(config.confidence.mode, ConfidenceMode::Fixed);

        let analyzer = config.analyzer_config().unwrap();
        let waste = analyzer.rule(IssueCategory::Waste).unwrap();
        assert_eq!(waste.warning_above, 50.0);
        assert_eq!(waste.critical_above, 70.0);

        // Enabled on top of the minimal profile with standard cut points
        let air = analyzer.rule(IssueCategory::AirQuality).unwrap();
        assert_eq!(air.critical_above, 90.0);
        assert_eq!(analyzer.rules().len(), 4);

        assert_eq!(config.confidence_estimator().estimate(&[]), 80);
    }

    #[test]
    fn test_disable_category() {
        let toml_content = r#"
[thresholds.street_lights]
enabled = false
"#;
        let config: Config = toml::from_str(toml_content).unwrap();
        let analyzer = config.analyzer_config().unwrap();
        assert!(analyzer.rule(IssueCategory::StreetLights).is_none());
        assert_eq!(analyzer.rules().len(), 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.thresholds.traffic = Some(ThresholdOverride {
            warning_above: Some(85.0),
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.confidence.min = 96;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.general.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analyzer]"));
        assert!(toml_str.contains("[confidence]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.analyzer.profile, Profile::Extended);
    }
}
