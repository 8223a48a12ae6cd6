//! Data models for the zone risk analyzer.
//!
//! This module contains the core data structures used throughout
//! the application for representing zone readings, detected issues,
//! per-zone insights, and the analysis result handed to sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Identifier of a zone: a positive integer or a string key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneId {
    Number(u64),
    Key(String),
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneId::Number(n) => write!(f, "{}", n),
            ZoneId::Key(k) => write!(f, "{}", k),
        }
    }
}

/// Reads a metric. Anything that is not a finite number reads as zero.
fn lenient_metric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// Reads a count. Negative, fractional and non-numeric values read as zero;
/// integral floats such as `2.0` keep their value.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match value.as_u64() {
        Some(n) => n,
        None => value
            .as_f64()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map_or(0, |v| v as u64),
    };
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Reads the traffic block. Anything other than an object reads as all zero.
fn lenient_traffic<'de, D>(deserializer: D) -> Result<TrafficReading, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value).unwrap_or_default()),
        _ => Ok(TrafficReading::default()),
    }
}

/// Traffic metrics for a zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReading {
    /// Congestion percentage. Drives classification.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub congestion: f64,
    /// Accident count, carried through into issue details.
    #[serde(default, deserialize_with = "lenient_count")]
    pub accidents: u32,
    /// Average speed in km/h, carried through.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub avg_speed: f64,
}

/// One snapshot of a zone's metrics at analysis time.
///
/// Missing, null or non-numeric metrics deserialize as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneReading {
    /// Unique zone identifier.
    pub id: ZoneId,
    /// Display name, unique within a batch.
    pub name: String,
    /// Latitude, for map collaborators only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude, for map collaborators only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Waste bin fill level in percent.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub waste: f64,
    /// Traffic metrics.
    #[serde(default, deserialize_with = "lenient_traffic")]
    pub traffic: TrafficReading,
    /// Number of streetlights currently reported faulty.
    #[serde(default, deserialize_with = "lenient_count")]
    pub street_lights: u32,
    /// Air quality index, higher is worse.
    #[serde(default, deserialize_with = "lenient_metric")]
    pub air_quality: f64,
}

#[cfg(test)]
impl ZoneReading {
    /// Creates a reading with every metric at zero.
    pub fn new(id: ZoneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lat: None,
            lng: None,
            waste: 0.0,
            traffic: TrafficReading::default(),
            street_lights: 0,
            air_quality: 0.0,
        }
    }
}

/// Severity of a detected issue.
///
/// "Good" is not a severity: a healthy metric produces no issue at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Overall risk of a zone, ordered good < warning < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Good,
    Warning,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Good => write!(f, "Good"),
            RiskLevel::Warning => write!(f, "Warning"),
            RiskLevel::Critical => write!(f, "Critical"),
        }
    }
}

impl RiskLevel {
    /// Returns an emoji representation of the risk level.
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Good => "🟢",
            RiskLevel::Warning => "🟡",
            RiskLevel::Critical => "🔴",
        }
    }
}

impl From<Severity> for RiskLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Warning => RiskLevel::Warning,
            Severity::Critical => RiskLevel::Critical,
        }
    }
}

/// Metric category an issue belongs to, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Waste,
    Traffic,
    StreetLights,
    AirQuality,
}

impl IssueCategory {
    /// All categories in evaluation order.
    pub const ALL: [IssueCategory; 4] = [
        IssueCategory::Waste,
        IssueCategory::Traffic,
        IssueCategory::StreetLights,
        IssueCategory::AirQuality,
    ];

    /// Descriptive label used by the extended profile.
    pub fn descriptive_label(&self) -> &'static str {
        match self {
            IssueCategory::Waste => "Waste Collection",
            IssueCategory::Traffic => "Traffic Management",
            IssueCategory::StreetLights => "Public Safety - Lighting",
            IssueCategory::AirQuality => "Environmental Health",
        }
    }

    /// Short label used by the minimal profile.
    pub fn short_label(&self) -> &'static str {
        match self {
            IssueCategory::Waste => "Waste",
            IssueCategory::Traffic => "Traffic",
            IssueCategory::StreetLights => "Streetlights",
            IssueCategory::AirQuality => "Air Quality",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptive_label())
    }
}

/// A detected condition in one metric category for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Category label, e.g. "Waste Collection".
    #[serde(rename = "type")]
    pub kind: String,
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable explanation with the triggering value.
    pub details: String,
}

/// Issues detected for one zone, keyed by zone name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInsight {
    /// Name of the zone, copied from the reading.
    pub zone: String,
    /// Issues in category evaluation order. Empty means the zone is good.
    pub issues: Vec<Issue>,
}

/// City-wide aggregates over one batch of readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub avg_waste: f64,
    pub avg_traffic: f64,
    /// Sum of faulty-light snapshot counts across zones.
    pub total_light_failures: u64,
    /// Placeholder until a complaints pipeline feeds real values.
    pub avg_complaint_resolution: f64,
    pub air_quality: f64,
}

/// The complete output of one analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,
    /// One insight per input reading, in input order.
    pub insights: Vec<ZoneInsight>,
    /// Presentation-only score with no statistical meaning.
    pub confidence: u8,
}

impl AnalysisResult {
    /// The result of analyzing an empty batch.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Risk assigned to a zone, as written back to a zones table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRisk {
    pub zone: String,
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
}

/// Counts of zones per risk level and issues per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    /// Number of zones.
    pub total: usize,
    pub good: usize,
    pub warning: usize,
    pub critical: usize,
    /// Total number of issues.
    pub issues: usize,
    /// Issues grouped by category label.
    pub by_category: HashMap<String, usize>,
}

/// One persisted analysis run.
///
/// Summary fields are discrete columns; insights are kept as an opaque blob.
/// `zones` holds the risk written back to each zone by this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub avg_waste: f64,
    pub avg_traffic: f64,
    pub total_light_failures: u64,
    pub avg_complaint_resolution: f64,
    pub air_quality: f64,
    pub confidence: u8,
    pub insights_data: serde_json::Value,
    #[serde(default)]
    pub zones: Vec<ZoneRisk>,
}

impl AnalysisRecord {
    /// Flattens a report into a record stamped with its analysis date.
    pub fn from_report(report: &Report) -> serde_json::Result<Self> {
        let result = &report.result;

        Ok(Self {
            timestamp: report.metadata.analysis_date,
            source: report.metadata.source.clone(),
            avg_waste: result.summary.avg_waste,
            avg_traffic: result.summary.avg_traffic,
            total_light_failures: result.summary.total_light_failures,
            avg_complaint_resolution: result.summary.avg_complaint_resolution,
            air_quality: result.summary.air_quality,
            confidence: result.confidence,
            insights_data: serde_json::to_value(&result.insights)?,
            zones: report.zone_risks.clone(),
        })
    }

    /// Rebuilds the analysis result stored in this record.
    pub fn to_result(&self) -> serde_json::Result<AnalysisResult> {
        Ok(AnalysisResult {
            summary: AnalysisSummary {
                avg_waste: self.avg_waste,
                avg_traffic: self.avg_traffic,
                total_light_failures: self.total_light_failures,
                avg_complaint_resolution: self.avg_complaint_resolution,
                air_quality: self.air_quality,
            },
            insights: serde_json::from_value(self.insights_data.clone())?,
            confidence: self.confidence,
        })
    }
}

/// History of one zone across persisted runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStatistics {
    pub zone: String,
    /// Risk from the most recent run that covered the zone.
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
    pub last_analysis: DateTime<Utc>,
    /// Number of runs that covered the zone.
    pub analysis_count: usize,
}

/// Response envelope used by HTTP collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
        }
    }
}

/// Metadata about one analyzed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Where the readings came from.
    pub source: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Analyzer profile name.
    pub profile: String,
    /// Number of zones in the batch.
    pub zones_analyzed: usize,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// Everything a sink needs to publish one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub result: AnalysisResult,
    pub zone_risks: Vec<ZoneRisk>,
    pub breakdown: RiskBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Good < RiskLevel::Warning);
        assert!(RiskLevel::Warning < RiskLevel::Critical);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(RiskLevel::from(Severity::Critical), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_emoji() {
        assert_eq!(RiskLevel::Critical.emoji(), "🔴");
        assert_eq!(RiskLevel::Warning.emoji(), "🟡");
        assert_eq!(RiskLevel::Good.emoji(), "🟢");
    }

    #[test]
    fn test_reading_defaults_missing_metrics() {
        let reading: ZoneReading =
            serde_json::from_str(r#"{"id": 7, "name": "Zone-X"}"#).unwrap();
        assert_eq!(reading.id, ZoneId::Number(7));
        assert_eq!(reading.waste, 0.0);
        assert_eq!(reading.traffic, TrafficReading::default());
        assert_eq!(reading.street_lights, 0);
        assert_eq!(reading.air_quality, 0.0);
    }

    #[test]
    fn test_reading_null_metrics_read_as_zero() {
        let reading: ZoneReading = serde_json::from_str(
            r#"{"id": 1, "name": "A", "waste": null, "airQuality": null,
                "traffic": null, "streetLights": null}"#,
        )
        .unwrap();
        assert_eq!(reading.waste, 0.0);
        assert_eq!(reading.air_quality, 0.0);
        assert_eq!(reading.traffic, TrafficReading::default());
        assert_eq!(reading.street_lights, 0);
    }

    #[test]
    fn test_reading_non_numeric_metrics_read_as_zero() {
        let reading: ZoneReading = serde_json::from_str(
            r#"{"id": 1, "name": "A", "waste": "n/a", "airQuality": true,
                "traffic": {"congestion": "heavy", "accidents": "two", "avgSpeed": 30},
                "streetLights": [1]}"#,
        )
        .unwrap();
        assert_eq!(reading.waste, 0.0);
        assert_eq!(reading.air_quality, 0.0);
        assert_eq!(reading.traffic.congestion, 0.0);
        assert_eq!(reading.traffic.accidents, 0);
        assert_eq!(reading.traffic.avg_speed, 30.0);
        assert_eq!(reading.street_lights, 0);

        let reading: ZoneReading =
            serde_json::from_str(r#"{"id": 2, "name": "B", "traffic": 75}"#).unwrap();
        assert_eq!(reading.traffic, TrafficReading::default());
    }

    #[test]
    fn test_reading_float_counts() {
        let parse = |lights: &str| -> u32 {
            let json = format!(r#"{{"id": 1, "name": "A", "streetLights": {}}}"#, lights);
            serde_json::from_str::<ZoneReading>(&json).unwrap().street_lights
        };

        assert_eq!(parse("2.0"), 2);
        assert_eq!(parse("2.5"), 0);
        assert_eq!(parse("-3"), 0);
        assert_eq!(parse("5"), 5);
    }

    #[test]
    fn test_reading_accepts_string_id_and_camel_case() {
        let reading: ZoneReading = serde_json::from_str(
            r#"{"id": "north-1", "name": "North", "streetLights": 4,
                "airQuality": 91.5, "traffic": {"congestion": 70, "avgSpeed": 22}}"#,
        )
        .unwrap();
        assert_eq!(reading.id, ZoneId::Key("north-1".to_string()));
        assert_eq!(reading.street_lights, 4);
        assert_eq!(reading.air_quality, 91.5);
        assert_eq!(reading.traffic.avg_speed, 22.0);
        assert_eq!(reading.traffic.accidents, 0);
    }

    #[test]
    fn test_result_field_names() {
        let result = AnalysisResult {
            summary: AnalysisSummary {
                avg_waste: 60.0,
                avg_traffic: 50.0,
                total_light_failures: 3,
                avg_complaint_resolution: 2.5,
                air_quality: 70.0,
            },
            insights: vec![ZoneInsight {
                zone: "Zone-A".to_string(),
                issues: vec![Issue {
                    kind: "Waste Collection".to_string(),
                    severity: Severity::Warning,
                    details: "High waste level".to_string(),
                }],
            }],
            confidence: 90,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["summary"]["avgWaste"], 60.0);
        assert_eq!(json["summary"]["totalLightFailures"], 3);
        assert_eq!(json["summary"]["avgComplaintResolution"], 2.5);
        assert_eq!(json["insights"][0]["zone"], "Zone-A");
        assert_eq!(json["insights"][0]["issues"][0]["type"], "Waste Collection");
        assert_eq!(json["insights"][0]["issues"][0]["severity"], "warning");
        assert_eq!(json["confidence"], 90);

        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    fn record_report(result: AnalysisResult) -> Report {
        let zone_risks = result
            .insights
            .iter()
            .map(|insight| ZoneRisk {
                zone: insight.zone.clone(),
                risk_level: RiskLevel::Good,
                issues: insight.issues.clone(),
            })
            .collect();

        Report {
            metadata: ReportMetadata {
                source: "sample".to_string(),
                analysis_date: Utc::now(),
                profile: "minimal".to_string(),
                zones_analyzed: result.insights.len(),
                duration_seconds: 0.0,
            },
            result,
            zone_risks,
            breakdown: RiskBreakdown::default(),
        }
    }

    #[test]
    fn test_record_round_trip() {
        // Unrounded minimal-profile averages need every bit to survive.
        let result = AnalysisResult {
            summary: AnalysisSummary {
                avg_waste: 15.479452054794521,
                avg_traffic: 1.0 / 3.0,
                total_light_failures: 4,
                avg_complaint_resolution: 2.5,
                air_quality: 0.1 + 0.2,
            },
            insights: vec![ZoneInsight {
                zone: "Zone-C".to_string(),
                issues: Vec::new(),
            }],
            confidence: 88,
        };

        let json = serde_json::to_string(&result).unwrap();
        let back: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);

        let record = AnalysisRecord::from_report(&record_report(result.clone())).unwrap();
        assert_eq!(record.confidence, 88);
        assert!(record.insights_data.is_array());
        assert_eq!(record.zones.len(), 1);
        assert_eq!(record.zones[0].risk_level, RiskLevel::Good);

        let line = serde_json::to_string(&record).unwrap();
        let stored: AnalysisRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(stored, record);
        assert_eq!(stored.to_result().unwrap(), result);
    }

    #[test]
    fn test_record_without_zones_still_loads() {
        let line = r#"{"timestamp":"2024-05-01T10:00:00Z","source":"old","avg_waste":1.0,
            "avg_traffic":2.0,"total_light_failures":0,"avg_complaint_resolution":2.5,
            "air_quality":40.0,"confidence":90,"insights_data":[]}"#;
        let record: AnalysisRecord = serde_json::from_str(line).unwrap();
        assert!(record.zones.is_empty());
        assert!(record.to_result().unwrap().insights.is_empty());
    }

    #[test]
    fn test_api_response_serializes_null_data() {
        let failure: ApiResponse<AnalysisResult> = ApiResponse::failure("no readings");
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "no readings");

        let ok = ApiResponse::ok(AnalysisResult::empty(), "done");
        assert!(ok.success);
        assert!(ok.data.is_some());
    }
}
