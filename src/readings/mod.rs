//! Zone reading providers.
//!
//! Providers load a batch of readings and check it is structurally valid
//! before it reaches the analyzer: ids and names must be present and names
//! unique. Malformed metric values are not an error; they read as zero.

use crate::models::{ZoneId, ZoneReading};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Built-in ten-zone dashboard batch.
const SAMPLE_ZONES: &str = include_str!("../../fixtures/sample_zones.json");

/// Errors raised while loading readings.
#[derive(Debug, Error)]
pub enum ReadingsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid readings in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid readings in {origin}: expected an array or an object with a \"zones\" array")]
    Shape { origin: String },

    #[error("Duplicate zone name in batch: {0}")]
    DuplicateZone(String),

    #[error("Zone {0} has an empty name")]
    EmptyName(ZoneId),
}

/// Source of zone readings for one analysis batch.
pub trait ReadingsProvider: Send {
    /// Human-readable description of where the readings come from.
    fn source(&self) -> String;

    /// Load and validate the batch.
    fn load(&self) -> Result<Vec<ZoneReading>, ReadingsError>;
}

/// Reads a JSON file holding readings.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadingsProvider for JsonFileProvider {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<ZoneReading>, ReadingsError> {
        let content = fs::read_to_string(&self.path).map_err(|source| ReadingsError::Io {
            path: self.path.clone(),
            source,
        })?;

        parse_readings(&content, &self.source())
    }
}

/// The built-in sample batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleProvider;

impl ReadingsProvider for SampleProvider {
    fn source(&self) -> String {
        "built-in sample".to_string()
    }

    fn load(&self) -> Result<Vec<ZoneReading>, ReadingsError> {
        parse_readings(SAMPLE_ZONES, &self.source())
    }
}

/// Parse a readings document.
///
/// Accepts either a bare array of readings or `{ "zones": [...] }`.
pub fn parse_readings(content: &str, origin: &str) -> Result<Vec<ZoneReading>, ReadingsError> {
    let parse_error = |source| ReadingsError::Parse {
        origin: origin.to_string(),
        source,
    };

    let document: Value = serde_json::from_str(content).map_err(parse_error)?;

    let zones = match document {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => match map.remove("zones") {
            Some(zones @ Value::Array(_)) => zones,
            _ => {
                return Err(ReadingsError::Shape {
                    origin: origin.to_string(),
                })
            }
        },
        _ => {
            return Err(ReadingsError::Shape {
                origin: origin.to_string(),
            })
        }
    };

    let readings: Vec<ZoneReading> = serde_json::from_value(zones).map_err(parse_error)?;
    validate_batch(&readings)?;

    debug!("Loaded {} readings from {}", readings.len(), origin);
    Ok(readings)
}

/// Check zone names are non-empty and unique within the batch.
pub fn validate_batch(readings: &[ZoneReading]) -> Result<(), ReadingsError> {
    let mut seen = HashSet::new();

    for reading in readings {
        if reading.name.trim().is_empty() {
            return Err(ReadingsError::EmptyName(reading.id.clone()));
        }
        if !seen.insert(reading.name.as_str()) {
            return Err(ReadingsError::DuplicateZone(reading.name.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sample_provider() {
        let readings = SampleProvider.load().unwrap();
        assert_eq!(readings.len(), 10);
        assert_eq!(readings[0].name, "Zone-A");
        assert_eq!(readings[1].traffic.accidents, 3);
        assert_eq!(readings[9].id, ZoneId::Number(10));
        assert_eq!(readings[9].lat, Some(23.026));
    }

    #[test]
    fn test_parse_bare_array() {
        let readings = parse_readings(
            r#"[{"id": 1, "name": "North", "waste": 70}, {"id": 2, "name": "South"}]"#,
            "inline",
        )
        .unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].waste, 70.0);
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(
            parse_readings(r#"{"areas": []}"#, "inline"),
            Err(ReadingsError::Shape { .. })
        ));
        assert!(matches!(
            parse_readings("42", "inline"),
            Err(ReadingsError::Shape { .. })
        ));
    }

    #[test]
    fn test_parse_coerces_malformed_metrics() {
        let readings = parse_readings(
            r#"[{"id": 1, "name": "A", "waste": null, "airQuality": null},
                {"id": 2, "name": "B", "traffic": null, "streetLights": 2.0},
                {"id": 3, "name": "C", "waste": "n/a"}]"#,
            "inline",
        )
        .unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].waste, 0.0);
        assert_eq!(readings[0].air_quality, 0.0);
        assert_eq!(readings[1].traffic.congestion, 0.0);
        assert_eq!(readings[1].street_lights, 2);
        assert_eq!(readings[2].waste, 0.0);
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        let err = parse_readings(r#"[{"id": 1, "waste": 40}]"#, "inline").unwrap_err();
        assert!(matches!(err, ReadingsError::Parse { .. }));
        assert!(err.to_string().contains("inline"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse_readings(
            r#"[{"id": 1, "name": "A"}, {"id": 2, "name": "A"}]"#,
            "inline",
        )
        .unwrap_err();
        assert!(matches!(err, ReadingsError::DuplicateZone(name) if name == "A"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = parse_readings(r#"[{"id": "x", "name": "  "}]"#, "inline").unwrap_err();
        assert!(matches!(err, ReadingsError::EmptyName(ZoneId::Key(k)) if k == "x"));
    }

    #[test]
    fn test_json_file_provider() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("zones.json");
        std::fs::write(&path, r#"{"zones": [{"id": 1, "name": "Harbor", "streetLights": 4}]}"#)
            .unwrap();

        let provider = JsonFileProvider::new(&path);
        let readings = provider.load().unwrap();
        assert_eq!(readings[0].street_lights, 4);

        let missing = JsonFileProvider::new(temp_dir.path().join("missing.json"));
        assert!(matches!(missing.load(), Err(ReadingsError::Io { .. })));
    }
}
