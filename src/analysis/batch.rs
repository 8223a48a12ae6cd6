//! Concurrent analysis of independent reading batches.

use crate::analysis::ZoneRiskAnalyzer;
use crate::models::AnalysisResult;
use crate::readings::ReadingsProvider;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Result of analyzing one batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Where the readings came from.
    pub source: String,
    /// Number of readings in the batch.
    pub zone_count: usize,
    pub result: AnalysisResult,
    pub duration_seconds: f64,
}

/// Load and analyze every batch, at most `concurrency` at a time.
///
/// Outcomes are returned in provider order. The first failing batch aborts
/// the run.
pub async fn analyze_batches(
    providers: Vec<Box<dyn ReadingsProvider>>,
    analyzer: Arc<ZoneRiskAnalyzer>,
    concurrency: usize,
) -> Result<Vec<BatchOutcome>> {
    stream::iter(providers)
        .map(|provider| {
            let analyzer = Arc::clone(&analyzer);
            async move {
                let source = provider.source();
                tokio::task::spawn_blocking(move || run_batch(provider.as_ref(), &analyzer))
                    .await
                    .with_context(|| format!("Analysis task for {} failed", source))?
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

fn run_batch(provider: &dyn ReadingsProvider, analyzer: &ZoneRiskAnalyzer) -> Result<BatchOutcome> {
    let start = Instant::now();
    let source = provider.source();

    let readings = provider
        .load()
        .with_context(|| format!("Failed to load readings from {}", source))?;
    let result = analyzer.analyze(&readings);

    info!("Analyzed {} zones from {}", readings.len(), source);

    Ok(BatchOutcome {
        source,
        zone_count: readings.len(),
        result,
        duration_seconds: start.elapsed().as_secs_f64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzerConfig, FixedConfidence};
    use crate::readings::{JsonFileProvider, SampleProvider};
    use tempfile::TempDir;

    fn analyzer() -> Arc<ZoneRiskAnalyzer> {
        Arc::new(ZoneRiskAnalyzer::new(
            AnalyzerConfig::extended(),
            Box::new(FixedConfidence(90)),
        ))
    }

    #[test]
    fn test_batches_keep_provider_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.json");
        let empty = temp_dir.path().join("empty.json");
        std::fs::write(&first, r#"[{"id": 1, "name": "Solo", "waste": 99}]"#).unwrap();
        std::fs::write(&empty, "[]").unwrap();

        let providers: Vec<Box<dyn ReadingsProvider>> = vec![
            Box::new(JsonFileProvider::new(&first)),
            Box::new(SampleProvider),
            Box::new(JsonFileProvider::new(&empty)),
        ];

        let outcomes =
            tokio_test::block_on(analyze_batches(providers, analyzer(), 2)).unwrap();

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].zone_count, 1);
        assert_eq!(outcomes[0].result.insights[0].zone, "Solo");
        assert_eq!(outcomes[1].zone_count, 10);
        assert_eq!(outcomes[1].source, "built-in sample");
        assert_eq!(outcomes[2].zone_count, 0);
        assert_eq!(outcomes[2].result.confidence, 0);
    }

    #[test]
    fn test_failing_batch_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let providers: Vec<Box<dyn ReadingsProvider>> = vec![
            Box::new(SampleProvider),
            Box::new(JsonFileProvider::new(temp_dir.path().join("absent.json"))),
        ];

        let err = tokio_test::block_on(analyze_batches(providers, analyzer(), 0)).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
