//! CityInsights - rule-based zone risk analyzer
//!
//! A CLI tool that classifies municipal zone readings into
//! severity-tagged issues and city-wide aggregates, then writes
//! Markdown/JSON reports and optional history snapshots.
//!
//! Exit codes:
//!   0 - Success (no zone at or above threshold, or no --fail-on set)
//!   1 - Runtime error (unreadable input, bad config, write failure, etc.)
//!   2 - A zone is at or above the --fail-on risk level

mod analysis;
mod cli;
mod config;
mod models;
mod readings;
mod report;

use analysis::{batch, highest_risk, zone_statistics, zones_at_or_above, ZoneRiskAnalyzer};
use anyhow::{Context, Result};
use cli::{Args, RiskThreshold};
use config::{Config, CONFIG_FILE};
use models::{Report, RiskLevel};
use readings::{JsonFileProvider, ReadingsProvider, SampleProvider};
use report::{FileSink, HistorySink, RenderOptions, ResultSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("CityInsights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cityinsights.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the profile, thresholds, and confidence.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let history_path = config.general.history.as_ref().map(PathBuf::from);

    // Handle --show-history: print snapshots and exit
    if let Some(count) = args.show_history {
        let path = history_path.context("--show-history needs --history or general.history")?;
        return handle_show_history(&path, count);
    }

    // Handle --zone-stats: print one zone's history and exit
    if let Some(ref zone) = args.zone_stats {
        let path = history_path.context("--zone-stats needs --history or general.history")?;
        return handle_zone_stats(&path, zone);
    }

    // Step 1: Collect the batches
    let mut providers: Vec<Box<dyn ReadingsProvider>> = args
        .input
        .iter()
        .map(|path| Box::new(JsonFileProvider::new(path)) as Box<dyn ReadingsProvider>)
        .collect();
    if args.sample {
        providers.push(Box::new(SampleProvider));
    }

    // Step 2: Build the analyzer
    let analyzer_config = config.analyzer_config()?;
    let profile = analyzer_config.profile;
    let analyzer = Arc::new(ZoneRiskAnalyzer::new(
        analyzer_config,
        config.confidence_estimator(),
    ));

    if !args.quiet {
        println!("🔬 Analyzing {} batch(es)...", providers.len());
        println!("   Profile: {}", profile);
        println!("   Categories: {}", describe_rules(analyzer.config()));
    }

    // Step 3: Run the analysis
    let outcomes =
        batch::analyze_batches(providers, Arc::clone(&analyzer), config.general.concurrency)
            .await?;

    let reports: Vec<Report> = outcomes
        .into_iter()
        .map(|o| {
            info!(
                "Analyzed {} zone(s) from {} in {:.3}s",
                o.zone_count, o.source, o.duration_seconds
            );
            report::build_report(o.source, profile.to_string(), o.duration_seconds, o.result)
        })
        .collect();

    // Step 4: Publish
    let options = RenderOptions {
        include_zone_table: config.report.include_zone_table,
        top_zones: config.report.top_zones,
        min_risk: args.min_risk.map(threshold_to_risk).unwrap_or(RiskLevel::Good),
    };

    let output = PathBuf::from(&config.general.output);
    let mut sinks: Vec<Box<dyn ResultSink>> =
        vec![Box::new(FileSink::new(&output, args.format, options))];
    if let Some(ref path) = history_path {
        sinks.push(Box::new(HistorySink::new(path)));
    }

    for sink in &mut sinks {
        sink.publish(&reports)?;
    }

    // Print summary
    if !args.quiet {
        print_summary(&reports);
        println!("\n✅ Analysis complete! Report saved to: {}", output.display());
        if let Some(ref path) = history_path {
            println!("   History appended to: {}", path.display());
        }
    }

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        let threshold = threshold_to_risk(fail_level);
        let worst = reports
            .iter()
            .map(|r| highest_risk(&r.result.insights))
            .max()
            .unwrap_or(RiskLevel::Good);

        if worst >= threshold {
            for report in &reports {
                for insight in zones_at_or_above(&report.result.insights, threshold) {
                    eprintln!(
                        "   {} {}: {} issue(s)",
                        report.metadata.source,
                        insight.zone,
                        insight.issues.len()
                    );
                }
            }
            eprintln!(
                "\n⛔ Zones found at or above {:?} risk. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Print per-batch results to the console.
fn print_summary(reports: &[Report]) {
    for report in reports {
        let summary = &report.result.summary;
        let breakdown = &report.breakdown;

        println!("\n📊 {}", report.metadata.source);
        println!("   Zones: {}", breakdown.total);
        println!(
            "   - {} Critical: {} | {} Warning: {} | {} Good: {}",
            RiskLevel::Critical.emoji(),
            breakdown.critical,
            RiskLevel::Warning.emoji(),
            breakdown.warning,
            RiskLevel::Good.emoji(),
            breakdown.good
        );
        println!(
            "   Avg waste: {}% | Avg traffic: {}% | Light failures: {} | AQI: {}",
            summary.avg_waste, summary.avg_traffic, summary.total_light_failures, summary.air_quality
        );
        println!("   Confidence: {}%", report.result.confidence);
    }
}

/// Handle --show-history: print the newest snapshots, exit.
fn handle_show_history(path: &Path, count: usize) -> Result<i32> {
    let records = report::read_history(path, count)?;

    if records.is_empty() {
        println!("No snapshots recorded in {}", path.display());
        return Ok(0);
    }

    println!("🕒 Last {} snapshot(s) from {}:\n", records.len(), path.display());
    for record in &records {
        let result = record
            .to_result()
            .with_context(|| format!("Invalid insights in snapshot from {}", record.source))?;
        let critical = result
            .insights
            .iter()
            .filter(|i| analysis::risk_level_of(i) == RiskLevel::Critical)
            .count();
        println!(
            "   {}  {}  zones: {} ({} critical)  waste: {}%  traffic: {}%  lights: {}  AQI: {}  confidence: {}%",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.source,
            result.insights.len(),
            critical,
            result.summary.avg_waste,
            result.summary.avg_traffic,
            result.summary.total_light_failures,
            result.summary.air_quality,
            result.confidence
        );
    }

    Ok(0)
}

/// Handle --zone-stats: print the zone's latest risk across all snapshots, exit.
fn handle_zone_stats(path: &Path, zone: &str) -> Result<i32> {
    let records = report::read_history(path, usize::MAX)?;

    let Some(stats) = zone_statistics(&records, zone) else {
        eprintln!("Zone not found in {}: {}", path.display(), zone);
        return Ok(1);
    };

    println!("📍 {} ({})", stats.zone, path.display());
    println!("   Risk: {} {}", stats.risk_level.emoji(), stats.risk_level);
    println!("   Last analysis: {}", stats.last_analysis.format("%Y-%m-%d %H:%M:%S"));
    println!("   Analyses: {}", stats.analysis_count);
    for issue in &stats.issues {
        println!("   - [{}] {}: {}", issue.severity, issue.kind, issue.details);
    }

    Ok(0)
}

fn describe_rules(config: &analysis::AnalyzerConfig) -> String {
    config
        .rules()
        .iter()
        .map(|r| format!("{} (>{} / >{})", r.category, r.warning_above, r.critical_above))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert RiskThreshold to RiskLevel for comparison.
fn threshold_to_risk(level: RiskThreshold) -> RiskLevel {
    match level {
        RiskThreshold::Warning => RiskLevel::Warning,
        RiskThreshold::Critical => RiskLevel::Critical,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that is present but broken is an error
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
