//! Report generation.
//!
//! This module renders analyzed batches as Markdown, as the bare JSON
//! analysis result, or wrapped in the HTTP response envelope.

use crate::analysis::{most_at_risk_zones, risk_level_of, zone_risks};
use crate::models::{
    AnalysisResult, AnalysisSummary, ApiResponse, Issue, Report, ReportMetadata, RiskBreakdown,
    RiskLevel, Severity, ZoneInsight, ZoneRisk,
};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

/// Options controlling Markdown rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Include the per-zone risk table.
    pub include_zone_table: bool,
    /// Number of zones listed under "Most At-Risk Zones".
    pub top_zones: usize,
    /// Zones below this level are left out of the zone sections.
    pub min_risk: RiskLevel,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_zone_table: true,
            top_zones: 5,
            min_risk: RiskLevel::Good,
        }
    }
}

/// Bundle an analysis result with its metadata and derived risk data.
pub fn build_report(
    source: impl Into<String>,
    profile: impl Into<String>,
    duration_seconds: f64,
    result: AnalysisResult,
) -> Report {
    let metadata = ReportMetadata {
        source: source.into(),
        analysis_date: Utc::now(),
        profile: profile.into(),
        zones_analyzed: result.insights.len(),
        duration_seconds,
    };

    Report {
        metadata,
        zone_risks: zone_risks(&result),
        breakdown: RiskBreakdown::from_insights(&result.insights),
        result,
    }
}

/// Generate a complete Markdown report covering every batch.
pub fn generate_markdown_report(reports: &[Report], options: &RenderOptions) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# City Insights Report\n\n");

    if reports.is_empty() {
        output.push_str("No batches were analyzed.\n\n");
    }

    for report in reports {
        output.push_str(&generate_batch_section(report, options));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

fn generate_batch_section(report: &Report, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", report.metadata.source));
    section.push_str(&generate_metadata_section(&report.metadata, report.result.confidence));
    section.push_str(&generate_summary_section(&report.result.summary));
    section.push_str(&generate_risk_section(&report.breakdown));

    let insights = &report.result.insights;

    let at_risk = most_at_risk_zones(insights, options.top_zones);
    if !at_risk.is_empty() {
        section.push_str("### Most At-Risk Zones\n\n");
        section.push_str("| Zone | Risk | Issues |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for (insight, level) in at_risk {
            section.push_str(&format!(
                "| {} | {} {} | {} |\n",
                insight.zone,
                level.emoji(),
                level,
                insight.issues.len()
            ));
        }
        section.push('\n');
    }

    let shown: Vec<&ZoneInsight> = insights
        .iter()
        .filter(|i| risk_level_of(i) >= options.min_risk)
        .collect();

    if options.include_zone_table && !shown.is_empty() {
        section.push_str("### Zone Risk Levels\n\n");
        section.push_str("| Zone | Risk | Issues |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for insight in &shown {
            let level = risk_level_of(insight);
            section.push_str(&format!(
                "| {} | {} {} | {} |\n",
                insight.zone,
                level.emoji(),
                level,
                insight.issues.len()
            ));
        }
        section.push('\n');
    }

    section.push_str(&generate_zone_issues_section(&shown));

    section
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, confidence: u8) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Profile:** `{}`\n", metadata.profile));
    section.push_str(&format!("- **Zones Analyzed:** {}\n", metadata.zones_analyzed));
    section.push_str(&format!("- **Confidence:** {}%\n", confidence));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.3}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the city-wide summary table.
fn generate_summary_section(summary: &AnalysisSummary) -> String {
    let mut section = String::new();

    section.push_str("### City Summary\n\n");
    section.push_str("| Avg Waste | Avg Traffic | Light Failures | Complaint Resolution | Air Quality |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {}% | {}% | {} | {} days | {} |\n\n",
        summary.avg_waste,
        summary.avg_traffic,
        summary.total_light_failures,
        summary.avg_complaint_resolution,
        summary.air_quality
    ));

    section
}

/// Generate the risk breakdown section.
fn generate_risk_section(breakdown: &RiskBreakdown) -> String {
    let mut section = String::new();

    section.push_str("### Risk Breakdown\n\n");
    section.push_str(&format!(
        "| {} Critical | {} Warning | {} Good | **Zones** | **Issues** |\n",
        RiskLevel::Critical.emoji(),
        RiskLevel::Warning.emoji(),
        RiskLevel::Good.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** | **{}** |\n\n",
        breakdown.critical, breakdown.warning, breakdown.good, breakdown.total, breakdown.issues
    ));

    if !breakdown.by_category.is_empty() {
        section.push_str("| Category | Issues |\n");
        section.push_str("|:---|:---:|\n");

        let mut categories: Vec<_> = breakdown.by_category.iter().collect();
        categories.sort_by(|(a_name, a), (b_name, b)| b.cmp(a).then_with(|| a_name.cmp(b_name)));

        for (category, count) in categories {
            section.push_str(&format!("| {} | {} |\n", category, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-zone issue blocks.
fn generate_zone_issues_section(insights: &[&ZoneInsight]) -> String {
    let mut section = String::new();

    section.push_str("### Zone Insights\n\n");

    let with_issues: Vec<_> = insights.iter().filter(|i| !i.issues.is_empty()).collect();

    if with_issues.is_empty() {
        section.push_str("No issues were detected in the analyzed zones.\n\n");
        return section;
    }

    for insight in with_issues {
        let level = risk_level_of(insight);
        section.push_str(&format!(
            "#### {} {} ({})\n\n",
            level.emoji(),
            insight.zone,
            level
        ));

        // Critical first, evaluation order otherwise
        let mut issues = insight.issues.clone();
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));

        for issue in &issues {
            section.push_str(&generate_issue_line(issue));
        }
        section.push('\n');
    }

    section
}

/// Generate a single issue line.
fn generate_issue_line(issue: &Issue) -> String {
    let badge = match issue.severity {
        Severity::Critical => "🔴 **CRITICAL**",
        Severity::Warning => "🟡 **WARNING**",
    };

    format!("- {} {}: {}\n", badge, issue.kind, issue.details)
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by CityInsights*\n".to_string()
}

/// Generate a JSON report: the analysis result for a single batch, an
/// array of results otherwise.
pub fn generate_json_report(reports: &[Report]) -> Result<String> {
    match reports {
        [single] => serde_json::to_string_pretty(&single.result).map_err(Into::into),
        _ => {
            let results: Vec<&AnalysisResult> = reports.iter().map(|r| &r.result).collect();
            serde_json::to_string_pretty(&results).map_err(Into::into)
        }
    }
}

/// Envelope payload: the analysis result plus the risk assigned to each zone.
#[derive(Serialize)]
struct AnalysisPayload<'a> {
    #[serde(flatten)]
    result: &'a AnalysisResult,
    zones: &'a [ZoneRisk],
}

impl<'a> From<&'a Report> for AnalysisPayload<'a> {
    fn from(report: &'a Report) -> Self {
        Self {
            result: &report.result,
            zones: &report.zone_risks,
        }
    }
}

/// Generate the JSON report wrapped in the HTTP response envelope.
pub fn generate_envelope_report(reports: &[Report]) -> Result<String> {
    let message = "AI analysis completed successfully";

    match reports {
        [] => serde_json::to_string_pretty(&ApiResponse::<AnalysisResult>::failure(
            "No batches were analyzed",
        ))
        .map_err(Into::into),
        [single] => {
            serde_json::to_string_pretty(&ApiResponse::ok(AnalysisPayload::from(single), message))
                .map_err(Into::into)
        }
        _ => {
            let payloads: Vec<AnalysisPayload> = reports.iter().map(AnalysisPayload::from).collect();
            serde_json::to_string_pretty(&ApiResponse::ok(payloads, message)).map_err(Into::into)
        }
    }
}
