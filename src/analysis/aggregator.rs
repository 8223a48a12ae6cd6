//! Risk triage and statistics over zone insights.
//!
//! This module reduces per-zone issue lists to risk levels and computes
//! the breakdowns used by reports and exit-code checks.

use crate::models::{
    AnalysisRecord, AnalysisResult, RiskBreakdown, RiskLevel, ZoneInsight, ZoneRisk,
    ZoneStatistics,
};

/// Overall risk of a zone: its most severe issue, or good when it has none.
pub fn risk_level_of(insight: &ZoneInsight) -> RiskLevel {
    insight
        .issues
        .iter()
        .map(|i| RiskLevel::from(i.severity))
        .max()
        .unwrap_or(RiskLevel::Good)
}

/// Risk assignments for every zone, in insight order.
pub fn zone_risks(result: &AnalysisResult) -> Vec<ZoneRisk> {
    result
        .insights
        .iter()
        .map(|insight| ZoneRisk {
            zone: insight.zone.clone(),
            risk_level: risk_level_of(insight),
            issues: insight.issues.clone(),
        })
        .collect()
}

impl RiskBreakdown {
    /// Creates a breakdown from a list of insights.
    pub fn from_insights(insights: &[ZoneInsight]) -> Self {
        let mut breakdown = Self {
            total: insights.len(),
            ..Self::default()
        };

        for insight in insights {
            match risk_level_of(insight) {
                RiskLevel::Critical => breakdown.critical += 1,
                RiskLevel::Warning => breakdown.warning += 1,
                RiskLevel::Good => breakdown.good += 1,
            }

            for issue in &insight.issues {
                breakdown.issues += 1;
                *breakdown.by_category.entry(issue.kind.clone()).or_insert(0) += 1;
            }
        }

        breakdown
    }
}

/// Highest risk across all zones.
pub fn highest_risk(insights: &[ZoneInsight]) -> RiskLevel {
    insights
        .iter()
        .map(risk_level_of)
        .max()
        .unwrap_or(RiskLevel::Good)
}

/// Zones whose risk is at or above `level`, in input order.
pub fn zones_at_or_above(insights: &[ZoneInsight], level: RiskLevel) -> Vec<&ZoneInsight> {
    insights
        .iter()
        .filter(|i| risk_level_of(i) >= level)
        .collect()
}

/// Identify the most at-risk zones (by risk, then issue count).
///
/// Good zones are never included. Ties keep input order.
pub fn most_at_risk_zones(insights: &[ZoneInsight], n: usize) -> Vec<(&ZoneInsight, RiskLevel)> {
    let mut ranked: Vec<_> = insights
        .iter()
        .map(|i| (i, risk_level_of(i)))
        .filter(|(_, level)| *level > RiskLevel::Good)
        .collect();

    ranked.sort_by(|(a, la), (b, lb)| lb.cmp(la).then_with(|| b.issues.len().cmp(&a.issues.len())));
    ranked.truncate(n);

    ranked
}

/// Latest risk and run count for one zone across history records.
///
/// Returns `None` when no record covers the zone. Record order does not
/// matter; the newest timestamp wins.
pub fn zone_statistics(records: &[AnalysisRecord], zone: &str) -> Option<ZoneStatistics> {
    let covering = records
        .iter()
        .filter_map(|record| {
            record
                .zones
                .iter()
                .find(|risk| risk.zone == zone)
                .map(|risk| (record, risk))
        });

    let mut analysis_count = 0;
    let mut latest: Option<(&AnalysisRecord, &ZoneRisk)> = None;
    for (record, risk) in covering {
        analysis_count += 1;
        if latest.map_or(true, |(newest, _)| record.timestamp > newest.timestamp) {
            latest = Some((record, risk));
        }
    }

    latest.map(|(record, risk)| ZoneStatistics {
        zone: risk.zone.clone(),
        risk_level: risk.risk_level,
        issues: risk.issues.clone(),
        last_analysis: record.timestamp,
        analysis_count,
    })
}
