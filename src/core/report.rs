// src/core/report.rs
//! Summary views derived from the insights table on every export

use std::collections::HashMap;

use super::result_store::ResultTable;
use crate::types::{EngagementLevel, RowStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Count(usize),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    fn count(name: &str, value: usize) -> Self {
        Self {
            name: name.to_string(),
            value: MetricValue::Count(value),
        }
    }

    fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: MetricValue::Text(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PainPointEntry {
    pub pain_point: String,
    pub severity: String,
    pub company: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEntry {
    pub feature: String,
    pub addresses: String,
    pub suggested_by: String,
    pub company: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frequency {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct InsightReport {
    pub metrics: Vec<Metric>,
    pub pain_points: Vec<PainPointEntry>,
    pub pain_point_frequency: Vec<Frequency>,
    pub features: Vec<FeatureEntry>,
    pub feature_frequency: Vec<Frequency>,
}

impl InsightReport {
    pub fn build(table: &ResultTable, run_id: &str, generated_at: &str) -> Self {
        let rows = table.rows();

        let mut pain_points = Vec::new();
        let mut features = Vec::new();
        for row in rows {
            for pp in row.pain_points.iter().filter(|p| !p.point.trim().is_empty()) {
                pain_points.push(PainPointEntry {
                    pain_point: pp.point.clone(),
                    severity: pp.severity.clone(),
                    company: row.lead.company_name.clone(),
                    contact: row.lead.full_name.clone(),
                });
            }
            for feat in row.features.iter().filter(|f| !f.feature.trim().is_empty()) {
                features.push(FeatureEntry {
                    feature: feat.feature.clone(),
                    addresses: feat.addresses_pain_point.clone(),
                    suggested_by: row.lead.full_name.clone(),
                    company: row.lead.company_name.clone(),
                });
            }
        }

        let engagement = |level: EngagementLevel| {
            rows.iter()
                .filter(|r| r.engagement_level == level)
                .count()
        };

        let mut metrics = vec![Metric::count("Total Conversations Analyzed", rows.len())];
        for level in EngagementLevel::all() {
            let label = format!("{} Engagement Leads", capitalize(level.as_str()));
            metrics.push(Metric::count(&label, engagement(level)));
        }
        metrics.extend([
            Metric::count(
                "Qualified Leads",
                rows.iter().filter(|r| r.is_qualified_lead).count(),
            ),
            Metric::count(
                "Not Qualified Leads",
                rows.iter().filter(|r| !r.is_qualified_lead).count(),
            ),
            Metric::count(
                "Meetings Booked",
                rows.iter().filter(|r| r.meeting_booked == Some(true)).count(),
            ),
            Metric::count("Total Pain Points Identified", pain_points.len()),
            Metric::count(
                "Conversations with Pain Points",
                rows.iter().filter(|r| r.has_pain_points()).count(),
            ),
            Metric::count("Total Feature Suggestions", features.len()),
            Metric::count(
                "Failed Analyses",
                rows.iter()
                    .filter(|r| r.status() == RowStatus::Failed)
                    .count(),
            ),
            Metric::text("Run ID", run_id),
            Metric::text("Generated At", generated_at),
        ]);

        let pain_point_frequency = frequency(pain_points.iter().map(|p| p.pain_point.as_str()));
        let feature_frequency = frequency(features.iter().map(|f| f.feature.as_str()));

        Self {
            metrics,
            pain_points,
            pain_point_frequency,
            features,
            feature_frequency,
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.iter().find(|m| m.name == name).map(|m| &m.value)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Occurrences per distinct trimmed text, most frequent first, ties alphabetical.
fn frequency<'a>(items: impl Iterator<Item = &'a str>) -> Vec<Frequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.trim()).or_insert(0) += 1;
    }

    let mut out: Vec<Frequency> = counts
        .into_iter()
        .map(|(text, count)| Frequency {
            text: text.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.text.cmp(&b.text)));
    out
}
