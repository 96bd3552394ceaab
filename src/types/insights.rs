// src/types/insights.rs
//! Enrichment results: what the model said about one conversation, flattened for the sheet

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::conversation::Conversation;
use super::records::Lead;

pub const MAX_PAIN_POINTS: usize = 4;
pub const MAX_FEATURES: usize = 4;
pub const ERROR_SUMMARY: &str = "Error during analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
    Unknown,
}

impl EngagementLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" => EngagementLevel::High,
            "medium" => EngagementLevel::Medium,
            "low" => EngagementLevel::Low,
            _ => EngagementLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementLevel::High => "high",
            EngagementLevel::Medium => "medium",
            EngagementLevel::Low => "low",
            EngagementLevel::Unknown => "unknown",
        }
    }

    pub fn all() -> [EngagementLevel; 4] {
        [
            EngagementLevel::High,
            EngagementLevel::Medium,
            EngagementLevel::Low,
            EngagementLevel::Unknown,
        ]
    }
}

/// Models emit `null` for values they have nothing to say about; treat it like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_engagement))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PainPoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub point: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSuggestion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses_pain_point: String,
}

fn unknown_engagement() -> String {
    "unknown".to_string()
}

/// Shape the extraction prompt asks the model to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub pain_points: Vec<PainPoint>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_suggestions: Vec<FeatureSuggestion>,
    #[serde(default = "unknown_engagement", deserialize_with = "null_as_unknown")]
    pub engagement_level: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_qualified_lead: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
}

/// Result of validating one model response.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// `raw` is the model's JSON object, re-serialized, kept for audit and repair.
    Parsed { payload: AnalysisPayload, raw: String },
    Failed { error: String },
}

impl AnalysisOutcome {
    /// Validate a model reply. Code fences are tolerated; anything that is not the
    /// expected JSON object becomes `Failed`.
    pub fn from_model_text(text: &str) -> Self {
        let body = strip_code_fence(text);
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(e) => {
                return AnalysisOutcome::Failed {
                    error: format!("Model response is not valid JSON: {}", e),
                }
            }
        };

        if !value.is_object() {
            return AnalysisOutcome::Failed {
                error: "Model response is not a JSON object".to_string(),
            };
        }

        match serde_json::from_value::<AnalysisPayload>(value.clone()) {
            Ok(payload) => AnalysisOutcome::Parsed {
                payload,
                raw: value.to_string(),
            },
            Err(e) => AnalysisOutcome::Failed {
                error: format!("Model response has unexpected shape: {}", e),
            },
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        AnalysisOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }
}

/// Models without a JSON mode like to wrap their answer in ```json fences.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// The marker written to `raw_analysis` when a call could not be analyzed.
pub fn sentinel_raw(error: &str) -> String {
    serde_json::json!({
        "pain_points": [],
        "feature_suggestions": [],
        "engagement_level": "unknown",
        "is_qualified_lead": false,
        "summary": ERROR_SUMMARY,
        "error": error,
    })
    .to_string()
}

/// Classification of a stored row, decided from its `raw_analysis` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Successful,
    Failed,
}

pub fn classify_raw_analysis(raw: &str) -> RowStatus {
    let raw = raw.trim();
    if raw.is_empty() || raw == "{}" {
        return RowStatus::Failed;
    }

    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return RowStatus::Failed;
    };

    if value.get("error").is_some() {
        return RowStatus::Failed;
    }

    let has_pain_points = value
        .get("pain_points")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false);
    let has_summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);

    if has_pain_points || has_summary {
        RowStatus::Successful
    } else {
        RowStatus::Failed
    }
}

/// A meeting detector's answer for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingVerdict {
    pub booked: bool,
    pub evidence: Option<String>,
    /// The detector could not answer; `evidence` holds the error.
    pub errored: bool,
}

impl MeetingVerdict {
    pub fn not_booked() -> Self {
        Self {
            booked: false,
            evidence: None,
            errored: false,
        }
    }

    pub fn booked(evidence: impl Into<String>) -> Self {
        Self {
            booked: true,
            evidence: Some(evidence.into()),
            errored: false,
        }
    }

    pub fn errored(error: impl Into<String>) -> Self {
        Self {
            booked: false,
            evidence: Some(format!("error: {}", error.into())),
            errored: true,
        }
    }
}

/// One row of the `Customer Insights` sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub lead: Lead,
    pub total_messages: usize,
    pub reply_count: usize,
    pub first_message_date: String,
    pub last_message_date: String,
    pub summary: String,
    pub engagement_level: EngagementLevel,
    pub is_qualified_lead: bool,
    pub pain_points: Vec<PainPoint>,
    pub features: Vec<FeatureSuggestion>,
    pub raw_analysis: String,
    pub full_conversation: String,
    pub meeting_booked: Option<bool>,
    pub meeting_evidence: String,
}

impl EnrichmentResult {
    pub fn from_conversation(conversation: &Conversation, outcome: AnalysisOutcome) -> Self {
        let mut result = Self {
            lead: conversation.lead.clone(),
            total_messages: conversation.total_messages(),
            reply_count: conversation.reply_count(),
            first_message_date: conversation.first_message_date(),
            last_message_date: conversation.last_message_date(),
            summary: String::new(),
            engagement_level: EngagementLevel::Unknown,
            is_qualified_lead: false,
            pain_points: Vec::new(),
            features: Vec::new(),
            raw_analysis: String::new(),
            full_conversation: conversation.transcript(),
            meeting_booked: None,
            meeting_evidence: String::new(),
        };

        match outcome {
            AnalysisOutcome::Parsed { payload, raw } => {
                result.summary = payload.summary;
                result.engagement_level = EngagementLevel::from_label(&payload.engagement_level);
                result.is_qualified_lead = payload.is_qualified_lead;
                result.pain_points = payload
                    .pain_points
                    .into_iter()
                    .take(MAX_PAIN_POINTS)
                    .collect();
                result.features = payload
                    .feature_suggestions
                    .into_iter()
                    .take(MAX_FEATURES)
                    .collect();
                result.raw_analysis = raw;
            }
            AnalysisOutcome::Failed { error } => {
                result.summary = ERROR_SUMMARY.to_string();
                result.raw_analysis = sentinel_raw(&error);
            }
        }

        result
    }

    pub fn lead_id(&self) -> &str {
        &self.lead.linkedin_url
    }

    pub fn status(&self) -> RowStatus {
        classify_raw_analysis(&self.raw_analysis)
    }

    /// Store a detector verdict. A booked meeting qualifies the lead; nothing un-qualifies it.
    /// A detector error never overwrites an earlier booked verdict.
    pub fn record_meeting(&mut self, verdict: MeetingVerdict) {
        if verdict.errored && self.meeting_booked == Some(true) {
            return;
        }
        self.meeting_booked = Some(verdict.booked);
        self.meeting_evidence = verdict.evidence.unwrap_or_default();
        if verdict.booked {
            self.is_qualified_lead = true;
        }
    }

    /// Carry sticky flags over from the row this one replaces.
    pub fn inherit_flags(&mut self, previous: &EnrichmentResult) {
        if previous.is_qualified_lead {
            self.is_qualified_lead = true;
        }
        if previous.meeting_booked == Some(true) && self.meeting_booked.is_none() {
            self.meeting_booked = Some(true);
            self.meeting_evidence = previous.meeting_evidence.clone();
        }
    }

    pub fn has_pain_points(&self) -> bool {
        self.pain_points.iter().any(|p| !p.point.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::records::{Direction, Message};

    fn conversation() -> Conversation {
        Conversation {
            lead: Lead {
                linkedin_url: "https://linkedin.com/in/jane".to_string(),
                full_name: "Jane Doe".to_string(),
                ..Lead::default()
            },
            messages: vec![
                Message::new("x", "2024-01-05T10:00", Direction::Sent, "Hi"),
                Message::new("x", "2024-01-06T10:00", Direction::Received, "Hello"),
            ],
        }
    }

    #[test]
    fn test_parse_valid_payload() {
        let text = r#"{"pain_points":[{"point":"Manual CRM updates","severity":"high"}],
            "feature_suggestions":[{"feature":"CRM sync","addresses_pain_point":"Manual CRM updates"}],
            "engagement_level":"High","is_qualified_lead":true,"summary":"Keen on sync."}"#;
        let outcome = AnalysisOutcome::from_model_text(text);
        let result = EnrichmentResult::from_conversation(&conversation(), outcome);

        assert_eq!(result.engagement_level, EngagementLevel::High);
        assert!(result.is_qualified_lead);
        assert_eq!(result.pain_points[0].point, "Manual CRM updates");
        assert_eq!(result.features[0].feature, "CRM sync");
        assert_eq!(result.status(), RowStatus::Successful);
    }

    #[test]
    fn test_fenced_payload_is_accepted() {
        let text = "```json\n{\"summary\": \"ok\"}\n```";
        match AnalysisOutcome::from_model_text(text) {
            AnalysisOutcome::Parsed { payload, .. } => {
                assert_eq!(payload.summary, "ok");
                assert_eq!(payload.engagement_level, "unknown");
            }
            other => panic!("expected parsed outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch_is_failure() {
        assert!(AnalysisOutcome::from_model_text("not json").is_failed());
        assert!(AnalysisOutcome::from_model_text("[1, 2]").is_failed());
        assert!(
            AnalysisOutcome::from_model_text(r#"{"is_qualified_lead": "yes"}"#).is_failed()
        );
    }

    #[test]
    fn test_null_values_take_defaults() {
        let text = r#"{"pain_points":[{"point":"Manual CRM","severity":null}],
            "feature_suggestions":[{"feature":"CRM sync","addresses_pain_point":null}],
            "summary":"Wants sync","engagement_level":"high","is_qualified_lead":true}"#;
        let result = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::from_model_text(text),
        );

        assert_eq!(result.summary, "Wants sync");
        assert!(result.is_qualified_lead);
        assert_eq!(result.pain_points[0].point, "Manual CRM");
        assert_eq!(result.pain_points[0].severity, "");
        assert_eq!(result.features[0].addresses_pain_point, "");
        assert_eq!(result.status(), RowStatus::Successful);
    }

    #[test]
    fn test_null_top_level_fields() {
        let text = r#"{"pain_points":null,"feature_suggestions":null,"summary":null,
            "engagement_level":null,"is_qualified_lead":null}"#;
        match AnalysisOutcome::from_model_text(text) {
            AnalysisOutcome::Parsed { payload, .. } => {
                assert!(payload.pain_points.is_empty());
                assert!(payload.summary.is_empty());
                assert_eq!(payload.engagement_level, "unknown");
                assert!(!payload.is_qualified_lead);
            }
            other => panic!("expected parsed outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_lists_truncated_to_four() {
        let points: Vec<String> = (0..6)
            .map(|i| format!(r#"{{"point":"p{}","severity":"low"}}"#, i))
            .collect();
        let text = format!(
            r#"{{"pain_points":[{}],"summary":"s"}}"#,
            points.join(",")
        );
        let result = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::from_model_text(&text),
        );
        assert_eq!(result.pain_points.len(), MAX_PAIN_POINTS);
        assert_eq!(result.pain_points[3].point, "p3");
    }

    #[test]
    fn test_failed_outcome_yields_sentinel() {
        let result = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::failed("connection reset"),
        );
        assert_eq!(result.engagement_level, EngagementLevel::Unknown);
        assert!(!result.is_qualified_lead);
        assert_eq!(result.summary, ERROR_SUMMARY);
        assert!(result.pain_points.is_empty());

        let raw: Value = serde_json::from_str(&result.raw_analysis).unwrap();
        assert_eq!(raw["error"], "connection reset");
        assert_eq!(result.status(), RowStatus::Failed);
    }

    #[test]
    fn test_classify_raw_analysis() {
        assert_eq!(classify_raw_analysis(""), RowStatus::Failed);
        assert_eq!(classify_raw_analysis("{}"), RowStatus::Failed);
        assert_eq!(classify_raw_analysis("{broken"), RowStatus::Failed);
        assert_eq!(
            classify_raw_analysis(r#"{"pain_points":[],"summary":""}"#),
            RowStatus::Failed
        );
        assert_eq!(
            classify_raw_analysis(r#"{"summary":"fine","error":"late"}"#),
            RowStatus::Failed
        );
        assert_eq!(
            classify_raw_analysis(r#"{"pain_points":[],"summary":"Polite decline"}"#),
            RowStatus::Successful
        );
    }

    #[test]
    fn test_meeting_verdict_qualifies_and_never_unqualifies() {
        let mut result = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::from_model_text(r#"{"summary":"s","is_qualified_lead":false}"#),
        );
        result.record_meeting(MeetingVerdict::booked("i'm available"));
        assert!(result.is_qualified_lead);

        result.record_meeting(MeetingVerdict::not_booked());
        assert_eq!(result.meeting_booked, Some(false));
        assert!(result.is_qualified_lead);
    }

    #[test]
    fn test_detector_error_keeps_booked_verdict() {
        let mut result = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::from_model_text(r#"{"summary":"s"}"#),
        );
        result.record_meeting(MeetingVerdict::errored("timeout"));
        assert_eq!(result.meeting_booked, Some(false));
        assert_eq!(result.meeting_evidence, "error: timeout");

        result.record_meeting(MeetingVerdict::booked("calendly"));
        result.record_meeting(MeetingVerdict::errored("rate limited"));
        assert_eq!(result.meeting_booked, Some(true));
        assert_eq!(result.meeting_evidence, "calendly");
        assert!(result.is_qualified_lead);
    }

    #[test]
    fn test_inherit_flags() {
        let mut previous = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::failed("timeout"),
        );
        previous.record_meeting(MeetingVerdict::booked("calendly"));

        let mut fresh = EnrichmentResult::from_conversation(
            &conversation(),
            AnalysisOutcome::from_model_text(r#"{"summary":"s"}"#),
        );
        fresh.inherit_flags(&previous);
        assert!(fresh.is_qualified_lead);
        assert_eq!(fresh.meeting_booked, Some(true));
        assert_eq!(fresh.meeting_evidence, "calendly");
    }
}
