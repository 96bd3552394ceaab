// src/linkedin_analysis/meeting_detector.rs
//! Two interchangeable answers to "did the lead agree to a meeting?"

use super::llm_client::LlmClient;
use super::prompts::meeting_prompt;
use super::rate_policy::RatePolicy;
use super::types::MeetingReply;
use crate::types::insights::strip_code_fence;
use crate::types::MeetingVerdict;
use crate::utils::{normalize_for_matching, preview};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

/// Ordered; the first match wins. Applied to the lowercased single-line transcript,
/// where lead turns are tagged `lead:`.
const MEETING_PATTERNS: &[&str] = &[
    // explicit booking
    r"\b(book|booked|booking)\s+(a\s+)?(meeting|call|demo|session)\b",
    r"\b(schedule|scheduled|scheduling)\s+(a\s+)?(meeting|call|demo|session)\b",
    r"\b(set up|setup|setting up)\s+(a\s+)?(meeting|call|demo|time)\b",
    // calendar tools
    r"\bcalendly\b",
    r"\bcal\.com\b",
    r"\b(my calendar|share.*(calendar|availability))\b",
    r"\b(send|sent).*(calendar|invite|meeting link)\b",
    // lead-side acceptance
    r"lead:.*\b(yes.*meeting|happy to meet|would love to|sounds good.*call|let's do it)\b",
    r"lead:.*\b(i'm available|i'm free|works for me|that works)\b",
    r"lead:.*\b(send.*(invite|link|calendar)|book.*(time|slot))\b",
    // time commitment
    r"\b(next (week|month|tuesday|wednesday|thursday|friday|monday).*call)\b",
    r"\b(15 min|30 min|half hour).*(call|chat|meeting)\b",
    // meeting platforms
    r"\b(zoom|teams|meet|google meet)\s+(link|call|meeting)\b",
    // strong interest
    r"lead:.*\b(interested.*demo|happy to chat|keen to learn more)\b",
];

#[async_trait]
pub trait MeetingDetector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self, transcript: &str) -> MeetingVerdict;
}

/// Local pattern pass; no network.
pub struct KeywordMeetingDetector {
    patterns: Vec<Regex>,
}

impl KeywordMeetingDetector {
    pub fn new() -> Result<Self> {
        let patterns = MEETING_PATTERNS
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){}", p))
                    .with_context(|| format!("Invalid meeting pattern: {}", p))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Matched text of the first rule that fires.
    pub fn scan(&self, transcript: &str) -> Option<String> {
        if transcript.trim().is_empty() {
            return None;
        }
        let text = normalize_for_matching(transcript);
        self.patterns
            .iter()
            .find_map(|re| re.find(&text).map(|m| preview(m.as_str(), 120)))
    }
}

#[async_trait]
impl MeetingDetector for KeywordMeetingDetector {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn detect(&self, transcript: &str) -> MeetingVerdict {
        match self.scan(transcript) {
            Some(evidence) => MeetingVerdict::booked(evidence),
            None => MeetingVerdict::not_booked(),
        }
    }
}

/// One strict single-purpose model call per conversation.
pub struct LlmMeetingDetector {
    llm: Arc<dyn LlmClient>,
    rate_policy: RatePolicy,
}

impl LlmMeetingDetector {
    pub fn new(llm: Arc<dyn LlmClient>, rate_policy: RatePolicy) -> Self {
        Self { llm, rate_policy }
    }

    async fn ask(&self, transcript: &str) -> Result<MeetingVerdict> {
        let text = self.llm.complete(&meeting_prompt(transcript)).await?;
        let reply: MeetingReply = serde_json::from_str(strip_code_fence(&text))
            .context("Meeting reply is not the expected JSON object")?;

        let evidence = reply
            .evidence
            .filter(|e| !e.trim().is_empty() && !e.trim().eq_ignore_ascii_case("none"));

        Ok(MeetingVerdict {
            booked: reply.meeting_booked,
            evidence,
            errored: false,
        })
    }
}

#[async_trait]
impl MeetingDetector for LlmMeetingDetector {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn detect(&self, transcript: &str) -> MeetingVerdict {
        if transcript.trim().is_empty() {
            return MeetingVerdict::not_booked();
        }

        let verdict = match self.ask(transcript).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("Meeting detection failed: {}", preview(&format!("{:#}", e), 100));
                MeetingVerdict::errored(format!("{:#}", e))
            }
        };
        self.rate_policy.pause().await;
        verdict
    }
}
