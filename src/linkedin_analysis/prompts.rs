// src/linkedin_analysis/prompts.rs
use crate::types::{Conversation, RenderStyle};

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// Extraction prompt: pain points, feature suggestions, engagement, qualification, summary.
pub fn insight_prompt(conversation: &Conversation) -> String {
    let lead = &conversation.lead;
    format!(
        r#"You are analyzing a LinkedIn conversation with a potential customer to extract product insights.

**Contact Information:**
- Name: {name}
- Company: {company}
- Title: {title}

**Conversation:**
{conversation}

**Your Task:**
Analyze this conversation and extract:

1. **Pain Points** (up to 4): What problems, challenges, or frustrations did the lead mention or imply?
2. **Feature Suggestions** (up to 4): Based on the pain points, what specific product features would solve their problems?

**Output Format (JSON only):**
{{
    "pain_points": [
        {{"point": "Description of pain point", "severity": "high|medium|low"}}
    ],
    "feature_suggestions": [
        {{"feature": "Feature name/description", "addresses_pain_point": "Which pain point it solves"}}
    ],
    "engagement_level": "high|medium|low",
    "is_qualified_lead": true|false,
    "summary": "One sentence summary of the conversation"
}}

**Important:**
- If no clear pain points are mentioned, return empty arrays
- Be specific and actionable with feature suggestions
- Only extract what's actually in the conversation, don't assume
- Output ONLY valid JSON, no extra text"#,
        name = or_unknown(&lead.full_name),
        company = or_unknown(&lead.company_name),
        title = or_unknown(&lead.job_title),
        conversation = conversation.render(RenderStyle::MultiLine),
    )
}

/// Meeting prompt: did the lead, not the sender, commit to a meeting?
pub fn meeting_prompt(transcript: &str) -> String {
    format!(
        r#"Analyze this LinkedIn conversation and determine if the LEAD agreed to book a meeting, scheduled a call, or said they want to meet.

**Conversation:**
{transcript}

**Your task:**
Determine if the LEAD (not YOU) explicitly:
- Agreed to schedule a meeting/call
- Said they would book time
- Confirmed availability for a meeting
- Said "yes" to a meeting request
- Provided times they're available
- Asked to schedule a call

Return ONLY a JSON object:
{{
    "meeting_booked": true or false,
    "evidence": "exact quote from lead showing they agreed to meet, or 'none' if no meeting"
}}

**Important:**
- Return TRUE only if the LEAD explicitly agreed or confirmed
- Return FALSE if they just showed interest but didn't commit to a meeting
- Return FALSE if only YOU asked for a meeting but they didn't respond yet
- Return FALSE if they said "maybe" or "let me think about it""#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Lead, Message};

    #[test]
    fn test_insight_prompt_contains_metadata_and_turns() {
        let conversation = Conversation {
            lead: Lead {
                linkedin_url: "u".to_string(),
                full_name: "Ann Lee".to_string(),
                company_name: "Acme".to_string(),
                ..Lead::default()
            },
            messages: vec![
                Message::new("u", "2024-01-05T10:00", Direction::Sent, "Hi Ann"),
                Message::new("u", "2024-01-06T10:00", Direction::Received, "Hello"),
            ],
        };
        let prompt = insight_prompt(&conversation);
        assert!(prompt.contains("- Name: Ann Lee"));
        assert!(prompt.contains("- Company: Acme"));
        assert!(prompt.contains("- Title: Unknown"));
        assert!(prompt.contains("[2024-01-05] You: Hi Ann\n\n[2024-01-06] Lead: Hello"));
        assert!(prompt.contains("\"pain_points\""));
    }

    #[test]
    fn test_meeting_prompt_embeds_transcript() {
        let prompt = meeting_prompt("[2024] LEAD: sure");
        assert!(prompt.contains("[2024] LEAD: sure"));
        assert!(prompt.contains("\"meeting_booked\""));
    }
}
