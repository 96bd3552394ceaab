// src/pipeline.rs
//! The enrichment passes the commands are built from

use std::collections::HashSet;
use tracing::{info, warn};

use crate::core::aggregator::group_messages;
use crate::core::result_store::{merge, plan_repair, plan_resume, ResultTable};
use crate::linkedin_analysis::{ConversationAnalyzer, MeetingDetector};
use crate::types::{render_messages, Conversation, ConversationSet, Message, RenderStyle};

/// What one enrichment batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub attempted: usize,
    pub failed: usize,
    /// Conversations left for a later run because of the batch limit.
    pub deferred: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeetingPassSummary {
    pub checked: usize,
    pub meetings: usize,
    pub newly_qualified: usize,
}

fn limited<'a>(pending: Vec<&'a Conversation>, limit: Option<usize>) -> (Vec<&'a Conversation>, usize) {
    match limit {
        Some(n) if pending.len() > n => {
            info!("Batch limited to {} of {} conversations", n, pending.len());
            let deferred = pending.len() - n;
            (pending.into_iter().take(n).collect(), deferred)
        }
        _ => (pending, 0),
    }
}

async fn enrich(
    analyzer: &ConversationAnalyzer,
    pending: Vec<&Conversation>,
    limit: Option<usize>,
) -> (ResultTable, BatchStats) {
    let (batch, deferred) = limited(pending, limit);
    let fresh = ResultTable::from_rows(analyzer.analyze_all(batch).await);
    let stats = BatchStats {
        attempted: fresh.len(),
        failed: fresh.failed_count(),
        deferred,
    };
    (fresh, stats)
}

/// Enrich every conversation in the set from scratch.
pub async fn analyze_fresh(
    analyzer: &ConversationAnalyzer,
    conversations: &ConversationSet,
    limit: Option<usize>,
) -> (ResultTable, BatchStats) {
    let (mut table, stats) = enrich(analyzer, conversations.iter().collect(), limit).await;
    table.sort_by_total_messages_desc();
    (table, stats)
}

/// Enrich only conversations missing from `prior`, then append them.
pub async fn resume(
    analyzer: &ConversationAnalyzer,
    prior: ResultTable,
    conversations: &ConversationSet,
    limit: Option<usize>,
) -> (ResultTable, BatchStats) {
    let pending = plan_resume(&prior, conversations);
    let (fresh, stats) = enrich(analyzer, pending, limit).await;
    (merge(prior, fresh.into_rows()), stats)
}

/// Re-enrich the failed rows of `prior` and recombine them with the successful ones.
/// Failed rows held back by the batch limit are kept as they were.
pub async fn repair(
    analyzer: &ConversationAnalyzer,
    prior: ResultTable,
    conversations: &ConversationSet,
    limit: Option<usize>,
) -> (ResultTable, BatchStats) {
    let previous = prior.clone();
    let plan = plan_repair(prior, conversations);

    let (fresh, stats) = enrich(analyzer, plan.retry, limit).await;

    // The failed rows are gone from `kept`, so their sticky flags come from `previous`.
    let mut retried = fresh.into_rows();
    for row in &mut retried {
        if let Some(old) = previous.get(row.lead_id()) {
            row.inherit_flags(old);
        }
    }

    let orphaned: HashSet<&str> = plan.orphaned.iter().map(String::as_str).collect();
    let mut table = merge(plan.kept, retried);
    for id in &plan.failed_ids {
        if orphaned.contains(id.as_str()) || table.contains(id) {
            continue;
        }
        if let Some(row) = previous.get(id) {
            table.insert_new(row.clone());
        }
    }

    table.sort_by_total_messages_desc();
    (table, stats)
}

/// Run a detector over the stored transcripts and record its verdicts. With a limit, only
/// the first rows are checked; the rest are left untouched and stay in the table.
pub async fn apply_meeting_detection(
    table: &mut ResultTable,
    detector: &dyn MeetingDetector,
    limit: Option<usize>,
) -> MeetingPassSummary {
    let mut summary = MeetingPassSummary::default();
    let total = limit.map_or(table.len(), |n| n.min(table.len()));
    if total < table.len() {
        info!("Meeting check limited to {} of {} rows", total, table.len());
    }
    info!("🔍 Checking {} conversations for meetings ({} detector)", total, detector.name());

    for (idx, row) in table.rows_mut().take(total).enumerate() {
        let verdict = detector.detect(&row.full_conversation).await;
        summary.checked += 1;

        if verdict.booked {
            summary.meetings += 1;
            if !row.is_qualified_lead {
                summary.newly_qualified += 1;
            }
            info!(
                "[{}/{}] Meeting found for {}",
                idx + 1,
                total,
                row.lead.display_name()
            );
        }
        row.record_meeting(verdict);
    }

    info!(
        "Meetings booked: {} ({} leads newly qualified)",
        summary.meetings, summary.newly_qualified
    );
    summary
}

/// Rebuild `full_conversation` for every row from the messages export. Returns how many
/// rows received a transcript; rows with no messages are left empty.
pub fn attach_conversations(table: &mut ResultTable, messages: &[Message]) -> usize {
    let threads: std::collections::HashMap<String, Vec<Message>> =
        group_messages(messages).into_iter().collect();

    let mut attached = 0usize;
    for row in table.rows_mut() {
        match threads.get(row.lead_id()) {
            Some(thread) => {
                row.full_conversation = render_messages(thread, RenderStyle::SingleLine);
                attached += 1;
            }
            None => row.full_conversation.clear(),
        }
    }

    if attached < table.len() {
        warn!(
            "{} rows have no messages in the export",
            table.len() - attached
        );
    }
    info!("Attached conversations to {} of {} rows", attached, table.len());
    attached
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkedin_analysis::llm_client::testing::ScriptedClient;
    use crate::linkedin_analysis::{KeywordMeetingDetector, RatePolicy};
    use crate::types::{AnalysisOutcome, Direction, EnrichmentResult, Lead, MeetingVerdict, RowStatus};
    use std::sync::Arc;

    const GOOD: &str = r#"{"pain_points":[{"point":"Manual work","severity":"high"}],"summary":"ok"}"#;

    fn conversation(id: &str, replies: usize) -> Conversation {
        let mut messages = vec![Message::new(id, "2024-01-01T08:00:00", Direction::Sent, "Interested in a demo?")];
        for i in 0..replies {
            messages.push(Message::new(
                id,
                &format!("2024-01-0{}T09:00:00", i + 2),
                Direction::Received,
                "Tell me more",
            ));
        }
        Conversation {
            lead: Lead::unmatched(id),
            messages,
        }
    }

    fn set(ids: &[(&str, usize)]) -> ConversationSet {
        let mut set = ConversationSet::new();
        for (id, replies) in ids {
            set.insert(conversation(id, *replies));
        }
        set
    }

    fn analyzer(replies: &[&str]) -> (ConversationAnalyzer, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::ok(replies));
        (
            ConversationAnalyzer::new(client.clone(), RatePolicy::none()),
            client,
        )
    }

    fn row(id: &str, replies: usize, text: &str) -> EnrichmentResult {
        EnrichmentResult::from_conversation(
            &conversation(id, replies),
            AnalysisOutcome::from_model_text(text),
        )
    }

    #[tokio::test]
    async fn test_analyze_fresh_respects_limit() {
        let (analyzer, client) = analyzer(&[GOOD, GOOD]);
        let conversations = set(&[("a", 1), ("b", 3), ("c", 1)]);

        let (table, stats) = analyze_fresh(&analyzer, &conversations, Some(2)).await;
        assert_eq!(stats, BatchStats { attempted: 2, failed: 0, deferred: 1 });
        assert_eq!(client.prompts().len(), 2);
        assert_eq!(table.rows()[0].lead_id(), "b");
        assert!(!table.contains("c"));
    }

    #[tokio::test]
    async fn test_resume_never_reanalyzes() {
        let (analyzer, client) = analyzer(&[GOOD]);
        let conversations = set(&[("a", 1), ("b", 1)]);
        let prior = ResultTable::from_rows(vec![row("a", 1, GOOD)]);

        let (table, stats) = resume(&analyzer, prior, &conversations, None).await;
        assert_eq!(stats.attempted, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(client.prompts().len(), 1);
        assert!(client.prompts()[0].contains("Name: Unknown"));
    }

    #[tokio::test]
    async fn test_repair_replaces_failed_rows_only() {
        let (analyzer, client) = analyzer(&[GOOD]);
        let conversations = set(&[("a", 1), ("b", 2)]);
        let prior = ResultTable::from_rows(vec![
            row("a", 1, GOOD),
            row("b", 2, "garbage"),
            row("gone", 1, "garbage"),
        ]);

        let (table, stats) = repair(&analyzer, prior, &conversations, None).await;
        assert_eq!(stats.attempted, 1);
        assert_eq!(client.prompts().len(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("b").unwrap().status(), RowStatus::Successful);
        assert!(!table.contains("gone"));
        assert_eq!(table.rows()[0].lead_id(), "b");
    }

    #[tokio::test]
    async fn test_repair_keeps_qualification_of_retried_rows() {
        let (analyzer, _client) = analyzer(&[r#"{"summary":"ok","is_qualified_lead":false}"#]);
        let conversations = set(&[("a", 1)]);
        let mut failed = row("a", 1, "garbage");
        failed.record_meeting(MeetingVerdict::booked("tuesday works"));
        let prior = ResultTable::from_rows(vec![failed]);

        let (table, stats) = repair(&analyzer, prior, &conversations, None).await;
        assert_eq!(stats.attempted, 1);

        let a = table.get("a").unwrap();
        assert_eq!(a.status(), RowStatus::Successful);
        assert_eq!(a.summary, "ok");
        assert!(a.is_qualified_lead);
        assert_eq!(a.meeting_booked, Some(true));
        assert_eq!(a.meeting_evidence, "tuesday works");
    }

    #[tokio::test]
    async fn test_repair_keeps_failed_rows_beyond_limit() {
        let (analyzer, _client) = analyzer(&[GOOD]);
        let conversations = set(&[("a", 1), ("b", 1)]);
        let prior = ResultTable::from_rows(vec![row("a", 1, "garbage"), row("b", 1, "garbage")]);

        let (table, stats) = repair(&analyzer, prior, &conversations, Some(1)).await;
        assert_eq!(stats.deferred, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a").unwrap().status(), RowStatus::Successful);
        assert_eq!(table.get("b").unwrap().status(), RowStatus::Failed);
    }

    #[tokio::test]
    async fn test_meeting_pass_qualifies_leads() {
        let mut booked = conversation("a", 0);
        booked.messages.push(Message::new(
            "a",
            "2024-01-06T09:00",
            Direction::Received,
            "Yes, I'm available Tuesday 2pm",
        ));
        let mut table = ResultTable::from_rows(vec![
            EnrichmentResult::from_conversation(&booked, AnalysisOutcome::from_model_text(GOOD)),
            row("b", 1, GOOD),
        ]);

        let detector = KeywordMeetingDetector::new().unwrap();
        let summary = apply_meeting_detection(&mut table, &detector, None).await;
        assert_eq!(
            summary,
            MeetingPassSummary { checked: 2, meetings: 1, newly_qualified: 1 }
        );

        let a = table.get("a").unwrap();
        assert!(a.is_qualified_lead);
        assert_eq!(a.meeting_booked, Some(true));
        let b = table.get("b").unwrap();
        assert_eq!(b.meeting_booked, Some(false));
        assert!(!b.is_qualified_lead);
    }

    #[tokio::test]
    async fn test_limited_meeting_pass_keeps_every_row() {
        let mut table =
            ResultTable::from_rows(vec![row("a", 1, GOOD), row("b", 1, GOOD), row("c", 1, GOOD)]);
        let detector = KeywordMeetingDetector::new().unwrap();

        let summary = apply_meeting_detection(&mut table, &detector, Some(2)).await;
        assert_eq!(summary.checked, 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("a").unwrap().meeting_booked, Some(false));
        assert_eq!(table.get("c").unwrap().meeting_booked, None);
    }

    #[test]
    fn test_attach_conversations() {
        let mut table = ResultTable::from_rows(vec![row("a", 1, GOOD), row("z", 1, GOOD)]);
        let messages = vec![
            Message::new("a", "2024-01-02T09:00:00", Direction::Received, "second"),
            Message::new("a", "2024-01-01T09:00:00", Direction::Sent, "first"),
        ];

        let attached = attach_conversations(&mut table, &messages);
        assert_eq!(attached, 1);
        assert_eq!(
            table.get("a").unwrap().full_conversation,
            "[2024-01-01T09:00:00] YOU: first [2024-01-02T09:00:00] LEAD: second"
        );
        assert!(table.get("z").unwrap().full_conversation.is_empty());
    }
}
