// src/core/aggregator.rs
//! Groups exported messages into per-lead conversations

use std::collections::HashMap;
use tracing::info;

use crate::types::{Conversation, ConversationSet, Lead, Message};

/// Group messages by lead in first-appearance order, each group sorted by timestamp.
/// Messages without a lead identifier are dropped; empty timestamps sort last.
pub fn group_messages(messages: &[Message]) -> Vec<(String, Vec<Message>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Message>> = HashMap::new();

    for msg in messages {
        if msg.lead_id.is_empty() {
            continue;
        }
        groups
            .entry(msg.lead_id.clone())
            .or_insert_with(|| {
                order.push(msg.lead_id.clone());
                Vec::new()
            })
            .push(msg.clone());
    }

    order
        .into_iter()
        .filter_map(|id| {
            let mut thread = groups.remove(&id)?;
            thread.sort_by(|a, b| {
                (a.timestamp.is_empty(), &a.timestamp).cmp(&(b.timestamp.is_empty(), &b.timestamp))
            });
            Some((id, thread))
        })
        .collect()
}

/// Build the conversations worth analyzing: those where the lead replied at least once.
pub fn aggregate(messages: &[Message], people: &[Lead]) -> ConversationSet {
    let mut directory: HashMap<&str, &Lead> = HashMap::new();
    for lead in people {
        if !lead.linkedin_url.is_empty() {
            directory.entry(lead.linkedin_url.as_str()).or_insert(lead);
        }
    }

    let mut set = ConversationSet::new();
    let mut without_reply = 0usize;

    for (lead_id, thread) in group_messages(messages) {
        if !thread.iter().any(|m| m.direction.is_inbound()) {
            without_reply += 1;
            continue;
        }

        let lead = directory
            .get(lead_id.as_str())
            .map(|&lead| lead.clone())
            .unwrap_or_else(|| Lead::unmatched(&lead_id));

        set.insert(Conversation {
            lead,
            messages: thread,
        });
    }

    info!(
        "Aggregated {} conversations with replies ({} without a reply skipped)",
        set.len(),
        without_reply
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn msg(lead: &str, ts: &str, direction: Direction, body: &str) -> Message {
        Message::new(lead, ts, direction, body)
    }

    fn person(url: &str, name: &str) -> Lead {
        Lead {
            linkedin_url: url.to_string(),
            full_name: name.to_string(),
            company_name: format!("{} Inc", name),
            ..Lead::default()
        }
    }

    #[test]
    fn test_messages_sorted_by_timestamp() {
        let messages = vec![
            msg("a", "2024-01-07T09:00", Direction::Received, "third"),
            msg("a", "2024-01-05T09:00", Direction::Sent, "first"),
            msg("a", "", Direction::Sent, "undated"),
            msg("a", "2024-01-06T09:00", Direction::Sent, "second"),
        ];
        let set = aggregate(&messages, &[]);
        let conv = set.get("a").unwrap();
        let bodies: Vec<&str> = conv.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second", "third", "undated"]);

        let dated: Vec<&str> = conv
            .messages
            .iter()
            .filter(|m| !m.timestamp.is_empty())
            .map(|m| m.timestamp.as_str())
            .collect();
        assert!(dated.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_outbound_only_threads_excluded() {
        let messages = vec![
            msg("silent", "2024-01-01", Direction::Sent, "ping"),
            msg("silent", "2024-01-02", Direction::Sent, "ping again"),
            msg("replied", "2024-01-01", Direction::Sent, "ping"),
            msg("replied", "2024-01-03", Direction::Received, "pong"),
        ];
        let set = aggregate(&messages, &[]);
        assert_eq!(set.len(), 1);
        assert!(!set.contains("silent"));
        assert!(set.contains("replied"));
    }

    #[test]
    fn test_missing_metadata_defaults_to_empty() {
        let messages = vec![msg("ghost", "2024-01-01", Direction::Received, "hi")];
        let set = aggregate(&messages, &[person("someone-else", "Bob")]);
        let conv = set.get("ghost").unwrap();
        assert_eq!(conv.lead.linkedin_url, "ghost");
        assert!(conv.lead.full_name.is_empty());
        assert!(conv.lead.company_name.is_empty());
        assert!(conv.lead.job_title.is_empty());
    }

    #[test]
    fn test_first_metadata_row_wins() {
        let messages = vec![msg("a", "2024-01-01", Direction::Received, "hi")];
        let people = vec![person("a", "First"), person("a", "Second")];
        let set = aggregate(&messages, &people);
        assert_eq!(set.get("a").unwrap().lead.full_name, "First");
    }

    #[test]
    fn test_blank_ids_skipped_and_order_preserved() {
        let messages = vec![
            msg("b", "2024-01-02", Direction::Received, "x"),
            msg("", "2024-01-01", Direction::Received, "orphan"),
            msg("a", "2024-01-01", Direction::Received, "y"),
        ];
        let set = aggregate(&messages, &[]);
        let ids: Vec<&str> = set.lead_ids().collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_group_messages_keeps_outbound_only() {
        let messages = vec![msg("silent", "2024-01-01", Direction::Sent, "ping")];
        let groups = group_messages(&messages);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "silent");
    }
}
