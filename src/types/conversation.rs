// src/types/conversation.rs
use std::collections::HashMap;

use super::records::{Direction, Lead, Message};

/// How a conversation is flattened into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// `[YYYY-MM-DD] You: ...` turns separated by blank lines; used in prompts.
    MultiLine,
    /// `[timestamp] YOU: ...` turns on one line; stored in the sheet and scanned for meetings.
    SingleLine,
}

/// Time-ordered messages exchanged with one lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub lead: Lead,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn lead_id(&self) -> &str {
        &self.lead.linkedin_url
    }

    pub fn total_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn reply_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.direction.is_inbound())
            .count()
    }

    pub fn has_reply(&self) -> bool {
        self.messages.iter().any(|m| m.direction.is_inbound())
    }

    pub fn first_message_date(&self) -> String {
        self.messages.first().map(Message::date).unwrap_or_default()
    }

    pub fn last_message_date(&self) -> String {
        self.messages.last().map(Message::date).unwrap_or_default()
    }

    pub fn render(&self, style: RenderStyle) -> String {
        render_messages(&self.messages, style)
    }

    /// Single-line transcript, the form kept in `full_conversation`.
    pub fn transcript(&self) -> String {
        self.render(RenderStyle::SingleLine)
    }
}

pub fn render_messages(messages: &[Message], style: RenderStyle) -> String {
    let turns: Vec<String> = messages
        .iter()
        .map(|msg| match style {
            RenderStyle::MultiLine => {
                let sender = if msg.direction == Direction::Sent {
                    "You"
                } else {
                    "Lead"
                };
                let date = if msg.timestamp.is_empty() {
                    "Unknown date".to_string()
                } else {
                    msg.date()
                };
                format!("[{}] {}: {}", date, sender, msg.body)
            }
            RenderStyle::SingleLine => {
                let sender = if msg.direction == Direction::Sent {
                    "YOU"
                } else {
                    "LEAD"
                };
                let stamp = if msg.timestamp.is_empty() {
                    "Unknown".to_string()
                } else {
                    msg.timestamp.chars().take(19).collect()
                };
                let body = msg.body.replace(['\n', '\r'], " ");
                format!("[{}] {}: {}", stamp, sender, body)
            }
        })
        .collect();

    match style {
        RenderStyle::MultiLine => turns.join("\n\n"),
        RenderStyle::SingleLine => turns.join(" "),
    }
}

/// Conversations with at least one reply, in first-appearance order of their lead.
#[derive(Debug, Clone, Default)]
pub struct ConversationSet {
    conversations: Vec<Conversation>,
    index: HashMap<String, usize>,
}

impl ConversationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a conversation; a second one for the same lead is ignored.
    pub fn insert(&mut self, conversation: Conversation) -> bool {
        if self.index.contains_key(conversation.lead_id()) {
            return false;
        }
        self.index
            .insert(conversation.lead_id().to_string(), self.conversations.len());
        self.conversations.push(conversation);
        true
    }

    pub fn get(&self, lead_id: &str) -> Option<&Conversation> {
        self.index.get(lead_id).map(|&i| &self.conversations[i])
    }

    pub fn contains(&self, lead_id: &str) -> bool {
        self.index.contains_key(lead_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    pub fn lead_ids(&self) -> impl Iterator<Item = &str> {
        self.conversations.iter().map(Conversation::lead_id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
