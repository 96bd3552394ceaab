// src/types/records.rs
//! Raw export rows as they come out of the outreach tool's CSV files

use serde::{Deserialize, Serialize};

/// Which side of the conversation a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
    Unknown,
}

impl Direction {
    /// Parse the export's direction label. Anything other than sent/received is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "sent" => Direction::Sent,
            "received" => Direction::Received,
            _ => Direction::Unknown,
        }
    }

    pub fn is_inbound(self) -> bool {
        self == Direction::Received
    }
}

/// One row of `messages.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRow {
    #[serde(default)]
    pub person_match_linkedin_url: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub lead_id: String,
    pub timestamp: String,
    pub direction: Direction,
    pub body: String,
    pub channel: String,
}

impl Message {
    pub fn new(lead_id: &str, timestamp: &str, direction: Direction, body: &str) -> Self {
        Self {
            lead_id: lead_id.to_string(),
            timestamp: timestamp.to_string(),
            direction,
            body: body.to_string(),
            channel: "dm".to_string(),
        }
    }

    /// `YYYY-MM-DD` prefix of the timestamp, empty if there is none.
    pub fn date(&self) -> String {
        self.timestamp.trim().chars().take(10).collect()
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        let channel = if row.channel.trim().is_empty() {
            "dm".to_string()
        } else {
            row.channel
        };

        Self {
            lead_id: row.person_match_linkedin_url.trim().to_string(),
            timestamp: row.timestamp.trim().to_string(),
            direction: Direction::from_label(&row.direction),
            body: row.body,
            channel,
        }
    }
}

/// One row of `people.csv`; also the denormalized metadata carried by a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub campaign_name: String,
}

impl Lead {
    /// Placeholder metadata for a lead that has messages but no people row.
    pub fn unmatched(linkedin_url: &str) -> Self {
        Self {
            linkedin_url: linkedin_url.to_string(),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            "Unknown"
        } else {
            &self.full_name
        }
    }
}

/// Header + rows of an export kept as plain text, for sheets that are copied verbatim.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count rows whose `column` value satisfies `pred`. `None` if the column is absent.
    pub fn count_where<F>(&self, column: &str, pred: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        let idx = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .filter(|row| row.get(idx).map(|v| pred(v)).unwrap_or(false))
                .count(),
        )
    }
}
