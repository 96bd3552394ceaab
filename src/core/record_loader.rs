// src/core/record_loader.rs
//! Reads the outreach exports (people, messages, threads) from CSV

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::types::records::{Lead, Message, MessageRow, RawTable};

pub struct RecordLoader;

impl RecordLoader {
    pub fn load_messages(path: &Path) -> Result<Vec<Message>> {
        let file = open(path)?;
        let messages = Self::read_messages(file)
            .with_context(|| format!("Failed to parse messages from {}", path.display()))?;
        info!("Loaded {} messages from {}", messages.len(), path.display());
        Ok(messages)
    }

    pub fn load_people(path: &Path) -> Result<Vec<Lead>> {
        let file = open(path)?;
        let people = Self::read_people(file)
            .with_context(|| format!("Failed to parse people from {}", path.display()))?;
        info!("Loaded {} people from {}", people.len(), path.display());
        Ok(people)
    }

    /// Any export as plain text, headers included; used for sheets copied verbatim.
    pub fn load_raw(path: &Path) -> Result<RawTable> {
        let file = open(path)?;
        let table = Self::read_raw(file)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn read_messages<R: Read>(reader: R) -> Result<Vec<Message>> {
        let rows: Vec<MessageRow> = read_rows(reader)?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    pub fn read_people<R: Read>(reader: R) -> Result<Vec<Lead>> {
        let mut people: Vec<Lead> = read_rows(reader)?;
        for lead in &mut people {
            lead.linkedin_url = lead.linkedin_url.trim().to_string();
        }
        Ok(people)
    }

    pub fn read_raw<R: Read>(reader: R) -> Result<RawTable> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.context("Failed to read CSV record")?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(RawTable { headers, rows })
    }
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn read_rows<R: Read, T: DeserializeOwned>(reader: R) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, record) in csv_reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed CSV row {}: {}", line + 2, e);
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows", skipped);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::records::Direction;

    #[test]
    fn test_read_messages_ignores_extra_columns() {
        let data = "\
id,person_match_linkedin_url,timestamp,direction,body,channel,extra
1,https://linkedin.com/in/a,2024-01-05T10:00:00Z,sent,\"Hi, there\",dm,x
2,https://linkedin.com/in/a,2024-01-06T10:00:00Z,received,Hello,,y
";
        let messages = RecordLoader::read_messages(data.as_bytes()).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "Hi, there");
        assert_eq!(messages[1].direction, Direction::Received);
        assert_eq!(messages[1].channel, "dm");
    }

    #[test]
    fn test_read_messages_without_channel_column() {
        let data = "person_match_linkedin_url,timestamp,direction,body\nu,2024,received,hey\n";
        let messages = RecordLoader::read_messages(data.as_bytes()).unwrap();
        assert_eq!(messages[0].channel, "dm");
    }

    #[test]
    fn test_read_people() {
        let data = "\
linkedin_url,full_name,first_name,last_name,job_title,company_name,campaign_name
 https://linkedin.com/in/a ,Ann Lee,Ann,Lee,CTO,Acme,Q1
";
        let people = RecordLoader::read_people(data.as_bytes()).unwrap();
        assert_eq!(people[0].linkedin_url, "https://linkedin.com/in/a");
        assert_eq!(people[0].company_name, "Acme");
    }

    #[test]
    fn test_read_raw_keeps_headers() {
        let data = "thread_id,message_count_received\nt1,2\nt2,0\n";
        let table = RecordLoader::read_raw(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["thread_id", "message_count_received"]);
        assert_eq!(table.len(), 2);
    }
}
