// src/core/result_store.rs
//! One row per lead across any number of enrichment runs

use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::types::{Conversation, ConversationSet, EnrichmentResult, RowStatus};

#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: Vec<EnrichmentResult>,
    index: HashMap<String, usize>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored rows. The first row for a lead wins; later duplicates are dropped.
    pub fn from_rows(rows: Vec<EnrichmentResult>) -> Self {
        let mut table = Self::new();
        let mut duplicates = 0usize;
        for row in rows {
            if !table.insert_new(row) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!("Dropped {} duplicate rows while loading results", duplicates);
        }
        table
    }

    /// Append a row for a lead not yet in the table. Returns false if the lead is present.
    pub fn insert_new(&mut self, row: EnrichmentResult) -> bool {
        if self.index.contains_key(row.lead_id()) {
            return false;
        }
        self.index.insert(row.lead_id().to_string(), self.rows.len());
        self.rows.push(row);
        true
    }

    /// Insert or fully replace the row for this lead, keeping sticky flags of the old row.
    pub fn upsert(&mut self, mut row: EnrichmentResult) {
        let existing = self.index.get(row.lead_id()).copied();
        match existing {
            Some(i) => {
                row.inherit_flags(&self.rows[i]);
                self.rows[i] = row;
            }
            None => {
                self.insert_new(row);
            }
        }
    }

    pub fn get(&self, lead_id: &str) -> Option<&EnrichmentResult> {
        self.index.get(lead_id).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, lead_id: &str) -> bool {
        self.index.contains_key(lead_id)
    }

    pub fn rows(&self) -> &[EnrichmentResult] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut EnrichmentResult> {
        self.rows.iter_mut()
    }

    pub fn lead_ids(&self) -> HashSet<&str> {
        self.rows.iter().map(EnrichmentResult::lead_id).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Readability sort; row order carries no meaning.
    pub fn sort_by_total_messages_desc(&mut self) {
        self.rows
            .sort_by(|a, b| b.total_messages.cmp(&a.total_messages));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.lead_id().to_string(), i))
            .collect();
    }

    pub fn failed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.status() == RowStatus::Failed)
            .count()
    }

    pub fn into_rows(self) -> Vec<EnrichmentResult> {
        self.rows
    }
}

/// Conversations not yet covered by `prior`, in conversation order.
pub fn plan_resume<'a>(
    prior: &ResultTable,
    conversations: &'a ConversationSet,
) -> Vec<&'a Conversation> {
    let pending: Vec<&Conversation> = conversations
        .iter()
        .filter(|c| !prior.contains(c.lead_id()))
        .collect();

    info!(
        "Already analyzed: {}, remaining to analyze: {}",
        prior.len(),
        pending.len()
    );
    pending
}

/// Prior rows split by status, and the conversations to re-run for the failed ones.
#[derive(Debug)]
pub struct RepairPlan<'a> {
    pub kept: ResultTable,
    pub failed_ids: Vec<String>,
    pub retry: Vec<&'a Conversation>,
    /// Failed leads with no eligible conversation left; they are dropped.
    pub orphaned: Vec<String>,
}

pub fn plan_repair(prior: ResultTable, conversations: &ConversationSet) -> RepairPlan<'_> {
    let mut kept = Vec::new();
    let mut failed_ids = Vec::new();

    for row in prior.into_rows() {
        match row.status() {
            RowStatus::Successful => kept.push(row),
            RowStatus::Failed => failed_ids.push(row.lead_id().to_string()),
        }
    }

    let mut retry = Vec::new();
    let mut orphaned = Vec::new();
    for id in &failed_ids {
        match conversations.get(id) {
            Some(conversation) => retry.push(conversation),
            None => orphaned.push(id.clone()),
        }
    }

    info!(
        "Successfully analyzed: {}, need to re-analyze: {}",
        kept.len(),
        failed_ids.len()
    );
    if !orphaned.is_empty() {
        warn!(
            "{} failed rows have no conversation with replies in the export and will be dropped",
            orphaned.len()
        );
    }

    RepairPlan {
        kept: ResultTable::from_rows(kept),
        failed_ids,
        retry,
        orphaned,
    }
}

/// Fold freshly enriched rows into `table`, replacing any row for the same lead.
pub fn merge(mut table: ResultTable, fresh: Vec<EnrichmentResult>) -> ResultTable {
    for row in fresh {
        table.upsert(row);
    }
    table
}
