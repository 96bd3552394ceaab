// src/core/workbook.rs
//! Reading and writing the xlsx reports

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::report::{InsightReport, MetricValue};
use super::result_store::ResultTable;
use crate::types::insights::{MAX_FEATURES, MAX_PAIN_POINTS};
use crate::types::{EngagementLevel, EnrichmentResult, FeatureSuggestion, Lead, PainPoint, RawTable};
use crate::utils::{parse_flag, truncate_chars, XLSX_CELL_LIMIT};

pub const INSIGHTS_SHEET: &str = "Customer Insights";
const MAX_COLUMN_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl Cell {
    fn text(value: &str) -> Self {
        Cell::Text(value.to_string())
    }

    fn count(value: usize) -> Self {
        Cell::Number(value as f64)
    }

    fn display_width(&self) -> usize {
        match self {
            Cell::Text(s) => s.chars().count(),
            Cell::Number(n) => n.to_string().len(),
            Cell::Bool(b) => b.to_string().len(),
            Cell::Empty => 0,
        }
    }
}

struct Sheet {
    name: &'static str,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: &'static str, headers: &[&str]) -> Self {
        Self {
            name,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Column order of the `Customer Insights` sheet.
pub fn insight_columns() -> Vec<String> {
    let mut columns: Vec<String> = [
        "linkedin_url",
        "full_name",
        "first_name",
        "last_name",
        "job_title",
        "company_name",
        "campaign_name",
        "total_messages",
        "reply_count",
        "first_message_date",
        "last_message_date",
        "summary",
        "engagement_level",
        "is_qualified_lead",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    for i in 1..=MAX_PAIN_POINTS {
        columns.push(format!("pain_point_{}", i));
        columns.push(format!("pain_point_{}_severity", i));
    }
    for i in 1..=MAX_FEATURES {
        columns.push(format!("feature_{}", i));
        columns.push(format!("feature_{}_addresses", i));
    }
    columns.extend(
        ["raw_analysis", "full_conversation", "meeting_booked", "meeting_evidence"]
            .iter()
            .map(|c| c.to_string()),
    );
    columns
}

fn insight_row(row: &EnrichmentResult) -> Vec<Cell> {
    let lead = &row.lead;
    let mut cells = vec![
        Cell::text(&lead.linkedin_url),
        Cell::text(&lead.full_name),
        Cell::text(&lead.first_name),
        Cell::text(&lead.last_name),
        Cell::text(&lead.job_title),
        Cell::text(&lead.company_name),
        Cell::text(&lead.campaign_name),
        Cell::count(row.total_messages),
        Cell::count(row.reply_count),
        Cell::text(&row.first_message_date),
        Cell::text(&row.last_message_date),
        Cell::text(&row.summary),
        Cell::text(row.engagement_level.as_str()),
        Cell::Bool(row.is_qualified_lead),
    ];

    for i in 0..MAX_PAIN_POINTS {
        match row.pain_points.get(i) {
            Some(pp) => {
                cells.push(Cell::text(&pp.point));
                cells.push(Cell::text(&pp.severity));
            }
            None => cells.extend([Cell::Empty, Cell::Empty]),
        }
    }
    for i in 0..MAX_FEATURES {
        match row.features.get(i) {
            Some(f) => {
                cells.push(Cell::text(&f.feature));
                cells.push(Cell::text(&f.addresses_pain_point));
            }
            None => cells.extend([Cell::Empty, Cell::Empty]),
        }
    }

    cells.push(Cell::text(&row.raw_analysis));
    cells.push(Cell::text(&row.full_conversation));
    cells.push(row.meeting_booked.map(Cell::Bool).unwrap_or(Cell::Empty));
    cells.push(Cell::text(&row.meeting_evidence));
    cells
}

fn insight_sheets(table: &ResultTable, report: &InsightReport) -> Vec<Sheet> {
    let columns = insight_columns();
    let insights = Sheet {
        name: INSIGHTS_SHEET,
        headers: columns,
        rows: table.rows().iter().map(insight_row).collect(),
    };

    let mut summary = Sheet::new("Summary", &["Metric", "Value"]);
    summary.rows = report
        .metrics
        .iter()
        .map(|m| {
            let value = match &m.value {
                MetricValue::Count(n) => Cell::count(*n),
                MetricValue::Text(s) => Cell::text(s),
            };
            vec![Cell::text(&m.name), value]
        })
        .collect();

    let mut pain_points = Sheet::new(
        "All Pain Points",
        &["pain_point", "severity", "company", "contact"],
    );
    pain_points.rows = report
        .pain_points
        .iter()
        .map(|p| {
            vec![
                Cell::text(&p.pain_point),
                Cell::text(&p.severity),
                Cell::text(&p.company),
                Cell::text(&p.contact),
            ]
        })
        .collect();

    let mut pain_frequency = Sheet::new("Pain Point Frequency", &["pain_point", "count"]);
    pain_frequency.rows = report
        .pain_point_frequency
        .iter()
        .map(|f| vec![Cell::text(&f.text), Cell::count(f.count)])
        .collect();

    let mut features = Sheet::new(
        "All Features",
        &["feature", "addresses", "suggested_by", "company"],
    );
    features.rows = report
        .features
        .iter()
        .map(|f| {
            vec![
                Cell::text(&f.feature),
                Cell::text(&f.addresses),
                Cell::text(&f.suggested_by),
                Cell::text(&f.company),
            ]
        })
        .collect();

    let mut feature_frequency = Sheet::new("Feature Frequency", &["feature", "count"]);
    feature_frequency.rows = report
        .feature_frequency
        .iter()
        .map(|f| vec![Cell::text(&f.text), Cell::count(f.count)])
        .collect();

    vec![
        insights,
        summary,
        pain_points,
        pain_frequency,
        features,
        feature_frequency,
    ]
}

fn write_workbook(sheets: &[Sheet], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;

        let mut widths: Vec<usize> = sheet.headers.iter().map(|h| h.chars().count()).collect();
        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header.as_str(), &bold)?;
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            let xlsx_row = (r + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let xlsx_col = col as u16;
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(xlsx_row, xlsx_col, truncate_chars(s, XLSX_CELL_LIMIT))?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(xlsx_row, xlsx_col, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(xlsx_row, xlsx_col, *b)?;
                    }
                    Cell::Empty => {}
                }
                if let Some(w) = widths.get_mut(col) {
                    *w = (*w).max(cell.display_width());
                }
            }
        }

        for (col, width) in widths.iter().enumerate() {
            let width = (width + 2).min(MAX_COLUMN_WIDTH);
            worksheet.set_column_width(col as u16, width as f64)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))?;
    Ok(())
}

/// Write the insights workbook: the primary sheet plus every derived view.
pub fn export_insights(table: &ResultTable, path: &Path, run_id: &str) -> Result<InsightReport> {
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let report = InsightReport::build(table, run_id, &generated_at);

    write_workbook(&insight_sheets(table, &report), path)?;
    info!(
        "💾 Saved {} rows to {} ({} pain points, {} feature suggestions)",
        table.len(),
        path.display(),
        report.pain_points.len(),
        report.features.len()
    );
    Ok(report)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) => format!("{}", f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR({:?})", e),
    }
}

fn cell_to_count(cell: &Data) -> usize {
    match cell {
        Data::Int(n) => (*n).max(0) as usize,
        Data::Float(f) if *f > 0.0 => *f as usize,
        Data::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as usize).unwrap_or(0),
        _ => 0,
    }
}

fn cell_to_flag(cell: &Data) -> Option<bool> {
    match cell {
        Data::Empty => None,
        Data::Bool(b) => Some(*b),
        Data::Int(n) => Some(*n != 0),
        Data::Float(f) => Some(*f != 0.0),
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(parse_flag(Some(s))),
        _ => None,
    }
}

/// Named access into one worksheet row.
struct RowView<'a> {
    columns: &'a HashMap<String, usize>,
    cells: &'a [Data],
}

impl<'a> RowView<'a> {
    fn cell(&self, name: &str) -> Option<&'a Data> {
        self.columns.get(name).and_then(|&i| self.cells.get(i))
    }

    fn text(&self, name: &str) -> String {
        self.cell(name).map(cell_to_string).unwrap_or_default()
    }

    fn count(&self, name: &str) -> usize {
        self.cell(name).map(cell_to_count).unwrap_or(0)
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.cell(name).and_then(cell_to_flag)
    }

    fn to_result(&self) -> EnrichmentResult {
        let pain_points = (1..=MAX_PAIN_POINTS)
            .map(|i| PainPoint {
                point: self.text(&format!("pain_point_{}", i)),
                severity: self.text(&format!("pain_point_{}_severity", i)),
            })
            .filter(|p| !p.point.trim().is_empty())
            .collect();
        let features = (1..=MAX_FEATURES)
            .map(|i| FeatureSuggestion {
                feature: self.text(&format!("feature_{}", i)),
                addresses_pain_point: self.text(&format!("feature_{}_addresses", i)),
            })
            .filter(|f| !f.feature.trim().is_empty())
            .collect();

        EnrichmentResult {
            lead: Lead {
                linkedin_url: self.text("linkedin_url").trim().to_string(),
                full_name: self.text("full_name"),
                first_name: self.text("first_name"),
                last_name: self.text("last_name"),
                job_title: self.text("job_title"),
                company_name: self.text("company_name"),
                campaign_name: self.text("campaign_name"),
            },
            total_messages: self.count("total_messages"),
            reply_count: self.count("reply_count"),
            first_message_date: self.text("first_message_date"),
            last_message_date: self.text("last_message_date"),
            summary: self.text("summary"),
            engagement_level: EngagementLevel::from_label(&self.text("engagement_level")),
            is_qualified_lead: self.flag("is_qualified_lead").unwrap_or(false),
            pain_points,
            features,
            raw_analysis: self.text("raw_analysis"),
            full_conversation: self.text("full_conversation"),
            meeting_booked: self.flag("meeting_booked"),
            meeting_evidence: self.text("meeting_evidence"),
        }
    }
}

/// Read a prior `Customer Insights` sheet back into a table. Missing columns take defaults;
/// rows without a lead identifier are skipped.
pub fn load_insights(path: &Path) -> Result<ResultTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("Failed to open workbook {}: {}", path.display(), e))?;

    let sheet_name = if workbook.sheet_names().iter().any(|s| s == INSIGHTS_SHEET) {
        INSIGHTS_SHEET.to_string()
    } else {
        workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| anyhow!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let columns: HashMap<String, usize> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| (cell_to_string(cell).trim().to_string(), i))
            .collect(),
        None => return Ok(ResultTable::new()),
    };
    if !columns.contains_key("linkedin_url") {
        anyhow::bail!(
            "Sheet '{}' in {} has no linkedin_url column",
            sheet_name,
            path.display()
        );
    }

    let results: Vec<EnrichmentResult> = rows
        .map(|cells| RowView {
            columns: &columns,
            cells,
        }
        .to_result())
        .filter(|r| !r.lead_id().is_empty())
        .collect();

    info!("Loaded {} prior results from {}", results.len(), path.display());
    Ok(ResultTable::from_rows(results))
}

fn raw_sheet(name: &'static str, table: &RawTable) -> Sheet {
    Sheet {
        name,
        headers: table.headers.clone(),
        rows: table
            .rows
            .iter()
            .map(|row| row.iter().map(|v| Cell::text(v)).collect())
            .collect(),
    }
}

/// Totals for the master-raw `Summary` sheet.
pub fn master_summary(
    people: &RawTable,
    messages: &RawTable,
    threads: &RawTable,
    extraction_date: &str,
) -> Vec<(String, String)> {
    let direction_count = |label: &str| {
        messages
            .count_where("direction", |v| v.trim().eq_ignore_ascii_case(label))
            .unwrap_or(0)
    };
    let with_replies = threads
        .count_where("message_count_received", |v| {
            v.trim().parse::<f64>().map(|n| n > 0.0).unwrap_or(false)
        })
        .map(|n| n.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let average = if threads.is_empty() {
        "0".to_string()
    } else {
        format!("{:.1}", messages.len() as f64 / threads.len() as f64)
    };

    vec![
        ("Total Contacts".to_string(), people.len().to_string()),
        ("Total Messages".to_string(), messages.len().to_string()),
        ("Total Threads".to_string(), threads.len().to_string()),
        ("Messages Sent".to_string(), direction_count("sent").to_string()),
        ("Messages Received".to_string(), direction_count("received").to_string()),
        ("Contacts with Replies".to_string(), with_replies),
        ("Avg Messages per Thread".to_string(), average),
        ("Extraction Date".to_string(), extraction_date.to_string()),
    ]
}

/// Copy the three exports verbatim into one workbook with a totals sheet.
pub fn export_master_raw(
    people: &RawTable,
    messages: &RawTable,
    threads: &RawTable,
    path: &Path,
) -> Result<()> {
    let extraction_date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let mut summary = Sheet::new("Summary", &["Metric", "Value"]);
    summary.rows = master_summary(people, messages, threads, &extraction_date)
        .into_iter()
        .map(|(metric, value)| vec![Cell::Text(metric), Cell::Text(value)])
        .collect();

    let sheets = vec![
        raw_sheet("All Contacts", people),
        raw_sheet("All Messages", messages),
        raw_sheet("All Threads", threads),
        summary,
    ];
    write_workbook(&sheets, path)?;

    info!(
        "💾 Saved master report to {} ({} contacts, {} messages, {} threads)",
        path.display(),
        people.len(),
        messages.len(),
        threads.len()
    );
    Ok(())
}
