// src/utils.rs
use std::path::{Path, PathBuf};

/// Excel refuses cells longer than this.
pub const XLSX_CELL_LIMIT: usize = 32_767;

/// Environment-style flag: `true`, `1` or `yes`, any case.
pub fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|s| s.trim().to_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}

/// Build a timestamped report path, e.g. `Customer_Insights_20251002_191635.xlsx`.
pub fn timestamped_output_path(base: &Path, stem: &str) -> PathBuf {
    base.join(format!(
        "{}_{}.xlsx",
        stem,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Lowercase and normalise typographic apostrophes so patterns can use a plain `'`.
pub fn normalize_for_matching(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Cut text to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First `max_chars` characters with an ellipsis, for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let cut = truncate_chars(text, max_chars);
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}
