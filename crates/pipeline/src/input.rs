//! Task list parsing.
//!
//! Two formats are accepted, chosen by file extension.
//!
//! **CSV** (`.csv`): a header row with `Summary` and `Original Estimate`
//! columns; other columns are ignored.
//!
//! ```text
//! Summary,Original Estimate
//! Install Minio,3h
//! Update SSL,2h
//! ```
//!
//! **YAML** (anything else; JSON also parses): a list of task entries, either
//! at the top level or under a `tasks` key:
//!
//! ```yaml
//! tasks:
//!   - summary: Install Minio
//!     original_estimate: 3h
//!   - summary: Update SSL
//!     original_estimate: 2h
//! ```
//!
//! Every entry is validated before anything is returned, so a malformed
//! document is rejected before any remote call is made. Entry indexes in
//! errors are zero-based and count data rows only.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::{SubmitError, TaskRecord, WorkDuration};

const CSV_SUMMARY: &str = "Summary";
const CSV_ESTIMATE: &str = "Original Estimate";

/// An entry as written in the document, before validation.
#[derive(Debug, Deserialize)]
struct RawTaskEntry {
    summary: Option<String>,
    original_estimate: Option<String>,
}

/// A CSV data row, keyed by header name.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Summary")]
    summary: Option<String>,
    #[serde(rename = "Original Estimate")]
    original_estimate: Option<String>,
}

impl From<CsvRow> for RawTaskEntry {
    fn from(row: CsvRow) -> Self {
        Self {
            summary: row.summary,
            original_estimate: row.original_estimate,
        }
    }
}

/// Reads and parses the task list at `path`: CSV for a `.csv` extension
/// (any case), YAML otherwise.
pub fn load_task_file(path: &Path) -> Result<Vec<TaskRecord>, SubmitError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SubmitError::input(format!("cannot read '{}': {e}", path.display())))?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        parse_task_csv(&text)
    } else {
        parse_task_document(&text)
    }
}

/// Parses CSV text with `Summary` and `Original Estimate` columns into
/// records, preserving row order.
pub fn parse_task_csv(text: &str) -> Result<Vec<TaskRecord>, SubmitError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SubmitError::input(format!("invalid CSV header: {e}")))?;
    for column in [CSV_SUMMARY, CSV_ESTIMATE] {
        if !headers.iter().any(|h| h == column) {
            return Err(SubmitError::input(format!("CSV header has no `{column}` column")));
        }
    }

    let records = reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(index, row)| {
            let row = row
                .map_err(|e| SubmitError::input_at(index, format!("invalid CSV row: {e}")))?;
            validate_entry(index, row.into())
        })
        .collect::<Result<Vec<_>, _>>()?;

    if records.is_empty() {
        return Err(SubmitError::input("CSV contains no task rows"));
    }
    Ok(records)
}

/// Parses a task document into records, preserving document order.
pub fn parse_task_document(text: &str) -> Result<Vec<TaskRecord>, SubmitError> {
    let document: Value = serde_yaml::from_str(text)
        .map_err(|e| SubmitError::input(format!("invalid YAML: {e}")))?;

    let entries = match document {
        Value::Sequence(entries) => entries,
        Value::Mapping(mut map) => match map.remove("tasks") {
            Some(Value::Sequence(entries)) => entries,
            Some(_) => return Err(SubmitError::input("`tasks` must be a list of task entries")),
            None => return Err(SubmitError::input("missing top-level `tasks` list")),
        },
        Value::Null => return Err(SubmitError::input("document is empty")),
        _ => {
            return Err(SubmitError::input(
                "expected a list of task entries or a mapping with a `tasks` list",
            ))
        }
    };

    if entries.is_empty() {
        return Err(SubmitError::input("document contains no task entries"));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

fn parse_entry(index: usize, entry: Value) -> Result<TaskRecord, SubmitError> {
    if !entry.is_mapping() {
        return Err(SubmitError::input_at(
            index,
            "entry must be a mapping with `summary` and `original_estimate`",
        ));
    }
    let raw: RawTaskEntry =
        serde_yaml::from_value(entry).map_err(|e| SubmitError::input_at(index, e.to_string()))?;
    validate_entry(index, raw)
}

fn validate_entry(index: usize, raw: RawTaskEntry) -> Result<TaskRecord, SubmitError> {
    let summary = raw
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SubmitError::input_at(index, "missing or empty `summary`"))?;

    let estimate = raw
        .original_estimate
        .ok_or_else(|| SubmitError::input_at(index, "missing `original_estimate`"))?;
    let original_estimate = WorkDuration::parse(&estimate).map_err(|e| {
        SubmitError::input_at(index, format!("invalid `original_estimate` {estimate:?}: {e}"))
    })?;

    Ok(TaskRecord {
        summary,
        original_estimate,
    })
}
