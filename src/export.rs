//! CSV export of a batch run.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::fanout::BatchOutcome;
use crate::fanout::batch::FanOutRow;

const BASE_COLUMNS: [&str; 5] = ["lookup_query", "query", "type", "user_intent", "reasoning"];
const ROUTING_COLUMNS: [&str; 2] = ["routing_format", "format_reason"];
const PLAN_COLUMNS: [&str; 5] = [
    "lookup_query",
    "target_query_count",
    "reasoning_for_count",
    "generated_count",
    "count_mismatch",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header for the row export: fixed preferred order, routing columns when
/// the run used them, then any extra keys the model added (sorted).
pub fn columns(outcome: &BatchOutcome) -> Vec<String> {
    let mut cols: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();

    let routed = outcome.variant.has_routing()
        || outcome
            .rows
            .iter()
            .any(|r| r.query.routing_format.is_some() || r.query.format_reason.is_some());
    if routed {
        cols.extend(ROUTING_COLUMNS.iter().map(|c| c.to_string()));
    }

    let extras: BTreeSet<&str> = outcome
        .rows
        .iter()
        .flat_map(|r| r.query.extra.keys().map(String::as_str))
        .filter(|k| !cols.iter().any(|c| c == k))
        .collect();
    cols.extend(extras.into_iter().map(str::to_string));
    cols
}

fn cell<'a>(row: &'a FanOutRow, column: &str) -> &'a str {
    let q = &row.query;
    match column {
        "lookup_query" => &row.lookup_query,
        "query" => &q.query,
        "type" => q.query_type.as_str(),
        "user_intent" => &q.user_intent,
        "reasoning" => &q.reasoning,
        "routing_format" => q.routing_format.as_ref().map_or("", |f| f.as_str()),
        "format_reason" => q.format_reason.as_deref().unwrap_or(""),
        other => q.extra.get(other).map_or("", String::as_str),
    }
}

/// One row per expanded query. The header is written even when there are no rows.
pub fn write_rows<W: Write>(outcome: &BatchOutcome, writer: W) -> Result<(), ExportError> {
    let cols = columns(outcome);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&cols)?;
    for row in &outcome.rows {
        csv.write_record(cols.iter().map(|c| cell(row, c)))?;
    }
    csv.flush()?;
    Ok(())
}

/// One row per successful lookup's generation plan.
pub fn write_plans<W: Write>(outcome: &BatchOutcome, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(PLAN_COLUMNS)?;
    for plan in &outcome.plans {
        let target = plan.target_text().unwrap_or_default();
        csv.write_record([
            plan.lookup_query.as_str(),
            target.as_str(),
            plan.reasoning_for_count.as_str(),
            plan.generated_count.to_string().as_str(),
            if plan.count_mismatch { "true" } else { "false" },
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn rows_to_path(outcome: &BatchOutcome, path: &Path) -> Result<(), ExportError> {
    write_rows(outcome, File::create(path)?)?;
    info!(path = %path.display(), rows = outcome.rows.len(), "CSV written");
    Ok(())
}

pub fn plans_to_path(outcome: &BatchOutcome, path: &Path) -> Result<(), ExportError> {
    write_plans(outcome, File::create(path)?)?;
    info!(path = %path.display(), plans = outcome.plans.len(), "plan CSV written");
    Ok(())
}
