// The merge step: joins roster entries with the day-summary map and
// renders the final plan (stdout table, CSV, JSON rows).

use std::collections::HashMap;

use chrono::NaiveDate;
use snafu::prelude::*;

use leave_reconcile::{DaySummaries, LeaveEntry};

use crate::recon::{PlanResult, WritingCsvSnafu};

/// Shown in the calendar column for a day the feed has nothing for.
const NO_EVENT: &str = "-";
/// Shown in the calendar column when no feed URL was given at all.
const NO_FEED: &str = "No link provided";

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PlanRow {
    pub date: NaiveDate,
    pub original: String,
    pub kind: String,
    pub calendar: String,
}

/// Joins the extracted entries against the day-summary map, sorted by
/// date ascending. `day_summaries` is `None` when no feed URL was given;
/// an empty map means the feed had no data (or failed), which is not an
/// error.
pub fn merge_plan(entries: Vec<LeaveEntry>, day_summaries: Option<&DaySummaries>) -> Vec<PlanRow> {
    let mut rows: Vec<PlanRow> = entries
        .into_iter()
        .map(|e| {
            let calendar = match day_summaries {
                Some(map) => map.get(&e.date).cloned().unwrap_or_else(|| NO_EVENT.to_string()),
                None => NO_FEED.to_string(),
            };
            PlanRow {
                date: e.date,
                original: e.original,
                kind: e.kind,
                calendar,
            }
        })
        .collect();
    rows.sort_by_key(|r| r.date);
    rows
}

/// Days per normalized leave type, descending by count. Ties are
/// ordered alphabetically.
pub fn kind_tally(rows: &[PlanRow]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.kind.clone()).or_default() += 1;
    }
    let mut tally: Vec<(String, usize)> = counts.into_iter().collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tally
}

pub fn print_plan(rows: &[PlanRow], tally: &[(String, usize)]) {
    let code_width = rows
        .iter()
        .map(|r| r.original.len())
        .max()
        .unwrap_or(0)
        .max("Type".len());
    println!("{:<10}  {:<code_width$}  Calendar", "Date", "Type");
    for row in rows {
        println!(
            "{}  {:<code_width$}  {}",
            row.date.format("%d-%m-%Y"),
            row.original,
            row.calendar
        );
    }
    println!();
    println!("Summary:");
    for (kind, days) in tally {
        println!("  {:<code_width$}  {} days", kind, days);
    }
}

pub fn write_csv(rows: &[PlanRow], path: &str) -> PlanResult<()> {
    let mut writer = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    writer
        .write_record(["Date", "Original Type", "Type", "My Calendar"])
        .context(WritingCsvSnafu { path })?;
    for row in rows {
        writer
            .write_record([
                row.date.format("%Y-%m-%d").to_string(),
                row.original.clone(),
                row.kind.clone(),
                row.calendar.clone(),
            ])
            .context(WritingCsvSnafu { path })?;
    }
    writer.flush().map_err(csv::Error::from).context(WritingCsvSnafu { path })?;
    Ok(())
}
