mod config;
use log::debug;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

pub use crate::config::*;

// **** Private structures ****

// The date-column mapping currently in effect while scanning the roster.
// A block is opened by an anchor row (a date-typed cell in the anchor
// column) and stays active until the next anchor row redefines it.
type DateBlock = BTreeMap<usize, NaiveDate>;

// Column holding the person's name in a data row.
const NAME_COLUMN: usize = 1;
// Column whose date-typed content marks an anchor row. It is also the first
// column that can carry per-date leave codes.
const ANCHOR_COLUMN: usize = 2;

/// Strips all whitespace and digit characters from a leave code, so that
/// variants like "AL1" and "AL 2" group under the same category.
pub fn normalized_kind(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && !c.is_numeric())
        .collect()
}

fn matches_target(cell: &CellValue, target_folded: &str) -> bool {
    cell.text().trim().to_lowercase() == target_folded
}

// A cell counts as a leave code when it is present and its trimmed text is
// neither empty nor one of the reserved placeholder spellings.
fn leave_code(cell: &CellValue) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    let code = cell.text().trim().to_string();
    if code.is_empty() || PLACEHOLDER_CODES.contains(&code.as_str()) {
        return None;
    }
    Some(code)
}

/// Extracts the booked leave entries of one person from a roster grid.
///
/// The roster interleaves anchor rows (whose anchor column holds a date,
/// establishing which columns map to which dates) with data rows (one per
/// person). The scan is a single forward pass carrying the active
/// date-column block; rows before the first anchor produce no entries.
///
/// The function never fails: short or malformed rows are skipped, and an
/// unmatched `target_name` simply yields an empty result. Entries come out
/// in insertion order (row, then column); callers that want a
/// chronological view sort by date themselves.
pub fn extract_leave(grid: &[Vec<CellValue>], target_name: &str) -> Vec<LeaveEntry> {
    let target_folded = target_name.trim().to_lowercase();
    let mut active_block = DateBlock::new();
    let mut entries: Vec<LeaveEntry> = Vec::new();

    for (rowno, row) in grid.iter().enumerate() {
        // Too short to hold a name and an anchor. Not even block-reset
        // logic applies.
        if row.len() <= ANCHOR_COLUMN {
            continue;
        }

        if let CellValue::Date(_) = row[ANCHOR_COLUMN] {
            // A fresh anchor row always replaces the previous block, even
            // if no matching data row follows it.
            active_block.clear();
            for (col_idx, cell) in row.iter().enumerate().skip(ANCHOR_COLUMN) {
                if let CellValue::Date(d) = cell {
                    active_block.insert(col_idx, *d);
                }
            }
            debug!(
                "extract_leave: row {}: new block with {} date columns",
                rowno,
                active_block.len()
            );
            // An anchor row never also contributes leave entries.
            continue;
        }

        if active_block.is_empty() || !matches_target(&row[NAME_COLUMN], &target_folded) {
            continue;
        }

        for (&col_idx, &date) in active_block.iter() {
            // The origin grids legitimately have ragged row lengths; a
            // block column beyond this row's bounds is skipped.
            let Some(cell) = row.get(col_idx) else {
                continue;
            };
            if let Some(code) = leave_code(cell) {
                debug!("extract_leave: row {} col {}: {} {}", rowno, col_idx, date, code);
                entries.push(LeaveEntry {
                    date,
                    kind: normalized_kind(&code),
                    original: code,
                });
            }
        }
    }
    entries
}

/// Expands events into per-day buckets of summary texts.
///
/// A missing end defaults to start + 1 day, and a zero-length event is
/// forced to span exactly one day. Every whole day in `[start, end)` gets
/// the event's summary appended, unless an identical text is already
/// present in that day's bucket (de-duplication is by exact string
/// equality, not by event identity).
pub fn expand_events(events: &[RawEvent]) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for event in events {
        let start = event.start;
        let mut end = event.end.unwrap_or(start + Duration::days(1));
        if end == start {
            end = start + Duration::days(1);
        }
        let mut day = start;
        while day < end {
            let bucket = buckets.entry(day).or_default();
            if !bucket.iter().any(|s| *s == event.summary) {
                bucket.push(event.summary.clone());
            }
            day += Duration::days(1);
        }
    }
    buckets
}

/// Produces the display text for one day's bucket of summaries.
///
/// If any summary case-insensitively contains the reserved marker, only
/// the matching summaries are shown; otherwise all of them are. Kept as a
/// pure two-pass reduction so the policy is testable on its own.
pub fn summarize_day(summaries: &[String]) -> String {
    let marked: Vec<&str> = summaries
        .iter()
        .filter(|s| s.to_lowercase().contains(AL_REF_MARKER))
        .map(|s| s.as_str())
        .collect();
    let chosen: Vec<&str> = if marked.is_empty() {
        summaries.iter().map(|s| s.as_str()).collect()
    } else {
        marked
    };
    chosen.join(SUMMARY_SEPARATOR)
}

/// Builds the date-keyed display map out of raw event occurrences.
pub fn build_day_summaries(events: &[RawEvent]) -> DaySummaries {
    expand_events(events)
        .into_iter()
        .map(|(day, bucket)| (day, summarize_day(&bucket)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn normalized_kind_strips_digits_and_whitespace() {
        assert_eq!(normalized_kind("AL1"), "AL");
        assert_eq!(normalized_kind("Sick 2"), "Sick");
        assert_eq!(normalized_kind(" AL "), "AL");
        assert_eq!(normalized_kind("0.5"), ".");
    }

    #[test]
    fn extract_basic_block() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
                CellValue::Date(date(2024, 1, 2)),
            ],
            vec![text(""), text("Smith, John"), text("AL1"), text("0")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        assert_eq!(
            entries,
            vec![LeaveEntry {
                date: date(2024, 1, 1),
                original: "AL1".to_string(),
                kind: "AL".to_string(),
            }]
        );
    }

    #[test]
    fn name_match_is_case_and_whitespace_insensitive() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 3, 4)),
            ],
            vec![text(""), text(" smith, john "), text("AL")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date(2024, 3, 4));
    }

    #[test]
    fn rows_before_first_anchor_produce_nothing() {
        let grid = vec![
            vec![text(""), text("Smith, John"), text("AL")],
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
            ],
        ];
        assert!(extract_leave(&grid, "Smith, John").is_empty());
    }

    #[test]
    fn anchor_row_resets_previous_block() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
                CellValue::Date(date(2024, 1, 2)),
            ],
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 2, 1)),
            ],
            vec![text(""), text("Smith, John"), text("AL"), text("SL")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        // Only the second block is active: one date column, so the "SL"
        // in the stale column 3 is ignored.
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date(2024, 2, 1));
        assert_eq!(entries[0].original, "AL");
    }

    #[test]
    fn placeholders_never_produce_entries() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
                CellValue::Date(date(2024, 1, 2)),
                CellValue::Date(date(2024, 1, 3)),
                CellValue::Date(date(2024, 1, 4)),
                CellValue::Date(date(2024, 1, 5)),
            ],
            vec![
                text(""),
                text("Smith, John"),
                text("0"),
                text("nan"),
                text("None"),
                CellValue::Number(0.0),
                CellValue::Empty,
            ],
        ];
        assert!(extract_leave(&grid, "Smith, John").is_empty());
    }

    #[test]
    fn ragged_data_row_is_bounds_checked() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
                CellValue::Date(date(2024, 1, 2)),
            ],
            // Shorter than the block: only column 2 is readable.
            vec![text(""), text("Smith, John"), text("AL")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date(2024, 1, 1));
    }

    #[test]
    fn short_rows_are_skipped_entirely() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
            ],
            // Two cells only: skipped, does not clear the block.
            vec![CellValue::Empty, CellValue::Date(date(2024, 6, 1))],
            vec![text(""), text("Smith, John"), text("AL")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, date(2024, 1, 1));
    }

    #[test]
    fn multiple_matching_rows_accumulate_in_insertion_order() {
        let grid = vec![
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 8)),
            ],
            vec![text(""), text("Smith, John"), text("AL 2")],
            vec![
                CellValue::Empty,
                CellValue::Empty,
                CellValue::Date(date(2024, 1, 1)),
            ],
            vec![text(""), text("Smith, John"), text("AL1")],
        ];
        let entries = extract_leave(&grid, "Smith, John");
        assert_eq!(entries.len(), 2);
        // No sorting here: the merge step orders by date.
        assert_eq!(entries[0].date, date(2024, 1, 8));
        assert_eq!(entries[0].kind, "AL");
        assert_eq!(entries[1].date, date(2024, 1, 1));
        assert_eq!(entries[1].kind, "AL");
    }

    fn event(summary: &str, start: NaiveDate, end: Option<NaiveDate>) -> RawEvent {
        RawEvent {
            summary: summary.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn multi_day_event_covers_half_open_range() {
        let events = vec![event(
            "Conference",
            date(2024, 1, 10),
            Some(date(2024, 1, 13)),
        )];
        let buckets = expand_events(&events);
        let days: Vec<NaiveDate> = buckets.keys().cloned().collect();
        assert_eq!(
            days,
            vec![date(2024, 1, 10), date(2024, 1, 11), date(2024, 1, 12)]
        );
    }

    #[test]
    fn zero_length_event_spans_one_day() {
        let events = vec![event("Checkin", date(2024, 2, 5), Some(date(2024, 2, 5)))];
        let buckets = expand_events(&events);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[&date(2024, 2, 5)], vec!["Checkin".to_string()]);
    }

    #[test]
    fn missing_end_defaults_to_one_day() {
        let events = vec![event("Standup", date(2024, 2, 6), None)];
        let buckets = expand_events(&events);
        assert_eq!(buckets.len(), 1);
        assert!(buckets.contains_key(&date(2024, 2, 6)));
    }

    #[test]
    fn identical_summaries_on_one_day_collapse() {
        let events = vec![
            event("Standup", date(2024, 2, 6), None),
            event("Standup", date(2024, 2, 6), None),
            event("Review", date(2024, 2, 6), None),
        ];
        let buckets = expand_events(&events);
        assert_eq!(
            buckets[&date(2024, 2, 6)],
            vec!["Standup".to_string(), "Review".to_string()]
        );
    }

    #[test]
    fn marker_filter_keeps_only_matching_summaries() {
        let summaries = vec![
            "Dentist".to_string(),
            "AL REF: approved".to_string(),
            "Team lunch".to_string(),
            "al ref followup".to_string(),
        ];
        assert_eq!(
            summarize_day(&summaries),
            "AL REF: approved; al ref followup"
        );
    }

    #[test]
    fn marker_filter_without_marker_keeps_everything() {
        let summaries = vec!["Dentist".to_string(), "Team lunch".to_string()];
        assert_eq!(summarize_day(&summaries), "Dentist; Team lunch");
    }

    #[test]
    fn day_summaries_end_to_end() {
        let events = vec![
            event("Dentist", date(2024, 1, 10), None),
            event("AL ref 1234", date(2024, 1, 10), Some(date(2024, 1, 12))),
            event("Gym", date(2024, 1, 11), None),
        ];
        let map = build_day_summaries(&events);
        assert_eq!(map[&date(2024, 1, 10)], "AL ref 1234");
        assert_eq!(map[&date(2024, 1, 11)], "AL ref 1234");
        assert!(!map.contains_key(&date(2024, 1, 12)));
    }
}
