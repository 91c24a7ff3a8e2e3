// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::NaiveDate;

/// A single cell of the roster grid.
///
/// The grid is produced by an external loader (spreadsheet reader, test
/// fixture, ...). The only distinction the algorithms rely on is whether a
/// cell is date-typed; everything else is carried as displayable content.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    /// A date-typed cell. In the roster layout these mark anchor rows and
    /// date columns.
    Date(NaiveDate),
    /// Free text, such as a person's name or a leave code.
    Text(String),
    /// A numeric cell. Spreadsheet readers commonly surface leave codes
    /// like `0` as numbers rather than text.
    Number(f64),
    /// A missing cell.
    Empty,
}

impl CellValue {
    /// The textual content of the cell, as a spreadsheet user would read it.
    pub fn text(&self) -> String {
        match self {
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(x) => format!("{}", x),
            CellValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

/// A calendar event at date granularity, before day expansion.
///
/// A recurring event contributes one `RawEvent` per materialized instance.
/// `end` is exclusive; a missing end means the event covers a single day.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawEvent {
    pub summary: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

// ******** Output data structures *********

/// One booked leave day for the target person.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LeaveEntry {
    pub date: NaiveDate,
    /// The leave code exactly as written in the roster, trimmed.
    pub original: String,
    /// The leave code with whitespace and digits stripped, used to group
    /// variants ("AL1", "AL 2") under one category.
    pub kind: String,
}

impl Display for LeaveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.date, self.original, self.kind)
    }
}

/// Mapping from date to the display text summarizing that day's events.
pub type DaySummaries = BTreeMap<NaiveDate, String>;

// ********* Reserved tokens **********

/// Cell contents that never count as a booked leave code. Spreadsheet
/// readers surface blanks and zeroes in several spellings.
pub const PLACEHOLDER_CODES: [&str; 4] = ["0", "nan", "None", "0.0"];

/// Case-insensitive marker that makes a summary win the day filter: if any
/// summary on a day contains it, only the matching summaries are displayed.
pub const AL_REF_MARKER: &str = "al ref";

/// Separator between summaries in a day's display text.
pub const SUMMARY_SEPARATOR: &str = "; ";
