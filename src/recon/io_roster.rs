// Loads the roster workbook into the generic cell grid that the
// extraction algorithm works on.

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use leave_reconcile::CellValue;

use crate::recon::{EmptyRosterSnafu, OpeningRosterSnafu, PlanResult};

pub fn read_roster_grid(
    path: &str,
    worksheet_name: Option<&str>,
) -> PlanResult<Vec<Vec<CellValue>>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningRosterSnafu { path })?;

    // A worksheet name was provided, use it. Otherwise fall back to the
    // first worksheet of the workbook.
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(OpeningRosterSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyRosterSnafu { path })?
            .context(OpeningRosterSnafu { path })?,
    };
    debug!(
        "read_roster_grid: {:?}: {} rows, {} columns",
        path,
        wrange.height(),
        wrange.width()
    );

    let grid: Vec<Vec<CellValue>> = wrange
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    Ok(grid)
}

// The core only distinguishes date-typed cells from displayable content;
// everything a spreadsheet reader can surface folds into that shape.
fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => CellValue::Date(dt.date()),
            None => CellValue::Empty,
        },
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        _ => CellValue::Empty,
    }
}
