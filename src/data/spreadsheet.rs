use calamine::{Data, Reader as _, open_workbook_auto};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;

use super::unreadable;
use crate::error::{RegressionError, Result};

/// Reads the first worksheet; its first row holds the column names.
pub fn read_first_sheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(path, e))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(RegressionError::EmptyDataset)?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| unreadable(path, e))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(RegressionError::EmptyDataset)?;
    let body: Vec<&[Data]> = rows.collect();
    tracing::debug!("Reading sheet '{sheet}' ({} data rows)", body.len());

    frame_from_cells(header, &body)
}

/// A column is numeric when every non-empty cell holds a number or a boolean.
pub(crate) fn frame_from_cells(header: &[Data], body: &[&[Data]]) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.len());

    for (idx, cell) in header.iter().enumerate() {
        let name = cell.to_string().trim().to_owned();
        if name.is_empty() {
            return Err(RegressionError::UnsupportedFormat(format!(
                "header cell {} is blank",
                idx + 1
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(RegressionError::UnsupportedFormat(format!(
                "duplicate column name '{name}'"
            )));
        }

        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(idx).unwrap_or(&Data::Empty))
            .collect();

        let numeric = cells.iter().all(|c| {
            matches!(
                c,
                Data::Int(_) | Data::Float(_) | Data::Bool(_) | Data::Empty | Data::Error(_)
            )
        });

        let series = if numeric {
            let values: Vec<Option<f64>> = cells.iter().map(|c| cell_as_f64(c)).collect();
            Series::new(name.as_str().into(), values)
        } else {
            let values: Vec<Option<String>> = cells.iter().map(|c| cell_as_text(c)).collect();
            Series::new(name.as_str().into(), values)
        };
        columns.push(Column::from(series));
    }

    Ok(DataFrame::new(columns)?)
}

fn cell_as_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        Data::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn cell_as_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_owned())
    }

    #[test]
    fn test_numeric_and_text_columns() -> anyhow::Result<()> {
        let header = vec![text("x"), text("city")];
        let r1 = vec![Data::Int(1), text("Lyon")];
        let r2 = vec![Data::Float(2.5), Data::Empty];
        let r3 = vec![Data::Empty, Data::Int(7)];
        let body: Vec<&[Data]> = vec![r1.as_slice(), r2.as_slice(), r3.as_slice()];

        let df = frame_from_cells(&header, &body)?;
        assert_eq!(df.height(), 3);
        assert!(df.column("x")?.dtype().is_primitive_numeric());
        assert_eq!(df.column("x")?.null_count(), 1);
        // A number inside a text column turns the column into text
        assert_eq!(df.column("city")?.dtype(), &DataType::String);
        assert_eq!(df.column("city")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_blank_header_is_unsupported() {
        let header = vec![text("x"), Data::Empty];
        let row = vec![Data::Int(1), Data::Int(2)];
        let body: Vec<&[Data]> = vec![row.as_slice()];
        assert!(matches!(
            frame_from_cells(&header, &body),
            Err(RegressionError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_duplicate_header_is_unsupported() {
        let header = vec![text("x"), text("x")];
        let row = vec![Data::Int(1), Data::Int(2)];
        let body: Vec<&[Data]> = vec![row.as_slice()];
        assert!(matches!(
            frame_from_cells(&header, &body),
            Err(RegressionError::UnsupportedFormat(_))
        ));
    }
}
