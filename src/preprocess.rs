//! Missing-value detection and remediation.
//!
//! [`missing_report`] tells the user where the gaps are; [`apply`] produces a
//! new [`Dataset`] with one [`PreprocessingChoice`] applied. Fills are built as
//! Polars expressions and evaluated in a single lazy pass.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{ColumnKind, Dataset};
use crate::error::{RegressionError, Result, ResultExt as _};

/// Constant used by [`PreprocessingChoice::FillConstant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FillValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// How missing values are remediated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingChoice {
    /// Remove every row holding at least one missing cell
    DropRows,
    /// Replace gaps in numeric columns with the column mean
    FillMean,
    /// Replace gaps in numeric columns with the column median
    FillMedian,
    /// Replace every gap with a constant
    FillConstant(FillValue),
}

impl fmt::Display for PreprocessingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropRows => write!(f, "drop rows with missing values"),
            Self::FillMean => write!(f, "fill with column mean"),
            Self::FillMedian => write!(f, "fill with column median"),
            Self::FillConstant(v) => write!(f, "fill with constant {v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMissing {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
}

/// Per-column missing counts, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingReport {
    pub columns: Vec<ColumnMissing>,
    pub rows: usize,
}

impl MissingReport {
    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.missing).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.total() == 0
    }

    pub fn columns_with_missing(&self) -> impl Iterator<Item = &ColumnMissing> {
        self.columns.iter().filter(|c| c.missing > 0)
    }

    pub fn missing_in(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.missing)
    }
}

impl fmt::Display for MissingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            return write!(f, "No missing values in {} rows.", self.rows);
        }
        writeln!(
            f,
            "{} missing values detected in {} rows:",
            self.total(),
            self.rows
        )?;
        for column in self.columns_with_missing() {
            writeln!(f, "  {:<24} {:>8}", column.name, column.missing)?;
        }
        Ok(())
    }
}

pub fn missing_report(dataset: &Dataset) -> MissingReport {
    let frame = dataset.frame();
    let columns = dataset
        .schema()
        .iter()
        .map(|c| ColumnMissing {
            name: c.name.clone(),
            kind: c.kind,
            missing: frame.column(&c.name).map(Column::null_count).unwrap_or(0),
        })
        .collect();

    MissingReport {
        columns,
        rows: dataset.height(),
    }
}

/// Applies `choice`, returning a new dataset with the same schema.
///
/// # Errors
///
/// `IncompatibleFillValue` when a constant does not fit a column that needs
/// filling, `EmptyDataset` when dropping rows would leave nothing.
pub fn apply(dataset: &Dataset, choice: &PreprocessingChoice) -> Result<Dataset> {
    let report = missing_report(dataset);

    let result = match choice {
        PreprocessingChoice::DropRows => drop_incomplete_rows(dataset)?,
        PreprocessingChoice::FillMean => fill_numeric(dataset, &report, Expr::mean)?,
        PreprocessingChoice::FillMedian => fill_numeric(dataset, &report, Expr::median)?,
        PreprocessingChoice::FillConstant(value) => fill_constant(dataset, &report, value)?,
    };

    tracing::info!(
        "Preprocessed with '{choice}': {} -> {} rows, {} -> {} missing values",
        report.rows,
        result.height(),
        report.total(),
        missing_report(&result).total()
    );
    Ok(result)
}

fn drop_incomplete_rows(dataset: &Dataset) -> Result<Dataset> {
    let frame = dataset.frame();
    let mut mask = BooleanChunked::full("complete".into(), true, frame.height());
    for column in frame.get_columns() {
        if column.null_count() > 0 {
            mask = &mask & &column.is_not_null();
        }
    }

    let filtered = frame.filter(&mask).context("Failed to drop rows")?;
    if filtered.height() == 0 {
        return Err(RegressionError::EmptyDataset);
    }
    Ok(dataset.with_frame(filtered))
}

/// Fills numeric columns with a statistic of their observed values.
///
/// A column without any observed value has no statistic and is left as is.
fn fill_numeric(
    dataset: &Dataset,
    report: &MissingReport,
    statistic: fn(Expr) -> Expr,
) -> Result<Dataset> {
    let mut exprs = Vec::new();
    for column in report.columns_with_missing() {
        if column.kind != ColumnKind::Numeric {
            continue;
        }
        if column.missing == report.rows {
            tracing::warn!(
                "Column '{}' has no observed values; leaving it unfilled",
                column.name
            );
            continue;
        }
        let expr = col(column.name.as_str());
        exprs.push(expr.clone().fill_null(statistic(expr)));
    }

    with_filled_columns(dataset, exprs)
}

fn fill_constant(dataset: &Dataset, report: &MissingReport, value: &FillValue) -> Result<Dataset> {
    let mut exprs = Vec::new();
    for column in report.columns_with_missing() {
        let fill = constant_for(column, value)?;
        exprs.push(col(column.name.as_str()).fill_null(fill));
    }

    with_filled_columns(dataset, exprs)
}

fn constant_for(column: &ColumnMissing, value: &FillValue) -> Result<Expr> {
    let incompatible = |reason: String| RegressionError::IncompatibleFillValue {
        column: column.name.clone(),
        reason,
    };

    match (column.kind, value) {
        (_, FillValue::Number(v)) if !v.is_finite() => {
            Err(incompatible(format!("{v} is not a usable value")))
        }
        (ColumnKind::Numeric, FillValue::Number(v)) => Ok(lit(*v)),
        (ColumnKind::Numeric, FillValue::Text(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(lit(v)),
            _ => Err(incompatible(format!("\"{s}\" is not a number"))),
        },
        (ColumnKind::Categorical, FillValue::Text(s)) => Ok(lit(s.clone())),
        (ColumnKind::Categorical, FillValue::Number(v)) => Err(incompatible(format!(
            "the column holds text, the fill value {v} is a number"
        ))),
    }
}

fn with_filled_columns(dataset: &Dataset, exprs: Vec<Expr>) -> Result<Dataset> {
    if exprs.is_empty() {
        return Ok(dataset.clone());
    }
    let filled = dataset
        .frame()
        .clone()
        .lazy()
        .with_columns(exprs)
        .collect()
        .context("Failed to fill missing values")?;
    Ok(dataset.with_frame(filled))
}
