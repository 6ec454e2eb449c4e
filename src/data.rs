//! Tabular datasets and the loaders that produce them.
//!
//! A [`Dataset`] wraps a Polars `DataFrame` together with an explicit schema
//! that is decided once, at load time. Every column is either
//! [`ColumnKind::Numeric`] (stored as `Float64`) or [`ColumnKind::Categorical`]
//! (stored as `String`); later stages only ever consult that schema.
//!
//! ```no_run
//! use regression_maker::config::LoaderSettings;
//! use regression_maker::data::{self, DataFormat};
//! use std::path::Path;
//!
//! # fn example() -> regression_maker::error::Result<()> {
//! let path = Path::new("houses.csv");
//! let dataset = data::load(path, DataFormat::from_path(path)?, &LoaderSettings::default())?;
//! println!("{} rows, columns: {:?}", dataset.height(), dataset.column_names());
//! # Ok(())
//! # }
//! ```

pub mod csv;
pub mod spreadsheet;
pub mod sqlite;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::LoaderSettings;
use crate::error::{RegressionError, Result};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// Source file formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Delimited text with a header row
    Csv,
    /// Spreadsheet workbook, first worksheet
    Spreadsheet,
    /// SQLite database holding a single table
    Sqlite,
}

impl DataFormat {
    /// Infers the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            "sqlite" | "sqlite3" | "db" => Ok(Self::Sqlite),
            "" => Err(RegressionError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                path.display()
            ))),
            _ => Err(RegressionError::UnsupportedFormat(format!(
                "unsupported file extension: .{ext}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Spreadsheet => "spreadsheet",
            Self::Sqlite => "SQLite",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-memory table with a declared schema.
///
/// Cloning is cheap: Polars columns are reference counted.
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    schema: Vec<ColumnSchema>,
    source: PathBuf,
}

impl Dataset {
    /// Builds a dataset from a frame, fixing the schema.
    ///
    /// Numeric and boolean columns become `Float64` (NaN counts as missing),
    /// everything else becomes `String`.
    ///
    /// # Errors
    ///
    /// `EmptyDataset` for a frame without rows or columns, `UnsupportedFormat`
    /// for blank column names.
    pub fn from_frame(frame: DataFrame, source: impl Into<PathBuf>) -> Result<Self> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(RegressionError::EmptyDataset);
        }

        let mut columns = Vec::with_capacity(frame.width());
        let mut schema = Vec::with_capacity(frame.width());
        for column in frame.get_columns() {
            let name = column.name().to_string();
            if name.trim().is_empty() {
                return Err(RegressionError::UnsupportedFormat(
                    "column with a blank header".to_owned(),
                ));
            }

            let dtype = column.dtype();
            let (normalized, kind) = if dtype.is_primitive_numeric() || dtype.is_bool() {
                let series = column.as_materialized_series().cast(&DataType::Float64)?;
                (nan_as_null(&series)?, ColumnKind::Numeric)
            } else {
                (
                    column.as_materialized_series().cast(&DataType::String)?,
                    ColumnKind::Categorical,
                )
            };
            columns.push(Column::from(normalized));
            schema.push(ColumnSchema { name, kind });
        }

        Ok(Self {
            frame: DataFrame::new(columns)?,
            schema,
            source: source.into(),
        })
    }

    /// Same schema and source, new frame. Used by preprocessing.
    pub(crate) fn with_frame(&self, frame: DataFrame) -> Self {
        Self {
            frame,
            schema: self.schema.clone(),
            source: self.source.clone(),
        }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.schema.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn null_count(&self, name: &str) -> Result<usize> {
        Ok(self.frame.column(name)?.null_count())
    }

    /// Values of a numeric column, `None` where missing.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        if self.column_kind(name) != Some(ColumnKind::Numeric) {
            return Err(RegressionError::DataProcessing(format!(
                "column '{name}' is not a numeric column"
            )));
        }
        Ok(self
            .frame
            .column(name)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect())
    }
}

fn nan_as_null(series: &Series) -> Result<Series> {
    let cleaned: Float64Chunked = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(cleaned.with_name(series.name().clone()).into_series())
}

/// Reads `path` as `format` into a [`Dataset`].
///
/// # Errors
///
/// `FileUnreadable` when the file is missing or cannot be parsed,
/// `UnsupportedFormat` when its layout cannot be mapped to one table,
/// `EmptyDataset` when the table has no rows or no columns.
pub fn load(path: &Path, format: DataFormat, settings: &LoaderSettings) -> Result<Dataset> {
    if !path.is_file() {
        return Err(RegressionError::FileUnreadable {
            path: path.to_path_buf(),
            reason: "file does not exist".to_owned(),
        });
    }

    let frame = match format {
        DataFormat::Csv => csv::read_csv(path, settings)?,
        DataFormat::Spreadsheet => spreadsheet::read_first_sheet(path)?,
        DataFormat::Sqlite => sqlite::read_single_table(path, settings.sqlite_table.as_deref())?,
    };

    let dataset = Dataset::from_frame(frame, path)?;
    tracing::info!(
        "Loaded {} dataset {} ({} rows x {} columns)",
        format,
        path.display(),
        dataset.height(),
        dataset.width()
    );
    Ok(dataset)
}

/// Like [`load`], inferring the format from the extension.
pub fn load_path(path: &Path, settings: &LoaderSettings) -> Result<Dataset> {
    load(path, DataFormat::from_path(path)?, settings)
}

pub(crate) fn unreadable(path: &Path, reason: impl fmt::Display) -> RegressionError {
    RegressionError::FileUnreadable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
