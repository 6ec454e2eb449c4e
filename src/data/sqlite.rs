//! Single-table SQLite files.
//!
//! The reader is async (sqlx); [`read_single_table`] drives it to completion on
//! a private current-thread runtime so callers stay synchronous.

use polars::prelude::*;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow, SqliteValueRef};
use sqlx::{Connection as _, Decode, Row as _, Sqlite, TypeInfo as _, ValueRef as _};
use std::path::Path;

use super::unreadable;
use crate::error::{RegressionError, Result};

/// Reads `table`, or the only user table when `table` is `None`.
///
/// Must not be called from inside an async runtime.
pub fn read_single_table(path: &Path, table: Option<&str>) -> Result<DataFrame> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(read_table(path, table))
}

pub async fn read_table(path: &Path, table: Option<&str>) -> Result<DataFrame> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);
    let mut conn = SqliteConnection::connect_with(&options)
        .await
        .map_err(|e| unreadable(path, e))?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&mut conn)
    .await
    .map_err(|e| unreadable(path, e))?;

    let table = pick_table(&tables, table)?;

    let declared: Vec<(String, String)> =
        sqlx::query_as("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
            .bind(&table)
            .fetch_all(&mut conn)
            .await
            .map_err(|e| unreadable(path, e))?;

    if declared.is_empty() {
        return Err(RegressionError::EmptyDataset);
    }

    let rows = sqlx::query(&format!("SELECT * FROM {}", quote_ident(&table)))
        .fetch_all(&mut conn)
        .await
        .map_err(|e| unreadable(path, e))?;

    let mut columns = Vec::with_capacity(declared.len());
    for (idx, (name, decl_type)) in declared.iter().enumerate() {
        let series = if is_numeric_affinity(decl_type) {
            let values = rows
                .iter()
                .map(|row| numeric_cell(row, idx))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| unreadable(path, e))?;
            Series::new(name.as_str().into(), values)
        } else {
            let values = rows
                .iter()
                .map(|row| text_cell(row, idx))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| unreadable(path, e))?;
            Series::new(name.as_str().into(), values)
        };
        columns.push(Column::from(series));
    }

    conn.close().await.map_err(|e| unreadable(path, e))?;
    tracing::debug!("Read table '{table}' ({} rows)", rows.len());

    Ok(DataFrame::new(columns)?)
}

/// Storage class of a stored value: SQLite keeps values it cannot coerce to
/// the column affinity as TEXT, even in numeric columns.
fn storage_class(value: &SqliteValueRef<'_>) -> String {
    value.type_info().name().to_owned()
}

/// A cell of a numeric column. NULL, text that does not parse as a finite
/// number, and blobs are all missing.
fn numeric_cell(row: &SqliteRow, idx: usize) -> std::result::Result<Option<f64>, BoxDynError> {
    let value = row.try_get_raw(idx)?;
    if value.is_null() {
        return Ok(None);
    }
    match storage_class(&value).as_str() {
        "INTEGER" | "REAL" | "NUMERIC" | "BOOLEAN" => {
            Ok(Some(<f64 as Decode<'_, Sqlite>>::decode(value)?))
        }
        "TEXT" => {
            let text = <String as Decode<'_, Sqlite>>::decode(value)?;
            Ok(text.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        }
        _ => Ok(None),
    }
}

/// A cell of a text column. NULL and blank text are missing.
fn text_cell(row: &SqliteRow, idx: usize) -> std::result::Result<Option<String>, BoxDynError> {
    let value = row.try_get_raw(idx)?;
    if value.is_null() {
        return Ok(None);
    }
    let text = <String as Decode<'_, Sqlite>>::decode(value)?;
    Ok((!text.trim().is_empty()).then_some(text))
}

fn pick_table(tables: &[String], configured: Option<&str>) -> Result<String> {
    if let Some(wanted) = configured {
        return tables
            .iter()
            .find(|t| t.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                RegressionError::UnsupportedFormat(format!("table '{wanted}' not found"))
            });
    }

    match tables {
        [] => Err(RegressionError::UnsupportedFormat(
            "the database contains no tables".to_owned(),
        )),
        [only] => Ok(only.clone()),
        many => Err(RegressionError::UnsupportedFormat(format!(
            "expected a single table, found {} ({}); set loader.sqlite_table",
            many.len(),
            many.join(", ")
        ))),
    }
}

/// SQLite type affinity rules, restricted to the numeric affinities.
fn is_numeric_affinity(decl_type: &str) -> bool {
    let t = decl_type.to_uppercase();
    if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") || t.contains("BLOB") {
        return false;
    }
    t.contains("INT")
        || t.contains("REAL")
        || t.contains("FLOA")
        || t.contains("DOUB")
        || t.contains("NUMERIC")
        || t.contains("DECIMAL")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
