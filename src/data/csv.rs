use polars::prelude::*;
use std::collections::HashSet;
use std::io::BufRead as _;
use std::path::Path;

use super::unreadable;
use crate::config::LoaderSettings;
use crate::error::{RegressionError, Result};

/// Reads delimited text with a header row.
pub fn read_csv(path: &Path, settings: &LoaderSettings) -> Result<DataFrame> {
    if !settings.csv_separator.is_ascii() {
        return Err(RegressionError::Config(format!(
            "CSV separator must be a single ASCII character, got '{}'",
            settings.csv_separator
        )));
    }
    let separator = settings.csv_separator as u8;

    if std::fs::metadata(path).is_ok_and(|m| m.len() == 0) {
        return Err(RegressionError::EmptyDataset);
    }

    check_header(path, separator)?;

    let result = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(settings.csv_infer_schema_length))
        .with_has_header(true)
        .with_separator(separator)
        .finish()
        .and_then(LazyFrame::collect);

    match result {
        Ok(df) => Ok(df),
        Err(PolarsError::NoData(_)) => Err(RegressionError::EmptyDataset),
        Err(e) => Err(unreadable(path, e)),
    }
}

/// Column names must be unique. The reader would otherwise rename repeats.
/// Blank names are left to the schema check.
fn check_header(path: &Path, separator: u8) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|e| unreadable(path, e))?;
    let mut line = String::new();
    std::io::BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| unreadable(path, e))?;

    let line = line.trim_end_matches(['\r', '\n']).trim_start_matches('\u{feff}');
    let mut seen = HashSet::new();
    for name in line.split(char::from(separator)) {
        let name = name.trim().trim_matches('"');
        if !name.is_empty() && !seen.insert(name) {
            return Err(RegressionError::UnsupportedFormat(format!(
                "duplicate column name '{name}' in {}",
                path.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_csv_with_header() -> anyhow::Result<()> {
        let file = write_csv("x,y,label\n1,2,a\n2,4,b\n3,6,\n");
        let df = read_csv(file.path(), &LoaderSettings::default())?;
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("label")?.null_count(), 1);
        Ok(())
    }

    #[test]
    fn test_read_csv_custom_separator() -> anyhow::Result<()> {
        let file = write_csv("x;y\n1;2\n2;4\n");
        let settings = LoaderSettings {
            csv_separator: ';',
            ..Default::default()
        };
        let df = read_csv(file.path(), &settings)?;
        assert_eq!(df.width(), 2);
        assert!(df.column("y").is_ok());
        Ok(())
    }

    #[test]
    fn test_empty_csv_is_empty_dataset() {
        let file = write_csv("");
        let result = read_csv(file.path(), &LoaderSettings::default());
        assert!(matches!(result, Err(RegressionError::EmptyDataset)));
    }

    #[test]
    fn test_non_ascii_separator_is_config_error() {
        let file = write_csv("x,y\n1,2\n");
        let settings = LoaderSettings {
            csv_separator: '§',
            ..Default::default()
        };
        assert!(matches!(
            read_csv(file.path(), &settings),
            Err(RegressionError::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_header_is_unsupported() {
        let file = write_csv("x,x,y\n1,2,3\n4,5,6\n");
        let err = read_csv(file.path(), &LoaderSettings::default()).unwrap_err();
        assert!(
            matches!(err, RegressionError::UnsupportedFormat(ref msg) if msg.contains("'x'")),
            "got {err:?}"
        );

        let file = write_csv("a;b;\"a\"\n1;2;3\n");
        let settings = LoaderSettings {
            csv_separator: ';',
            ..LoaderSettings::default()
        };
        assert!(matches!(
            read_csv(file.path(), &settings),
            Err(RegressionError::UnsupportedFormat(_))
        ));
    }
}
