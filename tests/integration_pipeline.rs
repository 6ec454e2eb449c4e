//! Integration tests for the full dataset-to-model workflow
//!
//! These tests drive the pipeline over the fixture files in `testdata/` and
//! check the fitted models, the saved files and the rejected transitions.

use anyhow::Result;
use regression_maker::config::{AppConfig, LoaderSettings};
use regression_maker::data::{self, ColumnKind, DataFormat};
use regression_maker::error::{RegressionError, SelectionRule};
use regression_maker::model::{self, Arity};
use regression_maker::pipeline::{Action, Pipeline, PipelineState};
use regression_maker::preprocess::{FillValue, PreprocessingChoice};
use std::collections::HashMap;
use std::path::Path;
use tempfile::tempdir;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// Fixtures hold exact data: price = 20 + 1.5 * size + 10 * rooms
fn assert_house_model(model: &model::FittedModel) {
    assert!((model.intercept() - 20.0).abs() < 1e-6, "{}", model.formula());
    assert!((model.coefficient("size").unwrap_or(f64::NAN) - 1.5).abs() < 1e-6);
    assert!((model.coefficient("rooms").unwrap_or(f64::NAN) - 10.0).abs() < 1e-6);
    assert!(model.metrics().r2.is_some_and(|r2| r2 > 0.999_999));
}

#[test]
fn test_houses_csv_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let model_path = dir.path().join("houses.json");

    let mut pipeline = Pipeline::new(AppConfig::default());
    let dataset = pipeline.load_dataset(Path::new("testdata/houses.csv"), None)?;
    assert_eq!(dataset.height(), 8);
    assert_eq!(dataset.column_kind("city"), Some(ColumnKind::Categorical));
    assert_eq!(dataset.column_kind("rooms"), Some(ColumnKind::Numeric));

    pipeline.preprocess(&PreprocessingChoice::DropRows)?;
    pipeline.configure(Arity::Multiple, &names(&["size", "rooms"]), "price")?;
    let trained = pipeline.train()?;
    assert_house_model(&trained);

    pipeline.save_model(&model_path, Some("House prices"))?;
    let stored = model::load_model(&model_path)?;
    assert_eq!(stored.model.coefficients(), trained.coefficients());
    assert_eq!(stored.model.intercept(), trained.intercept());
    assert_eq!(stored.model.spec(), trained.spec());
    assert_eq!(stored.description, "House prices");

    let mut fresh = Pipeline::default();
    fresh.load_model(&model_path)?;
    let inputs = HashMap::from([("size".to_owned(), 90.0), ("rooms".to_owned(), 3.0)]);
    assert!((fresh.predict(&inputs)? - 185.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_spreadsheet_and_sqlite_match_csv() -> Result<()> {
    let settings = LoaderSettings::default();
    let csv = data::load_path(Path::new("testdata/houses.csv"), &settings)?;

    for file in ["testdata/houses.xlsx", "testdata/houses.sqlite"] {
        let path = Path::new(file);
        let dataset = data::load_path(path, &settings)?;
        assert_eq!(dataset.schema(), csv.schema(), "{file}");
        assert_eq!(dataset.height(), csv.height(), "{file}");
        assert_eq!(
            dataset.numeric_values("price")?,
            csv.numeric_values("price")?,
            "{file}"
        );

        let mut pipeline = Pipeline::default();
        pipeline.load_dataset(path, None)?;
        pipeline.preprocess(&PreprocessingChoice::FillMean)?;
        pipeline.configure(Arity::Multiple, &names(&["size", "rooms"]), "price")?;
        assert_house_model(&pipeline.train()?);
    }
    Ok(())
}

#[test]
fn test_missing_values_strategies() -> Result<()> {
    let path = Path::new("testdata/missing_values.csv");
    let mut pipeline = Pipeline::default();
    pipeline.load_dataset(path, None)?;

    let report = pipeline.missing_report().unwrap_or_default();
    assert_eq!(report.total(), 4);
    assert_eq!(report.missing_in("size"), Some(1));
    assert_eq!(report.missing_in("city"), Some(1));

    // Dropping incomplete rows keeps the exact relationship
    let left = pipeline.preprocess(&PreprocessingChoice::DropRows)?;
    assert_eq!(left.rows, 4);
    assert!(left.is_complete());
    pipeline.configure(Arity::Multiple, &names(&["size", "rooms"]), "price")?;
    assert_house_model(&pipeline.train()?);

    // Mean fills numeric columns only
    pipeline.load_dataset(path, None)?;
    let left = pipeline.preprocess(&PreprocessingChoice::FillMean)?;
    assert_eq!(left.rows, 8);
    assert_eq!(left.total(), 1);
    assert_eq!(left.missing_in("city"), Some(1));

    // A number cannot fill the categorical gap
    pipeline.load_dataset(path, None)?;
    let err = pipeline
        .preprocess(&PreprocessingChoice::FillConstant(FillValue::Number(0.0)))
        .unwrap_err();
    assert_eq!(err.action, Action::Preprocess);
    assert!(matches!(
        err.source,
        RegressionError::IncompatibleFillValue { ref column, .. } if column == "city"
    ));
    assert_eq!(pipeline.state(), PipelineState::DatasetLoaded);
    Ok(())
}

#[test]
fn test_collinear_features_are_rejected() -> Result<()> {
    let mut pipeline = Pipeline::default();
    pipeline.load_dataset(Path::new("testdata/collinear.csv"), Some(DataFormat::Csv))?;
    pipeline.preprocess(&PreprocessingChoice::DropRows)?;
    pipeline.configure(Arity::Multiple, &names(&["a", "b"]), "y")?;

    let err = pipeline.train().unwrap_err();
    assert!(matches!(
        err.source,
        RegressionError::RankDeficientFeatures { ref dependent } if dependent == "b"
    ));
    assert_eq!(pipeline.state(), PipelineState::Configured);
    Ok(())
}

#[test]
fn test_selection_rules() -> Result<()> {
    let mut pipeline = Pipeline::default();
    pipeline.load_dataset(Path::new("testdata/houses.csv"), None)?;
    pipeline.preprocess(&PreprocessingChoice::DropRows)?;

    let cases = [
        (Arity::Simple, names(&["size", "rooms"]), "price"),
        (Arity::Multiple, names(&["size", "price"]), "price"),
        (Arity::Simple, names(&["floor"]), "price"),
        (Arity::Simple, names(&["city"]), "price"),
    ];
    for (arity, features, target) in cases {
        let err = pipeline.configure(arity, &features, target).unwrap_err();
        assert!(
            matches!(err.source, RegressionError::InvalidColumnSelection(_)),
            "{features:?}: {err}"
        );
    }

    let err = pipeline
        .configure(Arity::Simple, &names(&["size"]), "city")
        .unwrap_err();
    assert!(matches!(
        err.source,
        RegressionError::InvalidColumnSelection(SelectionRule::NonNumericColumn(ref c)) if c == "city"
    ));
    assert_eq!(pipeline.state(), PipelineState::Preprocessed);
    Ok(())
}

#[test]
fn test_unreadable_inputs() {
    let settings = LoaderSettings::default();

    assert!(matches!(
        data::load_path(Path::new("testdata/does_not_exist.csv"), &settings),
        Err(RegressionError::FileUnreadable { .. })
    ));
    assert!(matches!(
        data::load_path(Path::new("testdata/header_only.csv"), &settings),
        Err(RegressionError::EmptyDataset)
    ));
    assert!(matches!(
        DataFormat::from_path(Path::new("testdata/houses.parquet")),
        Err(RegressionError::UnsupportedFormat(_))
    ));
}
