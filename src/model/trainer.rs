use linfa::DatasetBase;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use std::time::Instant;

use super::types::{FitMetrics, FittedModel, ModelSpec};
use crate::config::TrainerSettings;
use crate::data::{ColumnKind, Dataset};
use crate::error::{RegressionError, Result, SelectionRule};

/// Fits ordinary least squares (with intercept) of `spec.target()` on
/// `spec.features()`. Metrics are computed on the training rows.
///
/// # Errors
///
/// `InvalidColumnSelection` when a selected column is absent, non-numeric or
/// still has missing values; `RankDeficientFeatures` when the features are
/// linearly dependent (constant columns and too few rows included).
pub fn train(dataset: &Dataset, spec: &ModelSpec, settings: &TrainerSettings) -> Result<FittedModel> {
    let start = Instant::now();

    // 1. Prepare features, column-major as read, then laid out row-major
    let columns = spec
        .features()
        .iter()
        .map(|name| observed_values(dataset, name))
        .collect::<Result<Vec<_>>>()?;
    let rows = dataset.height();
    let mut flat = Vec::with_capacity(rows * columns.len());
    for i in 0..rows {
        for column in &columns {
            flat.push(column.get(i).copied().unwrap_or(f64::NAN));
        }
    }
    let x = Array2::from_shape_vec((rows, columns.len()), flat)
        .map_err(|e| RegressionError::DataProcessing(format!("Failed to build feature matrix: {e}")))?;

    // 2. Prepare target
    let y = Array1::from(observed_values(dataset, spec.target())?);
    let target_varies = y.var(0.0) > 0.0;

    check_full_rank(&x, spec.features(), settings.rank_tolerance)?;

    // 3. Fit
    let data = DatasetBase::new(x, y);
    let model = LinearRegression::default()
        .fit(&data)
        .map_err(|e| RegressionError::DataProcessing(format!("Linear regression failed: {e}")))?;

    let prediction = model.predict(&data);
    let r2 = prediction.r2(&data)?;
    let mse = prediction.mean_squared_error(&data)?;

    let metrics = FitMetrics {
        r2: (target_varies && r2.is_finite()).then_some(r2),
        mse,
        rows,
    };
    let fitted = FittedModel::new(
        spec.clone(),
        model.params().to_vec(),
        model.intercept(),
        metrics,
    );

    tracing::info!(
        "Trained {} on {rows} rows in {:?}: R²={}, MSE={mse:.6}",
        fitted.formula(),
        start.elapsed(),
        metrics.r2.map_or_else(|| "undefined".to_owned(), |v| format!("{v:.6}"))
    );
    Ok(fitted)
}

/// Values of a selected column, which must be numeric and complete.
fn observed_values(dataset: &Dataset, name: &str) -> Result<Vec<f64>> {
    match dataset.column_kind(name) {
        None => {
            return Err(RegressionError::InvalidColumnSelection(
                SelectionRule::MissingColumn(name.to_owned()),
            ));
        }
        Some(ColumnKind::Categorical) => {
            return Err(RegressionError::InvalidColumnSelection(
                SelectionRule::NonNumericColumn(name.to_owned()),
            ));
        }
        Some(ColumnKind::Numeric) => {}
    }

    let missing = dataset.null_count(name)?;
    if missing > 0 {
        return Err(RegressionError::InvalidColumnSelection(
            SelectionRule::MissingValues {
                column: name.to_owned(),
                count: missing,
            },
        ));
    }

    Ok(dataset
        .numeric_values(name)?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Rejects feature matrices whose centered columns are linearly dependent.
///
/// Columns are centered (the intercept absorbs the mean), scaled to unit
/// length and orthogonalized in order with modified Gram-Schmidt. Cutoffs are
/// relative to each raw column's length, so a constant column that keeps a
/// little rounding noise after centering still counts as constant. A column
/// whose residual falls below `tolerance` is a combination of the columns
/// before it (or constant), and is reported by name.
pub(crate) fn check_full_rank(x: &Array2<f64>, names: &[String], tolerance: f64) -> Result<()> {
    let dependent = |j: usize| RegressionError::RankDeficientFeatures {
        dependent: names.get(j).cloned().unwrap_or_else(|| format!("#{j}")),
    };

    let mut basis: Vec<Array1<f64>> = Vec::with_capacity(x.ncols());
    for (j, column) in x.columns().into_iter().enumerate() {
        let scale = column.dot(&column).sqrt();
        let mean = column.mean().unwrap_or(0.0);
        let mut v = column.mapv(|value| value - mean);
        let norm = v.dot(&v).sqrt();
        if !norm.is_finite() || norm <= tolerance * scale {
            return Err(dependent(j));
        }
        v /= norm;

        for q in &basis {
            let projection = q.dot(&v);
            v.scaled_add(-projection, q);
        }
        let residual = v.dot(&v).sqrt();
        if residual <= tolerance || residual * norm <= tolerance * scale {
            return Err(dependent(j));
        }
        v /= residual;
        basis.push(v);
    }
    Ok(())
}
