use std::collections::HashMap;

use super::types::FittedModel;
use crate::error::{RegressionError, Result};

/// `intercept + Σ coefficient_i * value_i` over the model's features.
///
/// Inputs the model does not use are ignored.
///
/// # Errors
///
/// `MissingPredictionFeature` listing every required feature absent from
/// `inputs`, in feature order.
pub fn predict(model: &FittedModel, inputs: &HashMap<String, f64>) -> Result<f64> {
    let missing: Vec<String> = model
        .spec()
        .features()
        .iter()
        .filter(|name| !inputs.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RegressionError::MissingPredictionFeature(missing));
    }

    let prediction = model
        .terms()
        .filter_map(|(name, coef)| inputs.get(name).map(|value| coef * value))
        .fold(model.intercept(), |acc, term| acc + term);

    tracing::debug!("Predicted {} = {prediction}", model.spec().target());
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::fixtures::model;

    fn inputs(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn test_prediction_is_linear_combination() -> anyhow::Result<()> {
        let m = model(&["x1", "x2"], &[2.0, -1.0], 0.5);
        let y = predict(&m, &inputs(&[("x1", 3.0), ("x2", 4.0), ("unused", 99.0)]))?;
        assert!((y - 2.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_missing_feature_is_reported() {
        let m = model(&["x1", "x2"], &[2.0, -1.0], 0.5);
        let err = predict(&m, &inputs(&[("x1", 3.0)])).unwrap_err();
        match err {
            RegressionError::MissingPredictionFeature(names) => {
                assert_eq!(names, vec!["x2".to_owned()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_missing_features_listed_in_order() {
        let m = model(&["b", "a", "c"], &[1.0, 1.0, 1.0], 0.0);
        let err = predict(&m, &inputs(&[("a", 1.0)])).unwrap_err();
        assert_eq!(err.to_string(), "Missing value for feature(s): b, c");
    }
}
