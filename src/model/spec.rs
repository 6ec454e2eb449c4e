use std::collections::HashSet;

use super::types::{Arity, ModelSpec};
use crate::data::{ColumnKind, Dataset};
use crate::error::{RegressionError, Result, SelectionRule};

/// Validates a feature/target selection against `dataset`.
///
/// Rules are checked in order: feature count for the arity, unique names,
/// target not among the features, columns exist, columns are numeric.
///
/// # Errors
///
/// `InvalidColumnSelection` naming the first rule that fails.
pub fn configure(
    dataset: &Dataset,
    arity: Arity,
    features: &[String],
    target: &str,
) -> Result<ModelSpec> {
    let invalid = |rule: SelectionRule| -> Result<ModelSpec> {
        Err(RegressionError::InvalidColumnSelection(rule))
    };

    let count_ok = match arity {
        Arity::Simple => features.len() == 1,
        Arity::Multiple => !features.is_empty(),
    };
    if !count_ok {
        return invalid(SelectionRule::WrongFeatureCount {
            arity,
            given: features.len(),
        });
    }

    let mut seen = HashSet::new();
    for name in features {
        if !seen.insert(name.as_str()) {
            return invalid(SelectionRule::NameCollision(name.clone()));
        }
    }
    if seen.contains(target) {
        return invalid(SelectionRule::NameCollision(target.to_owned()));
    }

    for name in features.iter().map(String::as_str).chain([target]) {
        match dataset.column_kind(name) {
            None => return invalid(SelectionRule::MissingColumn(name.to_owned())),
            Some(ColumnKind::Categorical) => {
                return invalid(SelectionRule::NonNumericColumn(name.to_owned()));
            }
            Some(ColumnKind::Numeric) => {}
        }
    }

    let spec = ModelSpec {
        arity,
        features: features.to_vec(),
        target: target.to_owned(),
    };
    tracing::info!(
        "Configured {} regression: {} ~ {}",
        arity,
        spec.target,
        spec.features.join(" + ")
    );
    Ok(spec)
}
