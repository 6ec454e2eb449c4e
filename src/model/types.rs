use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Whether a regression uses one feature or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    #[default]
    Simple,
    Multiple,
}

impl Arity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Multiple => "multiple",
        }
    }

    pub fn parse_arity(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "multiple" => Some(Self::Multiple),
            _ => None,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated feature/target selection. Built by [`super::configure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub(crate) arity: Arity,
    pub(crate) features: Vec<String>,
    pub(crate) target: String,
}

impl ModelSpec {
    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Structural rules that hold independently of any dataset.
    pub(crate) fn check_shape(&self) -> Result<(), String> {
        match (self.arity, self.features.len()) {
            (_, 0) => return Err("no feature columns".to_owned()),
            (Arity::Simple, n) if n != 1 => {
                return Err(format!("simple model with {n} features"));
            }
            _ => {}
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.features {
            if !seen.insert(name.as_str()) {
                return Err(format!("feature '{name}' listed twice"));
            }
        }
        if seen.contains(self.target.as_str()) {
            return Err(format!("target '{}' is also a feature", self.target));
        }
        Ok(())
    }
}

/// In-sample fit quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    /// Coefficient of determination; `None` when the target is constant
    pub r2: Option<f64>,
    /// Mean squared error of the fitted values
    pub mse: f64,
    /// Rows used for fitting
    pub rows: usize,
}

/// Coefficients, intercept and the [`ModelSpec`] they were fitted against.
///
/// Immutable once created; coefficients follow `spec.features()` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    id: Uuid,
    spec: ModelSpec,
    coefficients: Vec<f64>,
    intercept: f64,
    metrics: FitMetrics,
    trained_at: DateTime<Utc>,
}

impl FittedModel {
    pub(crate) fn new(
        spec: ModelSpec,
        coefficients: Vec<f64>,
        intercept: f64,
        metrics: FitMetrics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            spec,
            coefficients,
            intercept,
            metrics,
            trained_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn metrics(&self) -> &FitMetrics {
        &self.metrics
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Coefficient for `feature`, if the model uses it.
    pub fn coefficient(&self, feature: &str) -> Option<f64> {
        self.spec
            .features
            .iter()
            .position(|f| f == feature)
            .and_then(|i| self.coefficients.get(i).copied())
    }

    /// Pairs of (feature, coefficient) in feature order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, f64)> {
        self.spec
            .features
            .iter()
            .map(String::as_str)
            .zip(self.coefficients.iter().copied())
    }

    /// `target = b0 + (b1) * x1 + ...` with two decimals.
    pub fn formula(&self) -> String {
        let mut formula = format!("{} = {:.2}", self.spec.target, self.intercept);
        for (name, coef) in self.terms() {
            formula.push_str(&format!(" + ({coef:.2}) * {name}"));
        }
        formula
    }

    /// Plain-language reading of the fit for non-technical users.
    pub fn interpretation(&self) -> Vec<String> {
        let target = &self.spec.target;
        let mut lines = Vec::new();

        match self.metrics.r2 {
            Some(r2) => {
                let pct = (r2 * 100.0).max(0.0);
                if r2 > 0.7 {
                    lines.push(format!(
                        "Strong predictive model: explains {pct:.1}% of the variation in {target}."
                    ));
                } else if r2 > 0.3 {
                    lines.push(format!(
                        "Moderate predictive model: explains {pct:.1}% of the variation in {target}."
                    ));
                } else {
                    lines.push(format!(
                        "Weak predictive model: only explains {pct:.1}% of the variation in {target}. Other factors are likely at play."
                    ));
                }
            }
            None => lines.push(format!(
                "'{target}' never varies in the training data, so R² is undefined."
            )),
        }

        let mut drivers: Vec<(&str, f64)> = self.terms().collect();
        drivers.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        for (name, coef) in drivers.into_iter().take(3) {
            if coef == 0.0 {
                continue;
            }
            let direction = if coef > 0.0 { "increase" } else { "decrease" };
            lines.push(format!(
                "Driver: a higher '{name}' usually leads to an {direction} in {target}."
            ));
        }
        lines
    }

    /// Consistency rules a deserialized model must satisfy.
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.spec.check_shape()?;
        if self.coefficients.len() != self.spec.features.len() {
            return Err(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.spec.features.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("non-finite parameter".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn spec(arity: Arity, features: &[&str], target: &str) -> ModelSpec {
        ModelSpec {
            arity,
            features: features.iter().map(|s| (*s).to_owned()).collect(),
            target: target.to_owned(),
        }
    }

    pub fn model(features: &[&str], coefficients: &[f64], intercept: f64) -> FittedModel {
        let arity = if features.len() == 1 {
            Arity::Simple
        } else {
            Arity::Multiple
        };
        FittedModel::new(
            spec(arity, features, "y"),
            coefficients.to_vec(),
            intercept,
            FitMetrics {
                r2: Some(0.5),
                mse: 1.25,
                rows: 10,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_formula() {
        let m = model(&["size", "rooms"], &[2.0, -0.5], 10.0);
        assert_eq!(m.formula(), "y = 10.00 + (2.00) * size + (-0.50) * rooms");
    }

    #[test]
    fn test_coefficient_lookup() {
        let m = model(&["size", "rooms"], &[2.0, -0.5], 10.0);
        assert_eq!(m.coefficient("rooms"), Some(-0.5));
        assert_eq!(m.coefficient("garden"), None);
    }

    #[test]
    fn test_interpretation_orders_drivers_by_magnitude() {
        let m = model(&["a", "b"], &[0.1, -3.0], 0.0);
        let lines = m.interpretation();
        assert!(lines[0].contains("Moderate predictive model"));
        assert!(lines[1].contains("'b'") && lines[1].contains("decrease"));
        assert!(lines[2].contains("'a'") && lines[2].contains("increase"));
    }

    #[test]
    fn test_shape_rules() {
        assert!(spec(Arity::Simple, &["x"], "y").check_shape().is_ok());
        assert!(spec(Arity::Simple, &["x", "z"], "y").check_shape().is_err());
        assert!(spec(Arity::Multiple, &[], "y").check_shape().is_err());
        assert!(spec(Arity::Multiple, &["x", "x"], "y").check_shape().is_err());
        assert!(spec(Arity::Multiple, &["x", "y"], "y").check_shape().is_err());
    }

    #[test]
    fn test_validate_rejects_mismatched_coefficients() {
        let mut m = model(&["a", "b"], &[1.0, 2.0], 0.0);
        assert!(m.validate().is_ok());
        m.coefficients.pop();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_arity_parse() {
        assert_eq!(Arity::parse_arity(" Multiple "), Some(Arity::Multiple));
        assert_eq!(Arity::parse_arity("double"), None);
    }
}
