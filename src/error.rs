//! Error kinds surfaced by every RegressionMaker operation.
//!
//! Each variant corresponds to one recoverable failure the user can act on:
//! pick another file, choose another cleaning policy, change the column
//! selection, and so on. None of them leaves the pipeline in a half-updated
//! state.
//!
//! ```
//! use regression_maker::error::RegressionError;
//!
//! fn describe(err: &RegressionError) -> &'static str {
//!     match err {
//!         RegressionError::FileUnreadable { .. } => "pick another file",
//!         RegressionError::RankDeficientFeatures { .. } => "drop a redundant feature",
//!         _ => "see message",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any result whose error converts
//! into [`RegressionError`], mirroring `anyhow`'s ergonomics for the typed
//! error.

use std::fmt;
use std::path::PathBuf;

use crate::model::Arity;
use crate::pipeline::{Action, PipelineState};

/// The rule a column selection broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionRule {
    /// Feature count does not fit the arity.
    WrongFeatureCount { arity: Arity, given: usize },
    /// A name appears twice, either among the features or as feature and target.
    NameCollision(String),
    /// The column is not part of the dataset.
    MissingColumn(String),
    /// The column is declared categorical.
    NonNumericColumn(String),
    /// The column still holds missing values at training time.
    MissingValues { column: String, count: usize },
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongFeatureCount { arity, given } => match arity {
                Arity::Simple => write!(
                    f,
                    "simple regression needs exactly one feature, {given} given"
                ),
                Arity::Multiple => write!(
                    f,
                    "multiple regression needs at least one feature, {given} given"
                ),
            },
            Self::NameCollision(name) => {
                write!(f, "column '{name}' is selected more than once")
            }
            Self::MissingColumn(name) => write!(f, "column '{name}' does not exist"),
            Self::NonNumericColumn(name) => write!(f, "column '{name}' is not numeric"),
            Self::MissingValues { column, count } => {
                write!(f, "column '{column}' still has {count} missing values")
            }
        }
    }
}

/// Main error type for RegressionMaker operations.
#[derive(Debug)]
pub enum RegressionError {
    /// The file is missing, unreadable, or its content cannot be parsed.
    FileUnreadable { path: PathBuf, reason: String },

    /// Unknown file type, or a layout the loader cannot map to a single table.
    UnsupportedFormat(String),

    /// The table has no rows or no columns.
    EmptyDataset,

    /// A constant fill value does not fit a column that needs filling.
    IncompatibleFillValue { column: String, reason: String },

    /// Feature/target selection broke a configuration rule.
    InvalidColumnSelection(SelectionRule),

    /// The feature matrix does not have full column rank.
    RankDeficientFeatures { dependent: String },

    /// The model file exists but is not a readable model.
    CorruptModelFile { path: PathBuf, reason: String },

    /// Prediction input lacks one or more required features.
    MissingPredictionFeature(Vec<String>),

    /// The action is not legal in the current pipeline state.
    IllegalStateTransition {
        state: PipelineState,
        action: Action,
    },

    /// I/O errors while writing output files
    Io(std::io::Error),

    /// Internal data processing errors (Polars, linfa)
    DataProcessing(String),

    /// Configuration errors
    Config(String),
}

impl fmt::Display for RegressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileUnreadable { path, reason } => {
                write!(f, "Cannot read '{}': {reason}", path.display())
            }
            Self::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            Self::EmptyDataset => write!(f, "The dataset has no rows or no columns"),
            Self::IncompatibleFillValue { column, reason } => {
                write!(f, "Cannot fill column '{column}': {reason}")
            }
            Self::InvalidColumnSelection(rule) => write!(f, "Invalid column selection: {rule}"),
            Self::RankDeficientFeatures { dependent } => write!(
                f,
                "Features are linearly dependent: '{dependent}' is a combination of the other columns"
            ),
            Self::CorruptModelFile { path, reason } => {
                write!(f, "'{}' is not a valid model file: {reason}", path.display())
            }
            Self::MissingPredictionFeature(names) => {
                write!(f, "Missing value for feature(s): {}", names.join(", "))
            }
            Self::IllegalStateTransition { state, action } => {
                write!(f, "Cannot {action} while the pipeline is {state}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for RegressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RegressionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<polars::error::PolarsError> for RegressionError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<linfa::Error> for RegressionError {
    fn from(err: linfa::Error) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<serde_json::Error> for RegressionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

/// Result type alias for RegressionMaker operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RegressionError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: RegressionError = e.into();
            match err {
                RegressionError::DataProcessing(inner) => {
                    RegressionError::DataProcessing(format!("{}: {inner}", msg.into()))
                }
                RegressionError::Config(inner) => {
                    RegressionError::Config(format!("{}: {inner}", msg.into()))
                }
                other => other,
            }
        })
    }
}
