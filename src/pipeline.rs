//! Dataset-to-model pipeline state machine
//!
//! ```text
//! Empty --load--> DatasetLoaded --preprocess--> Preprocessed --configure--> Configured --train--> Trained
//!                       ^                                                                        |
//!                       +------------------------- load (from any state) ------------------------+
//! ```
//!
//! - **Save** is only legal in `Trained` and leaves the state unchanged.
//! - **Load model** is legal everywhere and leaves the state unchanged; it
//!   installs the model used by **predict**.
//! - Every other action is legal in exactly one state. Anything else is
//!   rejected with `IllegalStateTransition`, and a failed action never
//!   changes the state.
//!
//! The controller is a plain value: create one per session and pass it around.
//!
//! ```no_run
//! use regression_maker::config::AppConfig;
//! use regression_maker::model::Arity;
//! use regression_maker::pipeline::Pipeline;
//! use regression_maker::preprocess::PreprocessingChoice;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), regression_maker::pipeline::ActionError> {
//! let mut pipeline = Pipeline::new(AppConfig::default());
//! pipeline.load_dataset(Path::new("houses.csv"), None)?;
//! pipeline.preprocess(&PreprocessingChoice::FillMean)?;
//! pipeline.configure(Arity::Simple, &["size".to_owned()], "price")?;
//! let model = pipeline.train()?;
//! println!("{}", model.formula());
//! pipeline.save_model(Path::new("houses.model.json"), Some("price by size"))?;
//! # Ok(())
//! # }
//! ```

pub mod controller;

pub use controller::{ModelOrigin, Pipeline, run_to_trained};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RegressionError;

/// Where the pipeline currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    /// Nothing loaded yet
    Empty,
    /// A dataset is loaded, missing values not yet handled
    DatasetLoaded,
    /// A missing-value policy has been applied
    Preprocessed,
    /// Features and target are chosen
    Configured,
    /// A model has been fitted on the dataset
    Trained,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::DatasetLoaded => "dataset loaded",
            Self::Preprocessed => "preprocessed",
            Self::Configured => "configured",
            Self::Trained => "trained",
        }
    }

    /// State an action moves to from `self`, or `None` if it is illegal.
    ///
    /// `LoadModel` and `Predict` are governed by the active model rather
    /// than by the state and are not covered here.
    pub fn after(&self, action: Action) -> Option<Self> {
        match (self, action) {
            (_, Action::LoadDataset) => Some(Self::DatasetLoaded),
            (Self::DatasetLoaded, Action::Preprocess) => Some(Self::Preprocessed),
            (Self::Preprocessed, Action::Configure) => Some(Self::Configured),
            (Self::Configured, Action::Train) => Some(Self::Trained),
            (Self::Trained, Action::SaveModel) => Some(Self::Trained),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User actions, one per pipeline operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    LoadDataset,
    Preprocess,
    Configure,
    Train,
    SaveModel,
    LoadModel,
    Predict,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadDataset => "load dataset",
            Self::Preprocess => "preprocess",
            Self::Configure => "configure",
            Self::Train => "train",
            Self::SaveModel => "save model",
            Self::LoadModel => "load model",
            Self::Predict => "predict",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed pipeline action: what the user tried and why it failed.
#[derive(Debug)]
pub struct ActionError {
    pub action: Action,
    pub source: RegressionError,
}

impl ActionError {
    pub fn new(action: Action, source: RegressionError) -> Self {
        Self { action, source }
    }

    pub fn kind(&self) -> &RegressionError {
        &self.source
    }

    pub fn is_illegal_transition(&self) -> bool {
        matches!(self.source, RegressionError::IllegalStateTransition { .. })
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.action, self.source)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
