use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{Action, ActionError, PipelineState};
use crate::config::AppConfig;
use crate::data::{self, DataFormat, Dataset};
use crate::error::RegressionError;
use crate::model::{self, Arity, FittedModel, ModelSpec, StoredModel};
use crate::preprocess::{self, MissingReport, PreprocessingChoice};

/// Where the model used for predictions came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    /// Fitted in this session on the current dataset
    Trained,
    /// Read from a model file
    File { path: PathBuf, description: String },
}

/// Artifacts owned by each state. Later stages carry everything earlier ones
/// produced, so a transition replaces the whole value.
#[derive(Debug, Clone, Default)]
enum Stage {
    #[default]
    Empty,
    DatasetLoaded {
        dataset: Dataset,
    },
    Preprocessed {
        dataset: Dataset,
    },
    Configured {
        dataset: Dataset,
        spec: ModelSpec,
    },
    Trained {
        dataset: Dataset,
        spec: ModelSpec,
        model: FittedModel,
    },
}

impl Stage {
    fn state(&self) -> PipelineState {
        match self {
            Self::Empty => PipelineState::Empty,
            Self::DatasetLoaded { .. } => PipelineState::DatasetLoaded,
            Self::Preprocessed { .. } => PipelineState::Preprocessed,
            Self::Configured { .. } => PipelineState::Configured,
            Self::Trained { .. } => PipelineState::Trained,
        }
    }

    fn dataset(&self) -> Option<&Dataset> {
        match self {
            Self::Empty => None,
            Self::DatasetLoaded { dataset }
            | Self::Preprocessed { dataset }
            | Self::Configured { dataset, .. }
            | Self::Trained { dataset, .. } => Some(dataset),
        }
    }
}

/// Drives one dataset through load, preprocess, configure and train.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stage: Stage,
    active: Option<(FittedModel, ModelOrigin)>,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self {
            stage: Stage::Empty,
            active: None,
            config,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.stage.state()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.stage.dataset()
    }

    pub fn model_spec(&self) -> Option<&ModelSpec> {
        match &self.stage {
            Stage::Configured { spec, .. } | Stage::Trained { spec, .. } => Some(spec),
            _ => None,
        }
    }

    /// The model fitted in the `Trained` state.
    pub fn trained_model(&self) -> Option<&FittedModel> {
        match &self.stage {
            Stage::Trained { model, .. } => Some(model),
            _ => None,
        }
    }

    /// The model [`predict`](Self::predict) uses, trained or loaded.
    pub fn active_model(&self) -> Option<(&FittedModel, &ModelOrigin)> {
        self.active.as_ref().map(|(model, origin)| (model, origin))
    }

    /// Loads a dataset, discarding everything built on the previous one.
    ///
    /// The format is inferred from the extension when `format` is `None`.
    pub fn load_dataset(
        &mut self,
        path: &Path,
        format: Option<DataFormat>,
    ) -> std::result::Result<&Dataset, ActionError> {
        let action = Action::LoadDataset;
        self.permit(action)?;
        let format = match format {
            Some(format) => format,
            None => DataFormat::from_path(path).map_err(|e| self.fail(action, e))?,
        };
        let dataset =
            data::load(path, format, &self.config.loader).map_err(|e| self.fail(action, e))?;

        if matches!(self.active, Some((_, ModelOrigin::Trained))) {
            tracing::info!("Discarding model trained on the previous dataset");
            self.active = None;
        }
        self.advance(action, Stage::DatasetLoaded { dataset });

        self.stage
            .dataset()
            .ok_or_else(|| self.fail(action, RegressionError::EmptyDataset))
    }

    /// Missing values in the current dataset, if one is loaded.
    pub fn missing_report(&self) -> Option<MissingReport> {
        self.dataset().map(preprocess::missing_report)
    }

    /// Applies a missing-value policy and returns what is left missing.
    pub fn preprocess(
        &mut self,
        choice: &PreprocessingChoice,
    ) -> std::result::Result<MissingReport, ActionError> {
        let action = Action::Preprocess;
        self.permit(action)?;
        let Stage::DatasetLoaded { dataset } = &self.stage else {
            return Err(self.reject(action));
        };

        let dataset = preprocess::apply(dataset, choice).map_err(|e| self.fail(action, e))?;
        let report = preprocess::missing_report(&dataset);
        self.advance(action, Stage::Preprocessed { dataset });
        Ok(report)
    }

    pub fn configure(
        &mut self,
        arity: Arity,
        features: &[String],
        target: &str,
    ) -> std::result::Result<&ModelSpec, ActionError> {
        let action = Action::Configure;
        self.permit(action)?;
        let Stage::Preprocessed { dataset } = &self.stage else {
            return Err(self.reject(action));
        };

        let spec = model::configure(dataset, arity, features, target)
            .map_err(|e| self.fail(action, e))?;
        let dataset = dataset.clone();
        self.advance(action, Stage::Configured { dataset, spec });

        self.model_spec()
            .ok_or_else(|| self.fail(action, RegressionError::EmptyDataset))
    }

    /// Fits the configured model and makes it the active one.
    pub fn train(&mut self) -> std::result::Result<FittedModel, ActionError> {
        let action = Action::Train;
        self.permit(action)?;
        let Stage::Configured { dataset, spec } = &self.stage else {
            return Err(self.reject(action));
        };

        let model = model::train(dataset, spec, &self.config.trainer)
            .map_err(|e| self.fail(action, e))?;
        let (dataset, spec) = (dataset.clone(), spec.clone());

        self.active = Some((model.clone(), ModelOrigin::Trained));
        self.advance(
            action,
            Stage::Trained {
                dataset,
                spec,
                model: model.clone(),
            },
        );
        Ok(model)
    }

    /// Writes the trained model. The state does not change.
    pub fn save_model(
        &self,
        path: &Path,
        description: Option<&str>,
    ) -> std::result::Result<(), ActionError> {
        let action = Action::SaveModel;
        self.permit(action)?;
        let Stage::Trained { model, .. } = &self.stage else {
            return Err(self.reject(action));
        };

        model::save_model(model, path, description, &self.config.store)
            .map_err(|e| self.fail(action, e))
    }

    /// Reads a model file and makes it the active model. Legal in every
    /// state; the state does not change.
    pub fn load_model(&mut self, path: &Path) -> std::result::Result<StoredModel, ActionError> {
        let stored = model::load_model(path).map_err(|e| self.fail(Action::LoadModel, e))?;

        let origin = ModelOrigin::File {
            path: path.to_path_buf(),
            description: stored.description.clone(),
        };
        self.active = Some((stored.model.clone(), origin));
        tracing::info!(
            "Active model is now {} ({})",
            stored.model.id(),
            stored.model.formula()
        );
        Ok(stored)
    }

    /// Predicts with the active model.
    pub fn predict(&self, inputs: &HashMap<String, f64>) -> std::result::Result<f64, ActionError> {
        let action = Action::Predict;
        let Some((model, _)) = &self.active else {
            return Err(self.reject(action));
        };
        model::predict(model, inputs).map_err(|e| self.fail(action, e))
    }

    /// Checks `action` against [`PipelineState::after`].
    fn permit(&self, action: Action) -> std::result::Result<PipelineState, ActionError> {
        self.state().after(action).ok_or_else(|| self.reject(action))
    }

    fn advance(&mut self, action: Action, next: Stage) {
        let from = self.state();
        debug_assert_eq!(from.after(action), Some(next.state()));
        self.stage = next;
        tracing::info!("Pipeline: {action}: {from} -> {}", self.state());
    }

    fn reject(&self, action: Action) -> ActionError {
        self.fail(
            action,
            RegressionError::IllegalStateTransition {
                state: self.state(),
                action,
            },
        )
    }

    fn fail(&self, action: Action, source: RegressionError) -> ActionError {
        tracing::warn!("Pipeline: {action} rejected in state {}: {source}", self.state());
        ActionError::new(action, source)
    }
}

/// Runs load, preprocess, configure and train in one go.
///
/// Used by the one-shot `train` command; interactive callers drive the
/// [`Pipeline`] step by step.
pub fn run_to_trained(
    pipeline: &mut Pipeline,
    path: &Path,
    choice: &PreprocessingChoice,
    arity: Arity,
    features: &[String],
    target: &str,
) -> std::result::Result<FittedModel, ActionError> {
    pipeline.load_dataset(path, None)?;
    pipeline.preprocess(choice)?;
    pipeline.configure(arity, features, target)?;
    pipeline.train()
}

