//! Linear-regression models: configuration, fitting, persistence and prediction.
//!
//! The flow mirrors what a user does in the application:
//!
//! 1. [`configure`] validates a feature/target selection into a [`ModelSpec`]
//! 2. [`train`] fits ordinary least squares and returns an immutable [`FittedModel`]
//! 3. [`save_model`] / [`load_model`] persist it as JSON
//! 4. [`predict`] evaluates it on new feature values

pub mod predictor;
pub mod spec;
pub mod store;
pub mod trainer;
pub mod types;

pub use predictor::predict;
pub use spec::configure;
pub use store::{StoredModel, load_model, save_model};
pub use trainer::train;
pub use types::{Arity, FitMetrics, FittedModel, ModelSpec};
