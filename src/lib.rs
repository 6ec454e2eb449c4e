//! # Regression Maker - Datasets to Linear Models
//!
//! Regression Maker turns a tabular dataset into a fitted linear-regression
//! model: load a file, handle missing values, pick features and a target,
//! train, inspect the fit, save the model and predict with it later.
//!
//! ## Quick Start
//!
//! ```no_run
//! use regression_maker::config::load_app_config;
//! use regression_maker::model::Arity;
//! use regression_maker::pipeline::Pipeline;
//! use regression_maker::preprocess::PreprocessingChoice;
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut pipeline = Pipeline::new(load_app_config());
//! pipeline.load_dataset(Path::new("houses.csv"), None)?;
//! println!("{}", pipeline.missing_report().unwrap_or_default());
//!
//! pipeline.preprocess(&PreprocessingChoice::DropRows)?;
//! pipeline.configure(Arity::Simple, &["size".to_owned()], "price")?;
//! let model = pipeline.train()?;
//! println!("{}", model.formula());
//!
//! let price = pipeline.predict(&HashMap::from([("size".to_owned(), 80.0)]))?;
//! println!("Predicted price: {price:.2}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`data`]: CSV, spreadsheet and SQLite loading into a typed [`data::Dataset`]
//! - [`preprocess`]: Missing-value reports and remediation
//! - [`model`]: Configuration, training, persistence and prediction
//! - [`pipeline`]: The state machine tying the steps together
//! - [`config`]: Application settings
//! - [`error`]: Error types and handling utilities
//! - [`logging`]: File and console logging setup
//!
//! ## Key Concepts
//!
//! ### Explicit Schema
//!
//! Column types are decided once, when the file is read. Every column is
//! numeric (`Float64`) or categorical (`String`), and later steps only
//! consult that schema.
//!
//! ### One Owner for State
//!
//! A [`pipeline::Pipeline`] is an ordinary value. Each successful step
//! replaces its state wholesale; a failed step leaves it untouched.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod preprocess;
