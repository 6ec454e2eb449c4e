//! Model files.
//!
//! A model is written as a JSON envelope:
//!
//! ```json
//! {
//!   "format": "regression-maker/model",
//!   "version": 1,
//!   "description": "House prices by size",
//!   "saved_at": "2026-01-01T12:00:00Z",
//!   "model": { "id": "...", "spec": { ... }, "coefficients": [ ... ], ... }
//! }
//! ```
//!
//! Floats are written with enough digits to read back bit-identical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::FittedModel;
use crate::config::StoreSettings;
use crate::error::{RegressionError, Result};

pub const MODEL_FORMAT: &str = "regression-maker/model";
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A model read back from disk, with the metadata saved next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredModel {
    pub model: FittedModel,
    pub description: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ModelFileRef<'a> {
    format: &'a str,
    version: u32,
    description: &'a str,
    saved_at: DateTime<Utc>,
    model: &'a FittedModel,
}

/// Just enough to recognise the file before decoding the model itself.
#[derive(Deserialize)]
struct Envelope {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct ModelFile {
    description: String,
    saved_at: DateTime<Utc>,
    model: FittedModel,
}

/// Writes `model` to `path`. A blank description is replaced with the
/// configured default.
///
/// # Errors
///
/// `Io` when the file cannot be written.
pub fn save_model(
    model: &FittedModel,
    path: &Path,
    description: Option<&str>,
    settings: &StoreSettings,
) -> Result<()> {
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(settings.default_description.as_str());

    let file = ModelFileRef {
        format: MODEL_FORMAT,
        version: MODEL_FORMAT_VERSION,
        description,
        saved_at: Utc::now(),
        model,
    };
    let content = serde_json::to_string_pretty(&file)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;

    tracing::info!("Saved model {} to {}", model.id(), path.display());
    Ok(())
}

/// Reads a model written by [`save_model`].
///
/// # Errors
///
/// `FileUnreadable` when the file is missing or cannot be read,
/// `CorruptModelFile` when it is not a valid model file.
pub fn load_model(path: &Path) -> Result<StoredModel> {
    let bytes = std::fs::read(path).map_err(|e| RegressionError::FileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let corrupt = |reason: String| RegressionError::CorruptModelFile {
        path: path.to_path_buf(),
        reason,
    };

    let envelope: Envelope = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
    if envelope.format != MODEL_FORMAT {
        return Err(corrupt(format!("unknown format '{}'", envelope.format)));
    }
    if envelope.version != MODEL_FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported version {} (expected {MODEL_FORMAT_VERSION})",
            envelope.version
        )));
    }

    let file: ModelFile = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
    file.model.validate().map_err(corrupt)?;

    tracing::info!("Loaded model {} from {}", file.model.id(), path.display());
    Ok(StoredModel {
        model: file.model,
        description: file.description,
        saved_at: file.saved_at,
    })
}
