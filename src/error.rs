use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while estimating page skew.
#[derive(Debug, Error)]
pub enum SkewError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Rasterization failed for {path}: {reason}")]
    DecodeFailure { path: PathBuf, reason: String },

    /// Line extraction found nothing to measure; the skew is undetermined.
    #[error("Line extraction found no qualifying lines, skew is undetermined")]
    NoLinesDetected,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write line overlay: {0}")]
    Overlay(#[from] image::ImageError),
}

impl SkewError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SkewError>;
