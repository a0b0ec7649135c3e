//! Tunable constants of the skew pipeline.
//!
//! Defaults reproduce the empirically chosen values. A TOML file may override
//! any subset of them:
//!
//! ```toml
//! correction_deadband = 0.25
//!
//! [edges]
//! low_threshold = 40.0
//!
//! [lines]
//! vote_threshold = 80
//! min_line_length = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canny low threshold (8-bit gradient magnitude)
pub const DEFAULT_LOW_THRESHOLD: f32 = 50.0;

/// Canny high threshold (8-bit gradient magnitude)
pub const DEFAULT_HIGH_THRESHOLD: f32 = 150.0;

/// Gradient kernel size; the Canny implementation uses a fixed 3x3 Sobel
pub const SUPPORTED_APERTURE: u32 = 3;

/// Minimum vote count for a Hough bin to seed a segment
pub const DEFAULT_VOTE_THRESHOLD: u32 = 100;

/// Minimum segment extent in pixels
pub const DEFAULT_MIN_LINE_LENGTH: u32 = 100;

/// Maximum run of missing pixels bridged inside one segment
pub const DEFAULT_MAX_LINE_GAP: u32 = 10;

/// Seed for the visiting order of the probabilistic transform
pub const DEFAULT_SEED: u64 = 0x5EED_5CA7;

/// Skews at or below this magnitude (degrees) are left alone
pub const DEFAULT_CORRECTION_DEADBAND: f64 = 0.5;

/// PDF pages are rendered at this multiple of their native 72 DPI
pub const DEFAULT_RASTER_ZOOM: f32 = 2.0;

/// Scale of the debug overlay relative to the rasterized page
pub const DEFAULT_OVERLAY_SCALE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Edge detector settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Gradients below this are suppressed
    pub low_threshold: f32,
    /// Gradients above this confirm an edge
    pub high_threshold: f32,
    /// Gradient kernel size
    pub aperture_size: u32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low_threshold: DEFAULT_LOW_THRESHOLD,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            aperture_size: SUPPORTED_APERTURE,
        }
    }
}

/// Line extractor settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Distance resolution of the accumulator (pixels)
    pub rho: f64,
    /// Angular resolution of the accumulator (radians)
    pub theta: f64,
    pub vote_threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
    pub seed: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: std::f64::consts::PI / 180.0,
            vote_threshold: DEFAULT_VOTE_THRESHOLD,
            min_line_length: DEFAULT_MIN_LINE_LENGTH,
            max_line_gap: DEFAULT_MAX_LINE_GAP,
            seed: DEFAULT_SEED,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    pub edges: EdgeConfig,
    pub lines: LineConfig,
    /// |median| must exceed this (degrees) for a correction to be recommended
    pub correction_deadband: f64,
    pub raster_zoom: f32,
    pub overlay_scale: f32,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            edges: EdgeConfig::default(),
            lines: LineConfig::default(),
            correction_deadband: DEFAULT_CORRECTION_DEADBAND,
            raster_zoom: DEFAULT_RASTER_ZOOM,
            overlay_scale: DEFAULT_OVERLAY_SCALE,
        }
    }
}

impl SkewConfig {
    /// Load a TOML file on top of the defaults and validate the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without validating it.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        let edges = &self.edges;
        if !(edges.low_threshold >= 0.0 && edges.low_threshold < edges.high_threshold) {
            return invalid(format!(
                "edge thresholds must satisfy 0 <= low < high (got {} / {})",
                edges.low_threshold, edges.high_threshold
            ));
        }
        if edges.aperture_size != SUPPORTED_APERTURE {
            return invalid(format!(
                "aperture_size {} is not supported, only {} is",
                edges.aperture_size, SUPPORTED_APERTURE
            ));
        }

        let lines = &self.lines;
        if !(lines.rho > 0.0 && lines.theta > 0.0 && lines.theta < std::f64::consts::PI) {
            return invalid(format!(
                "rho and theta must be positive, theta below pi (got {} / {})",
                lines.rho, lines.theta
            ));
        }
        if lines.vote_threshold == 0 || lines.min_line_length == 0 {
            return invalid("vote_threshold and min_line_length must be positive".to_string());
        }
        if i32::try_from(lines.vote_threshold).is_err() {
            return invalid(format!(
                "vote_threshold must not exceed {} (got {})",
                i32::MAX,
                lines.vote_threshold
            ));
        }

        if !(self.correction_deadband >= 0.0) {
            return invalid(format!(
                "correction_deadband must be non-negative (got {})",
                self.correction_deadband
            ));
        }
        if !(self.raster_zoom > 0.0) {
            return invalid(format!("raster_zoom must be positive (got {})", self.raster_zoom));
        }
        if !(self.overlay_scale > 0.0 && self.overlay_scale <= 1.0) {
            return invalid(format!(
                "overlay_scale must be in (0, 1] (got {})",
                self.overlay_scale
            ));
        }

        Ok(())
    }
}
