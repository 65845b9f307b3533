//! Estimation parameters.
//!
//! The S and N parameters control the whole estimator: S bounds the
//! number of candidates kept per region, N sets the size of the motion
//! smoothing window relative to the frame.

use super::frame::Dimensions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default history capacity of the reference parameter set.
pub const DEFAULT_S: u32 = 19;
/// Default window divisor of the reference parameter set.
pub const DEFAULT_N: u32 = 3;

/// Parameters consumed by the estimation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// History capacity per region (S).
    pub s_param: u32,
    /// Divisor used to derive the smoothing window size (N).
    pub n_param: u32,
    /// L1 distance strictly above which a pixel counts as moving.
    pub motion_threshold: u32,
    /// Side of the square regions, 1 for pixel-level regions.
    pub block_size: u32,
    /// Spread per-region work over the rayon pool.
    pub parallel: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            s_param: DEFAULT_S,
            n_param: DEFAULT_N,
            motion_threshold: 0,
            block_size: 1,
            parallel: true,
        }
    }
}

impl ModelConfig {
    /// Creates a configuration with the given S and N, other fields default.
    pub fn with_params(s_param: u32, n_param: u32) -> Self {
        Self {
            s_param,
            n_param,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.s_param < 1 {
            return Err(ConfigError::InvalidS(self.s_param));
        }
        if self.n_param < 1 {
            return Err(ConfigError::InvalidN(self.n_param));
        }
        if self.block_size < 1 {
            return Err(ConfigError::InvalidBlockSize(self.block_size));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// S below one.
    #[error("the S parameter must be positive (got {0})")]
    InvalidS(u32),
    /// N below one.
    #[error("the N parameter must be positive (got {0})")]
    InvalidN(u32),
    /// Block size below one.
    #[error("the block size must be positive (got {0})")]
    InvalidBlockSize(u32),
    /// Zero-area frames.
    #[error("frame dimensions must be non-zero (got {0})")]
    InvalidDimensions(Dimensions),
    /// A required parameter was not supplied.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
///
/// ```toml
/// [model]
/// s_param = 19
/// n_param = 3
///
/// [output]
/// directory = "out"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Estimation parameters given in the file.
    #[serde(default)]
    pub model: ModelSection,
    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// The `[model]` table. Every key is optional; S and N have no file default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// History capacity per region (S).
    pub s_param: Option<u32>,
    /// Window divisor (N).
    pub n_param: Option<u32>,
    /// Moving-pixel threshold.
    pub motion_threshold: Option<u32>,
    /// Region side length.
    pub block_size: Option<u32>,
    /// Use the rayon pool.
    pub parallel: Option<bool>,
}

impl ModelSection {
    /// Builds a configuration with the given S and N, taking the remaining
    /// fields from the file or their defaults.
    pub fn with_params(&self, s_param: u32, n_param: u32) -> ModelConfig {
        let defaults = ModelConfig::default();
        ModelConfig {
            s_param,
            n_param,
            motion_threshold: self.motion_threshold.unwrap_or(defaults.motion_threshold),
            block_size: self.block_size.unwrap_or(defaults.block_size),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        }
    }

    /// Rejects values present in the file that are out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.s_param, self.n_param, self.block_size) {
            (Some(0), _, _) => Err(ConfigError::InvalidS(0)),
            (_, Some(0), _) => Err(ConfigError::InvalidN(0)),
            (_, _, Some(0)) => Err(ConfigError::InvalidBlockSize(0)),
            _ => Ok(()),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Directory receiving the background image.
    pub directory: Option<PathBuf>,
    /// Optional file receiving the run metrics in Prometheus text format.
    pub metrics_file: Option<PathBuf>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.model.validate()?;
        Ok(config)
    }
}
