//! Crate-level error taxonomy.
//!
//! Stage errors are folded into [`EstimationError`] so callers handle one
//! type. Every variant is fatal for the run that produced it.

use crate::capture::{ConfigError, Dimensions, SourceError};
use crate::history::{HistoryError, RegionId};
use crate::motion::MotionError;
use crate::output::SinkError;
use thiserror::Error;

/// Errors that stop an estimation run.
#[derive(Debug, Error)]
pub enum EstimationError {
    /// Invalid parameters.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Input size differs from the configured size.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured size.
        expected: Dimensions,
        /// Size received.
        actual: Dimensions,
    },

    /// Channel count differs from the established one.
    #[error("channel mismatch: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        /// Expected value.
        expected: usize,
        /// Value found.
        actual: usize,
    },

    /// A region has no candidate to aggregate.
    #[error("region {region} holds no candidates")]
    EmptyHistory {
        /// Region without candidates.
        region: RegionId,
    },

    /// Invalid region partition.
    #[error("invalid partition: {0}")]
    Partition(String),

    /// Frame input failed.
    #[error("frame source failed: {0}")]
    Source(#[from] SourceError),

    /// Background output failed.
    #[error("background sink failed: {0}")]
    Sink(#[from] SinkError),
}

impl From<MotionError> for EstimationError {
    fn from(err: MotionError) -> Self {
        match err {
            MotionError::DimensionMismatch { expected, actual } => {
                EstimationError::DimensionMismatch { expected, actual }
            }
            MotionError::ChannelMismatch { expected, actual } => {
                EstimationError::ChannelMismatch { expected, actual }
            }
        }
    }
}

impl From<HistoryError> for EstimationError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::DimensionMismatch { expected, actual } => {
                EstimationError::DimensionMismatch { expected, actual }
            }
            HistoryError::ChannelMismatch { expected, actual } => {
                EstimationError::ChannelMismatch { expected, actual }
            }
            HistoryError::EmptyHistory { region } => EstimationError::EmptyHistory { region },
            HistoryError::InvalidCapacity(capacity) => {
                EstimationError::Configuration(ConfigError::InvalidS(capacity as u32))
            }
            HistoryError::InvalidPartition(reason) => EstimationError::Partition(reason),
            HistoryError::UnknownRegion(region) => {
                EstimationError::Partition(format!("unknown region {region}"))
            }
            HistoryError::Frame(err) => EstimationError::Partition(err.to_string()),
        }
    }
}
