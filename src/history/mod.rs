//! Per-region candidate histories.
//!
//! The frame is split into regions once. For every region the history
//! keeps a bounded set of samples taken while local motion was lowest and
//! reduces them to a background value with a channel-wise median.

mod median;
mod patches;
mod region;

pub use median::lower_median;
pub use patches::{Admission, Candidate, InsertStats, PatchesHistory};
pub use region::{
    partitioner_for_block_size, verify_partition, BlockPartition, Partitioner, PixelPartition,
    Region, RegionId,
};

use crate::capture::{Dimensions, FrameError};
use thiserror::Error;

/// Errors raised by the history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Capacity below one.
    #[error("history capacity must be positive (got {0})")]
    InvalidCapacity(usize),
    /// Regions do not tile the frame exactly.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),
    /// Region id out of range.
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
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
    /// The aggregated buffer could not form a frame.
    #[error("invalid background frame: {0}")]
    Frame(#[from] FrameError),
}
