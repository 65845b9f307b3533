//! Motion detection between consecutive frames.
//!
//! Frame differencing produces a raw per-pixel indicator; the motion
//! filter turns it into a per-pixel score counting how many locations
//! around each pixel changed. Low scores mark locally calm moments.

mod difference;
mod filter;
mod map;

pub use difference::FrameDifference;
pub use filter::{kernel_size, MotionProbabilityFilter};
pub use map::{MotionMap, ScoreEncoding, ScoreMap};

use crate::capture::Dimensions;
use thiserror::Error;

/// Errors raised by the motion stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MotionError {
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
}
