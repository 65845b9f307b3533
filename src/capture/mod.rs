//! Frame input and run configuration.
//!
//! This module provides the frame representation, the frame source
//! abstraction used as the input boundary, and the estimation
//! parameters.

mod config;
mod frame;
mod source;

pub use config::{
    ConfigError, FileConfig, ModelConfig, ModelSection, OutputConfig, DEFAULT_N, DEFAULT_S,
};
pub use frame::{Dimensions, Frame, FrameError, Pixel, MAX_CHANNELS};
pub use source::{frame_from_image, FrameSource, ImageSequenceSource, MemorySource, SourceError};
