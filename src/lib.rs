//! Motion-Aware Background Estimation Library
//!
//! Estimates the static background of a video sequence that contains
//! moving foreground content. At each location the samples captured while
//! local motion was lowest are retained and reduced to a robust estimate.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → motion (difference → filter) → history (insert) → output
//!                                               ↓
//!                                       aggregate (median)
//! ```
//!
//! # Design Principles
//!
//! - **Fixed memory**: every region keeps at most S candidates
//! - **Calm samples win**: a full region only admits strictly calmer samples
//! - **Robust output**: channel-wise lower median, always an observed value
//! - **Any-time estimate**: the background can be computed after any frame
//!
//! # Example
//!
//! ```no_run
//! use bg_estimate::{
//!     capture::{ImageSequenceSource, ModelConfig},
//!     estimator::Pipeline,
//!     output::PngSink,
//! };
//!
//! let config = ModelConfig::with_params(19, 3);
//! let mut source = ImageSequenceSource::open("frames/").unwrap();
//! let mut sink = PngSink::in_directory("out/", config.s_param, config.n_param);
//!
//! let report = Pipeline::new(config).run(&mut source, &mut sink).unwrap();
//! println!("processed {} frames", report.frames_processed);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod error;
pub mod estimator;
pub mod history;
pub mod metrics;
pub mod motion;
pub mod output;

// Re-export commonly used types at crate root
pub use capture::{Dimensions, Frame, FrameSource, ImageSequenceSource, MemorySource, ModelConfig};
pub use error::EstimationError;
pub use estimator::{BackgroundEstimator, FrameOutcome, Pipeline, PreviewObserver, RunReport};
pub use history::{PatchesHistory, Partitioner, Region};
pub use motion::{FrameDifference, MotionProbabilityFilter};
pub use output::{BackgroundSink, MemorySink, PngSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
