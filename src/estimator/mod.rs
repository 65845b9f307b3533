//! Orchestration of the estimation stages.
//!
//! [`BackgroundEstimator`] is the per-frame state machine; [`Pipeline`]
//! connects it to a frame source and a background sink.

mod observer;
mod orchestrator;
mod pipeline;

pub use observer::{FramePreview, LoggingObserver, PreviewObserver};
pub use orchestrator::{BackgroundEstimator, FrameOutcome};
pub use pipeline::{Pipeline, RunReport};
