//! Background output.
//!
//! The estimated background leaves the crate through a [`BackgroundSink`],
//! the counterpart of the frame source on the input side.

mod sink;

pub use sink::{image_from_frame, output_file_name, BackgroundSink, MemorySink, PngSink, SinkError};
