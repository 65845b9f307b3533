//! Background sinks.

use crate::capture::Frame;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while emitting the background.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {reason}")]
    CreateDir {
        /// Path involved.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
    /// The image could not be encoded or written.
    #[error("failed to encode {path}: {reason}")]
    EncodeFailed {
        /// Path involved.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
    /// Channel count outside 1-4.
    #[error("unsupported channel count {0}")]
    UnsupportedChannels(usize),
}

/// Receives the final background image of a run.
pub trait BackgroundSink {
    /// Emits `background`.
    fn write(&mut self, background: &Frame) -> Result<(), SinkError>;
}

/// File name used for the background of a run with parameters S and N.
pub fn output_file_name(s_param: u32, n_param: u32) -> String {
    format!("output_{s_param}_{n_param}.png")
}

/// Converts a frame into an `image` buffer with the same channel layout.
pub fn image_from_frame(frame: &Frame) -> Result<DynamicImage, SinkError> {
    let (width, height) = (frame.width(), frame.height());
    let pixels = frame.pixels().to_vec();
    let image = match frame.channels() {
        1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        2 => GrayAlphaImage::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8),
        3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
        other => return Err(SinkError::UnsupportedChannels(other)),
    };
    image.ok_or(SinkError::UnsupportedChannels(frame.channels()))
}

/// Writes the background as a PNG file.
#[derive(Debug, Clone)]
pub struct PngSink {
    path: PathBuf,
}

impl PngSink {
    /// Sink writing to an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sink writing `output_<S>_<N>.png` inside `directory`.
    pub fn in_directory(directory: impl AsRef<Path>, s_param: u32, n_param: u32) -> Self {
        Self::new(directory.as_ref().join(output_file_name(s_param, n_param)))
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackgroundSink for PngSink {
    fn write(&mut self, background: &Frame) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::CreateDir {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        tracing::info!(path = %self.path.display(), "Writing background");
        image_from_frame(background)?
            .save_with_format(&self.path, image::ImageFormat::Png)
            .map_err(|e| SinkError::EncodeFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}

/// Keeps the emitted backgrounds in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    backgrounds: Vec<Frame>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently written background.
    pub fn last(&self) -> Option<&Frame> {
        self.backgrounds.last()
    }

    /// Number of writes received.
    pub fn len(&self) -> usize {
        self.backgrounds.len()
    }

    /// True if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.backgrounds.is_empty()
    }
}

impl BackgroundSink for MemorySink {
    fn write(&mut self, background: &Frame) -> Result<(), SinkError> {
        self.backgrounds.push(background.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{frame_from_image, Dimensions};

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(19, 3), "output_19_3.png");
    }

    #[test]
    fn test_png_sink_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::in_directory(dir.path().join("nested"), 5, 2);
        let pixels: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7) as u8).collect();
        let frame = Frame::new(pixels, Dimensions::new(3, 4), 3, 0).unwrap();

        sink.write(&frame).unwrap();

        let decoded = image::open(sink.path()).unwrap();
        let read_back = frame_from_image(decoded, 0).unwrap();
        assert_eq!(read_back.pixels(), frame.pixels());
        assert!(sink.path().ends_with("output_5_2.png"));
    }

    #[test]
    fn test_memory_sink_records_writes() {
        let mut sink = MemorySink::new();
        assert!(sink.is_empty());

        let frame = Frame::filled(Dimensions::new(1, 1), &[3], 0).unwrap();
        sink.write(&frame).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.last(), Some(&frame));
    }
}
