//! Frame source abstraction.
//!
//! A source reports the sequence dimensions once, then hands out frames
//! in order until it is exhausted. Decoding lives entirely behind this
//! trait so the estimator never touches files.

use super::frame::{Dimensions, Frame, FrameError};
use image::{DynamicImage, ImageReader};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions recognised by [`ImageSequenceSource`].
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Errors that can occur while reading frames.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The sequence directory could not be listed.
    #[error("failed to open sequence {path}: {reason}")]
    OpenFailed {
        /// Path involved.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
    /// The directory holds no supported image.
    #[error("sequence {0} contains no frames")]
    Empty(PathBuf),
    /// An image could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    DecodeFailed {
        /// Path involved.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
    /// A decoded image does not form a valid frame.
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
}

/// Trait for ordered, finite frame sequences.
pub trait FrameSource {
    /// Dimensions every delivered frame is expected to have.
    fn dimensions(&self) -> Dimensions;

    /// Returns the next frame, or `None` once the sequence is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Reads a directory of still images as a frame sequence.
///
/// Files are ordered by name, so zero-padded numbering gives the
/// expected temporal order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    files: VecDeque<PathBuf>,
    dimensions: Dimensions,
    sequence: u64,
}

impl ImageSequenceSource {
    /// Lists the image files of `dir` and reads the size of the first one.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| SourceError::OpenFailed {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        let first = files
            .first()
            .ok_or_else(|| SourceError::Empty(dir.to_path_buf()))?;
        let (width, height) =
            image::image_dimensions(first).map_err(|e| SourceError::DecodeFailed {
                path: first.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            path = %dir.display(),
            frames = files.len(),
            width,
            height,
            "Opened image sequence"
        );

        Ok(Self {
            files: files.into(),
            dimensions: Dimensions::new(height, width),
            sequence: 0,
        })
    }

    /// Number of frames not yet delivered.
    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        let image = ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| SourceError::DecodeFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?
            .decode()
            .map_err(|e| SourceError::DecodeFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let frame = frame_from_image(image, self.sequence)?;
        tracing::trace!(path = %path.display(), sequence = self.sequence, "Decoded frame");
        self.sequence += 1;
        Ok(Some(frame))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Converts a decoded image into a frame, keeping 8-bit channel layouts.
pub fn frame_from_image(image: DynamicImage, sequence: u64) -> Result<Frame, FrameError> {
    let dimensions = Dimensions::new(image.height(), image.width());
    let (pixels, channels) = match image {
        DynamicImage::ImageLuma8(buf) => (buf.into_raw(), 1),
        DynamicImage::ImageLumaA8(buf) => (buf.into_raw(), 2),
        DynamicImage::ImageRgb8(buf) => (buf.into_raw(), 3),
        DynamicImage::ImageRgba8(buf) => (buf.into_raw(), 4),
        other => (other.to_rgb8().into_raw(), 3),
    };
    Frame::new(pixels, dimensions, channels, sequence)
}

/// In-memory frame source for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Frame>,
    dimensions: Option<Dimensions>,
}

impl MemorySource {
    /// Creates a source from frames; dimensions come from the first frame.
    pub fn new(frames: Vec<Frame>) -> Self {
        let dimensions = frames.first().map(Frame::dimensions);
        Self {
            frames: frames.into(),
            dimensions,
        }
    }

    /// Creates a source that reports `dimensions` regardless of its frames.
    pub fn with_dimensions(frames: Vec<Frame>, dimensions: Dimensions) -> Self {
        Self {
            frames: frames.into(),
            dimensions: Some(dimensions),
        }
    }
}

impl FrameSource for MemorySource {
    fn dimensions(&self) -> Dimensions {
        self.dimensions.unwrap_or(Dimensions::new(0, 0))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}
