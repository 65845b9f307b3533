//! Frame type representing one decoded image of a sequence.

use std::fmt;

/// Maximum number of channels a frame may carry.
pub const MAX_CHANNELS: usize = 4;

/// Channel values of a single pixel.
///
/// Only the first `channels` entries of the owning frame are meaningful;
/// the remaining slots are zero.
pub type Pixel = [u8; MAX_CHANNELS];

/// Spatial size of a frame, shared by every frame of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Number of rows.
    pub height: u32,
    /// Number of columns.
    pub width: u32,
}

impl Dimensions {
    /// Creates dimensions from a height and a width.
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Returns the number of pixel locations.
    #[inline]
    pub fn area(&self) -> usize {
        (self.height as usize) * (self.width as usize)
    }

    /// Returns the smaller of height and width.
    #[inline]
    pub fn min_side(&self) -> u32 {
        self.height.min(self.width)
    }

    /// Linear index of the location at row `y`, column `x`.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors raised when a frame buffer is inconsistent with its shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Channel count outside 1-4.
    #[error("unsupported channel count {0} (expected 1-{})", MAX_CHANNELS)]
    UnsupportedChannels(usize),
    /// Buffer length does not match dimensions and channels.
    #[error("pixel buffer holds {actual} bytes, {expected} expected for {dimensions} x {channels}")]
    BufferSize {
        /// Frame size.
        dimensions: Dimensions,
        /// Channels per pixel.
        channels: usize,
        /// Byte count implied by the shape.
        expected: usize,
        /// Byte count supplied.
        actual: usize,
    },
}

/// An immutable H×W grid of pixels with interleaved `u8` channels.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Interleaved pixel data, row-major.
    pixels: Vec<u8>,
    dimensions: Dimensions,
    /// Channels per pixel (1-4).
    channels: usize,
    /// Position of the frame in its sequence.
    sequence: u64,
}

impl Frame {
    /// Creates a frame, checking that the buffer matches the shape.
    pub fn new(
        pixels: Vec<u8>,
        dimensions: Dimensions,
        channels: usize,
        sequence: u64,
    ) -> Result<Self, FrameError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(FrameError::UnsupportedChannels(channels));
        }
        let expected = dimensions.area() * channels;
        if pixels.len() != expected {
            return Err(FrameError::BufferSize {
                dimensions,
                channels,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            dimensions,
            channels,
            sequence,
        })
    }

    /// Creates a frame where every pixel holds `value`.
    pub fn filled(
        dimensions: Dimensions,
        value: &[u8],
        sequence: u64,
    ) -> Result<Self, FrameError> {
        let pixels = value
            .iter()
            .copied()
            .cycle()
            .take(dimensions.area() * value.len())
            .collect();
        Self::new(pixels, dimensions, value.len(), sequence)
    }

    /// Returns the raw interleaved pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the frame and returns its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Frame size.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Channels per pixel.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Position of the frame in its sequence.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Channel values of the pixel at column `x`, row `y`.
    #[inline]
    pub fn channel_slice(&self, x: u32, y: u32) -> &[u8] {
        let start = self.dimensions.index(x, y) * self.channels;
        &self.pixels[start..start + self.channels]
    }

    /// Pixel at column `x`, row `y`, padded to [`MAX_CHANNELS`].
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let mut out = [0u8; MAX_CHANNELS];
        out[..self.channels].copy_from_slice(self.channel_slice(x, y));
        out
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("dimensions", &self.dimensions)
            .field("channels", &self.channels)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let dims = Dimensions::new(48, 64);
        let frame = Frame::new(vec![0u8; 48 * 64 * 3], dims, 3, 1).unwrap();

        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.sequence(), 1);
    }

    #[test]
    fn test_frame_invalid_size() {
        let dims = Dimensions::new(48, 64);
        let result = Frame::new(vec![0u8; 100], dims, 3, 1);

        assert!(matches!(result, Err(FrameError::BufferSize { actual: 100, .. })));
    }

    #[test]
    fn test_unsupported_channels() {
        let dims = Dimensions::new(2, 2);
        assert!(matches!(
            Frame::new(vec![0u8; 20], dims, 5, 0),
            Err(FrameError::UnsupportedChannels(5))
        ));
    }

    #[test]
    fn test_pixel_access() {
        let dims = Dimensions::new(2, 2);
        let pixels = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let frame = Frame::new(pixels, dims, 3, 0).unwrap();

        assert_eq!(frame.channel_slice(1, 0), &[4, 5, 6]);
        assert_eq!(frame.pixel(0, 1), [7, 8, 9, 0]);
    }

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(Dimensions::new(3, 5), &[10, 20], 7).unwrap();
        assert_eq!(frame.channels(), 2);
        assert!(frame.pixels().chunks(2).all(|p| p == [10, 20]));
    }
}
