//! Spatial smoothing of the motion indicator.
//!
//! A location counts as moving when its raw indicator is strictly above
//! the configured threshold. The score of a location is the number of
//! moving locations inside the K×K window centered on it. Windows are
//! clamped to the frame: near the borders only in-bounds neighbors are
//! counted, so a score never exceeds the number of valid neighbors.

use super::map::{MotionMap, ScoreEncoding, ScoreMap, ScoreValues};
use super::MotionError;
use crate::capture::Dimensions;
use rayon::prelude::*;

/// Derives the odd window size used for `dimensions` and divisor `n`.
///
/// `K = max(1, (min(H, W) / n) | 1)`. A divisor of 0 is treated as 1.
pub fn kernel_size(dimensions: Dimensions, n: u32) -> u32 {
    ((dimensions.min_side() / n.max(1)) | 1).max(1)
}

/// Counts moving locations in a square window around each pixel.
#[derive(Debug, Clone)]
pub struct MotionProbabilityFilter {
    dimensions: Dimensions,
    kernel_size: u32,
    threshold: u32,
    encoding: ScoreEncoding,
    parallel: bool,
}

impl MotionProbabilityFilter {
    /// Creates a filter for frames of `dimensions`.
    ///
    /// The score encoding is fixed here from the window area.
    pub fn new(dimensions: Dimensions, n_param: u32, threshold: u32) -> Self {
        Self::with_kernel_size(dimensions, kernel_size(dimensions, n_param), threshold)
    }

    /// Creates a filter with an explicit window size, forced odd and positive.
    pub fn with_kernel_size(dimensions: Dimensions, kernel_size: u32, threshold: u32) -> Self {
        let kernel_size = kernel_size.max(1) | 1;
        let max_score = (kernel_size as u64) * (kernel_size as u64);
        Self {
            dimensions,
            kernel_size,
            threshold,
            encoding: ScoreEncoding::for_max_value(max_score),
            parallel: true,
        }
    }

    /// Enables or disables the rayon pool for the window pass.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Window side length (K).
    #[inline]
    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    /// Raw distance a location must exceed to count as moving.
    #[inline]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Integer width of the produced scores.
    #[inline]
    pub fn encoding(&self) -> ScoreEncoding {
        self.encoding
    }

    /// Returns a freshly allocated score map for `raw`.
    pub fn compute(&self, raw: &MotionMap) -> Result<ScoreMap, MotionError> {
        let mut out = ScoreMap::zeros(self.dimensions, self.encoding);
        self.compute_into(raw, &mut out)?;
        Ok(out)
    }

    /// Overwrites `out` with the window counts of `raw`.
    pub fn compute_into(&self, raw: &MotionMap, out: &mut ScoreMap) -> Result<(), MotionError> {
        if raw.dimensions() != self.dimensions {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimensions,
                actual: raw.dimensions(),
            });
        }
        if out.dimensions() != self.dimensions || out.encoding() != self.encoding {
            *out = ScoreMap::zeros(self.dimensions, self.encoding);
        }

        let integral = self.integral_image(raw);
        let window = Window {
            integral: &integral,
            dimensions: self.dimensions,
            half: self.kernel_size / 2,
            parallel: self.parallel,
        };

        match out.values_mut() {
            ScoreValues::U8(v) => window.fill(v, |count| count as u8),
            ScoreValues::U16(v) => window.fill(v, |count| count as u16),
            ScoreValues::U32(v) => window.fill(v, |count| count),
        }

        Ok(())
    }

    /// Summed-area table of the binarised indicator, one row and column
    /// of zero padding on the top and left.
    fn integral_image(&self, raw: &MotionMap) -> Vec<u32> {
        let width = self.dimensions.width as usize;
        let height = self.dimensions.height as usize;
        let stride = width + 1;
        let mut table = vec![0u32; stride * (height + 1)];

        for y in 0..height {
            let mut row_sum = 0u32;
            let row = &raw.values()[y * width..(y + 1) * width];
            for (x, &value) in row.iter().enumerate() {
                row_sum += u32::from(value > self.threshold);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }

        table
    }
}

struct Window<'a> {
    integral: &'a [u32],
    dimensions: Dimensions,
    half: u32,
    parallel: bool,
}

impl Window<'_> {
    /// Count of moving locations in the clamped window around (x, y).
    #[inline]
    fn count(&self, x: u32, y: u32) -> u32 {
        let stride = self.dimensions.width as usize + 1;
        let x0 = x.saturating_sub(self.half) as usize;
        let y0 = y.saturating_sub(self.half) as usize;
        let x1 = (x.saturating_add(self.half)).min(self.dimensions.width - 1) as usize + 1;
        let y1 = (y.saturating_add(self.half)).min(self.dimensions.height - 1) as usize + 1;

        self.integral[y1 * stride + x1] + self.integral[y0 * stride + x0]
            - self.integral[y0 * stride + x1]
            - self.integral[y1 * stride + x0]
    }

    fn fill<T, F>(&self, out: &mut [T], convert: F)
    where
        T: Send,
        F: Fn(u32) -> T + Sync,
    {
        let width = self.dimensions.width as usize;
        if width == 0 {
            return;
        }
        let fill_row = |(y, row): (usize, &mut [T])| {
            for (x, dst) in row.iter_mut().enumerate() {
                *dst = convert(self.count(x as u32, y as u32));
            }
        };

        if self.parallel {
            out.par_chunks_mut(width).enumerate().for_each(fill_row);
        } else {
            out.chunks_mut(width).enumerate().for_each(fill_row);
        }
    }
}
