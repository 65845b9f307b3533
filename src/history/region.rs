//! Regions of interest and frame partitioning.
//!
//! A region is the unit the history works on. Regions are rectangles that
//! tile the frame exactly; the tiling is supplied by a [`Partitioner`].

use super::HistoryError;
use crate::capture::{Dimensions, Frame, Pixel, MAX_CHANNELS};
use crate::motion::ScoreMap;

/// Index of a region in its partition.
pub type RegionId = usize;

/// A rectangular group of pixel locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Creates a region with its top-left corner at (x, y).
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A single-pixel region.
    pub fn pixel(x: u32, y: u32) -> Self {
        Self::new(x, y, 1, 1)
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Iterates over the (x, y) locations covered by the region, row-major.
    pub fn locations(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }

    fn fits(&self, dimensions: Dimensions) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= dimensions.width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= dimensions.height)
    }

    /// Value the region contributes from `frame`.
    ///
    /// Single-pixel regions take the pixel itself; larger regions take the
    /// rounded per-channel mean of their pixels.
    pub fn sample(&self, frame: &Frame) -> Pixel {
        if self.area() == 1 {
            return frame.pixel(self.x, self.y);
        }

        let channels = frame.channels();
        let mut sums = [0u64; MAX_CHANNELS];
        for (x, y) in self.locations() {
            for (sum, &value) in sums.iter_mut().zip(frame.channel_slice(x, y)) {
                *sum += value as u64;
            }
        }

        let area = self.area() as u64;
        let mut out = [0u8; MAX_CHANNELS];
        for (dst, sum) in out.iter_mut().zip(sums).take(channels) {
            *dst = ((sum + area / 2) / area) as u8;
        }
        out
    }

    /// Motion score of the region: the sum of the scores it covers.
    pub fn score(&self, scores: &ScoreMap) -> u64 {
        if self.area() == 1 {
            return scores.at(self.x, self.y) as u64;
        }
        self.locations().map(|(x, y)| scores.at(x, y) as u64).sum()
    }
}

/// Splits a frame into regions covering every pixel exactly once.
pub trait Partitioner: Send + Sync {
    /// Returns the regions of a frame of `dimensions`, in id order.
    fn partition(&self, dimensions: Dimensions) -> Vec<Region>;
}

/// One region per pixel.
#[derive(Debug, Default, Clone, Copy)]
pub struct PixelPartition;

impl Partitioner for PixelPartition {
    fn partition(&self, dimensions: Dimensions) -> Vec<Region> {
        (0..dimensions.height)
            .flat_map(|y| (0..dimensions.width).map(move |x| Region::pixel(x, y)))
            .collect()
    }
}

/// Square tiles of `size` pixels, clipped at the right and bottom edges.
#[derive(Debug, Clone, Copy)]
pub struct BlockPartition {
    size: u32,
}

impl BlockPartition {
    /// Creates tiles of `size` pixels; 0 is raised to 1.
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }

    /// Tile side length.
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Partitioner for BlockPartition {
    fn partition(&self, dimensions: Dimensions) -> Vec<Region> {
        let size = self.size;
        (0..dimensions.height)
            .step_by(size as usize)
            .flat_map(|y| {
                (0..dimensions.width).step_by(size as usize).map(move |x| {
                    Region::new(
                        x,
                        y,
                        size.min(dimensions.width - x),
                        size.min(dimensions.height - y),
                    )
                })
            })
            .collect()
    }
}

/// Returns the partitioner for a region side length (1 means pixel-level).
pub fn partitioner_for_block_size(block_size: u32) -> Box<dyn Partitioner> {
    if block_size <= 1 {
        Box::new(PixelPartition)
    } else {
        Box::new(BlockPartition::new(block_size))
    }
}

/// Checks that `regions` tile `dimensions` with no gap and no overlap.
pub fn verify_partition(dimensions: Dimensions, regions: &[Region]) -> Result<(), HistoryError> {
    let mut covered = vec![false; dimensions.area()];

    for (id, region) in regions.iter().enumerate() {
        if !region.fits(dimensions) {
            return Err(HistoryError::InvalidPartition(format!(
                "region {id} ({region:?}) lies outside {dimensions}"
            )));
        }
        for (x, y) in region.locations() {
            let slot = &mut covered[dimensions.index(x, y)];
            if *slot {
                return Err(HistoryError::InvalidPartition(format!(
                    "location ({x}, {y}) is covered twice"
                )));
            }
            *slot = true;
        }
    }

    if let Some(idx) = covered.iter().position(|&c| !c) {
        let width = dimensions.width as usize;
        return Err(HistoryError::InvalidPartition(format!(
            "location ({}, {}) is not covered",
            idx % width,
            idx / width
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionMap, MotionProbabilityFilter};

    #[test]
    fn test_pixel_partition_covers_frame() {
        let dims = Dimensions::new(3, 4);
        let regions = PixelPartition.partition(dims);

        assert_eq!(regions.len(), 12);
        assert_eq!(regions[5], Region::pixel(1, 1));
        assert!(verify_partition(dims, &regions).is_ok());
    }

    #[test]
    fn test_block_partition_clips_edges() {
        let dims = Dimensions::new(5, 7);
        let regions = BlockPartition::new(3).partition(dims);

        assert_eq!(regions.len(), 6);
        assert_eq!(regions[2], Region::new(6, 0, 1, 3));
        assert_eq!(regions[5], Region::new(6, 3, 1, 2));
        assert!(verify_partition(dims, &regions).is_ok());
    }

    #[test]
    fn test_overlap_rejected() {
        let dims = Dimensions::new(1, 2);
        let regions = vec![Region::new(0, 0, 2, 1), Region::pixel(1, 0)];
        assert!(matches!(
            verify_partition(dims, &regions),
            Err(HistoryError::InvalidPartition(_))
        ));
    }

    #[test]
    fn test_gap_rejected() {
        let dims = Dimensions::new(1, 2);
        assert!(verify_partition(dims, &[Region::pixel(0, 0)]).is_err());
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let dims = Dimensions::new(2, 2);
        assert!(verify_partition(dims, &[Region::new(1, 1, 2, 2)]).is_err());
    }

    #[test]
    fn test_block_sample_is_rounded_mean() {
        let dims = Dimensions::new(1, 2);
        let frame = Frame::new(vec![10, 0, 11, 255], dims, 2, 0).unwrap();
        let region = Region::new(0, 0, 2, 1);

        // (10 + 11) / 2 = 10.5 rounds up, (0 + 255) / 2 = 127.5 rounds up.
        assert_eq!(region.sample(&frame), [11, 128, 0, 0]);
    }

    #[test]
    fn test_block_score_sums_pixels() {
        let dims = Dimensions::new(2, 2);
        let raw = MotionMap::from_values(dims, vec![1, 0, 0, 0]).unwrap();
        let scores = MotionProbabilityFilter::with_kernel_size(dims, 1, 0)
            .compute(&raw)
            .unwrap();

        assert_eq!(Region::new(0, 0, 2, 2).score(&scores), 1);
        assert_eq!(Region::pixel(1, 1).score(&scores), 0);
    }
}
