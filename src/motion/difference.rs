//! Motion indicator via frame differencing.
//!
//! Each location of the output holds the L1 distance between the colors
//! of two consecutive frames: the sum over channels of the absolute
//! per-channel differences. The sum is symmetric in the channels and
//! monotonic in each channel difference.

use super::{map::MotionMap, MotionError};
use crate::capture::Frame;

/// Computes raw motion indicators between consecutive frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameDifference;

impl FrameDifference {
    /// Creates the difference stage.
    pub fn new() -> Self {
        Self
    }

    /// Returns the L1 distance map between `previous` and `current`.
    pub fn compute(&self, previous: &Frame, current: &Frame) -> Result<MotionMap, MotionError> {
        let mut out = MotionMap::zeros(current.dimensions());
        self.compute_into(previous, current, &mut out)?;
        Ok(out)
    }

    /// Writes the L1 distance map into `out`, resizing it if needed.
    pub fn compute_into(
        &self,
        previous: &Frame,
        current: &Frame,
        out: &mut MotionMap,
    ) -> Result<(), MotionError> {
        if previous.dimensions() != current.dimensions() {
            return Err(MotionError::DimensionMismatch {
                expected: previous.dimensions(),
                actual: current.dimensions(),
            });
        }
        if previous.channels() != current.channels() {
            return Err(MotionError::ChannelMismatch {
                expected: previous.channels(),
                actual: current.channels(),
            });
        }

        let channels = current.channels();
        out.reset(current.dimensions());

        for ((dst, prev), cur) in out
            .values_mut()
            .iter_mut()
            .zip(previous.pixels().chunks_exact(channels))
            .zip(current.pixels().chunks_exact(channels))
        {
            *dst = prev
                .iter()
                .zip(cur)
                .map(|(&p, &c)| p.abs_diff(c) as u32)
                .sum();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Dimensions;

    #[test]
    fn test_identical_frames_zero_difference() {
        let dims = Dimensions::new(8, 8);
        let frame1 = Frame::filled(dims, &[100, 50, 25], 1).unwrap();
        let frame2 = Frame::filled(dims, &[100, 50, 25], 2).unwrap();

        let map = FrameDifference::new().compute(&frame1, &frame2).unwrap();
        assert!(map.values().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_channels_are_summed() {
        let dims = Dimensions::new(2, 2);
        let frame1 = Frame::filled(dims, &[100, 50, 25], 1).unwrap();
        let frame2 = Frame::filled(dims, &[90, 60, 25], 2).unwrap();

        let map = FrameDifference::new().compute(&frame1, &frame2).unwrap();
        assert!(map.values().iter().all(|&v| v == 20));
    }

    #[test]
    fn test_difference_is_symmetric() {
        let dims = Dimensions::new(1, 3);
        let a = Frame::new(vec![0, 128, 255], dims, 1, 0).unwrap();
        let b = Frame::new(vec![255, 128, 0], dims, 1, 1).unwrap();

        let diff = FrameDifference::new();
        assert_eq!(diff.compute(&a, &b).unwrap(), diff.compute(&b, &a).unwrap());
        assert_eq!(diff.compute(&a, &b).unwrap().values(), &[255, 0, 255]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Frame::filled(Dimensions::new(4, 4), &[0], 0).unwrap();
        let b = Frame::filled(Dimensions::new(4, 5), &[0], 1).unwrap();

        assert!(matches!(
            FrameDifference::new().compute(&a, &b),
            Err(MotionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_channel_mismatch() {
        let dims = Dimensions::new(2, 2);
        let a = Frame::filled(dims, &[0], 0).unwrap();
        let b = Frame::filled(dims, &[0, 0, 0], 1).unwrap();

        assert!(matches!(
            FrameDifference::new().compute(&a, &b),
            Err(MotionError::ChannelMismatch { expected: 1, actual: 3 })
        ));
    }
}
