//! Per-pixel motion maps.

use crate::capture::Dimensions;

/// Raw per-pixel motion indicator produced by frame differencing.
///
/// Each value is the L1 distance between the colors of one location in two
/// consecutive frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionMap {
    dimensions: Dimensions,
    values: Vec<u32>,
}

impl MotionMap {
    /// Creates a zeroed map.
    pub fn zeros(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            values: vec![0; dimensions.area()],
        }
    }

    /// Creates a map from row-major values.
    ///
    /// Returns `None` if the value count does not match the dimensions.
    pub fn from_values(dimensions: Dimensions, values: Vec<u32>) -> Option<Self> {
        (values.len() == dimensions.area()).then_some(Self { dimensions, values })
    }

    /// Map size.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Raw distances in row-major order.
    #[inline]
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    #[inline]
    pub(crate) fn values_mut(&mut self) -> &mut [u32] {
        &mut self.values
    }

    /// Resizes the map in place, discarding its previous content.
    pub(crate) fn reset(&mut self, dimensions: Dimensions) {
        self.dimensions = dimensions;
        self.values.clear();
        self.values.resize(dimensions.area(), 0);
    }

    /// Number of locations whose indicator is strictly above `threshold`.
    pub fn count_above(&self, threshold: u32) -> usize {
        self.values.iter().filter(|&&v| v > threshold).count()
    }
}

/// Storage width of a [`ScoreMap`].
///
/// Chosen once from the window area so every score fits without overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreEncoding {
    /// Windows of up to 255 locations.
    U8,
    /// Windows of up to 65535 locations.
    U16,
    /// Larger windows.
    U32,
}

impl ScoreEncoding {
    /// Narrowest encoding able to hold counts up to `max_value`.
    pub fn for_max_value(max_value: u64) -> Self {
        if max_value <= u8::MAX as u64 {
            ScoreEncoding::U8
        } else if max_value <= u16::MAX as u64 {
            ScoreEncoding::U16
        } else {
            ScoreEncoding::U32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScoreValues {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

/// Smoothed per-pixel motion scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreMap {
    dimensions: Dimensions,
    values: ScoreValues,
}

impl ScoreMap {
    /// Creates a zeroed map stored with `encoding`.
    pub fn zeros(dimensions: Dimensions, encoding: ScoreEncoding) -> Self {
        let area = dimensions.area();
        let values = match encoding {
            ScoreEncoding::U8 => ScoreValues::U8(vec![0; area]),
            ScoreEncoding::U16 => ScoreValues::U16(vec![0; area]),
            ScoreEncoding::U32 => ScoreValues::U32(vec![0; area]),
        };
        Self { dimensions, values }
    }

    /// Map size.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Integer width of the stored scores.
    pub fn encoding(&self) -> ScoreEncoding {
        match self.values {
            ScoreValues::U8(_) => ScoreEncoding::U8,
            ScoreValues::U16(_) => ScoreEncoding::U16,
            ScoreValues::U32(_) => ScoreEncoding::U32,
        }
    }

    /// Score at linear index `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> u32 {
        match &self.values {
            ScoreValues::U8(v) => v[idx] as u32,
            ScoreValues::U16(v) => v[idx] as u32,
            ScoreValues::U32(v) => v[idx],
        }
    }

    /// Score at column `x`, row `y`.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> u32 {
        self.get(self.dimensions.index(x, y))
    }

    /// All scores widened to `u32`, row-major.
    pub fn to_vec(&self) -> Vec<u32> {
        (0..self.dimensions.area()).map(|i| self.get(i)).collect()
    }

    /// Mean score over the map, 0 for an empty map.
    pub fn mean(&self) -> f64 {
        let area = self.dimensions.area();
        if area == 0 {
            return 0.0;
        }
        let total: u64 = (0..area).map(|i| self.get(i) as u64).sum();
        total as f64 / area as f64
    }

    pub(crate) fn values_mut(&mut self) -> &mut ScoreValues {
        &mut self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_selection() {
        assert_eq!(ScoreEncoding::for_max_value(1), ScoreEncoding::U8);
        assert_eq!(ScoreEncoding::for_max_value(225), ScoreEncoding::U8);
        assert_eq!(ScoreEncoding::for_max_value(289), ScoreEncoding::U16);
        assert_eq!(ScoreEncoding::for_max_value(65_536), ScoreEncoding::U32);
    }

    #[test]
    fn test_motion_map_shape_checked() {
        let dims = Dimensions::new(2, 3);
        assert!(MotionMap::from_values(dims, vec![0; 6]).is_some());
        assert!(MotionMap::from_values(dims, vec![0; 5]).is_none());
    }

    #[test]
    fn test_count_above() {
        let map = MotionMap::from_values(Dimensions::new(1, 4), vec![0, 3, 10, 0]).unwrap();
        assert_eq!(map.count_above(0), 2);
        assert_eq!(map.count_above(3), 1);
    }
}
