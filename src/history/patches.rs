//! Bounded per-region candidate history.
//!
//! # Admission policy
//!
//! Each region keeps at most S candidates. While a region has room, every
//! sample is added. Once full, the held candidate with the highest motion
//! score is the eviction target; among equal scores the oldest one is
//! chosen. A new sample replaces it only if its score is strictly lower,
//! otherwise the sample is discarded. A region therefore always holds the
//! S lowest-score samples it has seen.
//!
//! In a static scene all scores are equal, nothing is ever strictly lower
//! than the worst held score, and the history keeps the first S samples.
//!
//! # Aggregation
//!
//! The background value of a region is the lower median of each channel
//! taken independently over the held candidates.

use super::median::lower_median;
use super::region::{verify_partition, Partitioner, Region, RegionId};
use super::HistoryError;
use crate::capture::{Dimensions, Frame, Pixel, MAX_CHANNELS};
use crate::motion::ScoreMap;
use rayon::prelude::*;

/// A retained sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Channel values, padded to [`MAX_CHANNELS`].
    pub value: Pixel,
    /// Motion score when the sample was taken.
    pub score: u64,
    /// Insertion order within the region, starting at 0.
    pub order: u64,
}

/// Outcome of offering a sample to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Added to a region that still had room.
    Added,
    /// Replaced the worst held candidate.
    Replaced {
        /// The candidate that was removed.
        evicted: Candidate,
    },
    /// Not admitted.
    Rejected,
}

/// Admission counts for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertStats {
    /// Samples added to regions with room.
    pub added: u64,
    /// Samples that evicted a held candidate.
    pub replaced: u64,
    /// Samples not admitted.
    pub rejected: u64,
}

impl InsertStats {
    fn record(mut self, admission: Admission) -> Self {
        match admission {
            Admission::Added => self.added += 1,
            Admission::Replaced { .. } => self.replaced += 1,
            Admission::Rejected => self.rejected += 1,
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        Self {
            added: self.added + other.added,
            replaced: self.replaced + other.replaced,
            rejected: self.rejected + other.rejected,
        }
    }

    /// Samples that entered a history.
    pub fn admitted(&self) -> u64 {
        self.added + self.replaced
    }
}

/// Candidates of one region, kept in insertion order.
#[derive(Debug, Clone, Default)]
struct RegionHistory {
    candidates: Vec<Candidate>,
    next_order: u64,
}

impl RegionHistory {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(capacity),
            next_order: 0,
        }
    }

    /// Highest score, earliest insertion among ties.
    fn worst_index(&self) -> Option<usize> {
        // Candidates are in insertion order, so the first maximum is the oldest.
        let mut worst: Option<(usize, u64)> = None;
        for (idx, candidate) in self.candidates.iter().enumerate() {
            if worst.map_or(true, |(_, score)| candidate.score > score) {
                worst = Some((idx, candidate.score));
            }
        }
        worst.map(|(idx, _)| idx)
    }

    fn insert(&mut self, capacity: usize, value: Pixel, score: u64) -> Admission {
        let candidate = Candidate {
            value,
            score,
            order: self.next_order,
        };

        if self.candidates.len() < capacity {
            self.next_order += 1;
            self.candidates.push(candidate);
            return Admission::Added;
        }

        match self.worst_index() {
            Some(idx) if score < self.candidates[idx].score => {
                self.next_order += 1;
                let evicted = self.candidates.remove(idx);
                self.candidates.push(candidate);
                Admission::Replaced { evicted }
            }
            _ => Admission::Rejected,
        }
    }

    fn median(&self, channels: usize, scratch: &mut Vec<u8>) -> Option<Pixel> {
        if self.candidates.is_empty() {
            return None;
        }
        let mut out = [0u8; MAX_CHANNELS];
        for (c, dst) in out.iter_mut().enumerate().take(channels) {
            scratch.clear();
            scratch.extend(self.candidates.iter().map(|candidate| candidate.value[c]));
            *dst = lower_median(scratch)?;
        }
        Some(out)
    }
}

/// Fixed-capacity candidate histories for every region of a frame.
#[derive(Debug, Clone)]
pub struct PatchesHistory {
    dimensions: Dimensions,
    regions: Vec<Region>,
    histories: Vec<RegionHistory>,
    capacity: usize,
    /// Channel count, fixed by the first insertion.
    channels: Option<usize>,
    frames_inserted: u64,
    parallel: bool,
}

impl PatchesHistory {
    /// Creates empty histories for `regions`, which must tile `dimensions`.
    pub fn new(
        dimensions: Dimensions,
        regions: Vec<Region>,
        capacity: usize,
    ) -> Result<Self, HistoryError> {
        if capacity < 1 {
            return Err(HistoryError::InvalidCapacity(capacity));
        }
        verify_partition(dimensions, &regions)?;

        let histories = (0..regions.len())
            .map(|_| RegionHistory::with_capacity(capacity))
            .collect();

        Ok(Self {
            dimensions,
            regions,
            histories,
            capacity,
            channels: None,
            frames_inserted: 0,
            parallel: true,
        })
    }

    /// Creates empty histories for the regions produced by `partitioner`.
    pub fn from_partitioner(
        dimensions: Dimensions,
        partitioner: &dyn Partitioner,
        capacity: usize,
    ) -> Result<Self, HistoryError> {
        Self::new(dimensions, partitioner.partition(dimensions), capacity)
    }

    /// Enables or disables the rayon pool for frame-wide operations.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Frame size the regions tile.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Maximum candidates per region (S).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Regions in id order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Number of regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Channel count established by the first insertion.
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }

    /// Number of frames fed through [`insert_frame`](Self::insert_frame).
    pub fn frames_inserted(&self) -> u64 {
        self.frames_inserted
    }

    /// Candidates held for `region`, oldest first.
    pub fn candidates(&self, region: RegionId) -> Result<&[Candidate], HistoryError> {
        self.histories
            .get(region)
            .map(|h| h.candidates.as_slice())
            .ok_or(HistoryError::UnknownRegion(region))
    }

    /// Total candidates held across all regions.
    pub fn total_candidates(&self) -> usize {
        self.histories.iter().map(|h| h.candidates.len()).sum()
    }

    /// Fraction of the total capacity in use, in [0, 1].
    pub fn fill_ratio(&self) -> f64 {
        let slots = self.regions.len() * self.capacity;
        if slots == 0 {
            return 0.0;
        }
        self.total_candidates() as f64 / slots as f64
    }

    /// True when no region holds a candidate.
    pub fn is_empty(&self) -> bool {
        self.histories.iter().all(|h| h.candidates.is_empty())
    }

    fn check_channels(&mut self, channels: usize) -> Result<(), HistoryError> {
        match self.channels {
            Some(expected) if expected != channels => Err(HistoryError::ChannelMismatch {
                expected,
                actual: channels,
            }),
            Some(_) => Ok(()),
            None if channels == 0 || channels > MAX_CHANNELS => {
                Err(HistoryError::ChannelMismatch {
                    expected: MAX_CHANNELS,
                    actual: channels,
                })
            }
            None => {
                self.channels = Some(channels);
                Ok(())
            }
        }
    }

    /// Offers one sample to one region.
    pub fn insert(
        &mut self,
        region: RegionId,
        value: &[u8],
        score: u64,
    ) -> Result<Admission, HistoryError> {
        if region >= self.histories.len() {
            return Err(HistoryError::UnknownRegion(region));
        }
        self.check_channels(value.len())?;

        let mut pixel = [0u8; MAX_CHANNELS];
        pixel[..value.len()].copy_from_slice(value);
        Ok(self.histories[region].insert(self.capacity, pixel, score))
    }

    /// Offers every region its sample of `frame` with its score from `scores`.
    pub fn insert_frame(
        &mut self,
        frame: &Frame,
        scores: &ScoreMap,
    ) -> Result<InsertStats, HistoryError> {
        for actual in [frame.dimensions(), scores.dimensions()] {
            if actual != self.dimensions {
                return Err(HistoryError::DimensionMismatch {
                    expected: self.dimensions,
                    actual,
                });
            }
        }
        self.check_channels(frame.channels())?;

        let capacity = self.capacity;
        let offer = |(region, history): (&Region, &mut RegionHistory)| {
            history.insert(capacity, region.sample(frame), region.score(scores))
        };

        let stats = if self.parallel {
            self.regions
                .par_iter()
                .zip(self.histories.par_iter_mut())
                .map(offer)
                .fold(InsertStats::default, InsertStats::record)
                .reduce(InsertStats::default, InsertStats::merge)
        } else {
            self.regions
                .iter()
                .zip(self.histories.iter_mut())
                .map(offer)
                .fold(InsertStats::default(), InsertStats::record)
        };

        self.frames_inserted += 1;
        Ok(stats)
    }

    /// Background value of one region.
    pub fn aggregate_region(&self, region: RegionId) -> Result<Pixel, HistoryError> {
        let history = self
            .histories
            .get(region)
            .ok_or(HistoryError::UnknownRegion(region))?;
        let channels = self.channels.ok_or(HistoryError::EmptyHistory { region })?;
        history
            .median(channels, &mut Vec::with_capacity(self.capacity))
            .ok_or(HistoryError::EmptyHistory { region })
    }

    /// Builds the background image from the current histories.
    ///
    /// Each region's channel-wise lower median is broadcast over the pixels
    /// it covers. Fails on the first region without candidates.
    pub fn aggregate(&self) -> Result<Frame, HistoryError> {
        let channels = self
            .channels
            .ok_or(HistoryError::EmptyHistory { region: 0 })?;
        let capacity = self.capacity;

        let medians: Vec<Option<Pixel>> = if self.parallel {
            self.histories
                .par_iter()
                .map_init(
                    || Vec::with_capacity(capacity),
                    |scratch, history| history.median(channels, scratch),
                )
                .collect()
        } else {
            let mut scratch = Vec::with_capacity(capacity);
            self.histories
                .iter()
                .map(|history| history.median(channels, &mut scratch))
                .collect()
        };

        let mut pixels = vec![0u8; self.dimensions.area() * channels];
        for (id, (region, median)) in self.regions.iter().zip(medians).enumerate() {
            let value = median.ok_or(HistoryError::EmptyHistory { region: id })?;
            for (x, y) in region.locations() {
                let start = self.dimensions.index(x, y) * channels;
                pixels[start..start + channels].copy_from_slice(&value[..channels]);
            }
        }

        Ok(Frame::new(
            pixels,
            self.dimensions,
            channels,
            self.frames_inserted,
        )?)
    }
}
