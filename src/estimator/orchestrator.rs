//! Per-frame driver of the estimation stages.

use super::observer::{FramePreview, PreviewObserver};
use crate::capture::{ConfigError, Dimensions, Frame, ModelConfig};
use crate::error::EstimationError;
use crate::history::{partitioner_for_block_size, InsertStats, PatchesHistory, Partitioner};
use crate::motion::{FrameDifference, MotionMap, MotionProbabilityFilter, ScoreMap};

/// What happened to a frame handed to [`BackgroundEstimator::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The first frame only primes the difference stage.
    Skipped,
    /// The frame was offered to every region.
    Inserted(InsertStats),
}

enum State {
    AwaitingFirstFrame,
    Processing { previous: Frame },
}

/// Drives difference, filtering and insertion over a frame sequence.
///
/// The first frame is only remembered; every later frame is differenced
/// against its predecessor, scored and offered to the histories. The
/// background can be requested at any point once a second frame has
/// been processed.
pub struct BackgroundEstimator {
    config: ModelConfig,
    dimensions: Dimensions,
    difference: FrameDifference,
    filter: MotionProbabilityFilter,
    history: PatchesHistory,
    state: State,
    motion: MotionMap,
    scores: ScoreMap,
    observer: Option<Box<dyn PreviewObserver>>,
    frames_processed: u64,
    totals: InsertStats,
}

impl BackgroundEstimator {
    /// Creates an estimator using the region granularity of `config`.
    pub fn new(config: ModelConfig, dimensions: Dimensions) -> Result<Self, EstimationError> {
        let partitioner = partitioner_for_block_size(config.block_size);
        Self::with_partitioner(config, dimensions, partitioner.as_ref())
    }

    /// Creates an estimator whose regions come from `partitioner`.
    pub fn with_partitioner(
        config: ModelConfig,
        dimensions: Dimensions,
        partitioner: &dyn Partitioner,
    ) -> Result<Self, EstimationError> {
        config.validate()?;
        if dimensions.area() == 0 {
            return Err(ConfigError::InvalidDimensions(dimensions).into());
        }

        let filter =
            MotionProbabilityFilter::new(dimensions, config.n_param, config.motion_threshold)
                .with_parallel(config.parallel);
        let history =
            PatchesHistory::from_partitioner(dimensions, partitioner, config.s_param as usize)?
                .with_parallel(config.parallel);

        tracing::info!(
            %dimensions,
            s = config.s_param,
            n = config.n_param,
            kernel_size = filter.kernel_size(),
            encoding = ?filter.encoding(),
            regions = history.region_count(),
            "Estimator initialised"
        );

        Ok(Self {
            motion: MotionMap::zeros(dimensions),
            scores: ScoreMap::zeros(dimensions, filter.encoding()),
            config,
            dimensions,
            difference: FrameDifference::new(),
            filter,
            history,
            state: State::AwaitingFirstFrame,
            observer: None,
            frames_processed: 0,
            totals: InsertStats::default(),
        })
    }

    /// Installs a preview observer.
    ///
    /// With an observer the background is recomputed after every frame.
    pub fn with_observer(mut self, observer: Box<dyn PreviewObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Parameters of the run.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Frame size every processed frame must have.
    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Side of the motion smoothing window.
    #[inline]
    pub fn kernel_size(&self) -> u32 {
        self.filter.kernel_size()
    }

    /// Candidate histories built so far.
    pub fn history(&self) -> &PatchesHistory {
        &self.history
    }

    /// True once the first frame has been received.
    pub fn is_primed(&self) -> bool {
        matches!(self.state, State::Processing { .. })
    }

    /// Frames inserted into the histories (the first frame excluded).
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Admission counts accumulated over the run.
    pub fn totals(&self) -> InsertStats {
        self.totals
    }

    /// Score map of the most recently processed frame.
    pub fn scores(&self) -> &ScoreMap {
        &self.scores
    }

    /// Feeds the next frame of the sequence.
    pub fn process(&mut self, frame: Frame) -> Result<FrameOutcome, EstimationError> {
        if frame.dimensions() != self.dimensions {
            return Err(EstimationError::DimensionMismatch {
                expected: self.dimensions,
                actual: frame.dimensions(),
            });
        }

        let previous = match &self.state {
            State::AwaitingFirstFrame => {
                tracing::info!(sequence = frame.sequence(), "Skipping first frame");
                self.state = State::Processing { previous: frame };
                return Ok(FrameOutcome::Skipped);
            }
            State::Processing { previous } => previous,
        };

        self.difference
            .compute_into(previous, &frame, &mut self.motion)?;
        self.filter.compute_into(&self.motion, &mut self.scores)?;
        let stats = self.history.insert_frame(&frame, &self.scores)?;

        self.frames_processed += 1;
        self.totals = InsertStats {
            added: self.totals.added + stats.added,
            replaced: self.totals.replaced + stats.replaced,
            rejected: self.totals.rejected + stats.rejected,
        };

        tracing::trace!(
            sequence = frame.sequence(),
            added = stats.added,
            replaced = stats.replaced,
            rejected = stats.rejected,
            "Frame inserted"
        );

        if let Some(observer) = &self.observer {
            let background = self.history.aggregate()?;
            observer.on_frame(&FramePreview {
                frame: &frame,
                motion: &self.motion,
                scores: &self.scores,
                background: &background,
                stats,
            });
        }

        self.state = State::Processing { previous: frame };
        Ok(FrameOutcome::Inserted(stats))
    }

    /// Background estimated from the current histories.
    pub fn background(&self) -> Result<Frame, EstimationError> {
        Ok(self.history.aggregate()?)
    }

    /// Consumes the estimator and returns the final background.
    pub fn finish(self) -> Result<Frame, EstimationError> {
        self.background()
    }
}

impl std::fmt::Debug for BackgroundEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundEstimator")
            .field("dimensions", &self.dimensions)
            .field("kernel_size", &self.filter.kernel_size())
            .field("primed", &self.is_primed())
            .field("frames_processed", &self.frames_processed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn gray(dims: Dimensions, value: u8, sequence: u64) -> Frame {
        Frame::filled(dims, &[value], sequence).unwrap()
    }

    #[test]
    fn test_first_frame_is_skipped() {
        let dims = Dimensions::new(4, 4);
        let mut estimator = BackgroundEstimator::new(ModelConfig::with_params(3, 2), dims).unwrap();

        assert!(!estimator.is_primed());
        assert_eq!(estimator.process(gray(dims, 9, 0)).unwrap(), FrameOutcome::Skipped);
        assert!(estimator.is_primed());
        assert!(estimator.history().is_empty());
        assert!(matches!(
            estimator.background(),
            Err(EstimationError::EmptyHistory { .. })
        ));
    }

    #[test]
    fn test_second_frame_is_inserted() {
        let dims = Dimensions::new(4, 4);
        let mut estimator = BackgroundEstimator::new(ModelConfig::with_params(3, 2), dims).unwrap();

        estimator.process(gray(dims, 9, 0)).unwrap();
        let outcome = estimator.process(gray(dims, 9, 1)).unwrap();

        assert!(matches!(outcome, FrameOutcome::Inserted(stats) if stats.added == 16));
        assert_eq!(estimator.frames_processed(), 1);
        assert_eq!(estimator.background().unwrap().pixels(), &[9; 16]);
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let dims = Dimensions::new(4, 4);
        let mut estimator = BackgroundEstimator::new(ModelConfig::default(), dims).unwrap();

        let result = estimator.process(gray(Dimensions::new(4, 5), 0, 0));
        assert!(matches!(
            result,
            Err(EstimationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result =
            BackgroundEstimator::new(ModelConfig::with_params(0, 3), Dimensions::new(4, 4));
        assert!(matches!(
            result,
            Err(EstimationError::Configuration(ConfigError::InvalidS(0)))
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let result = BackgroundEstimator::new(ModelConfig::default(), Dimensions::new(0, 4));
        assert!(matches!(
            result,
            Err(EstimationError::Configuration(ConfigError::InvalidDimensions(_)))
        ));
    }

    #[test]
    fn test_observer_sees_every_processed_frame() {
        let dims = Dimensions::new(3, 3);
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let observer = move |preview: &FramePreview<'_>| {
            assert_eq!(preview.background.dimensions(), preview.frame.dimensions());
            seen.set(seen.get() + 1);
        };

        let mut estimator = BackgroundEstimator::new(ModelConfig::with_params(2, 1), dims)
            .unwrap()
            .with_observer(Box::new(observer));

        for seq in 0..4 {
            estimator.process(gray(dims, seq as u8, seq)).unwrap();
        }
        assert_eq!(calls.get(), 3);
    }
}
