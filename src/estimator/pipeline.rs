//! Source-to-sink run of the estimator.

use super::observer::PreviewObserver;
use super::orchestrator::{BackgroundEstimator, FrameOutcome};
use crate::capture::{FrameSource, ModelConfig};
use crate::error::EstimationError;
use crate::history::{partitioner_for_block_size, InsertStats, Partitioner};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::output::BackgroundSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Summary of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Frames pulled from the source.
    pub frames_read: u64,
    /// Frames inserted into the histories.
    pub frames_processed: u64,
    /// Admission counts over the run.
    pub totals: InsertStats,
    /// Smoothing window size used.
    pub kernel_size: u32,
    /// True if the run stopped early on a cancellation request.
    pub cancelled: bool,
}

/// Reads every frame of a source and writes one background to a sink.
///
/// A cancellation request is honoured between frames; the background
/// estimated so far is still written.
pub struct Pipeline {
    config: ModelConfig,
    partitioner: Box<dyn Partitioner>,
    observer: Option<Box<dyn PreviewObserver>>,
    cancel: Option<Arc<AtomicBool>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Pipeline {
    /// Creates a pipeline for `config`.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            partitioner: partitioner_for_block_size(config.block_size),
            config,
            observer: None,
            cancel: None,
            metrics: None,
        }
    }

    /// Replaces the region partitioner derived from the block size.
    pub fn with_partitioner(mut self, partitioner: Box<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// Installs a preview observer on the estimator.
    pub fn with_observer(mut self, observer: Box<dyn PreviewObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stops frame delivery once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Publishes a snapshot to `metrics` after every frame.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs the estimator over `source` and emits the background to `sink`.
    ///
    /// Any error aborts the run before the sink is touched.
    pub fn run(
        self,
        source: &mut dyn FrameSource,
        sink: &mut dyn BackgroundSink,
    ) -> Result<RunReport, EstimationError> {
        let Pipeline {
            config,
            partitioner,
            observer,
            cancel,
            metrics,
        } = self;
        let cancelled = || cancel.as_ref().is_some_and(|f| f.load(Ordering::SeqCst));

        let mut estimator = BackgroundEstimator::with_partitioner(
            config,
            source.dimensions(),
            partitioner.as_ref(),
        )?;
        if let Some(observer) = observer {
            estimator = estimator.with_observer(observer);
        }

        let mut frames_read = 0u64;
        let mut was_cancelled = false;

        loop {
            if cancelled() {
                tracing::warn!(frames_read, "Cancellation requested, stopping early");
                was_cancelled = true;
                break;
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };
            frames_read += 1;

            if let FrameOutcome::Inserted(stats) = estimator.process(frame)? {
                tracing::debug!(
                    frame = frames_read,
                    admitted = stats.admitted(),
                    rejected = stats.rejected,
                    "Frame processed"
                );
            }

            if let Some(metrics) = &metrics {
                metrics.update(&MetricsSnapshot::from_estimator(&estimator));
            }
        }

        tracing::info!(
            frames_read,
            frames_processed = estimator.frames_processed(),
            "Computing background"
        );

        let report = RunReport {
            frames_read,
            frames_processed: estimator.frames_processed(),
            totals: estimator.totals(),
            kernel_size: estimator.kernel_size(),
            cancelled: was_cancelled,
        };

        let background = estimator.finish()?;
        sink.write(&background)?;

        Ok(report)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}
