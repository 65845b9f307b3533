//! Live preview hook.

use crate::capture::Frame;
use crate::history::InsertStats;
use crate::motion::{MotionMap, ScoreMap};

/// Everything computed for one processed frame.
#[derive(Debug, Clone, Copy)]
pub struct FramePreview<'a> {
    /// The frame just inserted.
    pub frame: &'a Frame,
    /// Raw motion indicator against the previous frame.
    pub motion: &'a MotionMap,
    /// Smoothed motion scores.
    pub scores: &'a ScoreMap,
    /// Background estimated from the histories so far.
    pub background: &'a Frame,
    /// Admission counts of this frame.
    pub stats: InsertStats,
}

/// Observer invoked after every processed frame.
///
/// Observers only read; nothing they do feeds back into the estimate.
pub trait PreviewObserver {
    /// Called after every inserted frame.
    fn on_frame(&self, preview: &FramePreview<'_>);
}

impl<F> PreviewObserver for F
where
    F: Fn(&FramePreview<'_>),
{
    fn on_frame(&self, preview: &FramePreview<'_>) {
        self(preview)
    }
}

/// Logs per-frame motion statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver {
    threshold: u32,
}

impl LoggingObserver {
    /// Creates an observer counting pixels above `threshold` as moving.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl PreviewObserver for LoggingObserver {
    fn on_frame(&self, preview: &FramePreview<'_>) {
        let area = preview.motion.dimensions().area().max(1);
        let moving = preview.motion.count_above(self.threshold) as f64 / area as f64;

        tracing::info!(
            sequence = preview.frame.sequence(),
            moving = format_args!("{:.4}", moving),
            mean_score = format_args!("{:.2}", preview.scores.mean()),
            added = preview.stats.added,
            replaced = preview.stats.replaced,
            rejected = preview.stats.rejected,
            "Frame processed"
        );
    }
}
