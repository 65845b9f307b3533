//! Metrics collection and registry.

use crate::estimator::BackgroundEstimator;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of run state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames inserted into the histories.
    pub frames_processed: u64,
    /// Frames consumed without insertion (the priming frame).
    pub frames_skipped: u64,
    /// Candidates added to regions that still had room.
    pub candidates_added: u64,
    /// Candidates evicted by a lower-score sample.
    pub candidates_evicted: u64,
    /// Samples discarded by full regions.
    pub candidates_rejected: u64,
    /// Smoothing window size.
    pub kernel_size: u32,
    /// Fraction of history slots in use.
    pub history_fill_ratio: f64,
    /// Mean motion score of the latest frame.
    pub mean_score: Option<f64>,
}

/// Prometheus metrics registry for an estimation run.
pub struct MetricsRegistry {
    registry: Registry,

    // Frame metrics
    frames_processed: IntCounter,
    frames_skipped: IntCounter,

    // History metrics
    candidates_added: IntCounter,
    candidates_evicted: IntCounter,
    candidates_rejected: IntCounter,
    history_fill_ratio: Gauge,

    // Motion metrics
    kernel_size: IntGauge,
    mean_score: Gauge,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all run metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_processed = IntCounter::new(
            "bg_estimate_frames_processed_total",
            "Frames inserted into the region histories",
        )?;
        let frames_skipped = IntCounter::new(
            "bg_estimate_frames_skipped_total",
            "Frames consumed without insertion",
        )?;

        let candidates_added = IntCounter::new(
            "bg_estimate_candidates_added_total",
            "Candidates added to regions with free capacity",
        )?;
        let candidates_evicted = IntCounter::new(
            "bg_estimate_candidates_evicted_total",
            "Candidates evicted by a lower-score sample",
        )?;
        let candidates_rejected = IntCounter::new(
            "bg_estimate_candidates_rejected_total",
            "Samples discarded by full regions",
        )?;
        let history_fill_ratio = Gauge::new(
            "bg_estimate_history_fill_ratio",
            "Fraction of history slots in use",
        )?;

        let kernel_size = IntGauge::new(
            "bg_estimate_kernel_size",
            "Side of the motion smoothing window",
        )?;
        let mean_score = Gauge::new(
            "bg_estimate_mean_score",
            "Mean motion score of the latest frame",
        )?;

        registry.register(Box::new(frames_processed.clone()))?;
        registry.register(Box::new(frames_skipped.clone()))?;
        registry.register(Box::new(candidates_added.clone()))?;
        registry.register(Box::new(candidates_evicted.clone()))?;
        registry.register(Box::new(candidates_rejected.clone()))?;
        registry.register(Box::new(history_fill_ratio.clone()))?;
        registry.register(Box::new(kernel_size.clone()))?;
        registry.register(Box::new(mean_score.clone()))?;

        Ok(Self {
            registry,
            frames_processed,
            frames_skipped,
            candidates_added,
            candidates_evicted,
            candidates_rejected,
            history_fill_ratio,
            kernel_size,
            mean_score,
        })
    }

    /// Updates all metrics from a snapshot of run state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // Counters only move forward, so apply the difference.
        advance(&self.frames_processed, snapshot.frames_processed);
        advance(&self.frames_skipped, snapshot.frames_skipped);
        advance(&self.candidates_added, snapshot.candidates_added);
        advance(&self.candidates_evicted, snapshot.candidates_evicted);
        advance(&self.candidates_rejected, snapshot.candidates_rejected);

        self.history_fill_ratio.set(snapshot.history_fill_ratio);
        self.kernel_size.set(snapshot.kernel_size as i64);
        if let Some(score) = snapshot.mean_score {
            self.mean_score.set(score);
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current state of an estimator.
    pub fn from_estimator(estimator: &BackgroundEstimator) -> Self {
        let totals = estimator.totals();
        let processed = estimator.frames_processed();

        Self {
            frames_processed: processed,
            frames_skipped: u64::from(estimator.is_primed()),
            candidates_added: totals.added,
            candidates_evicted: totals.replaced,
            candidates_rejected: totals.rejected,
            kernel_size: estimator.kernel_size(),
            history_fill_ratio: estimator.history().fill_ratio(),
            mean_score: (processed > 0).then(|| estimator.scores().mean()),
        }
    }
}
