//! Prometheus metrics for estimation runs.
//!
//! # Metrics Exposed
//!
//! ## Frames
//! - `bg_estimate_frames_processed_total` - Frames inserted into the histories
//! - `bg_estimate_frames_skipped_total` - Frames consumed without insertion
//!
//! ## History
//! - `bg_estimate_candidates_added_total` - Candidates added to non-full regions
//! - `bg_estimate_candidates_evicted_total` - Candidates evicted by a calmer sample
//! - `bg_estimate_candidates_rejected_total` - Samples discarded by full regions
//! - `bg_estimate_history_fill_ratio` - Fraction of history slots in use
//!
//! ## Motion
//! - `bg_estimate_kernel_size` - Side of the smoothing window
//! - `bg_estimate_mean_score` - Mean motion score of the latest frame
//!
//! # Example
//!
//! ```no_run
//! use bg_estimate::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     frames_processed: 120,
//!     frames_skipped: 1,
//!     kernel_size: 81,
//!     history_fill_ratio: 1.0,
//!     ..Default::default()
//! };
//!
//! registry.update(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
