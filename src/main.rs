//! Background Estimation CLI
//!
//! Reads a directory of frames, estimates the static background and
//! writes it as `output_<S>_<N>.png` into the output directory.

use bg_estimate::{
    capture::{ConfigError, FileConfig, ImageSequenceSource, ModelConfig, DEFAULT_N, DEFAULT_S},
    estimator::{LoggingObserver, Pipeline},
    metrics::MetricsRegistry,
    output::PngSink,
    EstimationError,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "bg-estimate", version, about = "Estimate the static background of a frame sequence")]
struct Args {
    /// Directory holding the input frames, read in file-name order
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving the background image
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// History capacity per region (S)
    #[arg(short = 's', long = "s-parameter")]
    s_param: Option<u32>,

    /// Divisor controlling the motion window size (N)
    #[arg(short = 'n', long = "n-parameter")]
    n_param: Option<u32>,

    /// Use the default parameter set (S = 19, N = 3)
    #[arg(short, long)]
    default: bool,

    /// Log per-frame motion statistics
    #[arg(short, long)]
    visualization: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Side of the square regions (1 = pixel-level)
    #[arg(long)]
    block_size: Option<u32>,

    /// L1 distance above which a pixel counts as moving
    #[arg(long)]
    threshold: Option<u32>,

    /// Write run metrics in Prometheus text format to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// Run every stage on the calling thread
    #[arg(long)]
    sequential: bool,
}

/// Resolved run settings.
struct Settings {
    model: ModelConfig,
    output: PathBuf,
    metrics_file: Option<PathBuf>,
}

fn resolve(args: &Args) -> Result<Settings, ConfigError> {
    let file = match &args.config {
        Some(path) => Some(FileConfig::from_file(path)?),
        None => None,
    };
    let section = file.as_ref().map(|f| f.model.clone()).unwrap_or_default();

    // --default wins, then flags, then the config file.
    let (s_param, n_param) = if args.default {
        (DEFAULT_S, DEFAULT_N)
    } else {
        (
            args.s_param
                .or(section.s_param)
                .ok_or(ConfigError::MissingParameter("S"))?,
            args.n_param
                .or(section.n_param)
                .ok_or(ConfigError::MissingParameter("N"))?,
        )
    };
    let mut model = section.with_params(s_param, n_param);

    if let Some(block_size) = args.block_size {
        model.block_size = block_size;
    }
    if let Some(threshold) = args.threshold {
        model.motion_threshold = threshold;
    }
    if args.sequential {
        model.parallel = false;
    }
    model.validate()?;

    let output = args
        .output
        .clone()
        .or_else(|| file.as_ref().and_then(|f| f.output.directory.clone()))
        .ok_or(ConfigError::MissingParameter("output"))?;
    let metrics_file = args
        .metrics_file
        .clone()
        .or_else(|| file.as_ref().and_then(|f| f.output.metrics_file.clone()));

    Ok(Settings {
        model,
        output,
        metrics_file,
    })
}

fn run(args: Args) -> Result<(), EstimationError> {
    let settings = resolve(&args)?;
    let model = settings.model;

    info!("Input sequence: {}", args.input.display());
    info!("   Output path: {}", settings.output.display());
    info!("             S: {}", model.s_param);
    info!("             N: {}", model.n_param);
    info!("    Block size: {}", model.block_size);
    info!("     Threshold: {}", model.motion_threshold);
    info!(" Visualization: {}", args.visualization);

    let mut source = ImageSequenceSource::open(&args.input)?;
    let mut sink = PngSink::in_directory(&settings.output, model.s_param, model.n_param);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let metrics = match &settings.metrics_file {
        Some(_) => match MetricsRegistry::new() {
            Ok(registry) => Some(Arc::new(registry)),
            Err(e) => {
                warn!("Metrics disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let mut pipeline = Pipeline::new(model.clone()).with_cancel_flag(cancel);
    if args.visualization {
        pipeline = pipeline.with_observer(Box::new(LoggingObserver::new(model.motion_threshold)));
    }
    if let Some(metrics) = &metrics {
        pipeline = pipeline.with_metrics(Arc::clone(metrics));
    }

    let report = pipeline.run(&mut source, &mut sink)?;

    if report.cancelled {
        warn!("Run cancelled: the written background is a partial estimate");
    }
    info!(
        "Processed {} of {} frames (kernel size {}): {} admitted, {} rejected",
        report.frames_processed,
        report.frames_read,
        report.kernel_size,
        report.totals.admitted(),
        report.totals.rejected
    );
    info!("Background written to {}", sink.path().display());

    if let (Some(metrics), Some(path)) = (&metrics, &settings.metrics_file) {
        match metrics.encode() {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    warn!("Failed to write metrics to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to encode metrics: {}", e),
        }
    }

    Ok(())
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Background Estimator v{}", bg_estimate::VERSION);

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn resolve_args(args: &[&str]) -> Result<Settings, ConfigError> {
        let mut argv = vec!["bg-estimate", "-i", "in"];
        argv.extend_from_slice(args);
        resolve(&Args::parse_from(argv))
    }

    #[test]
    fn test_missing_s_flag() {
        let result = resolve_args(&["-o", "out", "-n", "3"]);
        assert_eq!(result.err(), Some(ConfigError::MissingParameter("S")));
    }

    #[test]
    fn test_missing_n_flag() {
        let result = resolve_args(&["-o", "out", "-s", "5"]);
        assert_eq!(result.err(), Some(ConfigError::MissingParameter("N")));
    }

    #[test]
    fn test_config_without_params_is_missing_s() {
        let file = config_file("[output]\ndirectory = \"out\"\n");
        let path = file.path().to_str().unwrap();

        let result = resolve_args(&["--config", path]);
        assert_eq!(result.err(), Some(ConfigError::MissingParameter("S")));
    }

    #[test]
    fn test_config_supplies_params() {
        let file = config_file("[model]\ns_param = 7\nn_param = 2\nblock_size = 4\n");
        let path = file.path().to_str().unwrap();

        let settings = resolve_args(&["-o", "out", "--config", path]).unwrap();
        assert_eq!((settings.model.s_param, settings.model.n_param), (7, 2));
        assert_eq!(settings.model.block_size, 4);
    }

    #[test]
    fn test_flags_override_config() {
        let file = config_file("[model]\ns_param = 7\nn_param = 2\n");
        let path = file.path().to_str().unwrap();

        let settings = resolve_args(&["-o", "out", "--config", path, "-s", "9"]).unwrap();
        assert_eq!((settings.model.s_param, settings.model.n_param), (9, 2));
    }

    #[test]
    fn test_default_switch() {
        let settings = resolve_args(&["-o", "out", "--default"]).unwrap();
        assert_eq!(settings.model.s_param, DEFAULT_S);
        assert_eq!(settings.model.n_param, DEFAULT_N);
        assert_eq!(settings.output, PathBuf::from("out"));
    }

    #[test]
    fn test_missing_output() {
        let result = resolve_args(&["-s", "3", "-n", "3"]);
        assert_eq!(result.err(), Some(ConfigError::MissingParameter("output")));
    }
}
