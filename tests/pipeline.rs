//! End-to-end scenarios over in-memory and on-disk sequences.

use bg_estimate::capture::{
    Dimensions, Frame, FrameSource, ImageSequenceSource, MemorySource, ModelConfig, SourceError,
};
use bg_estimate::estimator::{BackgroundEstimator, Pipeline};
use bg_estimate::history::{PatchesHistory, PixelPartition};
use bg_estimate::output::{MemorySink, PngSink};
use bg_estimate::EstimationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const BACKGROUND: u8 = 100;
const OBJECT: u8 = 255;

/// 12x12 gray frames with a 3x3 object stepping three columns per frame.
fn moving_object_sequence(frames: u64) -> Vec<Frame> {
    let dims = Dimensions::new(12, 12);
    (0..frames)
        .map(|i| {
            let left = (3 * i as u32) % 12;
            let mut pixels = vec![BACKGROUND; dims.area()];
            for y in 4..7 {
                for x in left..left + 3 {
                    pixels[dims.index(x, y)] = OBJECT;
                }
            }
            Frame::new(pixels, dims, 1, i).unwrap()
        })
        .collect()
}

fn run_in_memory(frames: Vec<Frame>, config: ModelConfig) -> Result<Frame, EstimationError> {
    let mut sink = MemorySink::new();
    Pipeline::new(config).run(&mut MemorySource::new(frames), &mut sink)?;
    Ok(sink.last().cloned().expect("background written"))
}

#[test]
fn static_scene_yields_uniform_color() {
    let dims = Dimensions::new(6, 8);
    let color = [12, 200, 77];

    for (s, n) in [(1, 1), (3, 2), (19, 3), (2, 50)] {
        let frames = (0..5).map(|i| Frame::filled(dims, &color, i).unwrap()).collect();
        let background = run_in_memory(frames, ModelConfig::with_params(s, n)).unwrap();

        assert_eq!(background.dimensions(), dims);
        assert_eq!(background.channels(), 3);
        assert!(background.pixels().chunks(3).all(|p| p == color));
    }
}

#[test]
fn moving_object_is_removed() {
    let mut config = ModelConfig::with_params(3, 4);
    config.parallel = false;
    let background = run_in_memory(moving_object_sequence(40), config).unwrap();

    assert!(background.pixels().iter().all(|&v| v == BACKGROUND));
}

#[test]
fn moving_object_is_removed_with_blocks() {
    let mut config = ModelConfig::with_params(3, 4);
    config.block_size = 2;
    let background = run_in_memory(moving_object_sequence(40), config).unwrap();

    assert!(background.pixels().iter().all(|&v| v == BACKGROUND));
}

#[test]
fn single_outlier_is_evicted() {
    let mut history =
        PatchesHistory::from_partitioner(Dimensions::new(1, 1), &PixelPartition, 3).unwrap();
    for (value, score) in [(200, 5), (10, 1), (20, 1), (30, 1)] {
        history.insert(0, &[value], score).unwrap();
    }

    let held = history.candidates(0).unwrap();
    assert_eq!(held.iter().map(|c| c.score).collect::<Vec<_>>(), vec![1, 1, 1]);
    assert_eq!(held.iter().map(|c| c.value[0]).collect::<Vec<_>>(), vec![10, 20, 30]);
    assert_eq!(history.aggregate().unwrap().pixels(), &[20]);
}

#[test]
fn even_count_takes_lower_median() {
    let mut history =
        PatchesHistory::from_partitioner(Dimensions::new(1, 1), &PixelPartition, 2).unwrap();
    history.insert(0, &[10], 0).unwrap();
    history.insert(0, &[20], 0).unwrap();

    assert_eq!(history.aggregate().unwrap().pixels(), &[10]);
}

#[test]
fn first_frame_leaves_histories_empty() {
    let dims = Dimensions::new(5, 5);
    let mut estimator = BackgroundEstimator::new(ModelConfig::with_params(4, 2), dims).unwrap();
    estimator
        .process(Frame::filled(dims, &[1, 2, 3], 0).unwrap())
        .unwrap();

    let history = estimator.history();
    assert!((0..history.region_count()).all(|r| history.candidates(r).unwrap().is_empty()));
}

#[test]
fn dimension_mismatch_aborts_without_output() {
    let dims = Dimensions::new(4, 4);
    let frames = vec![
        Frame::filled(dims, &[1], 0).unwrap(),
        Frame::filled(dims, &[1], 1).unwrap(),
        Frame::filled(Dimensions::new(4, 3), &[1], 2).unwrap(),
        Frame::filled(dims, &[1], 3).unwrap(),
    ];
    let mut sink = MemorySink::new();

    let result = Pipeline::new(ModelConfig::with_params(2, 1))
        .run(&mut MemorySource::new(frames), &mut sink);

    assert!(matches!(result, Err(EstimationError::DimensionMismatch { .. })));
    assert!(sink.is_empty());
}

#[test]
fn reported_dimensions_are_enforced() {
    let frames = vec![Frame::filled(Dimensions::new(3, 3), &[1], 0).unwrap()];
    let mut source = MemorySource::with_dimensions(frames, Dimensions::new(4, 4));

    let result = Pipeline::new(ModelConfig::default()).run(&mut source, &mut MemorySink::new());
    assert!(matches!(result, Err(EstimationError::DimensionMismatch { .. })));
}

#[test]
fn invalid_parameters_are_rejected_before_processing() {
    let frames = moving_object_sequence(3);
    let result = Pipeline::new(ModelConfig::with_params(1, 0))
        .run(&mut MemorySource::new(frames), &mut MemorySink::new());

    assert!(matches!(result, Err(EstimationError::Configuration(_))));
}

/// Raises the cancellation flag after delivering `limit` frames.
struct CancellingSource {
    inner: MemorySource,
    flag: Arc<AtomicBool>,
    delivered: usize,
    limit: usize,
}

impl FrameSource for CancellingSource {
    fn dimensions(&self) -> Dimensions {
        self.inner.dimensions()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        self.delivered += 1;
        if self.delivered == self.limit {
            self.flag.store(true, Ordering::SeqCst);
        }
        self.inner.next_frame()
    }
}

#[test]
fn cancellation_still_writes_partial_estimate() {
    let dims = Dimensions::new(4, 4);
    let frames = (0..10).map(|i| Frame::filled(dims, &[42], i).unwrap()).collect();
    let flag = Arc::new(AtomicBool::new(false));
    let mut source = CancellingSource {
        inner: MemorySource::new(frames),
        flag: Arc::clone(&flag),
        delivered: 0,
        limit: 3,
    };
    let mut sink = MemorySink::new();

    let report = Pipeline::new(ModelConfig::with_params(5, 1))
        .with_cancel_flag(flag)
        .run(&mut source, &mut sink)
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.frames_read, 3);
    assert_eq!(report.frames_processed, 2);
    assert_eq!(sink.last().unwrap().pixels(), &[42; 16]);
}

#[test]
fn png_sequence_round_trip() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();

    for frame in moving_object_sequence(24) {
        let image = image::GrayImage::from_raw(12, 12, frame.pixels().to_vec()).unwrap();
        image
            .save(input.path().join(format!("frame_{:04}.png", frame.sequence())))
            .unwrap();
    }

    let config = ModelConfig::with_params(3, 4);
    let mut source = ImageSequenceSource::open(input.path()).unwrap();
    let mut sink = PngSink::in_directory(output.path(), config.s_param, config.n_param);
    let report = Pipeline::new(config).run(&mut source, &mut sink).unwrap();

    assert_eq!(report.frames_read, 24);
    let written = image::open(output.path().join("output_3_4.png")).unwrap().to_luma8();
    assert_eq!(written.dimensions(), (12, 12));
    assert!(written.pixels().all(|p| p.0[0] == BACKGROUND));
}
