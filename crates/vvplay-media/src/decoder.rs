//! Point-cloud decoder seam.
//!
//! File-format parsing lives outside vvplay. The loader only needs two calls:
//! how many points a frame file holds, and "fill this frame from that file".

use glam::Vec3;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::trace;
use vvplay_core::{Frame, Result, VvError};

/// External point-cloud decoder.
///
/// Implementations are shared between the player and its decode thread, so
/// they take `&self` and must be `Send + Sync`.
pub trait PointCloudDecoder: Send + Sync {
    /// Number of points in the file. Zero or negative means the file
    /// cannot be decoded.
    fn count_points(&self, path: &Path) -> Result<i64>;

    /// Fill a frame pre-sized from [`count_points`](Self::count_points).
    fn load_frame(&self, path: &Path, frame: &mut Frame) -> Result<()>;

    /// Short name for log output.
    fn name(&self) -> &str {
        "decoder"
    }
}

/// Count, allocate, load.
pub fn decode_frame(decoder: &dyn PointCloudDecoder, path: &Path) -> Result<Frame> {
    let count = decoder.count_points(path)?;
    if count <= 0 {
        return Err(VvError::EmptyFrame {
            path: path.to_path_buf(),
            count,
        });
    }
    let mut frame = Frame::new(count as usize);
    decoder.load_frame(path, &mut frame)?;
    trace!("Decoded {} points from {}", count, path.display());
    Ok(frame)
}

/// Source index encoded in a `{name}{index:04}.ply` file name.
pub fn source_index_from_path(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

/// When the synthetic decoder reports a failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    Never,
    Always,
    /// Fail every source index divisible by `n`.
    EveryNth(u32),
    /// Fail exactly these source indices.
    Indices(Vec<u32>),
}

impl FailureMode {
    fn fails(&self, index: Option<u32>) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::EveryNth(n) => index.is_some_and(|i| *n > 0 && i % n == 0),
            Self::Indices(list) => index.is_some_and(|i| list.contains(&i)),
        }
    }
}

/// Procedural decoder for demos and tests.
///
/// Produces a slowly rotating sphere of `points_per_frame` points whose phase
/// follows the source index in the file name. Optionally sleeps to simulate
/// decode latency and injects failures.
#[derive(Debug)]
pub struct SyntheticDecoder {
    points_per_frame: usize,
    latency: Duration,
    failure: FailureMode,
    require_files: bool,
    decoded: AtomicU64,
    failed: AtomicU64,
}

impl SyntheticDecoder {
    pub fn new(points_per_frame: usize) -> Self {
        Self {
            points_per_frame,
            latency: Duration::ZERO,
            failure: FailureMode::Never,
            require_files: false,
            decoded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Sleep this long in every `load_frame`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_failures(mut self, failure: FailureMode) -> Self {
        self.failure = failure;
        self
    }

    /// Only decode paths that exist on disk.
    pub fn with_file_check(mut self, require_files: bool) -> Self {
        self.require_files = require_files;
        self
    }

    /// A decoder whose every frame fails.
    pub fn always_failing() -> Self {
        Self::new(0).with_failures(FailureMode::Always)
    }

    pub fn points_per_frame(&self) -> usize {
        self.points_per_frame
    }

    /// Frames successfully loaded so far.
    pub fn decoded_count(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }

    /// Failures reported so far.
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn fill(&self, index: u32, frame: &mut Frame) {
        let n = frame.point_count().max(1) as f32;
        let phase = index as f32 * 0.05;
        let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
        let (positions, colors) = frame.buffers_mut();

        for (p, (pos, rgba)) in positions
            .chunks_exact_mut(3)
            .zip(colors.chunks_exact_mut(4))
            .enumerate()
        {
            let y = 1.0 - 2.0 * (p as f32 + 0.5) / n;
            let radius = (1.0 - y * y).max(0.0).sqrt();
            let theta = p as f32 * golden + phase;
            // Captured clips are in millimetres, roughly 1 m tall
            let point = Vec3::new(theta.cos() * radius, y, theta.sin() * radius) * 500.0
                + Vec3::new(0.0, 500.0, 0.0);
            pos.copy_from_slice(&point.to_array());

            rgba[0] = (128.0 + 127.0 * theta.cos()) as u8;
            rgba[1] = (128.0 + 127.0 * y) as u8;
            rgba[2] = (128.0 + 127.0 * theta.sin()) as u8;
            rgba[3] = 255;
        }
    }
}

impl PointCloudDecoder for SyntheticDecoder {
    fn count_points(&self, path: &Path) -> Result<i64> {
        if self.require_files {
            std::fs::metadata(path)?;
        }
        if self.failure.fails(source_index_from_path(path)) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return Ok(0);
        }
        Ok(self.points_per_frame as i64)
    }

    fn load_frame(&self, path: &Path, frame: &mut Frame) -> Result<()> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let index = source_index_from_path(path).ok_or_else(|| VvError::Decode {
            path: path.to_path_buf(),
            reason: "file name carries no frame index".into(),
        })?;
        self.fill(index, frame);
        self.decoded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
