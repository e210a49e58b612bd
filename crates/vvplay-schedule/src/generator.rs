//! Schedule generation.
//!
//! Every schedule is a pure function of the variant, the content frame range
//! and the seed. Stride-based variants walk the source frames and repeat each
//! one `stride` times. Delivery-based variants run a simulated delivery clock
//! for `T = round(duration * display_fps)` ticks:
//!
//! ```text
//! clock += instantaneous_fps / display_fps          (every tick after 0)
//! floor(clock) increased  -> show live frame start + floor(tick * source_fps / display_fps)
//! otherwise               -> hold the previously shown frame
//! ```
//!
//! The clock is kept in integer units of `1 / display_fps` so holds never
//! depend on floating-point rounding.

use crate::schedule::{Schedule, TierPlan};
use crate::variant::VariantSpec;
use tracing::debug;
use vvplay_core::{ContentDescriptor, Result, VvError};

/// Random generator behind seeded variants. Recorded in every seeded schedule
/// so stored test vectors name the algorithm that produced them.
pub const RNG_ALGORITHM: &str = "wyrand/fastrand-2";

/// Builds schedules for one content frame range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleGenerator {
    start_frame: u32,
    last_frame: u32,
    source_fps: u32,
    display_fps: u32,
    duration_secs: f64,
}

impl ScheduleGenerator {
    /// Generator over `start..=last` captured at `source_fps`, displayed at the
    /// same rate.
    pub fn new(start_frame: u32, last_frame: u32, source_fps: u32) -> Result<Self> {
        if start_frame > last_frame {
            return Err(VvError::InvalidParameter(format!(
                "frame range {}..={} is inverted",
                start_frame, last_frame
            )));
        }
        if source_fps == 0 {
            return Err(VvError::InvalidParameter("source fps must be positive".into()));
        }
        let frames = (last_frame - start_frame + 1) as f64;
        Ok(Self {
            start_frame,
            last_frame,
            source_fps,
            display_fps: source_fps,
            duration_secs: frames / source_fps as f64,
        })
    }

    /// Generator matching a content descriptor (range, rate and duration).
    pub fn for_content(content: &ContentDescriptor) -> Self {
        Self {
            start_frame: content.start_frame(),
            last_frame: content.last_frame(),
            source_fps: content.nominal_fps(),
            display_fps: content.nominal_fps(),
            duration_secs: content.duration_secs(),
        }
    }

    pub fn with_display_fps(mut self, display_fps: u32) -> Result<Self> {
        if display_fps == 0 {
            return Err(VvError::InvalidParameter("display fps must be positive".into()));
        }
        self.display_fps = display_fps;
        Ok(self)
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Result<Self> {
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(VvError::InvalidParameter(format!(
                "duration must be positive, got {}",
                duration_secs
            )));
        }
        self.duration_secs = duration_secs;
        Ok(self)
    }

    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    pub fn last_frame(&self) -> u32 {
        self.last_frame
    }

    pub fn source_fps(&self) -> u32 {
        self.source_fps
    }

    pub fn display_fps(&self) -> u32 {
        self.display_fps
    }

    /// Tick count `T` of delivery-based schedules.
    pub fn delivery_ticks(&self) -> usize {
        ((self.duration_secs * self.display_fps as f64).round() as usize).max(1)
    }

    /// Ticks a source frame is held when playing at `fps`.
    #[inline]
    pub fn stride_for(&self, fps: u32) -> u32 {
        ((self.source_fps as f64 / fps.max(1) as f64).round() as u32).max(1)
    }

    /// Frame the delivery clock would show at `tick` if it were on time.
    #[inline]
    pub fn live_frame(&self, tick: usize) -> u32 {
        let offset = tick as u64 * self.source_fps as u64 / self.display_fps as u64;
        (self.start_frame as u64 + offset).min(self.last_frame as u64) as u32
    }

    /// Compute the whole schedule for `variant`.
    pub fn generate(&self, variant: &VariantSpec) -> Result<Schedule> {
        variant.validate()?;

        let schedule = match variant {
            VariantSpec::Baseline { fps } => {
                let stride = self.stride_for(*fps);
                Schedule::new(variant.clone(), self.stride_sequence(|_| stride), None, None)
            }
            VariantSpec::SingleDip {
                base_fps,
                dip_fps,
                window,
            } => {
                let base = self.stride_for(*base_fps);
                let dip = self.stride_for(*dip_fps);
                let indices =
                    self.stride_sequence(|src| if window.contains(src) { dip } else { base });
                Schedule::new(variant.clone(), indices, None, None)
            }
            VariantSpec::MicroStutter {
                base_fps,
                dip_fps,
                interval,
                widths,
            } => {
                let base = self.stride_for(*base_fps);
                let dip = self.stride_for(*dip_fps);
                let indices = self.stride_sequence(|src| {
                    let cycle = (src / interval) as usize;
                    let offset = src % interval;
                    if offset < widths[cycle % widths.len()] {
                        dip
                    } else {
                        base
                    }
                });
                Schedule::new(variant.clone(), indices, None, None)
            }
            VariantSpec::Jitter {
                target_fps,
                range,
                step_period,
                seed,
            } => {
                let ticks = self.delivery_ticks();
                let walk = jitter_walk(*target_fps, *range, *step_period, ticks, *seed);
                let step = *step_period as usize;
                let indices = self.delivery_sequence(ticks, |tick| walk[tick / step]);
                Schedule::new(variant.clone(), indices, None, Some(RNG_ALGORITHM))
            }
            VariantSpec::HardJitter { drop_ratio, seed } => {
                let ticks = self.delivery_ticks();
                let held = held_tick_mask(*drop_ratio, ticks, *seed);
                let display = self.display_fps;
                let indices =
                    self.delivery_sequence(ticks, |tick| if held[tick] { 0 } else { display });
                Schedule::new(variant.clone(), indices, None, Some(RNG_ALGORITHM))
            }
            VariantSpec::Stall { points } => {
                let indices = self.stride_sequence(|src| {
                    1 + points
                        .iter()
                        .filter(|p| p.at == src)
                        .map(|p| p.hold_ticks)
                        .sum::<u32>()
                });
                Schedule::new(variant.clone(), indices, None, None)
            }
            VariantSpec::VersionSwitch {
                segment_ticks,
                tiers,
            } => {
                let plan = TierPlan {
                    segment_ticks: *segment_ticks,
                    tiers: tiers.clone(),
                };
                Schedule::new(variant.clone(), self.stride_sequence(|_| 1), Some(plan), None)
            }
            VariantSpec::Looping { fps, loops } => {
                let stride = self.stride_for(*fps);
                let indices = self.stride_sequence(|_| stride).repeat(*loops as usize);
                Schedule::new(variant.clone(), indices, None, None)
            }
        };

        debug!(
            "Generated schedule {} ({} ticks, {} held)",
            schedule.name(),
            schedule.len(),
            schedule.hold_count()
        );
        Ok(schedule)
    }

    /// Repeat every source frame `stride_for(src)` times.
    fn stride_sequence(&self, mut stride_for: impl FnMut(u32) -> u32) -> Vec<u32> {
        let frames = (self.last_frame - self.start_frame + 1) as usize;
        let mut indices = Vec::with_capacity(frames * 2);
        for src in self.start_frame..=self.last_frame {
            let stride = stride_for(src).max(1) as usize;
            indices.extend(std::iter::repeat(src).take(stride));
        }
        indices
    }

    /// Run the delivery clock; `rate_at(tick)` is the instantaneous fps.
    fn delivery_sequence(&self, ticks: usize, mut rate_at: impl FnMut(usize) -> u32) -> Vec<u32> {
        let display = self.display_fps as u64;
        let mut indices = Vec::with_capacity(ticks);
        let mut clock: u64 = 0;
        let mut shown = self.start_frame;
        indices.push(shown);

        for tick in 1..ticks {
            let before = clock / display;
            clock += rate_at(tick) as u64;
            if clock / display > before {
                shown = self.live_frame(tick);
            }
            indices.push(shown);
        }
        indices
    }
}

/// Seeded bounded random walk, one rate per step period.
///
/// The table covers `ceil(ticks / step_period) + 1` steps; each step moves the
/// rate by -1, 0 or +1 and clamps it to `target ± range`.
pub fn jitter_walk(target_fps: u32, range: u32, step_period: u32, ticks: usize, seed: u64) -> Vec<u32> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let steps = ticks.div_ceil(step_period.max(1) as usize) + 1;
    let lo = target_fps.saturating_sub(range).max(1) as i64;
    let hi = target_fps.saturating_add(range) as i64;

    let mut table = Vec::with_capacity(steps);
    let mut current = target_fps as i64;
    for _ in 0..steps {
        table.push(current as u32);
        let delta = rng.i64(-1..=1);
        current = (current + delta).clamp(lo, hi);
    }
    table
}

/// Seeded choice of exactly `round(drop_ratio * ticks)` held ticks, drawn
/// without replacement from ticks `1..ticks` (tick 0 always shows).
pub fn held_tick_mask(drop_ratio: f32, ticks: usize, seed: u64) -> Vec<bool> {
    let mut mask = vec![false; ticks];
    if ticks < 2 {
        return mask;
    }
    let mut candidates: Vec<usize> = (1..ticks).collect();
    let count = ((drop_ratio as f64 * ticks as f64).round() as usize).min(candidates.len());

    // Partial Fisher-Yates: the first `count` slots become the sample.
    let mut rng = fastrand::Rng::with_seed(seed);
    for i in 0..count {
        let j = rng.usize(i..candidates.len());
        candidates.swap(i, j);
    }
    for &tick in &candidates[..count] {
        mask[tick] = true;
    }
    mask
}
