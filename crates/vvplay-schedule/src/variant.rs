//! Declarative playback variants.
//!
//! A [`VariantSpec`] names one schedule-generation policy. Stride-based
//! variants decide per source frame how many ticks it stays on screen;
//! delivery-based variants (jitter) simulate a frame-delivery clock per tick.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use vvplay_core::{Result, VvError};

/// Inclusive source-frame window of a single dip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DipWindow {
    pub first: u32,
    pub last: u32,
}

impl DipWindow {
    /// The 30-frame centre window of a 300-frame clip.
    pub const CENTRE: Self = Self {
        first: 135,
        last: 164,
    };

    #[inline]
    pub fn contains(&self, index: u32) -> bool {
        index >= self.first && index <= self.last
    }
}

impl Default for DipWindow {
    fn default() -> Self {
        Self::CENTRE
    }
}

/// One stall: source frame `at` stays on screen for `hold_ticks` extra ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallPoint {
    pub at: u32,
    pub hold_ticks: u32,
}

/// Highest rate a variant may ask for.
pub const MAX_FPS: u32 = 1000;

/// Most passes a looping variant may make over the clip.
pub const MAX_LOOPS: u32 = 1000;

/// A named, deterministic schedule-generation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VariantSpec {
    /// Constant rate.
    Baseline { fps: u32 },
    /// Base rate with one drop to `dip_fps` inside `window`.
    SingleDip {
        base_fps: u32,
        dip_fps: u32,
        #[serde(default)]
        window: DipWindow,
    },
    /// Short dips at the start of every `interval`-frame cycle, `w` frames
    /// wide, `w` cycling through `widths`.
    MicroStutter {
        base_fps: u32,
        dip_fps: u32,
        interval: u32,
        widths: SmallVec<[u32; 4]>,
    },
    /// Seeded bounded random walk of the delivery rate.
    Jitter {
        target_fps: u32,
        range: u32,
        step_period: u32,
        seed: u64,
    },
    /// Seeded set of held ticks, `round(drop_ratio * T)` of them.
    HardJitter { drop_ratio: f32, seed: u64 },
    /// Full-rate playback with freezes at fixed source frames.
    Stall { points: SmallVec<[StallPoint; 4]> },
    /// Full-rate playback switching quality tier every `segment_ticks` ticks.
    VersionSwitch {
        segment_ticks: u32,
        tiers: SmallVec<[u32; 8]>,
    },
    /// The clip played `loops` times back to back at a constant rate,
    /// wrapping from the last frame to the first.
    Looping { fps: u32, loops: u32 },
}

impl VariantSpec {
    pub fn baseline(fps: u32) -> Self {
        Self::Baseline { fps }
    }

    pub fn single_dip(base_fps: u32, dip_fps: u32) -> Self {
        Self::SingleDip {
            base_fps,
            dip_fps,
            window: DipWindow::CENTRE,
        }
    }

    pub fn micro_stutter(base_fps: u32, dip_fps: u32, interval: u32, widths: &[u32]) -> Self {
        Self::MicroStutter {
            base_fps,
            dip_fps,
            interval,
            widths: SmallVec::from_slice(widths),
        }
    }

    pub fn jitter(target_fps: u32, range: u32, step_period: u32, seed: u64) -> Self {
        Self::Jitter {
            target_fps,
            range,
            step_period,
            seed,
        }
    }

    pub fn hard_jitter(drop_ratio: f32, seed: u64) -> Self {
        Self::HardJitter { drop_ratio, seed }
    }

    /// Stall at each `(at, hold_ticks)` pair; zero holds are dropped.
    pub fn stall(points: &[(u32, u32)]) -> Self {
        Self::Stall {
            points: points
                .iter()
                .filter(|(_, hold)| *hold > 0)
                .map(|&(at, hold_ticks)| StallPoint { at, hold_ticks })
                .collect(),
        }
    }

    pub fn version_switch(segment_ticks: u32, tiers: &[u32]) -> Self {
        Self::VersionSwitch {
            segment_ticks,
            tiers: SmallVec::from_slice(tiers),
        }
    }

    pub fn looping(fps: u32, loops: u32) -> Self {
        Self::Looping { fps, loops }
    }

    /// Whether the schedule is driven by a simulated delivery clock.
    pub fn is_delivery_based(&self) -> bool {
        matches!(self, Self::Jitter { .. } | Self::HardJitter { .. })
    }

    /// Seed of the random generator, for seeded variants.
    pub fn seed(&self) -> Option<u64> {
        match self {
            Self::Jitter { seed, .. } | Self::HardJitter { seed, .. } => Some(*seed),
            _ => None,
        }
    }

    /// Short kind label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Baseline { .. } => "baseline",
            Self::SingleDip { .. } => "single_dip",
            Self::MicroStutter { .. } => "micro_stutter",
            Self::Jitter { .. } => "jitter",
            Self::HardJitter { .. } => "hard_jitter",
            Self::Stall { .. } => "stall",
            Self::VersionSwitch { .. } => "version_switch",
            Self::Looping { .. } => "looping",
        }
    }

    /// Human-readable name, stable across runs (used in result logs).
    pub fn name(&self) -> String {
        match self {
            Self::Baseline { fps } => format!("Baseline_{}fps", fps),
            Self::SingleDip {
                base_fps,
                dip_fps,
                window,
            } => format!(
                "SingleDip_{}to{}_{}f",
                base_fps,
                dip_fps,
                window.last.saturating_sub(window.first) + 1
            ),
            Self::MicroStutter {
                base_fps,
                dip_fps,
                interval,
                widths,
            } => {
                if widths.len() == 1 {
                    format!(
                        "Micro_{}to{}_Every{}f_W{}f",
                        base_fps, dip_fps, interval, widths[0]
                    )
                } else {
                    format!(
                        "MicroVar_{}to{}_Every{}f_W{}f",
                        base_fps,
                        dip_fps,
                        interval,
                        join(widths, "-")
                    )
                }
            }
            Self::Jitter {
                target_fps,
                range,
                step_period,
                ..
            } => format!("Jitter_{}_±{}_Every{}f", target_fps, range, step_period),
            Self::HardJitter { drop_ratio, .. } => {
                format!("HardJitter_Drop{}%", (drop_ratio * 100.0).round() as u32)
            }
            Self::Stall { points } => {
                if points.is_empty() {
                    "Stall_None".to_string()
                } else {
                    let parts: Vec<String> = points
                        .iter()
                        .map(|p| format!("{}x{}", p.at, p.hold_ticks))
                        .collect();
                    format!("Stall_{}", parts.join("_"))
                }
            }
            Self::VersionSwitch {
                segment_ticks,
                tiers,
            } => format!("Switch_{}_Every{}t", join(tiers, "-"), segment_ticks),
            Self::Looping { fps, loops } => format!("Loop_{}fps_x{}", fps, loops),
        }
    }

    /// Check the parameters describe a playable variant.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> {
            Err(VvError::InvalidVariant(format!("{}: {}", self.name(), msg)))
        };

        let rate_ok = |fps: u32| (1..=MAX_FPS).contains(&fps);

        match self {
            Self::Baseline { fps } => {
                if !rate_ok(*fps) {
                    return invalid(format!("fps must lie in 1..={}", MAX_FPS));
                }
            }
            Self::SingleDip {
                base_fps,
                dip_fps,
                window,
            } => {
                if !rate_ok(*base_fps) || !rate_ok(*dip_fps) {
                    return invalid(format!("rates must lie in 1..={}", MAX_FPS));
                }
                if window.first > window.last {
                    return invalid(format!(
                        "dip window {}..={} is inverted",
                        window.first, window.last
                    ));
                }
            }
            Self::MicroStutter {
                base_fps,
                dip_fps,
                interval,
                widths,
            } => {
                if !rate_ok(*base_fps) || !rate_ok(*dip_fps) {
                    return invalid(format!("rates must lie in 1..={}", MAX_FPS));
                }
                if *interval == 0 {
                    return invalid("interval must be positive".into());
                }
                if widths.is_empty() {
                    return invalid("width table is empty".into());
                }
            }
            Self::Jitter {
                target_fps,
                range,
                step_period,
                ..
            } => {
                if *step_period == 0 {
                    return invalid("step period must be positive".into());
                }
                if target_fps.saturating_add(*range) > MAX_FPS {
                    return invalid(format!("rates above {} are not supported", MAX_FPS));
                }
                if range >= target_fps {
                    return invalid(format!(
                        "range {} would reach a non-positive rate around {}",
                        range, target_fps
                    ));
                }
            }
            Self::HardJitter { drop_ratio, .. } => {
                if !(0.0..1.0).contains(drop_ratio) {
                    return invalid(format!("drop ratio {} outside [0, 1)", drop_ratio));
                }
            }
            Self::Stall { .. } => {}
            Self::VersionSwitch {
                segment_ticks,
                tiers,
            } => {
                if *segment_ticks == 0 {
                    return invalid("segment length must be positive".into());
                }
                if tiers.is_empty() {
                    return invalid("tier list is empty".into());
                }
            }
            Self::Looping { fps, loops } => {
                if !rate_ok(*fps) {
                    return invalid(format!("fps must lie in 1..={}", MAX_FPS));
                }
                if !(1..=MAX_LOOPS).contains(loops) {
                    return invalid(format!("loop count must lie in 1..={}", MAX_LOOPS));
                }
            }
        }
        Ok(())
    }
}

fn join(values: &[u32], sep: &str) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
