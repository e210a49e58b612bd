//! Variant catalogs of the perceptual-quality experiments.
//!
//! Three fixed tables, addressed by index:
//! - frame-rate variation: 42 variants (baseline, single dip, micro stutter,
//!   jitter, hard jitter)
//! - stall: 33 freeze patterns at source frames 60/120/180/240
//! - version switch: 29 quality-tier sequences over 60-tick segments

use crate::variant::VariantSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vvplay_core::{Result, VvError};

// ── Frame-rate variation ────────────────────────────────────────

const BASELINE_FPS: [u32; 4] = [30, 25, 20, 15];

const SINGLE_DIPS: [(u32, u32); 6] = [(30, 15), (30, 20), (30, 25), (25, 15), (25, 20), (20, 15)];

const MICRO_BASES: [u32; 12] = [30, 30, 30, 30, 25, 25, 25, 25, 20, 20, 20, 20];
const MICRO_DIPS: [u32; 12] = [25, 20, 25, 20, 20, 15, 20, 15, 15, 15, 15, 15];
const MICRO_INTERVALS: [u32; 12] = [60, 60, 120, 120, 60, 60, 120, 120, 60, 60, 120, 120];

const FIXED_WIDTHS: [u32; 1] = [3];
const VARIABLE_WIDTHS: [u32; 3] = [1, 3, 8];

/// (target fps, range, step period, seed)
const JITTERS: [(u32, u32, u32, u64); 6] = [
    (28, 2, 3, 101),
    (28, 2, 15, 102),
    (25, 5, 3, 103),
    (25, 5, 15, 104),
    (20, 10, 3, 105),
    (20, 10, 15, 106),
];

const HARD_JITTERS: [(f32, u64); 2] = [(0.10, 201), (0.20, 202)];

pub const FRAME_RATE_VARIATION_COUNT: usize = BASELINE_FPS.len()
    + SINGLE_DIPS.len()
    + 2 * MICRO_BASES.len()
    + JITTERS.len()
    + HARD_JITTERS.len();

/// Variant `index` of the frame-rate-variation table.
pub fn frame_rate_variation(index: usize) -> Result<VariantSpec> {
    let mut i = index;

    if i < BASELINE_FPS.len() {
        return Ok(VariantSpec::baseline(BASELINE_FPS[i]));
    }
    i -= BASELINE_FPS.len();

    if i < SINGLE_DIPS.len() {
        let (base, dip) = SINGLE_DIPS[i];
        return Ok(VariantSpec::single_dip(base, dip));
    }
    i -= SINGLE_DIPS.len();

    for widths in [&FIXED_WIDTHS[..], &VARIABLE_WIDTHS[..]] {
        if i < MICRO_BASES.len() {
            return Ok(VariantSpec::micro_stutter(
                MICRO_BASES[i],
                MICRO_DIPS[i],
                MICRO_INTERVALS[i],
                widths,
            ));
        }
        i -= MICRO_BASES.len();
    }

    if i < JITTERS.len() {
        let (target, range, step, seed) = JITTERS[i];
        return Ok(VariantSpec::jitter(target, range, step, seed));
    }
    i -= JITTERS.len();

    if i < HARD_JITTERS.len() {
        let (ratio, seed) = HARD_JITTERS[i];
        return Ok(VariantSpec::hard_jitter(ratio, seed));
    }

    Err(VvError::InvalidVariantIndex {
        index,
        count: FRAME_RATE_VARIATION_COUNT,
    })
}

// ── Stall ───────────────────────────────────────────────────────

/// Source frames the stall patterns freeze at.
pub const STALL_AT: [u32; 4] = [60, 120, 180, 240];

/// Extra ticks held at each of [`STALL_AT`], per preset.
const STALL_HOLDS: [[u32; 4]; 33] = [
    [0, 7, 0, 0],
    [0, 15, 0, 0],
    [0, 22, 0, 0],
    [0, 30, 0, 0],
    [0, 45, 0, 0],
    [0, 60, 0, 0],
    [0, 90, 0, 0],
    [0, 120, 0, 0],
    [7, 0, 7, 0],
    [15, 0, 15, 0],
    [30, 0, 30, 0],
    [60, 0, 60, 0],
    [7, 0, 7, 7],
    [15, 0, 15, 15],
    [30, 0, 30, 30],
    [7, 7, 7, 7],
    [15, 15, 15, 15],
    [30, 30, 30, 30],
    [0, 0, 0, 7],
    [0, 0, 0, 15],
    [0, 0, 0, 22],
    [0, 0, 0, 30],
    [0, 0, 0, 45],
    [0, 0, 0, 60],
    [0, 0, 0, 90],
    [0, 0, 0, 120],
    [0, 7, 7, 0],
    [0, 15, 15, 0],
    [0, 30, 30, 0],
    [0, 60, 60, 0],
    [7, 7, 7, 0],
    [15, 15, 15, 0],
    [30, 30, 30, 0],
];

pub const STALL_COUNT: usize = STALL_HOLDS.len();

/// Variant `index` of the stall table.
pub fn stall(index: usize) -> Result<VariantSpec> {
    let holds = STALL_HOLDS.get(index).ok_or(VvError::InvalidVariantIndex {
        index,
        count: STALL_COUNT,
    })?;
    let points: Vec<(u32, u32)> = STALL_AT.iter().copied().zip(holds.iter().copied()).collect();
    Ok(VariantSpec::stall(&points))
}

// ── Version switch ──────────────────────────────────────────────

/// Ticks per quality segment.
pub const SWITCH_SEGMENT_TICKS: u32 = 60;

const SWITCH_TIERS: [[u32; 5]; 29] = [
    [1, 1, 1, 1, 1],
    [2, 2, 2, 2, 2],
    [3, 3, 3, 3, 3],
    [4, 4, 4, 4, 4],
    [5, 5, 5, 5, 5],
    [5, 1, 5, 1, 5],
    [5, 2, 5, 2, 5],
    [5, 3, 5, 3, 5],
    [5, 4, 5, 4, 5],
    [1, 5, 1, 5, 1],
    [2, 5, 2, 5, 2],
    [3, 5, 3, 5, 3],
    [4, 5, 4, 5, 4],
    [5, 1, 1, 5, 5],
    [5, 2, 2, 5, 5],
    [5, 3, 3, 5, 5],
    [5, 4, 4, 5, 5],
    [1, 5, 5, 1, 1],
    [2, 5, 5, 2, 2],
    [3, 5, 5, 3, 3],
    [4, 5, 5, 4, 4],
    [5, 4, 5, 5, 5],
    [5, 4, 4, 4, 5],
    [5, 3, 5, 5, 5],
    [5, 3, 3, 3, 5],
    [5, 2, 5, 5, 5],
    [5, 2, 2, 2, 5],
    [5, 1, 5, 5, 5],
    [5, 1, 1, 1, 5],
];

pub const VERSION_SWITCH_COUNT: usize = SWITCH_TIERS.len();

/// Variant `index` of the version-switch table.
pub fn version_switch(index: usize) -> Result<VariantSpec> {
    let tiers = SWITCH_TIERS.get(index).ok_or(VvError::InvalidVariantIndex {
        index,
        count: VERSION_SWITCH_COUNT,
    })?;
    Ok(VariantSpec::version_switch(SWITCH_SEGMENT_TICKS, tiers))
}

// ── Catalog selector ────────────────────────────────────────────

/// One of the experiment tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    FrameRateVariation,
    Stall,
    VersionSwitch,
}

impl Catalog {
    pub const ALL: [Catalog; 3] = [Self::FrameRateVariation, Self::Stall, Self::VersionSwitch];

    pub fn len(self) -> usize {
        match self {
            Self::FrameRateVariation => FRAME_RATE_VARIATION_COUNT,
            Self::Stall => STALL_COUNT,
            Self::VersionSwitch => VERSION_SWITCH_COUNT,
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn variant(self, index: usize) -> Result<VariantSpec> {
        match self {
            Self::FrameRateVariation => frame_rate_variation(index),
            Self::Stall => stall(index),
            Self::VersionSwitch => version_switch(index),
        }
    }

    /// Every variant of the table, in index order.
    pub fn variants(self) -> Vec<VariantSpec> {
        (0..self.len())
            .filter_map(|i| self.variant(i).ok())
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FrameRateVariation => "frv",
            Self::Stall => "stall",
            Self::VersionSwitch => "switch",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Catalog {
    type Err = VvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "frv" | "frame_rate_variation" | "framerate" => Ok(Self::FrameRateVariation),
            "stall" => Ok(Self::Stall),
            "switch" | "version_switch" => Ok(Self::VersionSwitch),
            other => Err(VvError::NotFound(format!("catalog '{}'", other))),
        }
    }
}
