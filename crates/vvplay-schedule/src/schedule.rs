//! Generated schedules.

use crate::variant::VariantSpec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Per-segment quality-tier plan of a version-switch schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPlan {
    pub segment_ticks: u32,
    pub tiers: SmallVec<[u32; 8]>,
}

impl TierPlan {
    /// Tier in effect at `tick`; the plan repeats once exhausted.
    pub fn tier_at(&self, tick: usize) -> u32 {
        let segment = tick / self.segment_ticks.max(1) as usize;
        self.tiers[segment % self.tiers.len()]
    }
}

/// Immutable tick-indexed sequence of source frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    variant: VariantSpec,
    name: String,
    indices: Vec<u32>,
    tier_plan: Option<TierPlan>,
    /// Random generator that produced the sequence, for seeded variants.
    rng_algorithm: Option<String>,
}

impl Schedule {
    pub(crate) fn new(
        variant: VariantSpec,
        indices: Vec<u32>,
        tier_plan: Option<TierPlan>,
        rng_algorithm: Option<&str>,
    ) -> Self {
        Self {
            name: variant.name(),
            variant,
            indices,
            tier_plan,
            rng_algorithm: rng_algorithm.map(str::to_string),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Source frame shown at `tick`.
    #[inline]
    pub fn source_index(&self, tick: usize) -> Option<u32> {
        self.indices.get(tick).copied()
    }

    pub fn variant(&self) -> &VariantSpec {
        &self.variant
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier_plan(&self) -> Option<&TierPlan> {
        self.tier_plan.as_ref()
    }

    pub fn rng_algorithm(&self) -> Option<&str> {
        self.rng_algorithm.as_deref()
    }

    /// Quality tier to decode `tick` at, falling back to the content's tier.
    pub fn quality_tier_at(&self, tick: usize, default_tier: u32) -> u32 {
        self.tier_plan
            .as_ref()
            .map_or(default_tier, |plan| plan.tier_at(tick))
    }

    /// Ticks that repeat the previous tick's source frame.
    pub fn held_ticks(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[0] == pair[1])
            .map(|(i, _)| i + 1)
    }

    pub fn hold_count(&self) -> usize {
        self.held_ticks().count()
    }

    /// Comma-separated source indices, as written to result logs.
    pub fn sequence_string(&self) -> String {
        self.indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
