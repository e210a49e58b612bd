//! Integration tests for schedule generation.
//!
//! Exercises the catalogs in vvplay-schedule against content described by
//! vvplay-core.

use vvplay_core::{defaults, ContentDescriptor};
use vvplay_schedule::{Catalog, ScheduleGenerator, VariantSpec, RNG_ALGORITHM};

// ── Helpers ────────────────────────────────────────────────────

fn longdress() -> ContentDescriptor {
    ContentDescriptor::new(
        defaults::CONTENT_NAME,
        defaults::QUALITY_TIER,
        defaults::START_FRAME,
        defaults::LAST_FRAME,
        defaults::SOURCE_FPS,
        defaults::ROOT_PATH,
    )
    .unwrap()
}

fn generator() -> ScheduleGenerator {
    ScheduleGenerator::for_content(&longdress())
}

// ── Stride variants ────────────────────────────────────────────

#[test]
fn baseline_15_doubles_every_source_frame() {
    let schedule = generator().generate(&VariantSpec::baseline(15)).unwrap();
    assert_eq!(schedule.len(), 600);
    for (tick, &index) in schedule.indices().iter().enumerate() {
        assert_eq!(index as usize, tick / 2, "tick {}", tick);
    }
}

#[test]
fn baseline_30_is_identity() {
    let schedule = generator().generate(&VariantSpec::baseline(30)).unwrap();
    assert_eq!(schedule.indices(), (0..300).collect::<Vec<u32>>().as_slice());
    assert_eq!(schedule.hold_count(), 0);
    assert!(schedule.rng_algorithm().is_none());
}

#[test]
fn single_dip_matches_baseline_outside_window() {
    let schedule = generator().generate(&VariantSpec::single_dip(30, 15)).unwrap();

    let mut expected = Vec::new();
    for src in 0..300u32 {
        let repeats = if (135..=164).contains(&src) { 2 } else { 1 };
        expected.extend(std::iter::repeat(src).take(repeats));
    }
    assert_eq!(schedule.indices(), expected.as_slice());
    assert_eq!(schedule.len(), 330);
}

#[test]
fn stall_holds_at_listed_frames() {
    let schedule = generator()
        .generate(&VariantSpec::stall(&[(60, 7), (180, 3)]))
        .unwrap();
    assert_eq!(schedule.len(), 310);
    assert_eq!(schedule.hold_count(), 10);
    let held: Vec<u32> = schedule
        .held_ticks()
        .map(|tick| schedule.indices()[tick])
        .collect();
    assert_eq!(held, vec![60; 7].into_iter().chain(vec![180; 3]).collect::<Vec<_>>());
}

// ── Seeded variants ────────────────────────────────────────────

#[test]
fn hard_jitter_is_reproducible() {
    let g = generator();
    let a = g.generate(&VariantSpec::hard_jitter(0.2, 202)).unwrap();
    let b = g.generate(&VariantSpec::hard_jitter(0.2, 202)).unwrap();
    let c = g.generate(&VariantSpec::hard_jitter(0.2, 203)).unwrap();

    assert_eq!(a.indices(), b.indices());
    assert_ne!(a.indices(), c.indices());
    assert_eq!(a.len(), 300);
    assert_eq!(a.hold_count(), 60);
    assert_eq!(c.hold_count(), 60);
    assert_eq!(a.rng_algorithm(), Some(RNG_ALGORITHM));
}

#[test]
fn hard_jitter_never_holds_first_tick() {
    let schedule = generator().generate(&VariantSpec::hard_jitter(0.1, 201)).unwrap();
    assert_eq!(schedule.source_index(0), Some(0));
    assert_eq!(schedule.hold_count(), 30);
    // Every shown frame is the live frame or a repeat of the previous one
    for (tick, pair) in schedule.indices().windows(2).enumerate() {
        let next = tick as u32 + 1;
        assert!(pair[1] == pair[0] || pair[1] == next);
    }
}

#[test]
fn jitter_is_reproducible_and_monotone() {
    let g = generator();
    for index in 34..40 {
        let variant = Catalog::FrameRateVariation.variant(index).unwrap();
        let a = g.generate(&variant).unwrap();
        let b = g.generate(&variant).unwrap();
        assert_eq!(a, b, "{}", a.name());
        assert_eq!(a.len(), 300);
        assert!(a.indices().windows(2).all(|w| w[0] <= w[1]));
        assert!(a.indices().iter().all(|&i| i <= 299));
    }
}

// ── Catalogs ───────────────────────────────────────────────────

#[test]
fn every_catalog_variant_generates() {
    let g = generator();
    for catalog in Catalog::ALL {
        for (index, variant) in catalog.variants().iter().enumerate() {
            let schedule = g
                .generate(variant)
                .unwrap_or_else(|e| panic!("{} #{}: {}", catalog, index, e));
            assert!(!schedule.is_empty());
            assert_eq!(schedule.source_index(0), Some(0));
            assert!(schedule.indices().iter().all(|&i| i <= 299));
        }
    }
}

#[test]
fn version_switch_plans_tiers_per_segment() {
    let variant = Catalog::VersionSwitch.variant(0).unwrap();
    let schedule = generator().generate(&variant).unwrap();
    let plan = schedule.tier_plan().unwrap().clone();

    assert_eq!(schedule.len(), 300);
    for tick in [0usize, 59, 60, 119, 120, 299] {
        let segment = tick / plan.segment_ticks as usize;
        assert_eq!(
            schedule.quality_tier_at(tick, 5),
            plan.tiers[segment % plan.tiers.len()]
        );
    }
}

#[test]
fn out_of_range_indices_are_rejected() {
    for catalog in Catalog::ALL {
        assert!(catalog.variant(catalog.len()).is_err());
    }
}

#[test]
fn shorter_content_shortens_schedules() {
    let content = longdress().with_duration(2.0).unwrap();
    let g = ScheduleGenerator::for_content(&content);
    assert_eq!(g.generate(&VariantSpec::hard_jitter(0.2, 202)).unwrap().len(), 60);

    let short = ContentDescriptor::new("loot", 5, 0, 59, 30, "unused").unwrap();
    let g = ScheduleGenerator::for_content(&short);
    assert_eq!(g.generate(&VariantSpec::baseline(15)).unwrap().len(), 120);
}

#[test]
fn schedules_survive_json() {
    let schedule = generator()
        .generate(&Catalog::Stall.variant(5).unwrap())
        .unwrap();
    let json = serde_json::to_string(&schedule).unwrap();
    let back: vvplay_schedule::Schedule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schedule);
}
