//! Integration tests for the playback pipeline.
//!
//! Exercises vvplay-playback driving the synthetic decoder from vvplay-media
//! over schedules from vvplay-schedule. Time is synthetic wherever the test
//! cares about pacing.

use std::sync::Arc;
use std::time::{Duration, Instant};
use vvplay_core::{ContentDescriptor, PlayerConfig, VvError};
use vvplay_media::{FailureMode, PointCloudDecoder, SyntheticDecoder};
use vvplay_playback::{
    PlaybackObserver, PlaybackReport, Player, PlayerState, RecordingSink, TickOutcome,
    VariantSource,
};
use vvplay_schedule::{Catalog, VariantSpec};

const WAIT: Duration = Duration::from_secs(5);
const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 30);

// ── Helpers ────────────────────────────────────────────────────

fn content(last_frame: u32) -> ContentDescriptor {
    ContentDescriptor::new("longdress", 5, 0, last_frame, 30, "unused").unwrap()
}

fn player_with(
    last_frame: u32,
    variant: impl Into<VariantSource>,
    decoder: impl PointCloudDecoder + 'static,
) -> Player {
    Player::new(
        PlayerConfig::default(),
        content(last_frame),
        variant,
        Arc::new(decoder),
    )
    .unwrap()
}

fn player_with_config(
    config: PlayerConfig,
    last_frame: u32,
    variant: impl Into<VariantSource>,
) -> Player {
    Player::new(config, content(last_frame), variant, Arc::new(SyntheticDecoder::new(4))).unwrap()
}

/// Play from the current state to the end on synthetic time.
/// Returns the sink that received the frames.
fn play_to_end(player: &mut Player) -> RecordingSink {
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();
    player.play_at(t0).unwrap();
    for step in 0..20_000u32 {
        if player.state() == PlayerState::Ended {
            return sink;
        }
        match player.tick_at(t0 + FRAME * step, &mut sink) {
            TickOutcome::Buffering { .. } => {
                player.await_prefill(WAIT);
            }
            TickOutcome::Stalled { .. } => {
                player.buffer().wait_for_len(2, Duration::from_millis(50));
            }
            _ => {}
        }
    }
    panic!("playback did not end: {:?}", player);
}

#[derive(Clone, Default)]
struct Events {
    log: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Events {
    fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl PlaybackObserver for Events {
    fn on_state_change(&mut self, from: PlayerState, to: PlayerState) {
        self.log.lock().unwrap().push(format!("{}->{}", from, to));
    }

    fn on_ended(&mut self, report: &PlaybackReport) {
        self.log
            .lock()
            .unwrap()
            .push(format!("ended:{}", report.stats.frames_shown));
    }
}

// ── Pre-fill ───────────────────────────────────────────────────

#[test]
fn prefill_requests_exactly_buffer_capacity() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(16));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));

    assert_eq!(player.stats().requests_issued, 20);
    assert_eq!(player.buffered(), 20);
    assert_eq!(player.frames_left(), 299);
    assert_eq!(player.state(), PlayerState::Buffering);
}

#[test]
fn prefill_of_short_schedule_is_its_length() {
    let mut player = player_with(7, VariantSpec::baseline(30), SyntheticDecoder::new(16));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));
    assert_eq!(player.prefill_target(), 8);
    assert_eq!(player.stats().requests_issued, 8);
    assert_eq!(player.buffered(), 8);
}

// ── Full runs ──────────────────────────────────────────────────

#[test]
fn baseline_plays_every_frame_then_ends() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(16));
    let events = Events::default();
    player.add_observer(Box::new(events.clone()));

    let sink = play_to_end(&mut player);

    assert!(!player.is_playing());
    assert_eq!(player.state(), PlayerState::Ended);
    assert_eq!(sink.shown, (0..300).collect::<Vec<u32>>());
    assert_eq!(player.frames_left(), 0);

    let log = events.entries();
    assert_eq!(log.first().map(String::as_str), Some("idle->buffering"));
    assert!(log.contains(&"buffering->playing".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("ended:300"));
}

#[test]
fn displayed_sequence_follows_schedule() {
    let variant = Catalog::Stall.variant(8).unwrap();
    let mut player = player_with(299, variant, SyntheticDecoder::new(4));
    let sink = play_to_end(&mut player);
    assert_eq!(sink.shown.as_slice(), player.schedule().indices());
    assert_eq!(sink.ticks, (0..player.schedule().len()).collect::<Vec<_>>());
}

#[test]
fn version_switch_decodes_at_planned_tiers() {
    let variant = Catalog::VersionSwitch.variant(3).unwrap();
    let mut player = player_with(299, variant, SyntheticDecoder::new(4));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));

    let t0 = Instant::now();
    let mut sink = RecordingSink::new();
    player.play_at(t0).unwrap();
    let mut checked = 0;
    for step in 0..20_000u32 {
        if player.state() == PlayerState::Ended {
            break;
        }
        match player.tick_at(t0 + FRAME * step, &mut sink) {
            TickOutcome::Advanced { tick, .. } => {
                let origin = player.current_frame().unwrap().origin();
                assert_eq!(origin.quality_tier, player.schedule().quality_tier_at(tick, 5));
                checked += 1;
            }
            TickOutcome::Stalled { .. } => {
                player.buffer().wait_for_len(2, Duration::from_millis(50));
            }
            _ => {}
        }
    }
    assert_eq!(checked, 300);
}

#[test]
fn replay_restarts_the_same_schedule() {
    let mut player = player_with(59, VariantSpec::baseline(20), SyntheticDecoder::new(4));
    let first = play_to_end(&mut player);

    player.replay().unwrap();
    assert_eq!(player.state(), PlayerState::Buffering);
    assert_eq!(player.render_tick(), 0);
    assert_eq!(player.elapsed(), Duration::ZERO);

    let second = play_to_end(&mut player);
    assert_eq!(first.shown, second.shown);
}

#[test]
fn lowest_refill_threshold_still_reaches_the_end() {
    let config = PlayerConfig {
        refill_threshold: Some(2),
        ..PlayerConfig::default()
    };
    let mut player = player_with_config(config, 299, VariantSpec::baseline(30));
    let sink = play_to_end(&mut player);

    assert_eq!(player.state(), PlayerState::Ended);
    assert_eq!(sink.uploads(), 300);
    assert_eq!(player.stats().requests_issued, 300);
}

#[test]
fn smallest_buffer_still_reaches_the_end() {
    let config = PlayerConfig {
        buffer_capacity: 2,
        refill_threshold: Some(2),
        ..PlayerConfig::default()
    };
    let mut player = player_with_config(config, 59, VariantSpec::baseline(15));
    let sink = play_to_end(&mut player);
    assert_eq!(sink.uploads(), 120);
}

#[test]
fn threshold_without_lookahead_is_rejected() {
    let config = PlayerConfig {
        refill_threshold: Some(1),
        ..PlayerConfig::default()
    };
    let result = Player::new(
        config,
        content(299),
        VariantSpec::baseline(30),
        Arc::new(SyntheticDecoder::new(4)),
    );
    assert!(matches!(result, Err(VvError::InvalidParameter(_))));
}

#[test]
fn looping_wraps_back_to_the_first_frame() {
    let mut player = player_with(59, VariantSpec::looping(30, 3), SyntheticDecoder::new(4));
    let sink = play_to_end(&mut player);

    assert_eq!(sink.uploads(), 180);
    let one_pass: Vec<u32> = (0..60).collect();
    for pass in sink.shown.chunks(60) {
        assert_eq!(pass, one_pass.as_slice());
    }
    assert_eq!(player.frames_left(), 0);
}

// ── Failure handling ───────────────────────────────────────────

#[test]
fn always_failing_decoder_stays_buffering() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::always_failing());
    let mut sink = RecordingSink::new();
    let t0 = Instant::now();
    player.play_at(t0).unwrap();

    for step in 0..600u32 {
        let outcome = player.tick_at(t0 + FRAME * step, &mut sink);
        assert!(matches!(outcome, TickOutcome::Buffering { buffered: 0, .. }));
        if step % 50 == 0 {
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    assert_eq!(player.state(), PlayerState::Buffering);
    assert_eq!(sink.uploads(), 0);
    assert!(player.stats().decode_failures > 0);
    player.shutdown().unwrap();
    assert_eq!(player.state(), PlayerState::Idle);
}

#[test]
fn failed_frames_become_holes_not_stalls() {
    let decoder = SyntheticDecoder::new(4).with_failures(FailureMode::Indices(vec![5, 6, 100]));
    let mut player = player_with(299, VariantSpec::baseline(30), decoder);
    let sink = play_to_end(&mut player);

    assert_eq!(player.stats().holes, 3);
    assert_eq!(player.stats().decode_failures, 3);
    assert_eq!(sink.uploads(), 297);
    assert!(!sink.shown.contains(&5) && !sink.shown.contains(&100));
}

// ── Time ───────────────────────────────────────────────────────

#[test]
fn elapsed_time_excludes_pauses() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(4));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));

    let t0 = Instant::now();
    let s = Duration::from_secs(1);
    let mut sink = RecordingSink::new();

    player.play_at(t0).unwrap();
    player.tick_at(t0 + s / 2, &mut sink);
    player.pause_at(t0 + s).unwrap();
    assert_eq!(player.state(), PlayerState::Paused);
    assert_eq!(player.elapsed(), s);

    // Four seconds of pause never count
    assert_eq!(
        player.tick_at(t0 + s * 3, &mut sink),
        TickOutcome::Paused
    );
    player.play_at(t0 + s * 5).unwrap();
    assert_eq!(player.elapsed_at(t0 + s * 5 + s / 2), s + s / 2);
    player.pause_at(t0 + s * 6).unwrap();
    assert_eq!(player.elapsed(), s * 2);
}

#[test]
fn resume_does_not_burst() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(4));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));

    let t0 = Instant::now();
    let mut sink = RecordingSink::new();
    player.play_at(t0).unwrap();
    player.tick_at(t0, &mut sink);
    player.pause_at(t0 + FRAME).unwrap();

    let resume = t0 + Duration::from_secs(10);
    player.play_at(resume).unwrap();
    // The first poll after resume only waits: no debt from the pause
    assert_eq!(player.tick_at(resume, &mut sink), TickOutcome::Waiting);
    assert!(matches!(
        player.tick_at(resume + FRAME, &mut sink),
        TickOutcome::Advanced { tick: 1, .. } | TickOutcome::Stalled { tick: 1 }
    ));
}

// ── Variant errors ─────────────────────────────────────────────

#[test]
fn invalid_variant_index_rejected_before_start() {
    let result = Player::new(
        PlayerConfig::default(),
        content(299),
        VariantSource::Catalog {
            catalog: Catalog::FrameRateVariation,
            index: 99,
        },
        Arc::new(SyntheticDecoder::new(4)),
    );
    assert!(matches!(
        result,
        Err(VvError::InvalidVariantIndex { index: 99, count: 42 })
    ));
}

#[test]
fn invalid_advance_leaves_running_player_untouched() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(4));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));
    let buffer = Arc::clone(player.buffer());

    let err = player
        .advance_to(
            content(299),
            VariantSource::Catalog {
                catalog: Catalog::Stall,
                index: 33,
            },
        )
        .unwrap_err();
    assert!(matches!(err, VvError::InvalidVariantIndex { index: 33, .. }));

    assert_eq!(player.state(), PlayerState::Buffering);
    assert!(!buffer.is_closed());
    assert_eq!(buffer.len(), 20);
    assert_eq!(player.schedule().name(), "Baseline_30fps");
}

#[test]
fn advance_switches_content_and_variant() {
    let mut player = player_with(299, VariantSpec::baseline(30), SyntheticDecoder::new(4));
    player.activate().unwrap();
    assert!(player.await_prefill(WAIT));
    let old_buffer = Arc::clone(player.buffer());

    let next = ContentDescriptor::new("soldier", 3, 0, 59, 30, "unused").unwrap();
    player
        .advance_to(
            next,
            VariantSource::Catalog {
                catalog: Catalog::FrameRateVariation,
                index: 3,
            },
        )
        .unwrap();

    assert!(old_buffer.is_closed());
    assert!(old_buffer.is_empty());
    assert_eq!(player.content().name(), "soldier");
    assert_eq!(player.schedule().len(), 120);

    let sink = play_to_end(&mut player);
    assert_eq!(sink.uploads(), 120);
}
