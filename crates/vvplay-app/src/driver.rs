//! Headless display loop.
//!
//! Stands in for a render loop: ticks the player, sleeps on the clock's hint
//! and collects what reached the sink. With `fast` set, time is synthetic and
//! advances one frame interval per tick, so a clip runs as quickly as the
//! decoder allows.

use anyhow::{bail, Result};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vvplay_playback::{Player, PlayerState, RecordingSink, TickOutcome};

/// What one headless run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub schedule: String,
    pub ticks: usize,
    pub frames_shown: usize,
    pub points_uploaded: u64,
    pub stalls: u64,
    pub holes: u64,
    pub decode_failures: u64,
    pub elapsed_secs: f64,
    pub wall_secs: f64,
}

pub fn run_to_end(player: &mut Player, fast: bool, timeout: Duration) -> Result<RunSummary> {
    let mut sink = RecordingSink::new();
    let wall_start = Instant::now();
    let deadline = wall_start + timeout;
    let interval = Duration::from_nanos(1_000_000_000 / player.content().nominal_fps().max(1) as u64);

    let t0 = Instant::now();
    let mut step: u32 = 0;
    player.play_at(t0)?;

    while player.state() != PlayerState::Ended {
        if Instant::now() > deadline {
            bail!(
                "{} did not finish within {:?} (tick {} of {})",
                player.schedule().name(),
                timeout,
                player.render_tick(),
                player.schedule().len()
            );
        }

        let now = if fast { t0 + interval * step } else { Instant::now() };
        let outcome = player.tick_at(now, &mut sink);
        match outcome {
            TickOutcome::Buffering { buffered, target } => {
                debug!("Buffering {}/{}", buffered, target);
                player.await_prefill(Duration::from_millis(50));
                continue;
            }
            TickOutcome::Stalled { tick } if fast => {
                // Let the decoder catch up instead of burning synthetic time
                player.buffer().wait_for_len(2, Duration::from_millis(20));
                debug!("Stalled at tick {}", tick);
            }
            TickOutcome::Idle => bail!("player dropped back to idle"),
            _ => {}
        }

        step = step.saturating_add(1);
        if !fast {
            let hint = player.time_until_next_tick(Instant::now());
            if !hint.is_zero() {
                thread::sleep(hint);
            }
        }
    }

    let stats = player.stats();
    if stats.decode_failures > 0 {
        warn!(
            "{} frames failed to decode during {}",
            stats.decode_failures,
            player.schedule().name()
        );
    }

    Ok(RunSummary {
        schedule: player.schedule().name().to_string(),
        ticks: player.schedule().len(),
        frames_shown: sink.uploads(),
        points_uploaded: sink.points_uploaded,
        stalls: stats.stalls,
        holes: stats.holes,
        decode_failures: stats.decode_failures,
        elapsed_secs: player.elapsed().as_secs_f64(),
        wall_secs: wall_start.elapsed().as_secs_f64(),
    })
}
