//! Playback state machine.
//!
//! ```text
//! Idle --activate--> Buffering --pre-fill + play--> Playing <--pause/play--> Paused
//!                                                      |
//!                                          render tick == schedule length
//!                                                      v
//!                                                    Ended
//! ```
//!
//! The player is driven by an external per-frame callback ([`Player::tick`])
//! and never blocks in it. One player type covers every experiment: the
//! variant is a value chosen at construction or at `advance_to`.
//!
//! Every operation has an `_at(now)` form taking the current instant, so
//! tests can drive time explicitly; the plain forms use `Instant::now()`.

use crate::clock::{ClockSignal, PlaybackClock};
use crate::loader::{FrameLoader, LoadRequest, LoaderEvent};
use crate::ring_buffer::RingBuffer;
use crate::sink::{FrameSink, PlaybackObserver, RenderHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vvplay_core::{ContentDescriptor, Frame, PlayerConfig, Result, Transform, VvError};
use vvplay_media::PointCloudDecoder;
use vvplay_schedule::{Catalog, Schedule, ScheduleGenerator, VariantSpec};

/// Consecutive stalls after which a sustained-stall warning is logged.
const SUSTAINED_STALL_TICKS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
    Ended,
}

impl PlayerState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Buffering => "buffering",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a player's variant comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantSource {
    Spec(VariantSpec),
    Catalog { catalog: Catalog, index: usize },
}

impl VariantSource {
    /// Resolve to a concrete variant; catalog lookups may fail with
    /// `InvalidVariantIndex`.
    pub fn resolve(&self) -> Result<VariantSpec> {
        match self {
            Self::Spec(spec) => Ok(spec.clone()),
            Self::Catalog { catalog, index } => catalog.variant(*index),
        }
    }
}

impl From<VariantSpec> for VariantSource {
    fn from(spec: VariantSpec) -> Self {
        Self::Spec(spec)
    }
}

/// What one call to [`Player::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// Pre-fill in progress.
    Buffering { buffered: usize, target: usize },
    /// Not yet time for the next tick.
    Waiting,
    /// A new frame went to the sink.
    Advanced {
        tick: usize,
        source_index: u32,
        handle: RenderHandle,
    },
    /// The frame for `tick` failed to decode; the current frame was held and
    /// the schedule moved on.
    Hole { tick: usize },
    /// A tick was due but the buffer could not supply it; nothing advanced.
    Stalled { tick: usize },
    Paused,
    Ended,
}

/// Counters for one activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStats {
    pub frames_shown: u64,
    pub stalls: u64,
    pub holes: u64,
    pub decode_failures: u64,
    pub requests_issued: u64,
}

/// Summary handed to observers when content ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackReport {
    pub content: String,
    pub variant: String,
    pub schedule_len: usize,
    pub stats: PlaybackStats,
    pub elapsed: Duration,
}

pub struct Player {
    config: PlayerConfig,
    decoder: Arc<dyn PointCloudDecoder>,
    content: ContentDescriptor,
    variant: VariantSpec,
    schedule: Schedule,
    state: PlayerState,

    buffer: Arc<RingBuffer<Frame>>,
    loader: Option<FrameLoader>,
    clock: Option<PlaybackClock>,

    /// Play time folded in from earlier play segments.
    played_time: Duration,
    /// Next schedule tick to request from the loader.
    next_request: usize,
    /// Requests without a Loaded/DecodeFailed event yet.
    in_flight: usize,
    prefill_target: usize,
    play_requested: bool,
    render_tick: usize,
    current: Option<Frame>,
    consecutive_stalls: u64,

    transform: Transform,
    transform_dirty: bool,
    stats: PlaybackStats,
    observers: Vec<Box<dyn PlaybackObserver>>,
}

impl Player {
    /// Build an idle player. The schedule is generated here, so a bad
    /// variant fails before any thread exists.
    pub fn new(
        config: PlayerConfig,
        content: ContentDescriptor,
        variant: impl Into<VariantSource>,
        decoder: Arc<dyn PointCloudDecoder>,
    ) -> Result<Self> {
        config.validate()?;
        let variant = variant.into().resolve()?;
        let schedule = ScheduleGenerator::for_content(&content).generate(&variant)?;
        let buffer = Arc::new(RingBuffer::new(config.buffer_capacity));

        Ok(Self {
            config,
            decoder,
            content,
            variant,
            schedule,
            state: PlayerState::Idle,
            buffer,
            loader: None,
            clock: None,
            played_time: Duration::ZERO,
            next_request: 0,
            in_flight: 0,
            prefill_target: 0,
            play_requested: false,
            render_tick: 0,
            current: None,
            consecutive_stalls: 0,
            transform: Transform::default(),
            transform_dirty: true,
            stats: PlaybackStats::default(),
            observers: Vec::new(),
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.observers.push(observer);
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.transform_dirty = true;
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn content(&self) -> &ContentDescriptor {
        &self.content
    }

    pub fn variant(&self) -> &VariantSpec {
        &self.variant
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Next schedule tick to be shown.
    pub fn render_tick(&self) -> usize {
        self.render_tick
    }

    /// Ticks remaining after the one at `render_tick`.
    pub fn frames_left(&self) -> usize {
        self.schedule
            .len()
            .saturating_sub(1)
            .saturating_sub(self.render_tick)
    }

    /// Frame currently on screen.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &Arc<RingBuffer<Frame>> {
        &self.buffer
    }

    pub fn prefill_target(&self) -> usize {
        self.prefill_target
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    /// Total play time, paused periods excluded.
    pub fn elapsed(&self) -> Duration {
        self.played_time + self.clock.as_ref().map_or(Duration::ZERO, |c| c.elapsed())
    }

    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.played_time
            + self
                .clock
                .as_ref()
                .map_or(Duration::ZERO, |c| c.elapsed_at(now))
    }

    /// Sleep hint for a driver loop.
    pub fn time_until_next_tick(&self, now: Instant) -> Duration {
        match (self.state, &self.clock) {
            (PlayerState::Playing, Some(clock)) => clock.time_until_advance(now),
            _ => Duration::from_millis(1),
        }
    }

    /// Block until pre-fill is satisfied or `timeout` passes. Harness helper;
    /// never call from a display loop.
    pub fn await_prefill(&self, timeout: Duration) -> bool {
        self.state != PlayerState::Idle && self.buffer.wait_for_len(self.prefill_target, timeout)
    }

    // ── Transitions ─────────────────────────────────────────────

    /// Idle → Buffering: fresh buffer, loader started, pre-fill requested.
    pub fn activate(&mut self) -> Result<()> {
        if self.state != PlayerState::Idle {
            return Err(VvError::InvalidTransition {
                state: self.state.name(),
                action: "activate",
            });
        }

        self.buffer = Arc::new(RingBuffer::new(self.config.buffer_capacity));
        self.loader = Some(FrameLoader::start(
            self.content.clone(),
            Arc::clone(&self.decoder),
            Arc::clone(&self.buffer),
            self.config.loader_space_wait(),
        )?);

        self.reset_progress();
        self.prefill_target = self.config.buffer_capacity.min(self.schedule.len());
        self.set_state(PlayerState::Buffering);
        self.issue_requests();

        info!(
            "Activated {} / {} ({} ticks, pre-fill {})",
            self.content.name(),
            self.schedule.name(),
            self.schedule.len(),
            self.prefill_target
        );
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.play_at(Instant::now())
    }

    /// Start or resume playback. During pre-fill the request is remembered
    /// and honoured by the tick that completes it.
    pub fn play_at(&mut self, now: Instant) -> Result<()> {
        match self.state {
            PlayerState::Idle => {
                self.activate()?;
                self.play_requested = true;
                self.try_start(now);
            }
            PlayerState::Buffering => {
                self.play_requested = true;
                self.try_start(now);
            }
            PlayerState::Paused => self.start_clock(now),
            PlayerState::Playing => {}
            PlayerState::Ended => {
                return Err(VvError::InvalidTransition {
                    state: "ended",
                    action: "play",
                });
            }
        }
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.pause_at(Instant::now())
    }

    /// Playing → Paused; the clock's time is folded into the elapsed total.
    pub fn pause_at(&mut self, now: Instant) -> Result<()> {
        match self.state {
            PlayerState::Playing => {
                self.fold_clock(now);
                self.set_state(PlayerState::Paused);
                Ok(())
            }
            PlayerState::Buffering => {
                self.play_requested = false;
                Ok(())
            }
            PlayerState::Paused | PlayerState::Ended => Ok(()),
            PlayerState::Idle => Err(VvError::InvalidTransition {
                state: "idle",
                action: "pause",
            }),
        }
    }

    /// Restart the same content: stop, tear down, regenerate, re-buffer.
    pub fn replay(&mut self) -> Result<()> {
        let schedule = ScheduleGenerator::for_content(&self.content).generate(&self.variant)?;
        self.teardown();
        self.schedule = schedule;
        self.played_time = Duration::ZERO;
        self.activate()?;
        self.play_requested = true;
        Ok(())
    }

    /// Switch to other content and/or variant, then buffer with play
    /// requested. The new schedule is built before anything is torn down.
    pub fn advance_to(
        &mut self,
        content: ContentDescriptor,
        variant: impl Into<VariantSource>,
    ) -> Result<()> {
        let variant = variant.into().resolve()?;
        let schedule = ScheduleGenerator::for_content(&content).generate(&variant)?;

        self.teardown();
        info!(
            "Advancing from {} / {} to {} / {}",
            self.content.name(),
            self.schedule.name(),
            content.name(),
            schedule.name()
        );
        self.content = content;
        self.variant = variant;
        self.schedule = schedule;
        self.played_time = Duration::ZERO;
        self.activate()?;
        self.play_requested = true;
        Ok(())
    }

    /// Stop the loader, then drop buffered frames. Ends in Idle.
    ///
    /// A loader that misses its shutdown deadline is reported, but the
    /// player is torn down all the same.
    pub fn shutdown(&mut self) -> Result<()> {
        let result = self.stop_loader();
        self.buffer.close();
        self.buffer.clear();
        self.clock = None;
        self.current = None;
        self.play_requested = false;
        self.set_state(PlayerState::Idle);
        result
    }

    // ── Per-frame driver ────────────────────────────────────────

    pub fn tick(&mut self, sink: &mut dyn FrameSink) -> TickOutcome {
        self.tick_at(Instant::now(), sink)
    }

    /// One display-loop iteration. Never blocks.
    pub fn tick_at(&mut self, now: Instant, sink: &mut dyn FrameSink) -> TickOutcome {
        match self.state {
            PlayerState::Idle => return TickOutcome::Idle,
            PlayerState::Ended => return TickOutcome::Ended,
            _ => {}
        }

        self.drain_events();
        self.issue_requests();

        match self.state {
            PlayerState::Paused => return TickOutcome::Paused,
            PlayerState::Buffering => {
                if !self.try_start(now) {
                    return TickOutcome::Buffering {
                        buffered: self.buffer.len(),
                        target: self.prefill_target,
                    };
                }
            }
            _ => {}
        }

        let signal = match self.clock.as_mut() {
            Some(clock) => clock.poll(now),
            None => ClockSignal::Wait,
        };
        if signal == ClockSignal::Wait {
            return TickOutcome::Waiting;
        }

        let outcome = self.advance(sink);
        if self.render_tick >= self.schedule.len() {
            self.end(now);
        }
        outcome
    }

    // ── Internals ───────────────────────────────────────────────

    fn advance(&mut self, sink: &mut dyn FrameSink) -> TickOutcome {
        let tick = self.render_tick;
        let head_tick = self.buffer.peek_with(|frame| frame.tick());

        match head_tick {
            // The frame for this tick failed to decode
            Some(head) if head > tick => self.step_over_hole(),
            None if self.loader_exhausted() => self.step_over_hole(),
            Some(_) if self.buffer.len() > 1 || self.loader_exhausted() => {
                match self.buffer.dequeue() {
                    Ok(frame) => self.show(frame, sink),
                    Err(_) => self.stall(),
                }
            }
            _ => self.stall(),
        }
    }

    fn show(&mut self, frame: Frame, sink: &mut dyn FrameSink) -> TickOutcome {
        if self.transform_dirty {
            sink.set_transform(&self.transform);
            self.transform_dirty = false;
        }
        let handle = sink.upload_frame(&frame);
        let tick = frame.tick();
        let source_index = frame.origin().source_index;

        self.render_tick = tick + 1;
        self.current = Some(frame);
        self.stats.frames_shown += 1;
        self.consecutive_stalls = 0;
        // A slot freed up; top up without waiting for the next tick
        self.issue_requests();

        TickOutcome::Advanced {
            tick,
            source_index,
            handle,
        }
    }

    fn step_over_hole(&mut self) -> TickOutcome {
        let tick = self.render_tick;
        debug!("Holding frame over undecodable tick {}", tick);
        self.render_tick += 1;
        self.stats.holes += 1;
        self.consecutive_stalls = 0;
        TickOutcome::Hole { tick }
    }

    fn stall(&mut self) -> TickOutcome {
        let tick = self.render_tick;
        self.stats.stalls += 1;
        self.consecutive_stalls += 1;
        debug!("Stall at tick {}: buffer runs out", tick);
        if self.consecutive_stalls == SUSTAINED_STALL_TICKS {
            warn!(
                "{} consecutive stalls at tick {}; decoding is not keeping up",
                self.consecutive_stalls, tick
            );
        }
        for observer in &mut self.observers {
            observer.on_stall(tick);
        }
        TickOutcome::Stalled { tick }
    }

    fn end(&mut self, now: Instant) {
        self.fold_clock(now);
        self.play_requested = false;
        self.set_state(PlayerState::Ended);

        let report = PlaybackReport {
            content: self.content.name().to_string(),
            variant: self.schedule.name().to_string(),
            schedule_len: self.schedule.len(),
            stats: self.stats,
            elapsed: self.played_time,
        };
        info!(
            "Finished {} / {}: {} shown, {} stalls, {} holes in {:.2}s",
            report.content,
            report.variant,
            report.stats.frames_shown,
            report.stats.stalls,
            report.stats.holes,
            report.elapsed.as_secs_f64()
        );
        for observer in &mut self.observers {
            observer.on_ended(&report);
        }
    }

    /// Buffering → Playing once pre-fill is satisfied and play was asked for.
    fn try_start(&mut self, now: Instant) -> bool {
        if self.state != PlayerState::Buffering || !self.play_requested {
            return false;
        }
        if !self.prefill_satisfied() {
            return false;
        }
        self.start_clock(now);
        true
    }

    fn prefill_satisfied(&self) -> bool {
        let buffered = self.buffer.len();
        buffered >= self.prefill_target || (buffered > 0 && self.loader_exhausted())
    }

    fn start_clock(&mut self, now: Instant) {
        let mut clock = PlaybackClock::new(self.content.nominal_fps(), now)
            .with_max_debt(self.config.max_clock_debt_intervals);
        if self.current.is_none() {
            clock.prime();
        }
        self.clock = Some(clock);
        self.set_state(PlayerState::Playing);
    }

    fn fold_clock(&mut self, now: Instant) {
        if let Some(clock) = self.clock.take() {
            self.played_time += clock.elapsed_at(now);
        }
    }

    /// Every request has been issued and answered.
    fn loader_exhausted(&self) -> bool {
        self.next_request >= self.schedule.len() && self.in_flight == 0
    }

    fn drain_events(&mut self) {
        let Some(loader) = self.loader.as_ref() else {
            return;
        };
        for event in loader.events() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if let LoaderEvent::DecodeFailed { .. } = event {
                self.stats.decode_failures += 1;
            }
        }
    }

    /// Request the next schedule ticks while there is room.
    fn issue_requests(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let capacity = self.buffer.capacity();
        let threshold = self.config.effective_refill_threshold();
        let buffered = self.buffer.len();
        if buffered >= threshold {
            return;
        }

        while self.next_request < self.schedule.len() && buffered + self.in_flight < capacity {
            let tick = self.next_request;
            let Some(source_index) = self.schedule.source_index(tick) else {
                break;
            };
            let request = LoadRequest {
                tick,
                source_index,
                quality_tier: self
                    .schedule
                    .quality_tier_at(tick, self.content.quality_tier()),
            };
            if !loader.request_frame(request) {
                break;
            }
            self.next_request += 1;
            self.in_flight += 1;
            self.stats.requests_issued += 1;
        }
    }

    fn stop_loader(&mut self) -> Result<()> {
        match self.loader.take() {
            Some(mut loader) => loader.stop(self.config.loader_shutdown_timeout()),
            None => Ok(()),
        }
    }

    /// Stop-then-teardown used by replay and content switches.
    fn teardown(&mut self) {
        if let Err(e) = self.stop_loader() {
            warn!("Continuing after loader shutdown failure: {}", e);
        }
        self.buffer.close();
        self.buffer.clear();
        self.clock = None;
        self.current = None;
        self.play_requested = false;
        self.set_state(PlayerState::Idle);
    }

    fn reset_progress(&mut self) {
        self.next_request = 0;
        self.in_flight = 0;
        self.render_tick = 0;
        self.current = None;
        self.clock = None;
        self.consecutive_stalls = 0;
        self.transform_dirty = true;
        self.stats = PlaybackStats::default();
    }

    fn set_state(&mut self, next: PlayerState) {
        let previous = self.state;
        if previous == next {
            return;
        }
        self.state = next;
        info!("Player {} -> {}", previous, next);
        for observer in &mut self.observers {
            observer.on_state_change(previous, next);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.loader.is_some() {
            let _ = self.shutdown();
        }
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("content", &self.content.name())
            .field("schedule", &self.schedule.name())
            .field("state", &self.state)
            .field("render_tick", &self.render_tick)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
