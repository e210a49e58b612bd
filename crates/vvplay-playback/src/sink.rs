//! Renderer and observer seams.

use crate::player::{PlaybackReport, PlayerState};
use vvplay_core::{Frame, Transform};

/// Opaque handle a renderer returns for an uploaded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// Where displayed frames go (GPU upload lives behind this).
pub trait FrameSink {
    fn upload_frame(&mut self, frame: &Frame) -> RenderHandle;
    fn set_transform(&mut self, transform: &Transform);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink {
    next: u64,
}

impl FrameSink for NullSink {
    fn upload_frame(&mut self, _frame: &Frame) -> RenderHandle {
        self.next += 1;
        RenderHandle(self.next)
    }

    fn set_transform(&mut self, _transform: &Transform) {}
}

/// Keeps a record of what was shown, for the headless driver and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Source index of every uploaded frame, in display order.
    pub shown: Vec<u32>,
    /// Schedule tick of every uploaded frame.
    pub ticks: Vec<usize>,
    pub points_uploaded: u64,
    pub transform: Option<Transform>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploads(&self) -> usize {
        self.shown.len()
    }
}

impl FrameSink for RecordingSink {
    fn upload_frame(&mut self, frame: &Frame) -> RenderHandle {
        self.shown.push(frame.origin().source_index);
        self.ticks.push(frame.tick());
        self.points_uploaded += frame.point_count() as u64;
        RenderHandle(self.shown.len() as u64)
    }

    fn set_transform(&mut self, transform: &Transform) {
        self.transform = Some(*transform);
    }
}

/// Hooks into the player's lifecycle. The end-of-content hook is where
/// experiment flow (scoring UI, next variant) attaches.
pub trait PlaybackObserver {
    fn on_state_change(&mut self, _from: PlayerState, _to: PlayerState) {}

    /// A tick was due but no frame could be shown.
    fn on_stall(&mut self, _tick: usize) {}

    fn on_ended(&mut self, _report: &PlaybackReport) {}
}
