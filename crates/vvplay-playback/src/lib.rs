//! vvplay Playback - buffered, paced playback of a frame schedule
//!
//! The display loop never blocks: it polls the clock, takes the head of the
//! ring buffer when a tick is due and hands it to a [`FrameSink`]. A single
//! decode thread fills the buffer in schedule order.
//!
//! - RingBuffer: bounded FIFO between decoder and display
//! - FrameLoader: the decode thread and its request/event channels
//! - PlaybackClock: drift-corrected pacing
//! - Player: the Idle/Buffering/Playing/Paused/Ended state machine

pub mod clock;
pub mod loader;
pub mod player;
pub mod ring_buffer;
pub mod sink;

pub use clock::{ClockSignal, PlaybackClock};
pub use loader::{FrameLoader, LoadRequest, LoaderEvent};
pub use player::{
    PlaybackReport, PlaybackStats, Player, PlayerState, TickOutcome, VariantSource,
};
pub use ring_buffer::{BufferError, RingBuffer};
pub use sink::{FrameSink, NullSink, PlaybackObserver, RecordingSink, RenderHandle};
