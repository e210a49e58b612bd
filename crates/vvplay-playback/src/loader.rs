//! Background decode thread.
//!
//! The display loop hands decode requests to the loader through a command
//! channel and never blocks on it. One worker thread decodes each request,
//! tags the frame with its schedule tick and pushes it into the ring buffer.
//! Outcomes come back on an event channel the player drains every tick.
//!
//! Stopping is cooperative: a stop flag, a job epoch that invalidates every
//! queued request, and closing the buffer so no enqueue can land after
//! [`FrameLoader::stop`] returns. The worker owns the sending half of a
//! completion channel; `stop` waits on it with a deadline, and the channel
//! disconnects even if the worker panics.

use crate::ring_buffer::{BufferError, RingBuffer};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryIter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use vvplay_core::{ContentDescriptor, Frame, FrameOrigin, Result, VvError};
use vvplay_media::{decode_frame, PointCloudDecoder};

/// Used by `Drop` when the owner never called `stop`.
const DROP_STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// One frame to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    /// Schedule tick the frame is for.
    pub tick: usize,
    pub source_index: u32,
    pub quality_tier: u32,
}

/// Outcome of a request, reported back to the display loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    Loaded {
        tick: usize,
        source_index: u32,
    },
    DecodeFailed {
        tick: usize,
        source_index: u32,
        reason: String,
    },
}

impl LoaderEvent {
    pub fn tick(&self) -> usize {
        match self {
            Self::Loaded { tick, .. } | Self::DecodeFailed { tick, .. } => *tick,
        }
    }
}

enum LoaderCommand {
    Load { epoch: u64, request: LoadRequest },
    Stop,
}

#[derive(Debug, Default)]
struct LoaderCounters {
    loaded: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
}

/// State the worker thread shares with its owner.
struct Worker {
    content: ContentDescriptor,
    decoder: Arc<dyn PointCloudDecoder>,
    buffer: Arc<RingBuffer<Frame>>,
    commands: Receiver<LoaderCommand>,
    events: Sender<LoaderEvent>,
    stop_flag: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    counters: Arc<LoaderCounters>,
    space_wait: Duration,
    done: Sender<()>,
}

/// Owns the decode thread for one content activation.
pub struct FrameLoader {
    handle: Option<JoinHandle<()>>,
    commands: Sender<LoaderCommand>,
    events: Receiver<LoaderEvent>,
    done: Receiver<()>,
    buffer: Arc<RingBuffer<Frame>>,
    stop_flag: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    counters: Arc<LoaderCounters>,
    requested: u64,
}

impl FrameLoader {
    /// Spawn the decode thread for `content`, feeding `buffer`.
    ///
    /// `space_wait` bounds each wait for a free slot before the worker
    /// re-checks its stop flag.
    pub fn start(
        content: ContentDescriptor,
        decoder: Arc<dyn PointCloudDecoder>,
        buffer: Arc<RingBuffer<Frame>>,
        space_wait: Duration,
    ) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (done_tx, done_rx) = bounded(1);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let epoch = Arc::new(AtomicU64::new(0));
        let counters = Arc::new(LoaderCounters::default());

        info!(
            "Starting frame loader for {} (tier {}, decoder {})",
            content.name(),
            content.quality_tier(),
            decoder.name()
        );

        let worker = Worker {
            content,
            decoder,
            buffer: Arc::clone(&buffer),
            commands: command_rx,
            events: event_tx,
            stop_flag: Arc::clone(&stop_flag),
            epoch: Arc::clone(&epoch),
            counters: Arc::clone(&counters),
            space_wait,
            done: done_tx,
        };

        let handle = thread::Builder::new()
            .name("vvplay-loader".into())
            .spawn(move || worker.run())?;

        Ok(Self {
            handle: Some(handle),
            commands: command_tx,
            events: event_rx,
            done: done_rx,
            buffer,
            stop_flag,
            epoch,
            counters,
            requested: 0,
        })
    }

    /// Queue a decode job. Never blocks. Returns `false` once stopped.
    pub fn request_frame(&mut self, request: LoadRequest) -> bool {
        if self.stop_flag.load(Ordering::Acquire) {
            return false;
        }
        let epoch = self.epoch.load(Ordering::Acquire);
        if self
            .commands
            .send(LoaderCommand::Load { epoch, request })
            .is_err()
        {
            return false;
        }
        self.requested += 1;
        trace!(
            "Requested tick {} (source {}, tier {})",
            request.tick,
            request.source_index,
            request.quality_tier
        );
        true
    }

    /// Events reported since the last drain, without blocking.
    pub fn events(&self) -> TryIter<'_, LoaderEvent> {
        self.events.try_iter()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<LoaderEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Invalidate every queued request; in-flight work is dropped unpushed.
    /// Returns the new epoch.
    pub fn cancel_pending(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Loader epoch advanced to {}", epoch);
        epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn requested_count(&self) -> u64 {
        self.requested
    }

    pub fn loaded_count(&self) -> u64 {
        self.counters.loaded.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Jobs dropped because their epoch went stale.
    pub fn discarded_count(&self) -> u64 {
        self.counters.discarded.load(Ordering::Relaxed)
    }

    pub fn buffer(&self) -> &Arc<RingBuffer<Frame>> {
        &self.buffer
    }

    /// Whether the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the worker and wait up to `timeout` for it to exit.
    ///
    /// The buffer is closed before waiting, so once this returns no frame
    /// from this loader can appear in it, even if the thread is still stuck
    /// inside the decoder. On timeout the thread is detached and
    /// `ShutdownTimeout` is returned.
    pub fn stop(&mut self, timeout: Duration) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.stop_flag.store(true, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let _ = self.commands.send(LoaderCommand::Stop);
        self.buffer.close();

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Frame loader did not stop within {:?}; detaching decode thread",
                    timeout
                );
                return Err(VvError::ShutdownTimeout(timeout));
            }
        }
        let _ = handle.join();

        debug!(
            "Frame loader stopped ({} requested, {} loaded, {} failed, {} discarded)",
            self.requested,
            self.loaded_count(),
            self.failed_count(),
            self.discarded_count()
        );
        Ok(())
    }
}

impl Drop for FrameLoader {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop(DROP_STOP_TIMEOUT);
        }
    }
}

impl Worker {
    fn run(self) {
        debug!("Decode thread started");
        let mut tiered = self.content.clone();

        while let Ok(command) = self.commands.recv() {
            let (job_epoch, request) = match command {
                LoaderCommand::Load { epoch, request } => (epoch, request),
                LoaderCommand::Stop => break,
            };
            if self.stop_flag.load(Ordering::Acquire) {
                break;
            }
            if self.is_stale(job_epoch) {
                self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            if tiered.quality_tier() != request.quality_tier {
                tiered = self.content.with_quality_tier(request.quality_tier);
            }
            let path = tiered.frame_path(request.source_index);

            match decode_frame(self.decoder.as_ref(), &path) {
                Ok(frame) => {
                    let frame = frame.with_origin(FrameOrigin {
                        tick: request.tick,
                        source_index: request.source_index,
                        quality_tier: request.quality_tier,
                    });
                    if !self.push(frame, job_epoch) {
                        self.counters.discarded.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.counters.loaded.fetch_add(1, Ordering::Relaxed);
                    let _ = self.events.send(LoaderEvent::Loaded {
                        tick: request.tick,
                        source_index: request.source_index,
                    });
                }
                Err(e) => self.report_failure(request, path, e),
            }
        }

        debug!("Decode thread exiting");
        let _ = self.done.send(());
    }

    fn is_stale(&self, job_epoch: u64) -> bool {
        job_epoch != self.epoch.load(Ordering::Acquire)
    }

    /// Push with bounded waits on a full buffer. Returns `false` when the
    /// frame was dropped because the loader stopped or the job went stale.
    fn push(&self, frame: Frame, job_epoch: u64) -> bool {
        let mut pending = frame;
        loop {
            if self.stop_flag.load(Ordering::Acquire) || self.is_stale(job_epoch) {
                return false;
            }
            match self.buffer.enqueue(pending) {
                Ok(()) => return true,
                Err(BufferError::Full(frame)) => {
                    pending = frame;
                    self.buffer.wait_for_space(self.space_wait);
                }
                Err(BufferError::Closed(_)) | Err(BufferError::Empty) => return false,
            }
        }
    }

    fn report_failure(&self, request: LoadRequest, path: PathBuf, error: VvError) {
        warn!(
            "Cannot import tick {} from {}: {}",
            request.tick,
            path.display(),
            error
        );
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        let _ = self.events.send(LoaderEvent::DecodeFailed {
            tick: request.tick,
            source_index: request.source_index,
            reason: error.to_string(),
        });
    }
}
