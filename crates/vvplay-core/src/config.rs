//! Player tuning parameters.

use crate::error::{Result, VvError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default ring-buffer capacity in frames.
pub const DEFAULT_BUFFER_CAPACITY: usize = 20;

/// The player only dequeues while a second frame is buffered behind the
/// head, so capacity and refill threshold can never go below this.
pub const MIN_BUFFERED_FRAMES: usize = 2;

/// Tunables for one player instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Ring-buffer capacity in frames.
    pub buffer_capacity: usize,
    /// Occupancy below which the player tops up decode requests.
    /// `None` means "keep the buffer as full as possible".
    pub refill_threshold: Option<usize>,
    /// Clock debt (in frame intervals) kept before the clock resyncs.
    pub max_clock_debt_intervals: u32,
    /// How long `stop` waits for the decode thread.
    pub loader_shutdown_timeout_ms: u64,
    /// Bounded wait the loader performs on a full buffer before retrying.
    pub loader_space_wait_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            refill_threshold: None,
            max_clock_debt_intervals: 3,
            loader_shutdown_timeout_ms: 500,
            loader_space_wait_ms: 10,
        }
    }
}

impl PlayerConfig {
    /// Reject values the player cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity < MIN_BUFFERED_FRAMES {
            return Err(VvError::InvalidParameter(format!(
                "buffer_capacity must be at least {}",
                MIN_BUFFERED_FRAMES
            )));
        }
        if let Some(threshold) = self.refill_threshold {
            if !(MIN_BUFFERED_FRAMES..=self.buffer_capacity).contains(&threshold) {
                return Err(VvError::InvalidParameter(format!(
                    "refill_threshold {} must lie in {}..={}",
                    threshold, MIN_BUFFERED_FRAMES, self.buffer_capacity
                )));
            }
        }
        Ok(())
    }

    /// Occupancy below which requests are topped up.
    pub fn effective_refill_threshold(&self) -> usize {
        self.refill_threshold.unwrap_or(self.buffer_capacity)
    }

    pub fn loader_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.loader_shutdown_timeout_ms)
    }

    pub fn loader_space_wait(&self) -> Duration {
        Duration::from_millis(self.loader_space_wait_ms)
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| VvError::Serialization(format!("Invalid player config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| VvError::Serialization(format!("Failed to serialize player config: {}", e)))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
