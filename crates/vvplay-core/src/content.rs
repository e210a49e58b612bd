//! Content descriptors: which clip, at which quality tier, over which frames.
//!
//! A descriptor is immutable. Switching quality tier or clip produces a new
//! descriptor rather than mutating the active one, so a loader that captured
//! the old descriptor keeps a consistent view of the paths it decodes.

use crate::error::{Result, VvError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Immutable description of a volumetric clip on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContent")]
pub struct ContentDescriptor {
    name: String,
    quality_tier: u32,
    start_frame: u32,
    last_frame: u32,
    nominal_fps: u32,
    explicit_duration: Option<f32>,
    root_path: PathBuf,
}

/// Unchecked wire form; deserialization goes through [`ContentDescriptor::new`].
#[derive(Deserialize)]
struct RawContent {
    name: String,
    quality_tier: u32,
    start_frame: u32,
    last_frame: u32,
    nominal_fps: u32,
    explicit_duration: Option<f32>,
    root_path: PathBuf,
}

impl TryFrom<RawContent> for ContentDescriptor {
    type Error = VvError;

    fn try_from(raw: RawContent) -> Result<Self> {
        let content = Self::new(
            raw.name,
            raw.quality_tier,
            raw.start_frame,
            raw.last_frame,
            raw.nominal_fps,
            raw.root_path,
        )?;
        match raw.explicit_duration {
            Some(seconds) => content.with_duration(seconds),
            None => Ok(content),
        }
    }
}

impl ContentDescriptor {
    /// Create a descriptor, validating the frame range and rate.
    pub fn new(
        name: impl Into<String>,
        quality_tier: u32,
        start_frame: u32,
        last_frame: u32,
        nominal_fps: u32,
        root_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(VvError::InvalidContent("content name is empty".into()));
        }
        if start_frame > last_frame {
            return Err(VvError::InvalidContent(format!(
                "start frame {} is after last frame {}",
                start_frame, last_frame
            )));
        }
        if nominal_fps == 0 {
            return Err(VvError::InvalidContent(format!(
                "{}: nominal frame rate must be positive",
                name
            )));
        }

        Ok(Self {
            name,
            quality_tier,
            start_frame,
            last_frame,
            nominal_fps,
            explicit_duration: None,
            root_path: root_path.into(),
        })
    }

    /// Same content with an explicit playback duration in seconds.
    pub fn with_duration(&self, seconds: f32) -> Result<Self> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(VvError::InvalidContent(format!(
                "{}: explicit duration must be positive, got {}",
                self.name, seconds
            )));
        }
        Ok(Self {
            explicit_duration: Some(seconds),
            ..self.clone()
        })
    }

    /// Same content at another quality tier.
    pub fn with_quality_tier(&self, quality_tier: u32) -> Self {
        Self {
            quality_tier,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quality_tier(&self) -> u32 {
        self.quality_tier
    }

    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    pub fn last_frame(&self) -> u32 {
        self.last_frame
    }

    pub fn nominal_fps(&self) -> u32 {
        self.nominal_fps
    }

    pub fn explicit_duration(&self) -> Option<f32> {
        self.explicit_duration
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Number of source frames in the inclusive range.
    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.last_frame - self.start_frame + 1
    }

    /// Playback duration in seconds: the explicit one if set, else frames / fps.
    pub fn duration_secs(&self) -> f64 {
        match self.explicit_duration {
            Some(d) => d as f64,
            None => self.frame_count() as f64 / self.nominal_fps as f64,
        }
    }

    /// Whether a source index lies inside the clip.
    #[inline]
    pub fn contains(&self, index: u32) -> bool {
        index >= self.start_frame && index <= self.last_frame
    }

    /// Directory holding the frames of this quality tier.
    pub fn representation_dir(&self) -> PathBuf {
        self.root_path
            .join(&self.name)
            .join(format!("representation{}", self.quality_tier))
    }

    /// Path of one source frame: `{root}/{name}/representation{tier}/{name}{index:04}.ply`.
    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.representation_dir()
            .join(format!("{}{:04}.ply", self.name, index))
    }
}
