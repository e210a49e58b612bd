//! vvplay Core - Foundation types for volumetric playback
//!
//! This crate provides the types shared by every other vvplay crate:
//! - Content description and frame path conventions (ContentDescriptor)
//! - Decoded point-cloud frames (Frame)
//! - Object placement (Transform)
//! - Player tuning (PlayerConfig)

pub mod config;
pub mod content;
pub mod error;
pub mod frame;
pub mod geometry;

pub use config::PlayerConfig;
pub use content::ContentDescriptor;
pub use error::{Result, VvError};
pub use frame::{Frame, FrameOrigin};
pub use geometry::Transform;

/// Default experiment setup.
pub mod defaults {
    /// Clip played when nothing else is configured.
    pub const CONTENT_NAME: &str = "longdress";

    /// Highest quality tier shipped with the captured clips.
    pub const QUALITY_TIER: u32 = 5;

    /// Inclusive frame range of the captured clips.
    pub const START_FRAME: u32 = 0;
    pub const LAST_FRAME: u32 = 299;

    /// Capture rate of the clips.
    pub const SOURCE_FPS: u32 = 30;

    /// Directory holding `{name}/representation{tier}/` trees.
    pub const ROOT_PATH: &str = "assets/pointcloud";
}
