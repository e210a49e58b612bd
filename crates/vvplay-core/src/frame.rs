//! Decoded point-cloud frames in CPU memory.
//!
//! A frame is a flat array of `xyz` positions and `rgba` colors, laid out the
//! way the renderer uploads them: 12 bytes of position and 4 bytes of color
//! per point.

use crate::error::{Result, VvError};
use glam::Vec3;

/// Floats per point in the position array.
pub const POSITION_COMPONENTS: usize = 3;

/// Bytes per point in the color array.
pub const COLOR_COMPONENTS: usize = 4;

/// Where a frame came from in the playback schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameOrigin {
    /// Schedule tick the frame was requested for.
    pub tick: usize,
    /// Source frame index inside the clip.
    pub source_index: u32,
    /// Quality tier the frame was decoded at.
    pub quality_tier: u32,
}

/// One decoded point-cloud sample.
///
/// `positions.len() == 3 * point_count` and `colors.len() == 4 * point_count`
/// hold for every constructed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    point_count: usize,
    positions: Vec<f32>,
    colors: Vec<u8>,
    origin: FrameOrigin,
}

impl Frame {
    /// Allocate a zeroed frame for `point_count` points.
    pub fn new(point_count: usize) -> Self {
        Self {
            point_count,
            positions: vec![0.0; point_count * POSITION_COMPONENTS],
            colors: vec![0; point_count * COLOR_COMPONENTS],
            origin: FrameOrigin::default(),
        }
    }

    /// Build a frame from already-filled arrays.
    pub fn from_parts(positions: Vec<f32>, colors: Vec<u8>) -> Result<Self> {
        if positions.len() % POSITION_COMPONENTS != 0 {
            return Err(VvError::InvalidParameter(format!(
                "position array length {} is not a multiple of 3",
                positions.len()
            )));
        }
        let point_count = positions.len() / POSITION_COMPONENTS;
        if colors.len() != point_count * COLOR_COMPONENTS {
            return Err(VvError::InvalidParameter(format!(
                "color array holds {} bytes, expected {} for {} points",
                colors.len(),
                point_count * COLOR_COMPONENTS,
                point_count
            )));
        }
        Ok(Self {
            point_count,
            positions,
            colors,
            origin: FrameOrigin::default(),
        })
    }

    /// Tag the frame with its schedule origin.
    pub fn with_origin(mut self, origin: FrameOrigin) -> Self {
        self.origin = origin;
        self
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    #[inline]
    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    #[inline]
    pub fn tick(&self) -> usize {
        self.origin.tick
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[u8] {
        &self.colors
    }

    /// Mutable views of both arrays, for decoders filling a pre-sized frame.
    pub fn buffers_mut(&mut self) -> (&mut [f32], &mut [u8]) {
        (&mut self.positions, &mut self.colors)
    }

    /// Positions viewed as `Vec3`s without copying.
    pub fn points(&self) -> &[Vec3] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Colors viewed as `[r, g, b, a]` quadruples without copying.
    pub fn rgba(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Raw position bytes, ready for a vertex-buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Total memory held by the frame's arrays.
    pub fn memory_size(&self) -> usize {
        self.positions.len() * std::mem::size_of::<f32>() + self.colors.len()
    }

    /// Axis-aligned bounds of the points, `None` for an empty frame.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let points = self.points();
        let first = *points.first()?;
        Some(
            points
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }
}
