//! Content probing: check a clip is on disk before playing it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};
use vvplay_core::{ContentDescriptor, Result, VvError};

/// What was found for one content descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentProbe {
    /// Representation directory that was scanned.
    pub directory: PathBuf,
    /// Frames of the descriptor's range present on disk.
    pub frames_present: u32,
    /// Frames of the range that are missing.
    pub missing: Vec<u32>,
    /// `.ply` files in the directory, in range or not.
    pub ply_files: usize,
    /// Total size of the in-range frame files.
    pub total_bytes: u64,
}

impl ContentProbe {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Average file size of the frames present.
    pub fn mean_frame_bytes(&self) -> Option<u64> {
        (self.frames_present > 0).then(|| self.total_bytes / self.frames_present as u64)
    }
}

/// Scan the representation directory of `content`.
pub fn probe_content(content: &ContentDescriptor) -> Result<ContentProbe> {
    let directory = content.representation_dir();
    if !directory.is_dir() {
        return Err(VvError::NotFound(format!(
            "Representation directory not found: {}",
            directory.display()
        )));
    }

    let ply_files = std::fs::read_dir(&directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"))
        })
        .count();

    let mut frames_present = 0;
    let mut missing = Vec::new();
    let mut total_bytes = 0;
    for index in content.start_frame()..=content.last_frame() {
        match std::fs::metadata(content.frame_path(index)) {
            Ok(meta) if meta.is_file() => {
                frames_present += 1;
                total_bytes += meta.len();
            }
            _ => missing.push(index),
        }
    }

    if missing.is_empty() {
        debug!(
            "Probed {}: {} frames, {} bytes",
            directory.display(),
            frames_present,
            total_bytes
        );
    } else {
        warn!(
            "Probed {}: {} of {} frames missing",
            directory.display(),
            missing.len(),
            content.frame_count()
        );
    }

    Ok(ContentProbe {
        directory,
        frames_present,
        missing,
        ply_files,
        total_bytes,
    })
}
