//! Presentation order of a session's variants.
//!
//! The order file's first line is the space-separated permutation; the lines
//! after it describe each entry (`No{id}.{description}`) for whoever reads
//! the file later. An existing file is reused, so a restarted session
//! presents variants in the same order.

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;
use vvplay_core::{Result, VvError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationOrder {
    positions: Vec<usize>,
}

impl PresentationOrder {
    /// Positions `0..count` in order.
    pub fn sequential(count: usize) -> Self {
        Self {
            positions: (0..count).collect(),
        }
    }

    /// Seeded Fisher-Yates shuffle of `0..count`.
    pub fn shuffled(count: usize, seed: u64) -> Self {
        let mut positions: Vec<usize> = (0..count).collect();
        fastrand::Rng::with_seed(seed).shuffle(&mut positions);
        Self { positions }
    }

    /// Parse a header line, checking it is a permutation of `0..count`.
    pub fn parse(line: &str, count: usize) -> Result<Self> {
        let positions = line
            .split_whitespace()
            .map(|token| {
                token.parse::<usize>().map_err(|e| {
                    VvError::Serialization(format!("bad order entry '{}': {}", token, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = vec![false; count];
        for &p in &positions {
            match seen.get_mut(p) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(VvError::InvalidParameter(format!(
                        "order entry {} repeats or exceeds {} variants",
                        p, count
                    )));
                }
            }
        }
        if positions.len() != count {
            return Err(VvError::InvalidParameter(format!(
                "order lists {} of {} variants",
                positions.len(),
                count
            )));
        }
        Ok(Self { positions })
    }

    /// Reuse the order stored at `path`, or create it.
    ///
    /// `describe` supplies the text for each entry's description line.
    pub fn load_or_create(
        path: &Path,
        count: usize,
        seed: Option<u64>,
        describe: impl Fn(usize) -> String,
    ) -> Result<Self> {
        if path.exists() {
            let text = fs::read_to_string(path)?;
            let header = text.lines().next().unwrap_or_default();
            let order = Self::parse(header, count)?;
            info!("Resuming presentation order from {}", path.display());
            return Ok(order);
        }

        let order = match seed {
            Some(seed) => Self::shuffled(count, seed),
            None => Self::sequential(count),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        writeln!(file, "{}", order.header_line())?;
        for position in 0..count {
            writeln!(file, "No{}.{}", position, describe(position))?;
        }
        info!("Wrote presentation order to {}", path.display());
        Ok(order)
    }

    pub fn header_line(&self) -> String {
        self.positions
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Entry position presented at `step`.
    pub fn get(&self, step: usize) -> Option<usize> {
        self.positions.get(step).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
