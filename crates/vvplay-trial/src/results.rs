//! Append-only score log.
//!
//! One file per session, `MOS.user{n}.txt` with the first free `n`:
//!
//! ```text
//! ContentName=longdress
//! Session=6f1c...
//! Variant,Score,Duration,Sequence
//! 17,4,10.012,0,1,1,2,...
//! ```
//!
//! The sequence is the comma-joined schedule and always comes last, so a
//! record splits on its first three commas.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;
use vvplay_core::{Result, VvError};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

const COLUMNS: &str = "Variant,Score,Duration,Sequence";

/// One scored trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub variant_id: usize,
    pub score: u8,
    pub duration: Duration,
    pub sequence: String,
}

impl TrialRecord {
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{:.3},{}",
            self.variant_id,
            self.score,
            self.duration.as_secs_f64(),
            self.sequence
        )
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let bad = |what: &str| VvError::Serialization(format!("bad {} in record '{}'", what, line));
        let mut fields = line.splitn(4, ',');

        let variant_id = fields
            .next()
            .and_then(|f| f.trim().parse().ok())
            .ok_or_else(|| bad("variant"))?;
        let score = fields
            .next()
            .and_then(|f| f.trim().parse().ok())
            .ok_or_else(|| bad("score"))?;
        let seconds: f64 = fields
            .next()
            .and_then(|f| f.trim().parse().ok())
            .ok_or_else(|| bad("duration"))?;
        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| bad("duration"))?;
        let sequence = fields.next().unwrap_or_default().trim().to_string();

        Ok(Self {
            variant_id,
            score,
            duration,
            sequence,
        })
    }
}

#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    session_id: Uuid,
    records: usize,
}

impl ResultLog {
    /// Create a new log in `dir` without touching earlier sessions' files.
    pub fn create(dir: &Path, content_name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut user = 1;
        let (path, mut file) = loop {
            let candidate = dir.join(format!("MOS.user{}.txt", user));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => break (candidate, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => user += 1,
                Err(e) => return Err(e.into()),
            }
        };

        let session_id = Uuid::new_v4();
        write!(
            file,
            "ContentName={}\nSession={}\n{}\n",
            content_name, session_id, COLUMNS
        )?;
        info!("Recording results to {}", path.display());

        Ok(Self {
            path,
            session_id,
            records: 0,
        })
    }

    /// Append one record. Scores outside 1..=5 are rejected.
    pub fn append(&mut self, record: &TrialRecord) -> Result<()> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&record.score) {
            return Err(VvError::InvalidParameter(format!(
                "score {} outside {}..={}",
                record.score, MIN_SCORE, MAX_SCORE
            )));
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.to_line())?;
        self.records += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Records of a log file, header lines skipped.
    pub fn read_records(path: &Path) -> Result<Vec<TrialRecord>> {
        let text = fs::read_to_string(path)?;
        text.lines()
            .skip_while(|line| *line != COLUMNS)
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .map(TrialRecord::parse_line)
            .collect()
    }
}
