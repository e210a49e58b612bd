//! vvplay Trial - runs a subject through a list of variants
//!
//! Everything here lives outside the playback core:
//! - Experiment description, versioned JSON (ExperimentConfig)
//! - Seeded, persisted presentation order (PresentationOrder)
//! - Append-only score records (ResultLog)
//! - Stepping a player through the variants (TrialSession)
//! - Unscored warm-up before the trials (TrainingRun)

pub mod config;
pub mod order;
pub mod results;
pub mod session;
pub mod training;

pub use config::{ContentSettings, ExperimentConfig, VariantSelection, CURRENT_VERSION};
pub use order::PresentationOrder;
pub use results::{ResultLog, TrialRecord, MAX_SCORE, MIN_SCORE};
pub use session::{EndOfContent, TrialEntry, TrialSession};
pub use training::TrainingRun;
