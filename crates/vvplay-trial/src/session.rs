//! Stepping one subject through an experiment's variants.
//!
//! The session owns order and results; the caller owns the player and the
//! display loop. After each clip ends the caller collects a score and hands
//! it to [`TrialSession::record_score`], then presents the next variant.

use crate::config::ExperimentConfig;
use crate::order::PresentationOrder;
use crate::results::{ResultLog, TrialRecord};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use vvplay_core::{ContentDescriptor, PlayerConfig, Result, VvError};
use vvplay_media::PointCloudDecoder;
use vvplay_playback::{PlaybackObserver, PlaybackReport, Player};
use vvplay_schedule::{Schedule, VariantSpec};

/// A variant together with the id recorded in the result log.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialEntry {
    pub id: usize,
    pub variant: VariantSpec,
}

/// Observer that keeps the latest end-of-content report for the driver.
#[derive(Debug, Clone, Default)]
pub struct EndOfContent {
    report: Arc<Mutex<Option<PlaybackReport>>>,
}

impl EndOfContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Option<PlaybackReport> {
        self.report.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.report.lock().is_some()
    }
}

impl PlaybackObserver for EndOfContent {
    fn on_ended(&mut self, report: &PlaybackReport) {
        *self.report.lock() = Some(report.clone());
    }
}

#[derive(Debug)]
pub struct TrialSession {
    content: ContentDescriptor,
    entries: Vec<TrialEntry>,
    order: PresentationOrder,
    step: usize,
    log: ResultLog,
    player_config: PlayerConfig,
}

impl TrialSession {
    /// Resolve variants, load or create the presentation order and open a
    /// fresh result log under `config.result_dir`.
    pub fn open(config: &ExperimentConfig) -> Result<Self> {
        config.player.validate()?;
        let content = config.content.descriptor()?;
        let entries = config.variants.resolve()?;
        if entries.is_empty() {
            return Err(VvError::InvalidParameter(
                "experiment selects no variants".into(),
            ));
        }

        let order_path = config
            .result_dir
            .join(format!("order.{}.txt", content.name()));
        let order = PresentationOrder::load_or_create(
            &order_path,
            entries.len(),
            config.shuffle_seed,
            |position| {
                entries
                    .get(position)
                    .map(|e| format!("{},{},{}", e.id, e.variant.name(), content.name()))
                    .unwrap_or_default()
            },
        )?;
        let log = ResultLog::create(&config.result_dir, content.name())?;

        info!(
            "Trial session {} with {} variants of {}",
            log.session_id(),
            entries.len(),
            content.name()
        );

        Ok(Self {
            content,
            entries,
            order,
            step: 0,
            log,
            player_config: config.player.clone(),
        })
    }

    pub fn content(&self) -> &ContentDescriptor {
        &self.content
    }

    pub fn order(&self) -> &PresentationOrder {
        &self.order
    }

    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    /// Number of trials already scored.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.step)
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Entry to present now.
    pub fn current(&self) -> Option<&TrialEntry> {
        self.order
            .get(self.step)
            .and_then(|position| self.entries.get(position))
    }

    fn current_or_err(&self) -> Result<&TrialEntry> {
        self.current()
            .ok_or_else(|| VvError::NotFound("no trials left in session".into()))
    }

    /// Idle player set up for the current entry.
    pub fn create_player(&self, decoder: Arc<dyn PointCloudDecoder>) -> Result<Player> {
        let entry = self.current_or_err()?;
        Player::new(
            self.player_config.clone(),
            self.content.clone(),
            entry.variant.clone(),
            decoder,
        )
    }

    /// Switch an existing player to the current entry.
    pub fn present(&self, player: &mut Player) -> Result<()> {
        let entry = self.current_or_err()?;
        player.advance_to(self.content.clone(), entry.variant.clone())
    }

    /// Log the score for the current entry and move to the next one.
    pub fn record_score(
        &mut self,
        score: u8,
        report: &PlaybackReport,
        schedule: &Schedule,
    ) -> Result<()> {
        let variant_id = self.current_or_err()?.id;
        let record = TrialRecord {
            variant_id,
            score,
            duration: report.elapsed,
            sequence: schedule.sequence_string(),
        };
        self.log.append(&record)?;
        info!(
            "Trial {}/{}: variant {} ({}) scored {}",
            self.step + 1,
            self.len(),
            variant_id,
            report.variant,
            score
        );
        self.step += 1;
        Ok(())
    }
}
