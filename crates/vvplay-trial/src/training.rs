//! Unscored warm-up before a trial session.
//!
//! A training run plays its variants in the listed order so the subject
//! sees the kinds of impairment before rating anything. Nothing is
//! shuffled, persisted or scored.

use crate::config::ExperimentConfig;
use std::sync::Arc;
use tracing::info;
use vvplay_core::{ContentDescriptor, PlayerConfig, Result, VvError};
use vvplay_media::PointCloudDecoder;
use vvplay_playback::{PlaybackReport, Player};
use vvplay_schedule::VariantSpec;

#[derive(Debug, Clone)]
pub struct TrainingRun {
    content: ContentDescriptor,
    variants: Vec<VariantSpec>,
    step: usize,
    player_config: PlayerConfig,
}

impl TrainingRun {
    pub fn new(
        content: ContentDescriptor,
        variants: Vec<VariantSpec>,
        player_config: PlayerConfig,
    ) -> Result<Self> {
        player_config.validate()?;
        for variant in &variants {
            variant.validate()?;
        }
        Ok(Self {
            content,
            variants,
            step: 0,
            player_config,
        })
    }

    /// The experiment's `training` list over its content.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        Self::new(
            config.content.descriptor()?,
            config.training.clone(),
            config.player.clone(),
        )
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Number of variants already played through.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.variants.len()
    }

    pub fn current(&self) -> Option<&VariantSpec> {
        self.variants.get(self.step)
    }

    fn current_or_err(&self) -> Result<&VariantSpec> {
        self.current()
            .ok_or_else(|| VvError::NotFound("no training variants left".into()))
    }

    /// Idle player set up for the current variant.
    pub fn create_player(&self, decoder: Arc<dyn PointCloudDecoder>) -> Result<Player> {
        Player::new(
            self.player_config.clone(),
            self.content.clone(),
            self.current_or_err()?.clone(),
            decoder,
        )
    }

    /// Switch an existing player to the current variant.
    pub fn present(&self, player: &mut Player) -> Result<()> {
        let variant = self.current_or_err()?.clone();
        player.advance_to(self.content.clone(), variant)
    }

    /// Mark the current variant as watched and move on.
    pub fn finish_current(&mut self, report: &PlaybackReport) -> Result<()> {
        self.current_or_err()?;
        info!(
            "Training {}/{}: {} watched ({} shown, {} stalls)",
            self.step + 1,
            self.len(),
            report.variant,
            report.stats.frames_shown,
            report.stats.stalls
        );
        self.step += 1;
        Ok(())
    }
}
