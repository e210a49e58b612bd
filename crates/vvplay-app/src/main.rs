//! vvplay - headless driver for volumetric playback experiments
//!
//! Lists variant catalogs, prints schedules, probes content on disk and runs
//! paced playback against the synthetic decoder.

mod cli;
mod driver;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, ContentArgs, RunArgs, VariantArgs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vvplay_core::PlayerConfig;
use vvplay_media::{probe_content, PointCloudDecoder, SyntheticDecoder};
use vvplay_playback::Player;
use vvplay_schedule::{Catalog, ScheduleGenerator};
use vvplay_trial::{EndOfContent, ExperimentConfig, TrainingRun, TrialSession};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity)?;

    match cli.command {
        Command::Catalog { catalog, content } => list_catalogs(catalog, &content),
        Command::Schedule {
            variant,
            content,
            json,
        } => print_schedule(&variant, &content, json),
        Command::Play {
            variant,
            content,
            run,
        } => play(&variant, &content, &run),
        Command::Probe { content } => probe(&content),
        Command::Session {
            config,
            score,
            result_dir,
            skip_training,
            run,
        } => session(config, score, result_dir, skip_training, &run),
    }
}

fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn list_catalogs(only: Option<Catalog>, content: &ContentArgs) -> Result<()> {
    let generator = ScheduleGenerator::for_content(&content.descriptor()?);
    let catalogs: Vec<Catalog> = match only {
        Some(catalog) => vec![catalog],
        None => Catalog::ALL.to_vec(),
    };

    for catalog in catalogs {
        println!("{} ({} variants)", catalog, catalog.len());
        for (index, variant) in catalog.variants().iter().enumerate() {
            let schedule = generator.generate(variant)?;
            println!(
                "  {:>3}  {:<36} {:>5} ticks  {:>4} held",
                index,
                schedule.name(),
                schedule.len(),
                schedule.hold_count()
            );
        }
    }
    Ok(())
}

fn print_schedule(variant: &VariantArgs, content: &ContentArgs, json: bool) -> Result<()> {
    let spec = variant.catalog.variant(variant.index)?;
    let schedule = ScheduleGenerator::for_content(&content.descriptor()?).generate(&spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    println!("name:      {}", schedule.name());
    println!("ticks:     {}", schedule.len());
    println!("held:      {}", schedule.hold_count());
    if let Some(rng) = schedule.rng_algorithm() {
        println!("rng:       {}", rng);
    }
    if let Some(plan) = schedule.tier_plan() {
        println!("tiers:     {:?} every {} ticks", plan.tiers, plan.segment_ticks);
    }
    println!("sequence:  {}", schedule.sequence_string());
    Ok(())
}

fn synthetic_decoder(run: &RunArgs) -> Arc<dyn PointCloudDecoder> {
    Arc::new(
        SyntheticDecoder::new(run.points)
            .with_latency(Duration::from_millis(run.latency_ms))
            .with_failures(run.failure_mode())
            .with_file_check(run.require_files),
    )
}

fn play(variant: &VariantArgs, content: &ContentArgs, run: &RunArgs) -> Result<()> {
    let spec = variant.catalog.variant(variant.index)?;
    let mut player = Player::new(
        run.player_config(PlayerConfig::default()),
        content.descriptor()?,
        spec,
        synthetic_decoder(run),
    )?;

    info!(
        "Playing {} ({} ticks at {} fps)",
        player.schedule().name(),
        player.schedule().len(),
        player.content().nominal_fps()
    );
    let summary = driver::run_to_end(&mut player, run.fast, Duration::from_secs(run.timeout_secs))?;
    player.shutdown()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn probe(content: &ContentArgs) -> Result<()> {
    let descriptor = content.descriptor()?;
    let report = probe_content(&descriptor)
        .with_context(|| format!("probing {}", descriptor.name()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_complete() {
        anyhow::bail!(
            "{} of {} frames missing",
            report.missing.len(),
            descriptor.frame_count()
        );
    }
    Ok(())
}

fn training(mut training: TrainingRun, run: &RunArgs) -> Result<()> {
    let mut player = training.create_player(synthetic_decoder(run))?;
    let ended = EndOfContent::new();
    player.add_observer(Box::new(ended.clone()));

    let timeout = Duration::from_secs(run.timeout_secs);
    while !training.is_complete() {
        if training.step() > 0 {
            training.present(&mut player)?;
        }
        driver::run_to_end(&mut player, run.fast, timeout)?;
        let report = ended
            .take()
            .context("player ended without a report")?;
        training.finish_current(&report)?;
    }
    player.shutdown()?;
    Ok(())
}

fn session(
    config_path: Option<PathBuf>,
    score: u8,
    result_dir: Option<PathBuf>,
    skip_training: bool,
    run: &RunArgs,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ExperimentConfig::load_from_file(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if let Some(dir) = result_dir {
        config.result_dir = dir;
    }
    config.player = run.player_config(config.player);

    let warm_up = TrainingRun::from_config(&config)?;
    if !skip_training && !warm_up.is_empty() {
        info!("Training with {} variants", warm_up.len());
        training(warm_up, run)?;
    }

    let mut session = TrialSession::open(&config)?;
    let mut player = session.create_player(synthetic_decoder(run))?;
    let ended = EndOfContent::new();
    player.add_observer(Box::new(ended.clone()));

    let timeout = Duration::from_secs(run.timeout_secs);
    while !session.is_complete() {
        if session.step() > 0 {
            session.present(&mut player)?;
        }
        let summary = driver::run_to_end(&mut player, run.fast, timeout)?;
        let report = ended
            .take()
            .context("player ended without a report")?;
        session.record_score(score, &report, player.schedule())?;
        info!(
            "{}: {} shown, {} stalls",
            summary.schedule, summary.frames_shown, summary.stalls
        );
    }
    player.shutdown()?;

    println!("Results written to {}", session.log().path().display());
    Ok(())
}
