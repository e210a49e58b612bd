use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vvplay_core::{defaults, ContentDescriptor, PlayerConfig};
use vvplay_media::FailureMode;
use vvplay_schedule::Catalog;

/// Volumetric point-cloud playback driver
#[derive(Parser, Debug)]
#[command(name = "vvplay", author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (default: info, -v: debug, -vv+: trace).
    /// RUST_LOG overrides this.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the variants of one or all catalogs
    Catalog {
        /// frv, stall or switch; all catalogs when omitted
        #[arg(value_name = "CATALOG")]
        catalog: Option<Catalog>,

        #[command(flatten)]
        content: ContentArgs,
    },

    /// Print the schedule of one catalog variant
    Schedule {
        #[command(flatten)]
        variant: VariantArgs,

        #[command(flatten)]
        content: ContentArgs,

        /// Print the schedule as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Play one variant against the synthetic decoder
    Play {
        #[command(flatten)]
        variant: VariantArgs,

        #[command(flatten)]
        content: ContentArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check a clip's frame files on disk
    Probe {
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Run a whole trial session headless with a fixed score
    Session {
        /// Experiment file (JSON); built-in defaults when omitted
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: Option<PathBuf>,

        /// Score recorded for every trial (1-5)
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,

        /// Override the experiment's result directory
        #[arg(long = "results", value_name = "DIR")]
        result_dir: Option<PathBuf>,

        /// Go straight to the scored trials
        #[arg(long = "skip-training")]
        skip_training: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct VariantArgs {
    /// frv, stall or switch
    #[arg(long, default_value = "frv")]
    pub catalog: Catalog,

    /// Index into the catalog
    #[arg(short = 'i', long, default_value_t = 0)]
    pub index: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ContentArgs {
    /// Content name
    #[arg(long = "content", default_value = defaults::CONTENT_NAME)]
    pub name: String,

    /// Quality tier (representation directory)
    #[arg(long, default_value_t = defaults::QUALITY_TIER)]
    pub tier: u32,

    #[arg(long = "start-frame", default_value_t = defaults::START_FRAME)]
    pub start_frame: u32,

    #[arg(long = "last-frame", default_value_t = defaults::LAST_FRAME)]
    pub last_frame: u32,

    /// Source frame rate
    #[arg(long, default_value_t = defaults::SOURCE_FPS)]
    pub fps: u32,

    /// Root directory holding `{name}/representation{tier}/`
    #[arg(long, default_value = defaults::ROOT_PATH)]
    pub root: PathBuf,
}

impl ContentArgs {
    pub fn descriptor(&self) -> vvplay_core::Result<ContentDescriptor> {
        ContentDescriptor::new(
            self.name.clone(),
            self.tier,
            self.start_frame,
            self.last_frame,
            self.fps,
            self.root.clone(),
        )
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Points per synthetic frame
    #[arg(long, default_value_t = 20_000)]
    pub points: usize,

    /// Simulated decode latency per frame
    #[arg(long = "latency-ms", default_value_t = 0)]
    pub latency_ms: u64,

    /// Fail every Nth decode
    #[arg(long = "fail-every", value_name = "N")]
    pub fail_every: Option<u32>,

    /// Ring-buffer capacity
    #[arg(long, default_value_t = vvplay_core::config::DEFAULT_BUFFER_CAPACITY)]
    pub capacity: usize,

    /// Advance a synthetic clock instead of waiting in real time
    #[arg(long)]
    pub fast: bool,

    /// Give up after this many seconds of wall time
    #[arg(long = "timeout", default_value_t = 120)]
    pub timeout_secs: u64,

    /// Only decode frames that exist under the content root
    #[arg(long = "require-files")]
    pub require_files: bool,
}

impl RunArgs {
    pub fn failure_mode(&self) -> FailureMode {
        match self.fail_every {
            Some(n) if n > 0 => FailureMode::EveryNth(n),
            _ => FailureMode::Never,
        }
    }

    pub fn player_config(&self, base: PlayerConfig) -> PlayerConfig {
        PlayerConfig {
            buffer_capacity: self.capacity,
            ..base
        }
    }
}
