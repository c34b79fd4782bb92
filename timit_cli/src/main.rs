use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use timit_core::inputs::{htk, htk_config};
use timit_tools::{DatasetConfig, DatasetStatus, make_dataset};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "timit")]
#[command(about = "Prepare TIMIT features and phone labels as .npy arrays", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build train/dev/test inputs, labels and vocabularies.
    MakeDataset(MakeDatasetArgs),
    /// Write an HCopy configuration file.
    HtkConfig(HtkConfigArgs),
    /// Print the header of an HTK feature file.
    InspectHtk {
        path: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
struct MakeDatasetArgs {
    /// JSON config; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpus root holding `fbank/{split}` and `phone/{split}`.
    #[arg(long)]
    data_root: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    vocab_dir: Option<PathBuf>,

    /// 61/48/39 correspondence table.
    #[arg(long)]
    phone_map: Option<PathBuf>,

    /// Save features without global normalization.
    #[arg(long, default_value_t = false)]
    no_normalize: bool,
}

impl MakeDatasetArgs {
    fn into_config(self) -> Result<DatasetConfig> {
        let mut config = match &self.config {
            Some(path) => DatasetConfig::load(path)?,
            None => DatasetConfig::new(
                self.data_root.clone().context("--data-root is required without --config")?,
                self.output_dir.clone().context("--output-dir is required without --config")?,
                self.vocab_dir.clone().context("--vocab-dir is required without --config")?,
                self.phone_map.clone().context("--phone-map is required without --config")?,
            ),
        };
        if let Some(p) = self.data_root {
            config.data_root = p;
        }
        if let Some(p) = self.output_dir {
            config.output_dir = p;
        }
        if let Some(p) = self.vocab_dir {
            config.vocab_dir = p;
        }
        if let Some(p) = self.phone_map {
            config.phone_map_path = p;
        }
        if self.no_normalize {
            config.normalize = false;
        }
        Ok(config)
    }
}

#[derive(Debug, clap::Args)]
struct HtkConfigArgs {
    /// nist or wav
    #[arg(long)]
    audio_file_type: String,

    /// fbank or mfcc
    #[arg(long)]
    feature_type: String,

    #[arg(long)]
    channels: u32,

    #[arg(long)]
    save_dir: PathBuf,

    #[arg(long, default_value_t = 16_000)]
    sampling_rate: u32,

    /// Window width in seconds.
    #[arg(long, default_value_t = 0.025)]
    window: f64,

    /// Frame shift in seconds.
    #[arg(long, default_value_t = 0.01)]
    slide: f64,

    #[arg(long, default_value_t = false)]
    no_energy: bool,

    #[arg(long, default_value_t = false)]
    no_delta: bool,

    #[arg(long, default_value_t = false)]
    no_deltadelta: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Command::MakeDataset(args) => {
            let config = args.into_config()?;
            match make_dataset(&config)? {
                DatasetStatus::AlreadyBuilt => info!("already exists, nothing to do"),
                DatasetStatus::Built(summary) => {
                    for s in summary {
                        info!(split = %s.split, inputs = s.inputs, labels = s.labels, "done");
                    }
                }
            }
        }
        Command::HtkConfig(args) => {
            let path = htk_config::write_config(
                &args.audio_file_type,
                &args.feature_type,
                args.channels,
                &args.save_dir,
                |c| {
                    c.sampling_rate = args.sampling_rate;
                    c.window = args.window;
                    c.slide = args.slide;
                    c.energy = !args.no_energy;
                    c.delta = !args.no_delta;
                    c.deltadelta = !args.no_deltadelta;
                },
            )?;
            info!(path = %path.display(), "wrote HTK config");
        }
        Command::InspectHtk { path } => {
            let header = htk::read_header(&path)?;
            let features = htk::read(&path)?;
            info!(
                frames = header.frame_num,
                sample_period = header.sample_period,
                sample_size = header.sample_size,
                kind = %header.kind_name(),
                shape = ?features.dim(),
                "{}",
                path.display()
            );
        }
    }
    Ok(())
}
