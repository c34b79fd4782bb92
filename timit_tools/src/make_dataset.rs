//! Builds the whole dataset directory:
//!
//! ```text
//! {output_dir}/
//!   check.txt                       written last, marks a complete build
//!   train/input/{utt}.npy           normalized features
//!   train/input/frame_num.jsonl
//!   train/stats/{mean,std}.npy      training statistics reused by dev/test
//!   train/label/phone{61,48,39}/{speaker}_{utt}.npy
//!   dev/...                         same layout, no stats
//!   test/...                        labels are strings instead of indices
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use timit_core::{
    FeatureStats, LabelOutput, PhoneMap, PhoneTranscript, build_vocabularies, read_phone,
};
use tracing::info;

use crate::config::{DatasetConfig, Split};
use crate::discover;
use crate::features::{self, FeatureNorm};
use crate::manifest::{self, FRAME_COUNT_FILE};

/// Empty file whose presence means the dataset is complete.
pub const SENTINEL: &str = "check.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub split: Split,
    pub inputs: usize,
    pub labels: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetStatus {
    /// The sentinel was present; nothing was touched.
    AlreadyBuilt,
    Built(Vec<SplitSummary>),
}

fn clear_dir(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        removed.with_context(|| format!("failed to delete {}", path.display()))?;
    }
    Ok(())
}

fn resolve(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(_) => std::path::absolute(path)
            .with_context(|| format!("failed to resolve {}", path.display())),
    }
}

/// The output directory is wiped on rebuild, so no input may live below it.
fn check_inputs_outside(config: &DatasetConfig) -> Result<()> {
    let output_dir = resolve(&config.output_dir)?;
    for (name, path) in [
        ("data_root", &config.data_root),
        ("phone_map_path", &config.phone_map_path),
    ] {
        if resolve(path)?.starts_with(&output_dir) {
            bail!(
                "{name} {} is inside output_dir {}",
                path.display(),
                config.output_dir.display()
            );
        }
    }
    Ok(())
}

/// Every input needs a transcript and every transcript an input. Keys are
/// compared ignoring ASCII case.
fn check_alignment(split: Split, htk_paths: &[PathBuf], label_paths: &[PathBuf]) -> Result<()> {
    let inputs = htk_paths
        .iter()
        .map(|p| features::utterance_name(p).map(str::to_ascii_lowercase))
        .collect::<Result<BTreeSet<_>>>()?;
    let labels = label_paths
        .iter()
        .map(|p| PhoneTranscript::key_for(p).map(|key| key.to_ascii_lowercase()))
        .collect::<timit_core::Result<BTreeSet<_>>>()?;

    if let Some(key) = inputs.symmetric_difference(&labels).next() {
        let missing = if inputs.contains(key) { "transcript" } else { "input features" };
        bail!(
            "{split}: utterance {key} has no {missing} ({} inputs, {} transcripts)",
            inputs.len(),
            labels.len()
        );
    }
    Ok(())
}

pub fn make_dataset(config: &DatasetConfig) -> Result<DatasetStatus> {
    let output_dir = &config.output_dir;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    check_inputs_outside(config)?;

    if config.sentinel_path().is_file() {
        info!(dir = %output_dir.display(), "dataset already exists");
        return Ok(DatasetStatus::AlreadyBuilt);
    }
    info!(dir = %output_dir.display(), "deleting old dataset");
    clear_dir(output_dir)?;

    let phone_map = PhoneMap::load(&config.phone_map_path)?;
    let vocabs = build_vocabularies(&phone_map, &config.vocab_dir)?;

    let mut train_stats: Option<FeatureStats> = None;
    let mut summaries = Vec::with_capacity(Split::ALL.len());
    for split in Split::ALL {
        info!(%split, "---------- processing split ----------");
        let split_dir = output_dir.join(split.as_str());
        let input_dir = split_dir.join("input");
        let label_dir = split_dir.join("label");

        let htk_paths = discover::feature_paths(config, split)?;
        let label_paths = discover::label_paths(config, split)?;
        check_alignment(split, &htk_paths, &label_paths)?;

        let norm = match (config.normalize, split, train_stats.as_ref()) {
            (false, _, _) => FeatureNorm::Raw,
            (true, Split::Train, _) => FeatureNorm::Fit,
            (true, _, Some(stats)) => FeatureNorm::Apply(stats),
            (true, _, None) => bail!("{split} needs training statistics"),
        };
        let inputs = features::process_split(&htk_paths, &input_dir, norm)
            .with_context(|| format!("{split} inputs"))?;
        manifest::write_frame_counts(&input_dir.join(FRAME_COUNT_FILE), &inputs.frame_counts)?;
        if let Some(stats) = inputs.stats {
            let stats_dir = split_dir.join("stats");
            std::fs::create_dir_all(&stats_dir)
                .with_context(|| format!("failed to create {}", stats_dir.display()))?;
            stats.save(&stats_dir)?;
            train_stats = Some(stats);
        }

        let output = match split {
            Split::Test => LabelOutput::Text,
            Split::Train | Split::Dev => LabelOutput::Indices(&vocabs),
        };
        let labels = read_phone(&label_paths, &phone_map, output, Some(label_dir.as_path()))
            .with_context(|| format!("{split} labels"))?;

        summaries.push(SplitSummary {
            split,
            inputs: inputs.frame_counts.len(),
            labels,
        });
    }

    let sentinel = config.sentinel_path();
    std::fs::write(&sentinel, b"")
        .with_context(|| format!("failed to write {}", sentinel.display()))?;
    info!("successfully completed");
    Ok(DatasetStatus::Built(summaries))
}
