//! Input side of a split: HTK files to normalized `.npy` matrices.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use timit_core::inputs::htk;
use timit_core::{FeatureStats, StatsAccumulator, npy};
use tracing::{debug, info};

use crate::manifest::FrameCount;

#[derive(Debug, Clone, Copy)]
pub enum FeatureNorm<'a> {
    /// Compute statistics over these files, then normalize with them.
    Fit,
    /// Normalize with statistics computed on another split.
    Apply(&'a FeatureStats),
    /// Save features as read.
    Raw,
}

#[derive(Debug, Clone)]
pub struct SplitFeatures {
    /// Present only for [`FeatureNorm::Fit`].
    pub stats: Option<FeatureStats>,
    pub frame_counts: Vec<FrameCount>,
}

/// File name up to the first `.`.
pub(crate) fn utterance_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|s| s.to_str())
        .and_then(|s| s.split('.').next())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("cannot derive an utterance name from {}", path.display()))
}

/// Population statistics over every frame of every file.
pub fn fit_stats(htk_paths: &[PathBuf]) -> Result<FeatureStats> {
    let mut acc: Option<StatsAccumulator> = None;
    for path in htk_paths {
        let features = htk::read(path)?;
        let acc = acc.get_or_insert_with(|| StatsAccumulator::new(features.ncols()));
        acc.push(&features)
            .with_context(|| format!("while accumulating {}", path.display()))?;
    }
    let Some(acc) = acc else {
        bail!("no HTK files to compute statistics from");
    };
    let stats = acc.finish()?;
    info!(files = htk_paths.len(), frames = acc.frames(), dim = stats.dim(), "fitted feature statistics");
    Ok(stats)
}

/// Read, optionally normalize, and save every file as `{save_dir}/{utt}.npy`.
pub fn process_split(
    htk_paths: &[PathBuf],
    save_dir: &Path,
    norm: FeatureNorm<'_>,
) -> Result<SplitFeatures> {
    std::fs::create_dir_all(save_dir)
        .with_context(|| format!("failed to create {}", save_dir.display()))?;

    let fitted = match norm {
        FeatureNorm::Fit => Some(fit_stats(htk_paths)?),
        _ => None,
    };
    let stats = match norm {
        FeatureNorm::Fit => fitted.as_ref(),
        FeatureNorm::Apply(stats) => Some(stats),
        FeatureNorm::Raw => None,
    };

    info!(files = htk_paths.len(), normalize = stats.is_some(), "processing input features");
    let mut frame_counts = Vec::with_capacity(htk_paths.len());
    for path in htk_paths {
        let utterance = utterance_name(path)?;
        let mut features = htk::read(path)?;
        if let Some(stats) = stats {
            features = stats
                .normalize(&features)
                .with_context(|| format!("while normalizing {}", path.display()))?;
        }
        npy::write_f32_matrix(save_dir.join(format!("{utterance}.npy")), &features)?;
        debug!(%utterance, frames = features.nrows(), "saved input");

        frame_counts.push(FrameCount {
            utterance: utterance.to_string(),
            frame_num: features.nrows(),
        });
    }

    Ok(SplitFeatures {
        stats: fitted,
        frame_counts,
    })
}
