//! Global mean/variance normalization of feature matrices.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};

use crate::error::{CorpusError, Result};
use crate::npy;

const MEAN_FILE: &str = "mean.npy";
const STD_FILE: &str = "std.npy";

/// Per-dimension population mean and standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub mean: Array1<f32>,
    pub std: Array1<f32>,
}

impl FeatureStats {
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / std` per dimension. Dimensions with zero variance are
    /// only centred.
    pub fn normalize(&self, features: &Array2<f32>) -> Result<Array2<f32>> {
        if features.ncols() != self.dim() {
            return Err(CorpusError::invalid_argument(format!(
                "features have {} dimensions, statistics have {}",
                features.ncols(),
                self.dim()
            )));
        }
        let scale = self.std.mapv(|s| if s > 0.0 { s } else { 1.0 });
        Ok((features - &self.mean) / &scale)
    }

    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        npy::write_f32_vector(dir.join(MEAN_FILE), &self.mean)?;
        npy::write_f32_vector(dir.join(STD_FILE), &self.std)
    }

    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mean = npy::read_f32_vector(dir.join(MEAN_FILE))?;
        let std = npy::read_f32_vector(dir.join(STD_FILE))?;
        if mean.len() != std.len() {
            return Err(CorpusError::format(
                &dir.join(STD_FILE),
                format!("{} std values for {} means", std.len(), mean.len()),
            ));
        }
        Ok(Self { mean, std })
    }
}

/// Running sums over every frame of a split.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    sum: Array1<f64>,
    sum_sq: Array1<f64>,
    frames: usize,
}

impl StatsAccumulator {
    pub fn new(dim: usize) -> Self {
        Self {
            sum: Array1::zeros(dim),
            sum_sq: Array1::zeros(dim),
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn push(&mut self, features: &Array2<f32>) -> Result<()> {
        if features.ncols() != self.sum.len() {
            return Err(CorpusError::invalid_argument(format!(
                "expected {} feature dimensions, got {}",
                self.sum.len(),
                features.ncols()
            )));
        }
        let features = features.mapv(f64::from);
        self.sum += &features.sum_axis(Axis(0));
        self.sum_sq += &features.mapv(|x| x * x).sum_axis(Axis(0));
        self.frames += features.nrows();
        Ok(())
    }

    pub fn finish(&self) -> Result<FeatureStats> {
        if self.frames == 0 {
            return Err(CorpusError::invalid_argument(
                "cannot compute statistics over zero frames",
            ));
        }
        let n = self.frames as f64;
        let mean = &self.sum / n;
        let var = (&self.sum_sq / n - &mean * &mean).mapv(|v| v.max(0.0));
        Ok(FeatureStats {
            mean: mean.mapv(|m| m as f32),
            std: var.mapv(|v| v.sqrt() as f32),
        })
    }
}
