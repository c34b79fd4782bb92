use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    /// Train must come first: dev and test reuse its statistics.
    pub const ALL: [Self; 3] = [Self::Train, Self::Dev, Self::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Dev => "dev",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the corpus lives and where the dataset goes.
///
/// Features are found at `{data_root}/{feature_dir}/{split}/*.{feature_extension}`
/// and transcripts anywhere below `{data_root}/{label_dir}/{split}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub data_root: PathBuf,
    pub output_dir: PathBuf,
    pub vocab_dir: PathBuf,
    pub phone_map_path: PathBuf,
    #[serde(default = "default_feature_dir")]
    pub feature_dir: String,
    #[serde(default = "default_feature_extension")]
    pub feature_extension: String,
    #[serde(default = "default_label_dir")]
    pub label_dir: String,
    #[serde(default = "default_label_extension")]
    pub label_extension: String,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_feature_dir() -> String {
    "fbank".to_string()
}
fn default_feature_extension() -> String {
    "htk".to_string()
}
fn default_label_dir() -> String {
    "phone".to_string()
}
fn default_label_extension() -> String {
    "phn".to_string()
}
fn default_normalize() -> bool {
    true
}

impl DatasetConfig {
    pub fn new(
        data_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        vocab_dir: impl Into<PathBuf>,
        phone_map_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_root: data_root.into(),
            output_dir: output_dir.into(),
            vocab_dir: vocab_dir.into(),
            phone_map_path: phone_map_path.into(),
            feature_dir: default_feature_dir(),
            feature_extension: default_feature_extension(),
            label_dir: default_label_dir(),
            label_extension: default_label_extension(),
            normalize: default_normalize(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn feature_split_dir(&self, split: Split) -> PathBuf {
        self.data_root.join(&self.feature_dir).join(split.as_str())
    }

    pub fn label_split_dir(&self, split: Split) -> PathBuf {
        self.data_root.join(&self.label_dir).join(split.as_str())
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.output_dir.join(crate::make_dataset::SENTINEL)
    }
}
