//! Dataset builder: discovers the corpus files of each split and drives
//! `timit_core` to write normalized inputs, phone labels and vocabularies.

pub mod config;
pub mod discover;
pub mod features;
pub mod make_dataset;
pub mod manifest;

pub use config::{DatasetConfig, Split};
pub use make_dataset::{DatasetStatus, SENTINEL, SplitSummary, make_dataset};
