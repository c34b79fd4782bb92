//! Core readers and writers for turning the TIMIT corpus into per-utterance
//! arrays: HTK feature files in, normalized `.npy` features and phone label
//! sequences out.

pub mod error;
pub mod inputs;
pub mod labels;
pub mod npy;

pub use error::{CorpusError, Result};
pub use inputs::normalize::{FeatureStats, StatsAccumulator};
pub use labels::phone::{LabelOutput, PhoneTranscript, read_phone};
pub use labels::phone_map::{PhoneGranularity, PhoneMap};
pub use labels::vocab::{Vocabularies, Vocabulary, build_vocabularies};
