//! Writer for the HTK `HCopy` configuration used to extract the features
//! that [`super::htk`] reads back.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CorpusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFileType {
    Nist,
    Wav,
}

impl AudioFileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nist => "nist",
            Self::Wav => "wav",
        }
    }
}

impl FromStr for AudioFileType {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nist" => Ok(Self::Nist),
            "wav" => Ok(Self::Wav),
            _ => Err(CorpusError::invalid_argument(
                "audio_file_type must be nist or wav.",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    /// Log mel filter-bank channel outputs.
    Fbank,
    /// Mel-frequency cepstral coefficients.
    Mfcc,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fbank => "fbank",
            Self::Mfcc => "mfcc",
        }
    }

    fn target_kind(&self) -> &'static str {
        match self {
            Self::Fbank => "FBANK",
            Self::Mfcc => "MFCC",
        }
    }
}

impl FromStr for FeatureType {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fbank" => Ok(Self::Fbank),
            "mfcc" => Ok(Self::Mfcc),
            _ => Err(CorpusError::invalid_argument(
                "feature_type must be fbank or mfcc.",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtkConfig {
    pub audio_file_type: AudioFileType,
    pub feature_type: FeatureType,
    /// Number of filter-bank channels.
    pub channels: u32,
    pub sampling_rate: u32,
    /// Analysis window width in seconds.
    pub window: f64,
    /// Frame shift in seconds.
    pub slide: f64,
    pub energy: bool,
    pub delta: bool,
    pub deltadelta: bool,
}

impl HtkConfig {
    pub fn new(audio_file_type: AudioFileType, feature_type: FeatureType, channels: u32) -> Self {
        Self {
            audio_file_type,
            feature_type,
            channels,
            sampling_rate: 16_000,
            window: 0.025,
            slide: 0.01,
            energy: true,
            delta: true,
            deltadelta: true,
        }
    }

    pub fn target_kind(&self) -> String {
        let mut kind = self.feature_type.target_kind().to_string();
        if self.energy {
            kind.push_str("_E");
        }
        if self.delta {
            kind.push_str("_D");
        }
        if self.deltadelta {
            kind.push_str("_A");
        }
        kind
    }

    pub fn render(&self) -> String {
        let source_rate = match self.sampling_rate {
            16_000 => "SOURCERATE = 625\n",
            8_000 => "SOURCERATE = 1250\n",
            _ => "",
        };
        let mut out = format!(
            "SOURCEFORMAT = {}\n",
            self.audio_file_type.as_str().to_uppercase()
        );
        out.push_str(source_rate);
        out.push_str(&format!("TARGETKIND = {}\n", self.target_kind()));
        out.push_str(&format!("TARGETRATE = {:.1}\n", self.slide * 10_000_000.0));
        out.push_str("SAVECOMPRESSED = F\n");
        out.push_str("SAVEWITHCRC = F\n");
        out.push_str(&format!("WINDOWSIZE = {:.1}\n", self.window * 10_000_000.0));
        out.push_str("USEHAMMING = T\n");
        out.push_str("PREEMCOEF = 0.97\n");
        out.push_str(&format!("NUMCHANS = {}\n", self.channels));
        out.push_str("ENORMALISE = F\n");
        out.push_str("ZMEANSOURCE = T\n");
        out
    }

    /// Write `{save_dir}/{feature_type}.conf` and return its path.
    pub fn save<P: AsRef<Path>>(&self, save_dir: P) -> Result<PathBuf> {
        let path = save_dir
            .as_ref()
            .join(format!("{}.conf", self.feature_type.as_str()));
        std::fs::write(&path, self.render())
            .map_err(|e| CorpusError::io("writing HTK config", &path, e))?;
        Ok(path)
    }
}

/// Validate the string arguments and write the config file.
///
/// Nothing is created when either argument is rejected.
pub fn write_config<P: AsRef<Path>>(
    audio_file_type: &str,
    feature_type: &str,
    channels: u32,
    save_dir: P,
    customize: impl FnOnce(&mut HtkConfig),
) -> Result<PathBuf> {
    let mut config = HtkConfig::new(audio_file_type.parse()?, feature_type.parse()?, channels);
    customize(&mut config);
    config.save(save_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fbank_config_matches_hcopy_grammar() {
        let config = HtkConfig::new(AudioFileType::Wav, FeatureType::Fbank, 40);
        let expected = "\
SOURCEFORMAT = WAV
SOURCERATE = 625
TARGETKIND = FBANK_E_D_A
TARGETRATE = 100000.0
SAVECOMPRESSED = F
SAVEWITHCRC = F
WINDOWSIZE = 250000.0
USEHAMMING = T
PREEMCOEF = 0.97
NUMCHANS = 40
ENORMALISE = F
ZMEANSOURCE = T
";
        assert_eq!(config.render(), expected);
    }

    #[test]
    fn narrowband_mfcc_without_deltas() {
        let mut config = HtkConfig::new(AudioFileType::Nist, FeatureType::Mfcc, 26);
        config.sampling_rate = 8_000;
        config.delta = false;
        config.deltadelta = false;
        let text = config.render();
        assert!(text.starts_with("SOURCEFORMAT = NIST\nSOURCERATE = 1250\n"));
        assert!(text.contains("TARGETKIND = MFCC_E\n"));

        config.window = 0.032;
        config.slide = 0.016;
        let text = config.render();
        assert!(text.contains("TARGETRATE = 160000.0\nSAVECOMPRESSED = F\n"));
        assert!(text.contains("WINDOWSIZE = 320000.0\nUSEHAMMING = T\n"));
        assert!(text.ends_with("NUMCHANS = 26\nENORMALISE = F\nZMEANSOURCE = T\n"));

        config.sampling_rate = 44_100;
        assert!(!config.render().contains("SOURCERATE"));
    }

    #[test]
    fn write_config_rejects_unknown_kinds_without_creating_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_config("mp3", "fbank", 40, dir.path(), |_| {}).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidArgument { .. }));
        let err = write_config("wav", "plp", 40, dir.path(), |_| {}).unwrap_err();
        assert!(matches!(err, CorpusError::InvalidArgument { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn write_config_saves_named_after_feature_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config("wav", "mfcc", 13, dir.path(), |c| c.energy = false).unwrap();
        assert_eq!(path, dir.path().join("mfcc.conf"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("TARGETKIND = MFCC_D_A\n"));
        assert!(text.contains("NUMCHANS = 13\n"));
    }
}
