//! Phone-level target labels.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CorpusError, Result};
use crate::labels::phone_map::{PhoneGranularity, PhoneMap};
use crate::labels::vocab::Vocabularies;
use crate::npy;

/// One segmentation file: `start end phone` per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneTranscript {
    pub speaker: String,
    pub utterance_id: String,
    pub phones: Vec<String>,
}

impl PhoneTranscript {
    /// The speaker is the parent directory, the utterance id the file name
    /// up to its first `.`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (speaker, utterance_id) = utterance_key(path)?;
        let text = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::io("reading transcript", path, e))?;

        let mut phones = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let mut columns = line.split_whitespace();
            let Some(_start) = columns.next() else {
                continue;
            };
            let phone = columns.nth(1).ok_or_else(|| {
                CorpusError::format(
                    path,
                    format!("line {}: expected `start end phone`", lineno + 1),
                )
            })?;
            phones.push(phone.to_string());
        }

        Ok(Self {
            speaker,
            utterance_id,
            phones,
        })
    }

    /// `{speaker}_{utterance_id}`, the file name of every saved array.
    pub fn key(&self) -> String {
        format!("{}_{}", self.speaker, self.utterance_id)
    }

    /// The key [`read`](Self::read) gives `path`, without opening the file.
    pub fn key_for<P: AsRef<Path>>(path: P) -> Result<String> {
        let (speaker, utterance_id) = utterance_key(path.as_ref())?;
        Ok(format!("{speaker}_{utterance_id}"))
    }

    pub fn mapped(&self, phone_map: &PhoneMap, granularity: PhoneGranularity) -> Result<Vec<String>> {
        phone_map.map(&self.phones, granularity)
    }
}

fn utterance_key(path: &Path) -> Result<(String, String)> {
    let speaker = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .ok_or_else(|| CorpusError::format(path, "no speaker directory in path"))?;
    let utterance_id = path
        .file_name()
        .and_then(|s| s.to_str())
        .and_then(|s| s.split('.').next())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CorpusError::format(path, "no utterance id in file name"))?;
    Ok((speaker.to_string(), utterance_id.to_string()))
}

/// How label arrays are written.
#[derive(Debug, Clone, Copy)]
pub enum LabelOutput<'a> {
    /// `<i8` index arrays looked up in the vocabularies (train and dev).
    Indices(&'a Vocabularies),
    /// Space-joined phone strings (test).
    Text,
}

/// Read every transcript, map it to all three phone sets and, when
/// `save_path` is set, write `{save_path}/{granularity}/{speaker}_{utt}.npy`.
///
/// Returns the number of utterances processed. Any failure aborts the run.
pub fn read_phone<P: AsRef<Path>>(
    label_paths: &[P],
    phone_map: &PhoneMap,
    output: LabelOutput<'_>,
    save_path: Option<&Path>,
) -> Result<usize> {
    if let Some(save_path) = save_path {
        for granularity in PhoneGranularity::ALL {
            let dir = save_path.join(granularity.name());
            std::fs::create_dir_all(&dir).map_err(|e| CorpusError::io("creating", &dir, e))?;
        }
    }

    info!(files = label_paths.len(), "reading phone transcripts");
    for label_path in label_paths {
        let transcript = PhoneTranscript::read(label_path)?;
        let key = transcript.key();
        debug!(utterance = %key, phones = transcript.phones.len(), "transcript");

        let Some(save_path) = save_path else {
            // Mapping still runs so unknown symbols surface without saving.
            for granularity in PhoneGranularity::ALL {
                transcript.mapped(phone_map, granularity)?;
            }
            continue;
        };

        for granularity in PhoneGranularity::ALL {
            let phones = transcript.mapped(phone_map, granularity)?;
            let file = label_file(save_path, granularity, &key);
            match output {
                LabelOutput::Indices(vocabs) => {
                    let indices = vocabs.get(granularity).encode(&phones)?;
                    npy::write_i64_vector(&file, &indices)?;
                }
                LabelOutput::Text => npy::write_unicode_scalar(&file, &phones.join(" "))?,
            }
        }
    }
    Ok(label_paths.len())
}

pub fn label_file(save_path: &Path, granularity: PhoneGranularity, key: &str) -> PathBuf {
    save_path.join(granularity.name()).join(format!("{key}.npy"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::phone_map::tests::SAMPLE_MAP;
    use crate::labels::vocab::build_vocabularies;

    fn write_transcript(root: &Path, speaker: &str, name: &str, body: &str) -> PathBuf {
        let dir = root.join(speaker);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_third_column_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(
            dir.path(),
            "fcjf0",
            "sa1.phn",
            "0 3050 h#\n3050 4559 sh\n4559 5723 sh\n\n5723 6642 q\n",
        );
        let t = PhoneTranscript::read(&path).unwrap();
        assert_eq!(t.speaker, "fcjf0");
        assert_eq!(t.utterance_id, "sa1");
        assert_eq!(t.key(), "fcjf0_sa1");
        assert_eq!(t.phones, ["h#", "sh", "sh", "q"]);
        assert_eq!(PhoneTranscript::key_for(&path).unwrap(), t.key());
        assert_eq!(
            PhoneTranscript::key_for("/corpus/phone/dev/dr3/mrtk0/si1093.phn").unwrap(),
            "mrtk0_si1093"
        );
    }

    #[test]
    fn short_line_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_transcript(dir.path(), "fcjf0", "sa2.phn", "0 3050\n");
        assert!(matches!(
            PhoneTranscript::read(&path),
            Err(CorpusError::Format { .. })
        ));
    }

    #[test]
    fn saves_indices_for_every_granularity() {
        let dir = tempfile::tempdir().unwrap();
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        let vocabs = build_vocabularies(&map, dir.path().join("vocab")).unwrap();
        let labels = dir.path().join("label");
        let paths = vec![
            write_transcript(dir.path(), "mdab0", "si1039.phn", "0 1 h#\n1 2 q\n2 3 ao\n3 4 h#\n"),
            write_transcript(dir.path(), "mdab0", "sx139.phn", ""),
        ];

        let n = read_phone(&paths, &map, LabelOutput::Indices(&vocabs), Some(labels.as_path())).unwrap();
        assert_eq!(n, 2);

        let p61 = npy::read_i64_vector(label_file(&labels, PhoneGranularity::Phone61, "mdab0_si1039")).unwrap();
        let p48 = npy::read_i64_vector(label_file(&labels, PhoneGranularity::Phone48, "mdab0_si1039")).unwrap();
        let p39 = npy::read_i64_vector(label_file(&labels, PhoneGranularity::Phone39, "mdab0_si1039")).unwrap();
        assert_eq!(vocabs.phone61.decode(&p61).unwrap(), ["h#", "q", "ao", "h#"]);
        assert_eq!(vocabs.phone48.decode(&p48).unwrap(), ["h#", "ao", "h#"]);
        assert_eq!(vocabs.phone39.decode(&p39).unwrap(), ["h#", "aa", "h#"]);

        let empty = npy::read_i64_vector(label_file(&labels, PhoneGranularity::Phone39, "mdab0_sx139")).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn saves_text_without_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        let labels = dir.path().join("label");
        let paths = [write_transcript(
            dir.path(),
            "faks0",
            "sa1.phn",
            "0 1 h#\n1 2 ax-h\n2 3 q\n3 4 pau\n",
        )];

        read_phone(&paths, &map, LabelOutput::Text, Some(labels.as_path())).unwrap();
        let read = |g| npy::read_unicode_scalar(label_file(&labels, g, "faks0_sa1")).unwrap();
        assert_eq!(read(PhoneGranularity::Phone61), "h# ax-h q pau");
        assert_eq!(read(PhoneGranularity::Phone48), "h# ax pau");
        assert_eq!(read(PhoneGranularity::Phone39), "h# ah h#");
    }

    #[test]
    fn unknown_phone_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        let paths = [write_transcript(dir.path(), "faks0", "sa2.phn", "0 1 xx\n")];
        assert!(matches!(
            read_phone(&paths, &map, LabelOutput::Text, None),
            Err(CorpusError::Lookup { .. })
        ));
    }
}
