//! Locating HTK and transcript files for a split. Results are always sorted
//! so reruns visit utterances in the same order.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use walkdir::WalkDir;

use crate::config::{DatasetConfig, Split};

/// `{data_root}/{feature_dir}/{split}/*.{feature_extension}`, not recursive.
/// The directory must exist.
pub fn feature_paths(config: &DatasetConfig, split: Split) -> Result<Vec<PathBuf>> {
    let dir = config.feature_split_dir(split);
    if !dir.is_dir() {
        bail!("feature directory {} does not exist", dir.display());
    }
    let dir_str = dir
        .to_str()
        .ok_or_else(|| anyhow!("feature directory is not valid UTF-8: {}", dir.display()))?;
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(dir_str),
        glob::Pattern::escape(&config.feature_extension)
    );

    let mut paths = glob::glob(&pattern)
        .with_context(|| format!("bad feature pattern {pattern}"))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to list {}", dir.display()))?;
    paths.sort();
    Ok(paths)
}

/// Every file below `{data_root}/{label_dir}/{split}` whose extension matches
/// `label_extension`, ignoring ASCII case.
pub fn label_paths(config: &DatasetConfig, split: Split) -> Result<Vec<PathBuf>> {
    let dir = config.label_split_dir(split);
    let mut paths = Vec::new();
    for entry in WalkDir::new(&dir) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&config.label_extension));
        if matches {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_sorted_files_per_split() {
        let root = tempfile::tempdir().unwrap();
        let config = DatasetConfig::new(root.path(), "out", "vocab", "map.txt");

        let fbank = root.path().join("fbank/train");
        fs::create_dir_all(&fbank).unwrap();
        for name in ["mdab0_sx139.htk", "fcjf0_sa1.htk", "notes.txt"] {
            fs::write(fbank.join(name), b"").unwrap();
        }
        let features = feature_paths(&config, Split::Train).unwrap();
        assert_eq!(
            features,
            vec![fbank.join("fcjf0_sa1.htk"), fbank.join("mdab0_sx139.htk")]
        );

        let labels_root = root.path().join("phone/train");
        for (dir, name) in [("dr1/fcjf0", "SA1.PHN"), ("dr1/fcjf0", "sa1.wrd"), ("dr2/mdab0", "sx139.phn")] {
            fs::create_dir_all(labels_root.join(dir)).unwrap();
            fs::write(labels_root.join(dir).join(name), b"").unwrap();
        }
        let labels = label_paths(&config, Split::Train).unwrap();
        assert_eq!(
            labels,
            vec![
                labels_root.join("dr1/fcjf0/SA1.PHN"),
                labels_root.join("dr2/mdab0/sx139.phn")
            ]
        );
    }

    #[test]
    fn missing_split_dirs_are_errors() {
        let root = tempfile::tempdir().unwrap();
        let config = DatasetConfig::new(root.path(), "out", "vocab", "map.txt");
        assert!(label_paths(&config, Split::Test).is_err());
        let err = feature_paths(&config, Split::Test).unwrap_err();
        assert!(err.to_string().contains("fbank"), "{err}");

        fs::create_dir_all(root.path().join("fbank/test")).unwrap();
        assert!(feature_paths(&config, Split::Test).unwrap().is_empty());
    }

    #[test]
    fn feature_extension_is_matched_literally() {
        let root = tempfile::tempdir().unwrap();
        let mut config = DatasetConfig::new(root.path(), "out", "vocab", "map.txt");
        config.feature_extension = "htk[1]".to_string();

        let fbank = root.path().join("fbank/dev");
        fs::create_dir_all(&fbank).unwrap();
        for name in ["a_sa1.htk[1]", "b_sa1.htk1", "c_sa1.htk"] {
            fs::write(fbank.join(name), b"").unwrap();
        }
        assert_eq!(
            feature_paths(&config, Split::Dev).unwrap(),
            vec![fbank.join("a_sa1.htk[1]")]
        );
    }
}
