//! Phone vocabularies: one symbol per line, line number is the index.
//!
//! Vocabularies are built once with [`build_vocabularies`] (normally while
//! preparing the training split) and only read with [`Vocabularies::load`]
//! afterwards.

use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CorpusError, Result};
use crate::labels::phone_map::{PhoneGranularity, PhoneMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    pub fn from_symbols(symbols: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if index.insert(symbol.clone(), i).is_some() {
                return Err(CorpusError::lookup(format!(
                    "{symbol} appears twice in the vocabulary"
                )));
            }
        }
        Ok(Self { symbols, index })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::io("reading vocabulary", path, e))?;
        let symbols = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_symbols(symbols)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    pub fn encode<S: AsRef<str>>(&self, phones: &[S]) -> Result<Vec<i64>> {
        phones
            .iter()
            .map(|p| {
                let p = p.as_ref();
                self.index_of(p)
                    .map(|i| i as i64)
                    .ok_or_else(|| CorpusError::lookup(format!("{p} is not in the vocabulary")))
            })
            .collect()
    }

    pub fn decode(&self, indices: &[i64]) -> Result<Vec<String>> {
        indices
            .iter()
            .map(|&i| {
                usize::try_from(i)
                    .ok()
                    .and_then(|i| self.symbols.get(i))
                    .cloned()
                    .ok_or_else(|| CorpusError::lookup(format!("index {i} is out of range")))
            })
            .collect()
    }
}

pub fn vocab_path(vocab_dir: &Path, granularity: PhoneGranularity) -> PathBuf {
    vocab_dir.join(format!("{}.txt", granularity.name()))
}

fn write_vocab_file(path: &Path, symbols: &BTreeSet<String>) -> Result<()> {
    let io_err = |e| CorpusError::io("writing vocabulary", path, e);
    let mut file = std::io::BufWriter::new(std::fs::File::create(path).map_err(io_err)?);
    for symbol in symbols {
        writeln!(file, "{symbol}").map_err(io_err)?;
    }
    file.flush().map_err(io_err)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabularies {
    pub phone61: Vocabulary,
    pub phone48: Vocabulary,
    pub phone39: Vocabulary,
}

impl Vocabularies {
    pub fn load<P: AsRef<Path>>(vocab_dir: P) -> Result<Self> {
        let dir = vocab_dir.as_ref();
        Ok(Self {
            phone61: Vocabulary::load(vocab_path(dir, PhoneGranularity::Phone61))?,
            phone48: Vocabulary::load(vocab_path(dir, PhoneGranularity::Phone48))?,
            phone39: Vocabulary::load(vocab_path(dir, PhoneGranularity::Phone39))?,
        })
    }

    pub fn get(&self, granularity: PhoneGranularity) -> &Vocabulary {
        match granularity {
            PhoneGranularity::Phone61 => &self.phone61,
            PhoneGranularity::Phone48 => &self.phone48,
            PhoneGranularity::Phone39 => &self.phone39,
        }
    }
}

/// Write `phone61.txt`, `phone48.txt` and `phone39.txt` under `vocab_dir`
/// and return them as read back from disk.
pub fn build_vocabularies<P: AsRef<Path>>(phone_map: &PhoneMap, vocab_dir: P) -> Result<Vocabularies> {
    let dir = vocab_dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| CorpusError::io("creating", dir, e))?;

    let sets = phone_map.phone_sets();
    for granularity in PhoneGranularity::ALL {
        let path = vocab_path(dir, granularity);
        let symbols = sets.get(granularity);
        write_vocab_file(&path, symbols)?;
        debug!(%granularity, symbols = symbols.len(), path = %path.display(), "wrote vocabulary");
    }
    Vocabularies::load(dir)
}
