//! The 61 → 48 → 39 phone correspondence table.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use crate::error::{CorpusError, Result};

/// Marks a 61-phone symbol with no counterpart in a coarser set.
pub const NO_MAPPING: &str = "nan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhoneGranularity {
    Phone61,
    Phone48,
    Phone39,
}

impl PhoneGranularity {
    pub const ALL: [Self; 3] = [Self::Phone61, Self::Phone48, Self::Phone39];

    /// Name used for vocabulary files and label directories.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Phone61 => "phone61",
            Self::Phone48 => "phone48",
            Self::Phone39 => "phone39",
        }
    }
}

impl fmt::Display for PhoneGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneMapRow {
    pub phone61: String,
    pub phone48: Option<String>,
    pub phone39: Option<String>,
}

impl PhoneMapRow {
    pub fn target(&self, granularity: PhoneGranularity) -> Option<&str> {
        match granularity {
            PhoneGranularity::Phone61 => Some(&self.phone61),
            PhoneGranularity::Phone48 => self.phone48.as_deref(),
            PhoneGranularity::Phone39 => self.phone39.as_deref(),
        }
    }
}

/// Sorted, deduplicated symbol sets, one per granularity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneSets {
    pub phone61: BTreeSet<String>,
    pub phone48: BTreeSet<String>,
    pub phone39: BTreeSet<String>,
}

impl PhoneSets {
    pub fn get(&self, granularity: PhoneGranularity) -> &BTreeSet<String> {
        match granularity {
            PhoneGranularity::Phone61 => &self.phone61,
            PhoneGranularity::Phone48 => &self.phone48,
            PhoneGranularity::Phone39 => &self.phone39,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhoneMap {
    rows: Vec<PhoneMapRow>,
    by_phone61: HashMap<String, usize>,
}

impl PhoneMap {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::io("reading phone map", path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        let mut by_phone61 = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let columns: Vec<&str> = line.split_whitespace().collect();
            let (phone61, phone48, phone39) = match columns.as_slice() {
                [] => continue,
                &[a, b, c] => (a, b, c),
                other => {
                    return Err(CorpusError::lookup(format!(
                        "phone map line {}: expected 3 columns, found {}",
                        lineno + 1,
                        other.len()
                    )));
                }
            };
            if by_phone61.insert(phone61.to_string(), rows.len()).is_some() {
                return Err(CorpusError::lookup(format!(
                    "phone map line {}: {phone61} is listed twice",
                    lineno + 1
                )));
            }
            let target = |s: &str| (s != NO_MAPPING).then(|| s.to_string());
            rows.push(PhoneMapRow {
                phone61: phone61.to_string(),
                phone48: target(phone48),
                phone39: target(phone39),
            });
        }
        Ok(Self { rows, by_phone61 })
    }

    pub fn rows(&self) -> &[PhoneMapRow] {
        &self.rows
    }

    pub fn row(&self, phone61: &str) -> Option<&PhoneMapRow> {
        self.by_phone61.get(phone61).map(|&i| &self.rows[i])
    }

    pub fn phone_sets(&self) -> PhoneSets {
        let mut sets = PhoneSets::default();
        for row in &self.rows {
            sets.phone61.insert(row.phone61.clone());
            if let Some(p) = &row.phone48 {
                sets.phone48.insert(p.clone());
            }
            if let Some(p) = &row.phone39 {
                sets.phone39.insert(p.clone());
            }
        }
        sets
    }

    /// Map a 61-phone sequence to `granularity`, dropping symbols without a
    /// counterpart. Order and repeats are preserved.
    pub fn map<S: AsRef<str>>(
        &self,
        phones: &[S],
        granularity: PhoneGranularity,
    ) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(phones.len());
        for phone in phones {
            let phone = phone.as_ref();
            let row = self
                .row(phone)
                .ok_or_else(|| CorpusError::lookup(format!("{phone} is not in the phone map")))?;
            if let Some(target) = row.target(granularity) {
                out.push(target.to_string());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_MAP: &str = "\
aa\taa\taa
ao\tao\taa
ax\tax\tah
ax-h\tax\tah
h#\th#\th#
pau\tpau\th#
q\tnan\tnan
sh\tsh\tsh
zh   zh   sh
";

    fn phones(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn q_stays_in_phone61_only() {
        let sets = PhoneMap::parse(SAMPLE_MAP).unwrap().phone_sets();
        assert!(sets.phone61.contains("q"));
        assert!(!sets.phone48.contains("q"));
        assert!(!sets.phone39.contains("q"));
        assert!(!sets.phone48.contains(NO_MAPPING));
        assert_eq!(sets.phone61.len(), 9);
        assert_eq!(
            sets.phone48.iter().map(String::as_str).collect::<Vec<_>>(),
            ["aa", "ao", "ax", "h#", "pau", "sh", "zh"]
        );
        assert_eq!(
            sets.phone39.iter().map(String::as_str).collect::<Vec<_>>(),
            ["aa", "ah", "h#", "sh"]
        );
    }

    #[test]
    fn map_substitutes_and_drops_q() {
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        let src = phones("h# q aa q ao ax-h zh zh pau h#");

        assert_eq!(map.map(&src, PhoneGranularity::Phone61).unwrap(), src);
        assert_eq!(
            map.map(&src, PhoneGranularity::Phone48).unwrap(),
            phones("h# aa ao ax zh zh pau h#")
        );
        let p39 = map.map(&src, PhoneGranularity::Phone39).unwrap();
        assert_eq!(p39, phones("h# aa aa ah sh sh h# h#"));
        assert_eq!(p39.len(), src.len() - 2);
    }

    #[test]
    fn reduced_columns_drop_independently() {
        let map = PhoneMap::parse("x\tx\tnan\ny\tnan\ty\nz\tz\tz\n").unwrap();
        let sets = map.phone_sets();
        assert_eq!(sets.phone61.len(), 3);
        assert_eq!(
            sets.phone48.iter().map(String::as_str).collect::<Vec<_>>(),
            ["x", "z"]
        );
        assert_eq!(
            sets.phone39.iter().map(String::as_str).collect::<Vec<_>>(),
            ["y", "z"]
        );
        assert_eq!(map.row("x").unwrap().target(PhoneGranularity::Phone39), None);
        assert_eq!(map.row("y").unwrap().target(PhoneGranularity::Phone48), None);

        let src = phones("x y z y x");
        assert_eq!(map.map(&src, PhoneGranularity::Phone61).unwrap(), src);
        assert_eq!(map.map(&src, PhoneGranularity::Phone48).unwrap(), phones("x z x"));
        assert_eq!(map.map(&src, PhoneGranularity::Phone39).unwrap(), phones("y z y"));
    }

    #[test]
    fn empty_sequence_maps_to_empty() {
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        let empty: [&str; 0] = [];
        assert!(map.map(&empty, PhoneGranularity::Phone39).unwrap().is_empty());
    }

    #[test]
    fn unknown_symbol_is_a_lookup_error() {
        let map = PhoneMap::parse(SAMPLE_MAP).unwrap();
        assert!(matches!(
            map.map(&["aa", "xx"], PhoneGranularity::Phone48),
            Err(CorpusError::Lookup { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(matches!(
            PhoneMap::parse("aa aa\n"),
            Err(CorpusError::Lookup { .. })
        ));
        assert!(matches!(
            PhoneMap::parse("aa aa aa\naa ao aa\n"),
            Err(CorpusError::Lookup { .. })
        ));
        assert_eq!(PhoneMap::parse("\n\naa aa aa\n\n").unwrap().rows().len(), 1);
    }
}
