//! Reader for HTK binary feature files.
//!
//! An HTK file starts with a 12-byte big-endian header
//! (`frame_num: u32, sample_period: u32, sample_size: u16, parameter_kind: u16`)
//! followed by `frame_num` frames of `sample_size / 4` big-endian `f32` values.

use std::io::Read;
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use ndarray::Array2;

use crate::error::{CorpusError, Result};

pub const HEADER_LEN: usize = 12;
const BYTES_PER_SAMPLE: usize = 4;

const BASE_KINDS: [&str; 12] = [
    "WAVEFORM", "LPC", "LPREFC", "LPCEPSTRA", "LPDELCEP", "IREFC", "MFCC", "FBANK", "MELSPEC",
    "USER", "DISCRETE", "PLP",
];

// (bit, suffix) in the order HTK prints qualifiers.
const QUALIFIERS: [(u16, &str); 10] = [
    (0o100, "_E"),
    (0o200, "_N"),
    (0o400, "_D"),
    (0o1000, "_A"),
    (0o2000, "_C"),
    (0o4000, "_Z"),
    (0o10000, "_K"),
    (0o20000, "_0"),
    (0o40000, "_V"),
    (0o100000, "_T"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtkHeader {
    pub frame_num: u32,
    /// Frame period in 100ns units (100000 = 10ms).
    pub sample_period: u32,
    /// Bytes per frame.
    pub sample_size: u16,
    pub parameter_kind: u16,
}

impl HtkHeader {
    pub fn from_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            frame_num: reader.read_u32::<BigEndian>()?,
            sample_period: reader.read_u32::<BigEndian>()?,
            sample_size: reader.read_u16::<BigEndian>()?,
            parameter_kind: reader.read_u16::<BigEndian>()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.frame_num.to_be_bytes());
        out[4..8].copy_from_slice(&self.sample_period.to_be_bytes());
        out[8..10].copy_from_slice(&self.sample_size.to_be_bytes());
        out[10..12].copy_from_slice(&self.parameter_kind.to_be_bytes());
        out
    }

    /// Number of `f32` values per frame, `None` unless `sample_size` is a
    /// positive multiple of 4.
    pub fn feature_dim(&self) -> Option<usize> {
        let size = self.sample_size as usize;
        (size > 0 && size % BYTES_PER_SAMPLE == 0).then_some(size / BYTES_PER_SAMPLE)
    }

    /// Human-readable parameter kind, e.g. `FBANK_E_D_A`.
    pub fn kind_name(&self) -> String {
        let base = (self.parameter_kind & 0o77) as usize;
        let mut name = BASE_KINDS
            .get(base)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("KIND{base}"));
        for (bit, suffix) in QUALIFIERS {
            if self.parameter_kind & bit != 0 {
                name.push_str(suffix);
            }
        }
        name
    }
}

/// Read only the header of an HTK file.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<HtkHeader> {
    let path = path.as_ref();
    let mut file =
        std::fs::File::open(path).map_err(|e| CorpusError::io("opening HTK file", path, e))?;
    HtkHeader::from_reader(&mut file).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            CorpusError::format(path, format!("shorter than the {HEADER_LEN}-byte header"))
        }
        _ => CorpusError::io("reading HTK header", path, e),
    })
}

/// Read an HTK file into a `(frame_num, feature_dim)` matrix.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| CorpusError::io("reading HTK file", path, e))?;
    decode(&bytes, path)
}

/// Same as [`read`] for an in-memory file image.
pub fn from_bytes(bytes: &[u8]) -> Result<Array2<f32>> {
    decode(bytes, Path::new("<memory>"))
}

fn decode(bytes: &[u8], origin: &Path) -> Result<Array2<f32>> {
    if bytes.len() < HEADER_LEN {
        return Err(CorpusError::format(
            origin,
            format!(
                "{} bytes is shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            ),
        ));
    }
    let (mut head, payload) = bytes.split_at(HEADER_LEN);
    let header = HtkHeader::from_reader(&mut head)
        .map_err(|e| CorpusError::format(origin, e.to_string()))?;
    let feature_dim = header.feature_dim().ok_or_else(|| {
        CorpusError::format(
            origin,
            format!(
                "sample size {} is not a positive multiple of {BYTES_PER_SAMPLE} bytes",
                header.sample_size
            ),
        )
    })?;

    let frame_bytes = feature_dim * BYTES_PER_SAMPLE;
    if payload.len() % frame_bytes != 0 {
        return Err(CorpusError::format(
            origin,
            format!(
                "payload of {} bytes is not a whole number of {frame_bytes}-byte frames",
                payload.len()
            ),
        ));
    }
    let frames = payload.len() / frame_bytes;
    if frames != header.frame_num as usize {
        return Err(CorpusError::format(
            origin,
            format!(
                "header declares {} frames but payload holds {frames}",
                header.frame_num
            ),
        ));
    }

    // Samples are loaded in host order and swapped once, whatever the host.
    let samples: Vec<f32> = payload
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|c| f32::from_bits(u32::from_ne_bytes([c[0], c[1], c[2], c[3]]).swap_bytes()))
        .collect();

    Array2::from_shape_vec((frames, feature_dim), samples)
        .map_err(|e| CorpusError::format(origin, e.to_string()))
}

/// Serialize a matrix as an HTK file image with big-endian samples.
pub fn encode(features: &Array2<f32>, sample_period: u32, parameter_kind: u16) -> Result<Vec<u8>> {
    let (frames, dim) = features.dim();
    let frame_num = u32::try_from(frames)
        .map_err(|_| CorpusError::invalid_argument(format!("{frames} frames overflow u32")))?;
    let sample_size = u16::try_from(dim * BYTES_PER_SAMPLE).map_err(|_| {
        CorpusError::invalid_argument(format!("feature dimension {dim} overflows the header"))
    })?;
    let header = HtkHeader {
        frame_num,
        sample_period,
        sample_size,
        parameter_kind,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + frames * dim * BYTES_PER_SAMPLE);
    out.extend_from_slice(&header.to_bytes());
    for value in features.iter() {
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp(frames: usize, dim: usize) -> Array2<f32> {
        Array2::from_shape_fn((frames, dim), |(t, d)| t as f32 * 0.5 - d as f32 * 1.25)
    }

    #[test]
    fn header_example_gives_thirteen_dims() {
        let header = HtkHeader {
            frame_num: 3,
            sample_period: 100_000,
            sample_size: 52,
            parameter_kind: 9,
        };
        assert_eq!(header.feature_dim(), Some(13));
        assert_eq!(header.kind_name(), "USER");

        let mut bytes = header.to_bytes().to_vec();
        let expected = ramp(3, 13);
        for v in expected.iter() {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let matrix = from_bytes(&bytes).unwrap();
        assert_eq!(matrix.dim(), (3, 13));
        assert_eq!(matrix, expected);
    }

    #[test]
    fn header_bytes_are_big_endian() {
        let bytes = [0, 0, 0, 3, 0, 1, 0x86, 0xa0, 0, 52, 0, 9];
        let header = HtkHeader::from_reader(&mut &bytes[..]).unwrap();
        assert_eq!(header.frame_num, 3);
        assert_eq!(header.sample_period, 100_000);
        assert_eq!(header.sample_size, 52);
        assert_eq!(header.parameter_kind, 9);
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn encode_then_read_reproduces_matrix() {
        let expected = ramp(7, 40);
        let bytes = encode(&expected, 100_000, 7 | 0o100 | 0o400 | 0o1000).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 7 * 40 * 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fcjf0_sa1.htk");
        std::fs::write(&path, &bytes).unwrap();

        let header = read_header(&path).unwrap();
        assert_eq!(header.frame_num, 7);
        assert_eq!(header.kind_name(), "FBANK_E_D_A");
        assert_eq!(read(&path).unwrap(), expected);
    }

    #[test]
    fn zero_frames_is_an_empty_matrix() {
        let bytes = encode(&Array2::zeros((0, 13)), 100_000, 9).unwrap();
        assert_eq!(from_bytes(&bytes).unwrap().dim(), (0, 13));
    }

    #[test]
    fn rejects_sample_size_not_multiple_of_four() {
        let header = HtkHeader {
            frame_num: 1,
            sample_period: 100_000,
            sample_size: 50,
            parameter_kind: 9,
        };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 50]);
        assert!(matches!(
            from_bytes(&bytes),
            Err(CorpusError::Format { .. })
        ));
    }

    #[test]
    fn rejects_short_header_and_frame_mismatch() {
        assert!(matches!(
            from_bytes(&[0, 0, 0, 1]),
            Err(CorpusError::Format { .. })
        ));

        let mut bytes = encode(&ramp(2, 4), 100_000, 9).unwrap();
        bytes[3] = 5;
        let err = from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("declares 5 frames"), "{err}");

        let mut truncated = encode(&ramp(2, 4), 100_000, 9).unwrap();
        truncated.pop();
        assert!(matches!(
            from_bytes(&truncated),
            Err(CorpusError::Format { .. })
        ));
    }
}
