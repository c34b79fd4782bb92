//! NumPy `.npy` (format 1.0) files, readable with `np.load`.
//!
//! Only the three layouts the dataset uses are supported: little-endian `f32`
//! feature matrices and statistics vectors, `i64` label index sequences, and
//! 0-d unicode strings holding space-joined phone symbols.
//!
//! Numeric arrays go through `ndarray_npy`. It has no unicode dtype, so the
//! string layout is written and parsed here.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::{Array, Array1, Array2, ArrayBase, Data, Dimension};
use ndarray_npy::{
    ReadNpyError, ReadNpyExt, ReadableElement, WritableElement, WriteNpyError, WriteNpyExt,
};

use crate::error::{CorpusError, Result};

const NPY_MAGIC_STRING: &[u8] = b"\x93NUMPY";
const ARRAY_ALIGN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descr {
    F32,
    I64,
    /// Fixed-width UTF-32 string of the given number of code points.
    Unicode(usize),
}

impl Descr {
    fn as_string(&self) -> String {
        match self {
            Self::F32 => "<f4".to_string(),
            Self::I64 => "<i8".to_string(),
            Self::Unicode(n) => format!("<U{n}"),
        }
    }

    fn parse(descr: &str) -> Option<Self> {
        match descr {
            "<f4" => Some(Self::F32),
            "<i8" => Some(Self::I64),
            other => other
                .strip_prefix("<U")
                .and_then(|n| n.parse().ok())
                .map(Self::Unicode),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub descr: Descr,
    pub shape: Vec<usize>,
}

impl Header {
    fn render(&self) -> String {
        let shape = match self.shape.as_slice() {
            [] => "()".to_string(),
            [n] => format!("({n},)"),
            dims => format!(
                "({})",
                dims.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {shape}, }}",
            self.descr.as_string()
        )
    }

    // e.g. {'descr': '<f4', 'fortran_order': False, 'shape': (3, 13), }
    fn parse(header: &str, origin: &Path) -> Result<Self> {
        let malformed = |what: &str| CorpusError::format(origin, format!("npy header: {what}"));
        let body = header.trim().trim_start_matches('{').trim_end_matches('}');

        let mut fields = HashMap::new();
        let mut depth = 0i32;
        let mut start = 0usize;
        for (i, c) in body.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    push_field(&body[start..i], &mut fields);
                    start = i + 1;
                }
                _ => {}
            }
        }
        push_field(&body[start..], &mut fields);

        if fields.get("fortran_order").map(String::as_str) == Some("True") {
            return Err(malformed("fortran order is not supported"));
        }
        let descr = fields
            .get("descr")
            .and_then(|d| Descr::parse(d))
            .ok_or_else(|| malformed("missing or unsupported descr"))?;
        let shape = fields
            .get("shape")
            .ok_or_else(|| malformed("missing shape"))?
            .trim_matches(|c: char| c == '(' || c == ')')
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| d.parse::<usize>().map_err(|_| malformed("bad shape")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { descr, shape })
    }
}

fn push_field(part: &str, fields: &mut HashMap<String, String>) {
    if let Some((key, value)) = part.split_once(':') {
        let key = key.trim().trim_matches('\'');
        let value = value.trim().trim_matches('\'');
        fields.insert(key.to_string(), value.to_string());
    }
}

fn write_with<F>(path: &Path, header: &Header, write_data: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let io_err = |e| CorpusError::io("writing npy file", path, e);
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    let mut text = header.render();
    // magic + version + u16 length, then the header padded to the alignment.
    let preamble = NPY_MAGIC_STRING.len() + 2 + 2;
    let pad = (ARRAY_ALIGN - (preamble + text.len() + 1) % ARRAY_ALIGN) % ARRAY_ALIGN;
    text.extend(std::iter::repeat_n(' ', pad));
    text.push('\n');
    let len = u16::try_from(text.len())
        .map_err(|_| CorpusError::invalid_argument("npy header longer than 65535 bytes"))?;

    writer.write_all(NPY_MAGIC_STRING).map_err(io_err)?;
    writer.write_all(&[1u8, 0u8]).map_err(io_err)?;
    writer.write_all(&len.to_le_bytes()).map_err(io_err)?;
    writer.write_all(text.as_bytes()).map_err(io_err)?;
    write_data(&mut writer).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

fn write_array<A, S, D>(path: &Path, array: &ArrayBase<S, D>) -> Result<()>
where
    A: WritableElement,
    S: Data<Elem = A>,
    D: Dimension,
{
    let file = File::create(path).map_err(|e| CorpusError::io("creating npy file", path, e))?;
    array.write_npy(file).map_err(|e| match e {
        WriteNpyError::Io(e) => CorpusError::io("writing npy file", path, e),
        other => CorpusError::invalid_argument(format!("cannot write {}: {other}", path.display())),
    })
}

fn read_array<A, D>(path: &Path) -> Result<Array<A, D>>
where
    A: ReadableElement,
    D: Dimension,
{
    let file = File::open(path).map_err(|e| CorpusError::io("opening npy file", path, e))?;
    Array::<A, D>::read_npy(file).map_err(|e| match e {
        ReadNpyError::Io(e) => CorpusError::io("reading npy file", path, e),
        other => CorpusError::format(path, other.to_string()),
    })
}

pub fn write_f32_matrix<P: AsRef<Path>>(path: P, array: &Array2<f32>) -> Result<()> {
    write_array(path.as_ref(), array)
}

pub fn write_f32_vector<P: AsRef<Path>>(path: P, array: &Array1<f32>) -> Result<()> {
    write_array(path.as_ref(), array)
}

pub fn write_i64_vector<P: AsRef<Path>>(path: P, values: &[i64]) -> Result<()> {
    write_array(path.as_ref(), &Array1::from(values.to_vec()))
}

/// Write a 0-d string array, the layout `np.save(path, "some text")` produces.
pub fn write_unicode_scalar<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    // numpy never emits a zero-width string dtype.
    let width = text.chars().count().max(1);
    let header = Header {
        descr: Descr::Unicode(width),
        shape: Vec::new(),
    };
    write_with(path.as_ref(), &header, |w| {
        for c in text.chars() {
            w.write_all(&(c as u32).to_le_bytes())?;
        }
        for _ in text.chars().count()..width {
            w.write_all(&0u32.to_le_bytes())?;
        }
        Ok(())
    })
}

fn open(path: &Path) -> Result<(Header, BufReader<File>)> {
    let io_err = |e| CorpusError::io("reading npy file", path, e);
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(io_err)?;
    if magic != NPY_MAGIC_STRING {
        return Err(CorpusError::format(path, "magic string mismatch"));
    }
    let mut version = [0u8; 2];
    reader.read_exact(&mut version).map_err(io_err)?;
    if version[0] != 1 {
        return Err(CorpusError::format(
            path,
            format!("unsupported npy version {}", version[0]),
        ));
    }
    let len = reader.read_u16::<LittleEndian>().map_err(io_err)? as usize;
    let mut text = vec![0u8; len];
    reader.read_exact(&mut text).map_err(io_err)?;
    let header = Header::parse(&String::from_utf8_lossy(&text), path)?;
    Ok((header, reader))
}

pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Header> {
    open(path.as_ref()).map(|(header, _)| header)
}

pub fn read_f32_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f32>> {
    read_array(path.as_ref())
}

pub fn read_f32_vector<P: AsRef<Path>>(path: P) -> Result<Array1<f32>> {
    read_array(path.as_ref())
}

pub fn read_i64_vector<P: AsRef<Path>>(path: P) -> Result<Vec<i64>> {
    let values: Array1<i64> = read_array(path.as_ref())?;
    Ok(values.to_vec())
}

pub fn read_unicode_scalar<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let (header, mut reader) = open(path)?;
    let Descr::Unicode(width) = header.descr else {
        return Err(CorpusError::format(path, "expected a unicode string array"));
    };
    if !header.shape.is_empty() {
        return Err(CorpusError::format(path, "expected a 0-d array"));
    }
    let mut points = vec![0u32; width];
    reader
        .read_u32_into::<LittleEndian>(&mut points)
        .map_err(|e| CorpusError::io("reading npy data", path, e))?;
    points
        .into_iter()
        .take_while(|&p| p != 0)
        .map(|p| {
            char::from_u32(p)
                .ok_or_else(|| CorpusError::format(path, format!("invalid code point {p:#x}")))
        })
        .collect()
}
