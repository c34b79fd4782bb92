use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

pub const FRAME_COUNT_FILE: &str = "frame_num.jsonl";

/// One line of `frame_num.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCount {
    pub utterance: String,
    pub frame_num: usize,
}

pub fn write_frame_counts(out_path: &Path, counts: &[FrameCount]) -> Result<()> {
    let out_file = File::create(out_path)
        .with_context(|| format!("Failed to create output: {}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);

    for line in counts {
        serde_json::to_writer(&mut writer, line)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_frame_counts(path: &Path) -> Result<Vec<FrameCount>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let mut counts = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let count = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: bad frame count", path.display(), lineno + 1))?;
        counts.push(count);
    }
    Ok(counts)
}
