use crate::features::frame::Record;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads records for offline prediction: a JSON array, or one object per
/// line when the file ends in `.jsonl`. Blank lines are skipped.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    if path.extension().is_some_and(|ext| ext == "jsonl") {
        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("reading {:?}", path))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .with_context(|| format!("{:?} line {}", path, i + 1))?;
            records.push(record);
        }
        Ok(records)
    } else {
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {:?}", path))
    }
}
