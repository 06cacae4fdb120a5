use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::positions::PositionId;

pub mod validator;

/// One engine evaluation of a starting position. Opaque to the pipeline
/// except for the numeric fields the validator sanity-checks.
///
/// Exactly one of `cp` (centipawns from the first side's view) and `mate`
/// (signed mate-in-N) must be present.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub cp: Option<i64>,
    #[serde(default)]
    pub mate: Option<i32>,
    pub depth: u32,
    #[serde(default)]
    pub pv: Vec<String>,
}

/// One contributor-submitted analysis record.
///
/// Records are immutable once written: a correction is a new record with a
/// new timestamp, never an in-place edit. `validator` is only filled in when
/// an independent re-analysis confirmed the record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub position_id: u64,
    pub white: String,
    pub black: String,
    pub evaluation: Evaluation,
    pub contributor: String,
    pub submitted_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
}

impl PositionRecord {
    pub fn id(&self) -> PositionId {
        PositionId(self.position_id)
    }

    /// Same submission, byte for byte: used to detect re-merged batches.
    pub fn same_submission(&self, other: &PositionRecord) -> bool {
        self.position_id == other.position_id
            && self.contributor == other.contributor
            && self.submitted_at == other.submitted_at
    }
}

/// Reads a submitted record set: one JSON object per line, empty lines skipped.
pub fn read_records(path: &Path) -> Result<Vec<PositionRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open record set {}", path.display()))?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: PositionRecord = serde_json::from_str(&line)
            .with_context(|| format!("malformed record on line {}", line_num + 1))?;
        records.push(record);
    }

    Ok(records)
}

pub fn write_records(path: &Path, records: &[PositionRecord]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("failed to create record set {}", path.display()))?;

    for record in records {
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
    }

    Ok(())
}

#[test]
fn check_record_roundtrip_through_ndjson() {
    use crate::positions::setup_pair;

    let (white, black) = setup_pair(PositionId(42)).unwrap();
    let record = PositionRecord {
        position_id: 42,
        white: white.to_string(),
        black: black.to_string(),
        evaluation: Evaluation {
            cp: Some(-13),
            mate: None,
            depth: 24,
            pv: vec!["e2e4".to_string(), "c7c5".to_string()],
        },
        contributor: "alice".to_string(),
        submitted_at: 1_700_000_000,
        validator: None,
    };

    let path = std::env::temp_dir().join("dfrc_record_roundtrip.ndjson");
    write_records(&path, &[record.clone()]).unwrap();

    assert_eq!(read_records(&path).unwrap(), vec![record]);
}
