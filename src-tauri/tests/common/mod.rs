#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use csv_splitter_lib::streaming::RecordScanner;
use tempfile::TempDir;

/// Writes `content` to `name` inside `dir` and returns the path.
pub fn write_source(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write source");
    path
}

/// Splits a byte buffer into raw records.
pub fn records_in(bytes: &[u8]) -> Vec<Vec<u8>> {
    RecordScanner::new(Cursor::new(bytes.to_vec()))
        .map(|r| r.expect("Failed to scan records").bytes)
        .collect()
}

/// Raw records of an output file.
pub fn records_of(path: &Path) -> Vec<Vec<u8>> {
    records_in(&fs::read(path).expect("Failed to read output"))
}

/// Raw records of an output file with the first `header_lines` dropped.
pub fn data_records_of(path: &Path, header_lines: usize) -> Vec<Vec<u8>> {
    records_of(path).into_iter().skip(header_lines).collect()
}
