//! Shard file naming and atomic shard writing.
//!
//! Each shard is written to a temporary file in the output directory and
//! renamed to its final `<stem>_part<N>.csv` name on `commit()`. A shard that
//! is dropped before committing leaves nothing behind, so a final name always
//! refers to a complete shard.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;

use super::header_block::HeaderBlock;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Marker between the source stem and the shard index.
const PART_MARKER: &str = "_part";

/// Extension of every shard file.
const OUTPUT_EXTENSION: &str = "csv";

/// Write buffer per shard (64 KB).
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Naming
// ─────────────────────────────────────────────────────────────────────────────

/// What to do when a shard name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputPolicy {
    /// Refuse to write and report `AppError::OutputExists`.
    #[default]
    FailIfExists,
    /// Atomically replace existing files of the same name.
    Overwrite,
}

/// Deterministic shard names derived from the source file name.
#[derive(Debug, Clone)]
pub struct ShardNaming {
    dir: PathBuf,
    stem: OsString,
}

impl ShardNaming {
    /// Names shards after `source`, placed in `output_dir`.
    pub fn new(source: &Path, output_dir: &Path) -> Result<Self, AppError> {
        let stem = source.file_stem().ok_or_else(|| AppError::InvalidPath {
            path: source.to_path_buf(),
            reason: "path has no file name".into(),
        })?;

        Ok(Self {
            dir: output_dir.to_path_buf(),
            stem: stem.to_os_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the shard with the given 1-based index.
    pub fn path_for(&self, index: u64) -> PathBuf {
        let mut name = self.stem.clone();
        name.push(format!("{}{}.{}", PART_MARKER, index, OUTPUT_EXTENSION));
        self.dir.join(name)
    }

    /// Returns the shard index if `name` follows this naming scheme.
    pub fn shard_index(&self, name: &OsStr) -> Option<u64> {
        let name = name.to_string_lossy();
        let stem = self.stem.to_string_lossy();

        let digits = name
            .strip_prefix(stem.as_ref())?
            .strip_prefix(PART_MARKER)?
            .strip_suffix(OUTPUT_EXTENSION)?
            .strip_suffix('.')?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Finds the lowest-numbered existing shard from an earlier run, if any.
    pub fn find_existing(&self) -> Result<Option<PathBuf>, AppError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::write_failed(&self.dir, e)),
        };

        let mut lowest: Option<(u64, PathBuf)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| AppError::write_failed(&self.dir, e))?;
            if let Some(index) = self.shard_index(&entry.file_name()) {
                if lowest.as_ref().map_or(true, |(current, _)| index < *current) {
                    lowest = Some((index, entry.path()));
                }
            }
        }

        Ok(lowest.map(|(_, path)| path))
    }

    /// Creates the output directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| AppError::write_failed(&self.dir, e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shard File
// ─────────────────────────────────────────────────────────────────────────────

/// A shard that has been renamed to its final path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedShard {
    /// 1-based shard index.
    pub index: u64,
    pub path: PathBuf,
    /// Data records in the shard (header excluded).
    pub records: u64,
    /// Bytes written, header included.
    pub bytes: u64,
}

/// An in-progress shard backed by a temporary file.
pub struct ShardFile {
    writer: BufWriter<NamedTempFile>,
    final_path: PathBuf,
    index: u64,
    records: u64,
    bytes: u64,
    policy: OutputPolicy,
}

impl ShardFile {
    /// Opens shard `index` for writing.
    ///
    /// # Errors
    ///
    /// - `AppError::OutputExists` if the final name is taken and the policy
    ///   forbids overwriting
    /// - `AppError::WriteFailed` if the temporary file cannot be created
    pub fn create(naming: &ShardNaming, index: u64, policy: OutputPolicy) -> Result<Self, AppError> {
        let final_path = naming.path_for(index);

        if policy == OutputPolicy::FailIfExists && final_path.exists() {
            return Err(AppError::OutputExists { path: final_path });
        }

        let temp_file = tempfile::Builder::new()
            .prefix(".split-")
            .suffix(".tmp")
            .tempfile_in(naming.dir())
            .map_err(|e| AppError::write_failed(&final_path, e))?;

        Ok(Self {
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, temp_file),
            final_path,
            index,
            records: 0,
            bytes: 0,
            policy,
        })
    }

    /// Writes the replicated header block. Call before any record.
    pub fn write_header(&mut self, header: &HeaderBlock) -> Result<(), AppError> {
        self.write_bytes(header.bytes())
    }

    /// Writes one raw data record.
    pub fn write_record(&mut self, record: &[u8]) -> Result<(), AppError> {
        self.write_bytes(record)?;
        self.records += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.writer
            .write_all(bytes)
            .map_err(|e| AppError::write_failed(&self.final_path, e))?;
        self.bytes += bytes.len() as u64;
        Ok(())
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flushes the shard and renames it to its final path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OutputExists` if another file took the final name in
    /// the meantime (no-clobber policy), or `AppError::WriteFailed` on flush
    /// or rename failure. On error the temporary file is removed.
    pub fn commit(self) -> Result<CommittedShard, AppError> {
        let final_path = self.final_path;

        let temp_file = self
            .writer
            .into_inner()
            .map_err(|e| AppError::write_failed(&final_path, e.error()))?;

        let persisted = match self.policy {
            OutputPolicy::FailIfExists => temp_file.persist_noclobber(&final_path),
            OutputPolicy::Overwrite => temp_file.persist(&final_path),
        };

        if let Err(e) = persisted {
            return Err(if e.error.kind() == io::ErrorKind::AlreadyExists {
                AppError::OutputExists { path: final_path }
            } else {
                AppError::write_failed(&final_path, e.error)
            });
        }

        Ok(CommittedShard {
            index: self.index,
            path: final_path,
            records: self.records,
            bytes: self.bytes,
        })
    }
}
