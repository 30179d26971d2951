//! Record-aware CSV splitting that never corrupts records.
//!
//! Streams the source once, front to back. Records are copied verbatim into
//! shards of at most `lines_per_file` data records, each shard prefixed with
//! the header block when one is configured.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::validation::{validate_request, SplitRequest, ValidatedRequest};

use super::header_block::HeaderBlock;
use super::record_scanner::{LineTerminator, RecordScanner};
use super::shard_writer::{CommittedShard, OutputPolicy, ShardFile, ShardNaming};

/// Read buffer for the source (256 KB).
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Outcome of a successful split.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    /// Number of output files written.
    pub file_count: u64,
    /// Data records written across all files (headers excluded).
    pub data_records: u64,
    /// Records in the replicated header block.
    pub header_records: u64,
    /// Output files in shard order.
    pub output_paths: Vec<PathBuf>,
    /// Data records per output file (parallel to `output_paths`).
    pub records_per_file: Vec<u64>,
    /// Terminator seen in the source, if any record ended with one.
    pub line_terminator: Option<LineTerminator>,
    /// Bytes consumed from the source.
    pub bytes_read: u64,
}

/// Progress snapshot, reported after every committed shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitProgress {
    pub files_written: u64,
    pub records_written: u64,
    pub bytes_read: u64,
    pub total_bytes: u64,
}

/// Validates and splits a CSV file.
///
/// Equivalent to [`split_file_with_progress`] without a progress callback.
pub async fn split_file(
    request: SplitRequest,
    cancel: CancellationToken,
) -> Result<SplitReport, AppError> {
    split_file_with_progress(request, cancel, None::<fn(SplitProgress)>).await
}

/// Validates and splits a CSV file, reporting progress per committed shard.
///
/// Validation runs before anything is opened; the streaming work runs on a
/// blocking thread.
///
/// # Errors
///
/// Any [`AppError`] raised by validation, scanning, header extraction or shard
/// writing. Shards committed before a failure are kept on disk, but no count
/// is reported.
pub async fn split_file_with_progress<F>(
    request: SplitRequest,
    cancel: CancellationToken,
    on_progress: Option<F>,
) -> Result<SplitReport, AppError>
where
    F: FnMut(SplitProgress) + Send + 'static,
{
    let validated = validate_request(&request)?;

    tokio::task::spawn_blocking(move || {
        let mut on_progress = on_progress;
        split_file_blocking(
            &validated,
            &cancel,
            on_progress.as_mut().map(|f| f as &mut dyn FnMut(SplitProgress)),
        )
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
}

/// Blocking implementation of CSV file splitting.
///
/// Cancellation is checked before each new shard is opened, so a cancelled
/// split never leaves a partial shard under a final name.
pub fn split_file_blocking(
    request: &ValidatedRequest,
    cancel: &CancellationToken,
    mut on_progress: Option<&mut dyn FnMut(SplitProgress)>,
) -> Result<SplitReport, AppError> {
    let source = request.source_path();
    let options = request.options();
    let policy = options.output_policy();

    info!(
        source = %source.display(),
        lines_per_file = options.lines_per_file,
        header_lines = options.header_lines,
        overwrite = options.overwrite,
        "Starting CSV split"
    );

    let naming = ShardNaming::new(source, request.output_dir())?;
    if policy == OutputPolicy::FailIfExists {
        if let Some(existing) = naming.find_existing()? {
            warn!(existing = %existing.display(), "Output from an earlier split exists");
            return Err(AppError::OutputExists { path: existing });
        }
    }

    let file = File::open(source).map_err(|e| AppError::InvalidPath {
        path: source.to_path_buf(),
        reason: format!("cannot be opened: {}", e),
    })?;
    let mut scanner = RecordScanner::with_terminator(
        BufReader::with_capacity(READ_BUFFER_SIZE, file),
        request.terminator(),
    );

    let header = HeaderBlock::extract(&mut scanner, options.header_lines)?;

    let mut committed: Vec<CommittedShard> = Vec::new();
    let mut current: Option<ShardFile> = None;
    let mut data_records: u64 = 0;

    // Reusable buffer for the record being copied
    let mut record: Vec<u8> = Vec::with_capacity(4096);

    while scanner.read_record(&mut record)?.is_some() {
        let mut shard = match current.take() {
            Some(shard) => shard,
            None => {
                if cancel.is_cancelled() {
                    warn!(files_written = committed.len(), "CSV split cancelled");
                    return Err(AppError::Cancelled {
                        files_written: committed.len() as u64,
                    });
                }
                if committed.is_empty() {
                    naming.ensure_dir()?;
                }
                let mut shard = ShardFile::create(&naming, committed.len() as u64 + 1, policy)?;
                shard.write_header(&header)?;
                shard
            }
        };

        shard.write_record(&record)?;
        data_records += 1;

        if shard.records() >= options.lines_per_file {
            let bytes_read = scanner.bytes_read();
            commit_shard(shard, &mut committed, data_records, bytes_read, request, &mut on_progress)?;
        } else {
            current = Some(shard);
        }
    }

    if let Some(shard) = current.take() {
        let bytes_read = scanner.bytes_read();
        commit_shard(shard, &mut committed, data_records, bytes_read, request, &mut on_progress)?;
    }

    let report = SplitReport {
        file_count: committed.len() as u64,
        data_records,
        header_records: header.record_count(),
        records_per_file: committed.iter().map(|s| s.records).collect(),
        output_paths: committed.into_iter().map(|s| s.path).collect(),
        line_terminator: scanner.line_terminator(),
        bytes_read: scanner.bytes_read(),
    };

    info!(
        file_count = report.file_count,
        data_records = report.data_records,
        bytes_read = report.bytes_read,
        "CSV split complete"
    );

    Ok(report)
}

fn commit_shard(
    shard: ShardFile,
    committed: &mut Vec<CommittedShard>,
    records_written: u64,
    bytes_read: u64,
    request: &ValidatedRequest,
    on_progress: &mut Option<&mut dyn FnMut(SplitProgress)>,
) -> Result<(), AppError> {
    let shard = shard.commit()?;

    debug!(
        index = shard.index,
        records = shard.records,
        bytes = shard.bytes,
        path = %shard.path.display(),
        "Committed shard"
    );

    committed.push(shard);

    if let Some(callback) = on_progress.as_deref_mut() {
        callback(SplitProgress {
            files_written: committed.len() as u64,
            records_written,
            bytes_read,
            total_bytes: request.source_len(),
        });
    }

    Ok(())
}
