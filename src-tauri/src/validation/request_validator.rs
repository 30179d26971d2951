//! Split request types and up-front validation.
//!
//! Everything here runs before the source is opened: option checks are pure,
//! and the path check is a single metadata read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::streaming::{OutputPolicy, TerminatorMode};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Data records per output file when the caller does not say otherwise.
pub const DEFAULT_LINES_PER_FILE: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical split options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitOptions {
    /// Data records per output file (header excluded). Must be at least 1.
    pub lines_per_file: u64,
    /// Leading records repeated at the top of every output file.
    #[serde(default)]
    pub header_lines: u64,
    /// Replace output files left by an earlier split instead of failing.
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            lines_per_file: DEFAULT_LINES_PER_FILE,
            header_lines: 0,
            overwrite: false,
        }
    }
}

impl SplitOptions {
    /// Sets the data records per file.
    pub fn lines_per_file(mut self, lines: u64) -> Self {
        self.lines_per_file = lines;
        self
    }

    /// Sets the header size in records.
    pub fn header_lines(mut self, lines: u64) -> Self {
        self.header_lines = lines;
        self
    }

    /// Sets the overwrite flag.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn output_policy(&self) -> OutputPolicy {
        if self.overwrite {
            OutputPolicy::Overwrite
        } else {
            OutputPolicy::FailIfExists
        }
    }
}

/// A single split invocation.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub source_path: PathBuf,
    pub options: SplitOptions,
    /// Where shards go. Defaults to the source's directory.
    pub output_dir: Option<PathBuf>,
    pub terminator: TerminatorMode,
}

impl SplitRequest {
    pub fn new(source_path: impl Into<PathBuf>, options: SplitOptions) -> Self {
        Self {
            source_path: source_path.into(),
            options,
            output_dir: None,
            terminator: TerminatorMode::Auto,
        }
    }

    /// Sends shards to `dir` instead of the source's directory.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Overrides terminator sniffing.
    pub fn terminator(mut self, mode: TerminatorMode) -> Self {
        self.terminator = mode;
        self
    }
}

/// A request that passed [`validate_request`].
///
/// Only obtainable through validation, so the engine never sees an unchecked
/// request.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    source_path: PathBuf,
    output_dir: PathBuf,
    options: SplitOptions,
    terminator: TerminatorMode,
    source_len: u64,
}

impl ValidatedRequest {
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    pub fn terminator(&self) -> TerminatorMode {
        self.terminator
    }

    /// Size of the source at validation time.
    pub fn source_len(&self) -> u64 {
        self.source_len
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Checks the options only. Performs no I/O.
///
/// # Errors
///
/// Returns `AppError::InvalidOption` if `lines_per_file` is 0.
pub fn validate_options(options: &SplitOptions) -> Result<(), AppError> {
    if options.lines_per_file < 1 {
        return Err(AppError::InvalidOption {
            option: "linesPerFile",
            reason: "must be at least 1".into(),
        });
    }
    Ok(())
}

/// Validates a request before any file is opened.
///
/// Options are checked first, then the source path with a single metadata
/// read. The file extension is not checked.
///
/// # Errors
///
/// - `AppError::InvalidOption` for a zero `lines_per_file`
/// - `AppError::InvalidPath` if the source is missing or not a regular file
pub fn validate_request(request: &SplitRequest) -> Result<ValidatedRequest, AppError> {
    validate_options(&request.options)?;

    let source_path = &request.source_path;
    let metadata = fs::metadata(source_path).map_err(|e| AppError::InvalidPath {
        path: source_path.clone(),
        reason: match e.kind() {
            io::ErrorKind::NotFound => "file does not exist".into(),
            io::ErrorKind::PermissionDenied => "permission denied".into(),
            _ => e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(AppError::InvalidPath {
            path: source_path.clone(),
            reason: "not a regular file".into(),
        });
    }

    let output_dir = match &request.output_dir {
        Some(dir) => dir.clone(),
        None => match source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };

    Ok(ValidatedRequest {
        source_path: source_path.clone(),
        output_dir,
        options: request.options,
        terminator: request.terminator,
        source_len: metadata.len(),
    })
}
