use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Machine-readable classification of an [`AppError`].
///
/// The frontend branches on this value; the human-readable text lives in
/// [`ErrorPresentation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidPath,
    InvalidOption,
    MalformedRecord,
    TruncatedSource,
    ReadFailed,
    WriteFailed,
    OutputExists,
    Cancelled,
    AlreadyRunning,
    Internal,
}

/// User-friendly error presentation for the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPresentation {
    pub title: String,
    pub message: String,
    pub action: Option<String>,
}

/// Structured error payload returned across the command boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub path: Option<String>,
    pub offset: Option<u64>,
    pub option: Option<String>,
    #[serde(flatten)]
    pub presentation: ErrorPresentation,
}

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Request ───────────────────────────────────────────────────────────────
    #[error("Invalid source path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Invalid option {option}: {reason}")]
    InvalidOption { option: &'static str, reason: String },

    // ── Source ────────────────────────────────────────────────────────────────
    #[error("Malformed record at byte {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: String },

    #[error("Source has {found} records but {expected} header lines were requested")]
    TruncatedSource { expected: u64, found: u64 },

    #[error("Failed to read source at byte {offset}: {message}")]
    ReadFailed { offset: u64, message: String },

    // ── Output ────────────────────────────────────────────────────────────────
    #[error("Failed to write {}: {message}", .path.display())]
    WriteFailed { path: PathBuf, message: String },

    #[error("Output file already exists: {}", .path.display())]
    OutputExists { path: PathBuf },

    // ── Lifecycle ─────────────────────────────────────────────────────────────
    #[error("Split cancelled after {files_written} files")]
    Cancelled { files_written: u64 },

    #[error("A split is already running for {}", .path.display())]
    AlreadyRunning { path: PathBuf },

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub(crate) fn write_failed(path: &Path, err: impl std::fmt::Display) -> Self {
        AppError::WriteFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidPath { .. } => ErrorKind::InvalidPath,
            AppError::InvalidOption { .. } => ErrorKind::InvalidOption,
            AppError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            AppError::TruncatedSource { .. } => ErrorKind::TruncatedSource,
            AppError::ReadFailed { .. } => ErrorKind::ReadFailed,
            AppError::WriteFailed { .. } => ErrorKind::WriteFailed,
            AppError::OutputExists { .. } => ErrorKind::OutputExists,
            AppError::Cancelled { .. } => ErrorKind::Cancelled,
            AppError::AlreadyRunning { .. } => ErrorKind::AlreadyRunning,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Converts the error into a user-friendly presentation suitable for UI display.
    pub fn to_presentation(&self) -> ErrorPresentation {
        match self {
            // ── Request ───────────────────────────────────────────────────────
            AppError::InvalidPath { path, reason } => ErrorPresentation {
                title: "Cannot Use This File".into(),
                message: format!("{} cannot be split: {}.", path.display(), reason),
                action: Some("Choose another file".into()),
            },

            AppError::InvalidOption { option, reason } => ErrorPresentation {
                title: "Invalid Setting".into(),
                message: format!("The value for {} is not valid: {}.", option, reason),
                action: Some("Correct the setting and try again".into()),
            },

            // ── Source ────────────────────────────────────────────────────────
            AppError::MalformedRecord { offset, reason } => ErrorPresentation {
                title: "Invalid CSV".into(),
                message: format!(
                    "The CSV file has a formatting problem near byte {}: {}.",
                    offset, reason
                ),
                action: Some("Fix the CSV file and try again".into()),
            },

            AppError::TruncatedSource { expected, found } => ErrorPresentation {
                title: "Not Enough Rows".into(),
                message: format!(
                    "The file has {} rows, fewer than the {} header rows requested.",
                    found, expected
                ),
                action: Some("Lower the number of header rows".into()),
            },

            AppError::ReadFailed { .. } => ErrorPresentation {
                title: "Read Error".into(),
                message: "The source file could not be read to the end.".into(),
                action: Some("Check the file and try again".into()),
            },

            // ── Output ────────────────────────────────────────────────────────
            AppError::WriteFailed { path, .. } => ErrorPresentation {
                title: "Write Failed".into(),
                message: format!(
                    "Could not write {}. Files written before the failure were kept.",
                    path.display()
                ),
                action: Some("Check disk space and folder permissions".into()),
            },

            AppError::OutputExists { path } => ErrorPresentation {
                title: "Files Already Exist".into(),
                message: format!(
                    "{} already exists. This file seems to have been split before.",
                    path.display()
                ),
                action: Some("Remove the old parts or enable overwrite".into()),
            },

            // ── Lifecycle ─────────────────────────────────────────────────────
            AppError::Cancelled { files_written } => ErrorPresentation {
                title: "Cancelled".into(),
                message: format!(
                    "The split was cancelled. {} complete files were kept.",
                    files_written
                ),
                action: None,
            },

            AppError::AlreadyRunning { .. } => ErrorPresentation {
                title: "Split In Progress".into(),
                message: "This file is already being split.".into(),
                action: Some("Wait for the current split to finish".into()),
            },

            // ── Generic ───────────────────────────────────────────────────────
            AppError::Internal(_) => ErrorPresentation {
                title: "Unexpected Error".into(),
                message: "Something went wrong. Please try again.".into(),
                action: Some("Try again".into()),
            },
        }
    }

    /// Builds the structured payload sent to the frontend.
    pub fn to_payload(&self) -> ErrorPayload {
        let (path, offset, option) = match self {
            AppError::InvalidPath { path, .. }
            | AppError::WriteFailed { path, .. }
            | AppError::OutputExists { path }
            | AppError::AlreadyRunning { path } => {
                (Some(path.display().to_string()), None, None)
            }
            AppError::MalformedRecord { offset, .. } | AppError::ReadFailed { offset, .. } => {
                (None, Some(*offset), None)
            }
            AppError::InvalidOption { option, .. } => (None, None, Some(option.to_string())),
            AppError::TruncatedSource { .. } | AppError::Cancelled { .. } | AppError::Internal(_) => {
                (None, None, None)
            }
        };

        ErrorPayload {
            kind: self.kind(),
            path,
            offset,
            option,
            presentation: self.to_presentation(),
        }
    }
}

// Allow AppError to be returned from Tauri commands
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_payload().serialize(serializer)
    }
}
