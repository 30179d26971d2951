//! CSV split Tauri commands.
//!
//! These commands handle:
//! - Normalizing the options payload (canonical and legacy shapes)
//! - Running the split engine for a dropped or picked file
//! - Cancelling a running split

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;
use crate::streaming::{split_file_with_progress, SplitProgress, SplitReport};
use crate::validation::{SplitOptions, SplitRequest};

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical options shape sent by the frontend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalOptions {
    pub lines_per_file: i64,
    #[serde(default)]
    pub header_lines: i64,
    #[serde(default)]
    pub overwrite: bool,
}

/// Options shape used by older frontends.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOptions {
    pub num_lines: i64,
    #[serde(default)]
    pub with_header: bool,
    pub num_header_lines: Option<i64>,
}

/// Split options as received over IPC.
///
/// Both shapes are reduced to [`SplitOptions`] here; the engine only ever sees
/// the canonical form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SplitOptionsPayload {
    Canonical(CanonicalOptions),
    Legacy(LegacyOptions),
}

impl TryFrom<SplitOptionsPayload> for SplitOptions {
    type Error = AppError;

    fn try_from(payload: SplitOptionsPayload) -> Result<Self, Self::Error> {
        let (lines_per_file, header_lines, overwrite) = match payload {
            SplitOptionsPayload::Canonical(o) => (o.lines_per_file, o.header_lines, o.overwrite),
            SplitOptionsPayload::Legacy(o) => {
                let header_lines = match o.num_header_lines {
                    Some(n) => n,
                    None if o.with_header => 1,
                    None => 0,
                };
                (o.num_lines, header_lines, false)
            }
        };

        let lines_per_file = u64::try_from(lines_per_file).map_err(|_| AppError::InvalidOption {
            option: "linesPerFile",
            reason: "must be at least 1".into(),
        })?;
        let header_lines = u64::try_from(header_lines).map_err(|_| AppError::InvalidOption {
            option: "headerLines",
            reason: "must not be negative".into(),
        })?;

        Ok(SplitOptions {
            lines_per_file,
            header_lines,
            overwrite,
        })
    }
}

/// Result of a split returned to the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCsvResponse {
    /// Number of files written.
    pub file_count: u64,
    /// Data records written (headers excluded).
    pub data_records: u64,
    /// Output files in order.
    pub output_paths: Vec<String>,
}

impl From<SplitReport> for SplitCsvResponse {
    fn from(report: SplitReport) -> Self {
        Self {
            file_count: report.file_count,
            data_records: report.data_records,
            output_paths: report
                .output_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }
}

/// Progress event emitted after each output file is written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitProgressEvent {
    /// Source being split.
    pub path: String,
    pub files_written: u64,
    pub records_written: u64,
    pub bytes_read: u64,
    pub total_bytes: u64,
}

impl SplitProgressEvent {
    fn new(path: &str, progress: SplitProgress) -> Self {
        Self {
            path: path.to_string(),
            files_written: progress.files_written,
            records_written: progress.records_written,
            bytes_read: progress.bytes_read,
            total_bytes: progress.total_bytes,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command Bodies
// ─────────────────────────────────────────────────────────────────────────────

/// Splits the file at `path`, registering it so it can be cancelled.
///
/// Options are normalized first, so a bad option is reported before the path
/// is looked at.
pub async fn run_split<F>(
    state: &AppState,
    path: String,
    options: SplitOptionsPayload,
    on_progress: Option<F>,
) -> Result<SplitCsvResponse, AppError>
where
    F: FnMut(SplitProgressEvent) + Send + 'static,
{
    let options = SplitOptions::try_from(options)?;
    let source = PathBuf::from(&path);

    info!("[Split] Splitting {} ({:?})", path, options);

    // Held until the split returns or this future is dropped.
    let registration = state.splits.begin(&source)?;
    let progress = on_progress.map(|mut emit| {
        move |progress: SplitProgress| emit(SplitProgressEvent::new(&path, progress))
    });

    let report = split_file_with_progress(
        SplitRequest::new(&source, options),
        registration.token(),
        progress,
    )
    .await?;
    drop(registration);

    info!("[Split] Wrote {} files", report.file_count);
    Ok(report.into())
}

/// Cancels the split running for `path`, if any.
pub async fn request_cancel(state: &AppState, path: &str) -> bool {
    let cancelled = state.splits.cancel(&PathBuf::from(path));
    if cancelled {
        info!("[Split] Cancellation requested for {}", path);
    }
    cancelled
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Splits a CSV file into `<stem>_part<N>.csv` files beside it.
///
/// # Events
///
/// Emits `split:progress` after each output file is written.
#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn split_csv(
    state: tauri::State<'_, AppState>,
    app_handle: tauri::AppHandle,
    path: String,
    options: SplitOptionsPayload,
) -> Result<SplitCsvResponse, AppError> {
    use tauri::Emitter;

    let emit = move |event: SplitProgressEvent| {
        let _ = app_handle.emit("split:progress", event);
    };
    run_split(&state, path, options, Some(emit)).await
}

/// Cancels a running split. Returns whether one was running.
#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn cancel_split(state: tauri::State<'_, AppState>, path: String) -> Result<bool, AppError> {
    Ok(request_cancel(&state, &path).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    use crate::error::ErrorKind;

    fn payload(json: &str) -> SplitOptionsPayload {
        serde_json::from_str(json).expect("payload should deserialize")
    }

    fn no_progress() -> Option<fn(SplitProgressEvent)> {
        None
    }

    #[test]
    fn test_canonical_payload() {
        let options = SplitOptions::try_from(payload(
            r#"{"linesPerFile": 10, "headerLines": 2, "overwrite": true}"#,
        ))
        .unwrap();
        assert_eq!(options.lines_per_file, 10);
        assert_eq!(options.header_lines, 2);
        assert!(options.overwrite);
    }

    #[test]
    fn test_canonical_payload_defaults() {
        let options = SplitOptions::try_from(payload(r#"{"linesPerFile": 3}"#)).unwrap();
        assert_eq!(options.header_lines, 0);
        assert!(!options.overwrite);
    }

    #[test]
    fn test_legacy_payload_with_header_flag() {
        let options =
            SplitOptions::try_from(payload(r#"{"numLines": 50, "withHeader": true}"#)).unwrap();
        assert_eq!(options.lines_per_file, 50);
        assert_eq!(options.header_lines, 1);

        let options =
            SplitOptions::try_from(payload(r#"{"numLines": 50, "withHeader": false}"#)).unwrap();
        assert_eq!(options.header_lines, 0);
    }

    #[test]
    fn test_legacy_payload_with_header_count() {
        let options = SplitOptions::try_from(payload(
            r#"{"numLines": 5, "withHeader": true, "numHeaderLines": 3}"#,
        ))
        .unwrap();
        assert_eq!(options.header_lines, 3);
    }

    #[test]
    fn test_negative_values_are_invalid_options() {
        let err = SplitOptions::try_from(payload(r#"{"linesPerFile": -1}"#)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);

        let err = SplitOptions::try_from(payload(r#"{"linesPerFile": 5, "headerLines": -2}"#))
            .unwrap_err();
        match err {
            AppError::InvalidOption { option, .. } => assert_eq!(option, "headerLines"),
            other => panic!("Expected InvalidOption, got {:?}", other),
        }
    }

    #[test]
    fn test_response_serializes_file_count() {
        let response = SplitCsvResponse {
            file_count: 3,
            data_records: 25,
            output_paths: vec!["/d/a_part1.csv".into()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fileCount"], 3);
        assert_eq!(json["dataRecords"], 25);
        assert_eq!(json["outputPaths"][0], "/d/a_part1.csv");
    }

    #[tokio::test]
    async fn test_run_split_end_to_end() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("people.csv");
        fs::write(&source, "id,name\n1,a\n2,b\n3,c\n").unwrap();

        let state = AppState::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let response = run_split(
            &state,
            source.display().to_string(),
            payload(r#"{"linesPerFile": 2, "headerLines": 1}"#),
            Some(move |event: SplitProgressEvent| sink.lock().unwrap().push(event)),
        )
        .await
        .unwrap();

        assert_eq!(response.file_count, 2);
        assert_eq!(response.data_records, 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("people_part2.csv")).unwrap(),
            "id,name\n3,c\n"
        );

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].files_written, 2);
        assert_eq!(events[1].path, source.display().to_string());

        // The registry entry is released after the split returns.
        assert!(!state.splits.is_running(&source));
    }

    #[tokio::test]
    async fn test_run_split_reports_option_error_before_path_error() {
        let state = AppState::new();
        let err = run_split(
            &state,
            "/missing/file.csv".into(),
            payload(r#"{"linesPerFile": 0}"#),
            no_progress(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
    }

    #[tokio::test]
    async fn test_run_split_missing_file_releases_registry() {
        let state = AppState::new();
        let err = run_split(
            &state,
            "/missing/file.csv".into(),
            payload(r#"{"linesPerFile": 1}"#),
            no_progress(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        assert!(!state.splits.is_running(&PathBuf::from("/missing/file.csv")));
    }

    #[tokio::test]
    async fn test_run_split_rejects_file_already_being_split() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("busy.csv");
        fs::write(&source, "1\n").unwrap();

        let state = AppState::new();
        let registration = state.splits.begin(&source).unwrap();

        let err = run_split(
            &state,
            source.display().to_string(),
            payload(r#"{"linesPerFile": 1}"#),
            no_progress(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRunning);
        assert!(request_cancel(&state, &source.display().to_string()).await);
        assert!(registration.token().is_cancelled());

        drop(registration);
        let response = run_split(
            &state,
            source.display().to_string(),
            payload(r#"{"linesPerFile": 1}"#),
            no_progress(),
        )
        .await
        .unwrap();
        assert_eq!(response.file_count, 1);
    }

    #[tokio::test]
    async fn test_request_cancel_without_running_split() {
        let state = AppState::new();
        assert!(!request_cancel(&state, "/tmp/idle.csv").await);
    }
}
