pub mod commands;
pub mod error;
pub mod state;
pub mod streaming;
pub mod validation;

use tracing_subscriber::EnvFilter;

pub use error::{AppError, ErrorKind};
pub use streaming::{split_file, split_file_with_progress, SplitProgress, SplitReport};
pub use validation::{SplitOptions, SplitRequest};

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`. Returns false if a subscriber was
/// already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

// ── Tauri app ─────────────────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use crate::commands::{cancel_split, split_csv};
    use crate::state::AppState;

    init_tracing();

    tauri::Builder::default()
        .manage(AppState::new())
        .invoke_handler(tauri::generate_handler![split_csv, cancel_split])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        assert!(!init_tracing());
    }
}
