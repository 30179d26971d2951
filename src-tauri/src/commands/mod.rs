//! Tauri command handlers.
//!
//! This module contains all commands exposed to the frontend via Tauri's IPC.

pub mod split;

pub use split::*;
