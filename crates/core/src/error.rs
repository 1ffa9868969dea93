use std::path::PathBuf;
use thiserror::Error;

/// Core error taxonomy
///
/// Only `Config` and `Render` are fatal. `Scan` and `Probe` are isolated to a
/// single directory or repository, `Launch` becomes a transient UI message.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cannot read {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    #[error("Git query failed for {path}: {source}")]
    Probe { path: PathBuf, source: anyhow::Error },

    #[error("Invalid configuration in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Terminal error: {reason}")]
    Render { reason: String },

    #[error("Could not open {path} in external app: {reason}")]
    Launch { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
