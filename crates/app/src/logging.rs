use directories::ProjectDirs;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "gitpulse.log";

/// Route tracing output to a file so it never draws over the TUI.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Returns the log
/// file path, or `None` when no file could be opened and output is discarded.
pub fn init_logging() -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match open_log_file() {
        Ok((path, file)) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
            None
        }
    }
}

fn open_log_file() -> io::Result<(PathBuf, File)> {
    let dirs = ProjectDirs::from("", "", "gitpulse")
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
    let dir = dirs.cache_dir();
    fs::create_dir_all(dir)?;

    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}
