use crate::error::CoreError;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Request for repository discovery
#[derive(Clone, Debug)]
pub struct DiscoverReq {
    pub root: PathBuf,
    /// Directory levels below `root` to look at
    pub max_depth: usize,
    /// Repository basenames to leave out
    pub ignore: BTreeSet<String>,
}

/// Whether the scan collapsed onto a single repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// The root is (or lies inside) one repository
    Single,
    /// The root is a directory of repositories
    Multi,
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub mode: ScanMode,
    pub repos: Vec<PathBuf>,
    /// Entries that could not be read; never fatal
    pub skipped: Vec<CoreError>,
}

/// Port for repository discovery
pub trait DiscoveryPort: Send + Sync {
    /// Scan for repositories under the requested root.
    /// This is blocking. Fails only when the root itself is unusable.
    fn scan(&self, req: &DiscoverReq) -> Result<ScanOutcome>;
}
