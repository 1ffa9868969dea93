use anyhow::Result;
use std::path::Path;

/// Port for handing a repository to an external GUI git client
pub trait LauncherPort: Send + Sync {
    /// Start the client for `repo` and return without waiting for it
    fn open(&self, repo: &Path) -> Result<()>;
}
