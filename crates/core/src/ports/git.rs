use crate::domain::repo::{AheadBehind, Head, WorktreeCounts};
use anyhow::Result;
use std::path::Path;

/// Port for the git queries a probe needs
///
/// Every method is blocking and addresses a repository by its working tree
/// root. Callers run these off the input thread.
pub trait GitPort: Send + Sync {
    /// Current branch, unborn branch or detached commit
    fn head(&self, repo: &Path) -> Result<Head>;

    /// Short name of the upstream ref (e.g. `origin/main`), `None` when the
    /// branch tracks nothing
    fn upstream(&self, repo: &Path) -> Result<Option<String>>;

    /// Commit counts of HEAD relative to the given upstream
    fn ahead_behind(&self, repo: &Path, upstream: &str) -> Result<AheadBehind>;

    /// Modified (staged or unstaged) and untracked file counts
    fn worktree_counts(&self, repo: &Path) -> Result<WorktreeCounts>;

    /// Number of stash entries
    fn stash_count(&self, repo: &Path) -> Result<usize>;

    /// Update remote-tracking refs. The only network operation.
    fn fetch(&self, repo: &Path) -> Result<()>;
}
