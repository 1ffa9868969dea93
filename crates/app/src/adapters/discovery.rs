use anyhow::{bail, Context, Result};
use gitpulse_core::error::CoreError;
use gitpulse_core::ports::{DiscoverReq, DiscoveryPort, ScanMode, ScanOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File system discovery adapter that implements DiscoveryPort
pub struct FsDiscoveryAdapter;

impl FsDiscoveryAdapter {
    pub fn new() -> Self {
        Self
    }

    /// A repository root holds a `.git` directory, or a `.git` file for
    /// worktrees and submodules
    fn is_repo_root(path: &Path) -> bool {
        path.join(".git").exists()
    }

    /// Find repository roots below `root`, at most `max_depth` levels deep
    fn find_repos(&self, root: &Path, req: &DiscoverReq) -> (Vec<PathBuf>, Vec<CoreError>) {
        let mut repositories = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped = Vec::new();

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(req.max_depth)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            // Skip .git directories and don't descend into them
            .filter_entry(|e| e.file_name() != ".git");

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable directories and symlink loops end up here
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    let err = CoreError::Scan {
                        path,
                        reason: err.to_string(),
                    };
                    warn!("Skipping during scan: {}", err);
                    skipped.push(err);
                    continue;
                }
            };

            if !entry.file_type().is_dir() || !Self::is_repo_root(entry.path()) {
                continue;
            }

            // Nested repositories belong to their parent's working tree
            walker.skip_current_dir();

            let name = entry.file_name().to_string_lossy();
            if req.ignore.contains(name.as_ref()) {
                debug!("Ignoring repository {}", entry.path().display());
                continue;
            }

            // A repository reached through a symlink is keyed by its real path
            let path = entry.path().canonicalize().unwrap_or_else(|_| entry.path().to_path_buf());
            if seen.insert(path.clone()) {
                repositories.push(path);
            } else {
                debug!("{} is already tracked as {}", entry.path().display(), path.display());
            }
        }

        (repositories, skipped)
    }

    /// Working tree root of the repository `path` lies inside, if any
    fn enclosing_repo(path: &Path) -> Option<PathBuf> {
        let repo = git2::Repository::discover(path).ok()?;
        repo.workdir().and_then(|dir| dir.canonicalize().ok())
    }
}

impl DiscoveryPort for FsDiscoveryAdapter {
    fn scan(&self, req: &DiscoverReq) -> Result<ScanOutcome> {
        let root = req
            .root
            .canonicalize()
            .with_context(|| format!("Cannot access {}", req.root.display()))?;
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        if Self::is_repo_root(&root) {
            info!("{} is a repository, watching it alone", root.display());
            return Ok(ScanOutcome {
                mode: ScanMode::Single,
                repos: vec![root],
                skipped: Vec::new(),
            });
        }

        let (repos, skipped) = self.find_repos(&root, req);
        info!(
            "Scan of {} (depth {}) found {} repositories, skipped {} entries",
            root.display(),
            req.max_depth,
            repos.len(),
            skipped.len()
        );

        if repos.is_empty() {
            if let Some(enclosing) = Self::enclosing_repo(&root) {
                info!("{} lies inside {}, watching that repository", root.display(), enclosing.display());
                return Ok(ScanOutcome {
                    mode: ScanMode::Single,
                    repos: vec![enclosing],
                    skipped,
                });
            }
        }

        Ok(ScanOutcome {
            mode: ScanMode::Multi,
            repos,
            skipped,
        })
    }
}

impl Default for FsDiscoveryAdapter {
    fn default() -> Self {
        Self::new()
    }
}
