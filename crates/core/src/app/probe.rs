use crate::domain::{
    FetchOutcome, ProbeReport, ProbeStamp, RepositorySnapshot, Upstream,
};
use crate::error::CoreError;
use crate::ports::{Clock, GitPort};
use chrono::{DateTime, Local};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifies one repository per call. Holds no state between calls, so a
/// single instance is shared by every worker.
pub struct StatusProbe {
    git: Arc<dyn GitPort>,
    clock: Arc<dyn Clock>,
}

impl StatusProbe {
    pub fn new(git: Arc<dyn GitPort>, clock: Arc<dyn Clock>) -> Self {
        Self { git, clock }
    }

    /// Probe against locally known refs. Never fails: any git error becomes
    /// an `Error` snapshot.
    pub fn probe(&self, repo: &Path, stamp: ProbeStamp) -> RepositorySnapshot {
        let checked_at = self.clock.now();
        self.probe_at(repo, stamp, checked_at)
    }

    /// Update remote-tracking refs, then probe. A failed fetch is reported
    /// next to an otherwise normal local snapshot.
    pub fn fetch_and_probe(&self, repo: &Path, stamp: ProbeStamp) -> ProbeReport {
        let checked_at = self.clock.now();

        let outcome = match self.git.fetch(repo) {
            Ok(()) => {
                debug!("Fetched {}", repo.display());
                FetchOutcome::Fetched
            }
            Err(e) => {
                warn!("Fetch failed for {}: {:#}", repo.display(), e);
                FetchOutcome::Failed(format!("{:#}", e))
            }
        };

        ProbeReport::fetched(self.probe_at(repo, stamp, checked_at), outcome)
    }

    fn probe_at(&self, repo: &Path, stamp: ProbeStamp, checked_at: DateTime<Local>) -> RepositorySnapshot {
        match self.inspect(repo, stamp, checked_at) {
            Ok(snapshot) => snapshot,
            Err(source) => {
                let message = format!("{:#}", source);
                let err = CoreError::Probe {
                    path: repo.to_path_buf(),
                    source,
                };
                warn!("{}", err);
                RepositorySnapshot::failed(repo, message, checked_at, stamp)
            }
        }
    }

    fn inspect(
        &self,
        repo: &Path,
        stamp: ProbeStamp,
        checked_at: DateTime<Local>,
    ) -> anyhow::Result<RepositorySnapshot> {
        let head = self.git.head(repo)?;

        let upstream = match self.git.upstream(repo)? {
            Some(name) => {
                let sync = self.git.ahead_behind(repo, &name)?;
                Some(Upstream { name, sync })
            }
            None => None,
        };

        // Working tree state is independent of the upstream relation
        let worktree = self.git.worktree_counts(repo)?;
        let stash_count = self.git.stash_count(repo)?;

        Ok(RepositorySnapshot::observed(
            repo,
            head,
            upstream,
            worktree,
            stash_count,
            checked_at,
            stamp,
        ))
    }
}
