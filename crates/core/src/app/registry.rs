use crate::domain::{FetchState, ProbeReport, RepositorySnapshot, StatusClass};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A snapshot plus what the registry derives around it
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub snapshot: RepositorySnapshot,
    /// Position in the sorted view, 0 is the most urgent
    pub rank: usize,
    /// Last fetch result; local refreshes leave it alone
    pub fetch: FetchState,
}

/// Paths that entered or left the tracked set on a re-scan
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TrackChange {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Current snapshot per repository and the urgency-sorted view over them.
///
/// Owned by the coordinating loop: the scheduler writes through `&mut`, the
/// view reads through `&`.
#[derive(Debug, Default)]
pub struct RepoRegistry {
    tracked: BTreeSet<PathBuf>,
    entries: HashMap<PathBuf, RegistryEntry>,
    order: Vec<PathBuf>,
}

impl RepoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tracked path set. Entries whose path is no longer tracked
    /// are dropped.
    pub fn track<I>(&mut self, paths: I) -> TrackChange
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let next: BTreeSet<PathBuf> = paths.into_iter().collect();

        let change = TrackChange {
            added: next.difference(&self.tracked).cloned().collect(),
            removed: self.tracked.difference(&next).cloned().collect(),
        };

        for path in &change.removed {
            self.entries.remove(path);
        }
        self.tracked = next;
        self.rerank();

        change
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.tracked.contains(path)
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Path> {
        self.tracked.iter().map(PathBuf::as_path)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Tracked paths whose first probe has not come back yet
    pub fn pending(&self) -> Vec<&Path> {
        self.tracked
            .iter()
            .filter(|path| !self.entries.contains_key(*path))
            .map(PathBuf::as_path)
            .collect()
    }

    /// Store a snapshot unless a fresher one for the same path is already
    /// stored. Returns whether the registry changed.
    pub fn apply_probe_result(&mut self, snapshot: RepositorySnapshot) -> bool {
        match self.entries.get_mut(&snapshot.path) {
            Some(entry) => {
                if snapshot.freshness() < entry.snapshot.freshness() {
                    debug!(
                        "Discarding stale result for {} (stamp {} < {})",
                        snapshot.path.display(),
                        snapshot.stamp.0,
                        entry.snapshot.stamp.0
                    );
                    return false;
                }
                entry.snapshot = snapshot;
            }
            None => {
                self.tracked.insert(snapshot.path.clone());
                self.entries.insert(
                    snapshot.path.clone(),
                    RegistryEntry {
                        snapshot,
                        rank: 0,
                        fetch: FetchState::NotFetched,
                    },
                );
            }
        }

        self.rerank();
        true
    }

    /// Apply a worker report: the snapshot, and the fetch marker for fetch
    /// passes. Both are skipped when the report is stale.
    pub fn apply_report(&mut self, report: ProbeReport) -> bool {
        let ProbeReport { snapshot, fetch, .. } = report;
        let path = snapshot.path.clone();
        let at = snapshot.checked_at;

        if !self.apply_probe_result(snapshot) {
            return false;
        }

        if let (Some(outcome), Some(entry)) = (fetch, self.entries.get_mut(&path)) {
            entry.fetch = FetchState::from_outcome(&outcome, at);
        }
        true
    }

    pub fn get(&self, path: &Path) -> Option<&RegistryEntry> {
        self.entries.get(path)
    }

    /// Entries ordered by urgency, then case-insensitive name, then path
    pub fn sorted_view(&self) -> Vec<&RegistryEntry> {
        self.order
            .iter()
            .filter_map(|path| self.entries.get(path))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of repositories per status class
    pub fn summary(&self) -> BTreeMap<StatusClass, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.snapshot.status_class()).or_insert(0) += 1;
        }
        counts
    }

    fn rerank(&mut self) {
        let mut keyed: Vec<_> = self
            .entries
            .values()
            .map(|entry| {
                let snapshot = &entry.snapshot;
                (
                    snapshot.status_class().urgency(),
                    snapshot.name.to_lowercase(),
                    snapshot.path.clone(),
                )
            })
            .collect();
        keyed.sort();

        self.order = keyed.into_iter().map(|(_, _, path)| path).collect();
        for (rank, path) in self.order.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(path) {
                entry.rank = rank;
            }
        }
    }
}
