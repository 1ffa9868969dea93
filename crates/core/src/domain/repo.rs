use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};

/// Sequence number of one probe dispatch.
///
/// Issued by the scheduler in dispatch order, so a higher stamp always belongs
/// to a probe that started later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeStamp(pub u64);

impl ProbeStamp {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// What HEAD points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// On a local branch
    Branch(String),
    /// On a branch with no commits yet
    Unborn(String),
    /// Detached at a commit (short id)
    Detached(String),
    /// HEAD could not be read (error snapshots)
    Unknown,
}

impl Head {
    /// Current branch name, empty when unborn, detached or unknown.
    /// The unborn name is still shown through `Display`.
    pub fn branch(&self) -> &str {
        match self {
            Head::Branch(name) => name,
            Head::Unborn(_) | Head::Detached(_) | Head::Unknown => "",
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Branch(name) => write!(f, "{}", name),
            Head::Unborn(name) => write!(f, "{} (no commits yet)", name),
            Head::Detached(id) => write!(f, "(detached @ {})", id),
            Head::Unknown => write!(f, "(unknown)"),
        }
    }
}

/// Ahead/behind counts relative to the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: usize,
    pub behind: usize,
}

/// The tracking ref and how far HEAD has drifted from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub sync: AheadBehind,
}

/// Working tree change counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorktreeCounts {
    pub modified: usize,
    pub untracked: usize,
}

impl WorktreeCounts {
    pub fn is_dirty(&self) -> bool {
        self.modified > 0 || self.untracked > 0
    }
}

/// Normalized repository status, in precedence order (most urgent first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusClass {
    Error,
    Dirty,
    Diverged,
    Ahead,
    Behind,
    NoUpstream,
    Clean,
}

impl StatusClass {
    pub const ALL: [StatusClass; 7] = [
        StatusClass::Error,
        StatusClass::Dirty,
        StatusClass::Diverged,
        StatusClass::Ahead,
        StatusClass::Behind,
        StatusClass::NoUpstream,
        StatusClass::Clean,
    ];

    /// Classify from raw probe facts. Highest precedence wins:
    /// Error > Dirty > Diverged > Ahead > Behind > NoUpstream > Clean.
    pub fn classify(sync: Option<AheadBehind>, worktree: WorktreeCounts, errored: bool) -> Self {
        if errored {
            return StatusClass::Error;
        }
        if worktree.is_dirty() {
            return StatusClass::Dirty;
        }
        match sync {
            Some(AheadBehind { ahead, behind }) if ahead > 0 && behind > 0 => StatusClass::Diverged,
            Some(AheadBehind { ahead, .. }) if ahead > 0 => StatusClass::Ahead,
            Some(AheadBehind { behind, .. }) if behind > 0 => StatusClass::Behind,
            Some(_) => StatusClass::Clean,
            None => StatusClass::NoUpstream,
        }
    }

    /// Sort key, lower is more urgent
    pub fn urgency(self) -> u8 {
        match self {
            StatusClass::Error => 0,
            StatusClass::Dirty => 1,
            StatusClass::Diverged => 2,
            StatusClass::Ahead => 3,
            StatusClass::Behind => 4,
            StatusClass::NoUpstream => 5,
            StatusClass::Clean => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusClass::Error => "error",
            StatusClass::Dirty => "dirty",
            StatusClass::Diverged => "diverged",
            StatusClass::Ahead => "ahead",
            StatusClass::Behind => "behind",
            StatusClass::NoUpstream => "no upstream",
            StatusClass::Clean => "clean",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One probe's view of a repository. Rebuilt wholesale on every probe.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositorySnapshot {
    pub path: PathBuf,
    pub name: String,
    pub head: Head,
    pub upstream: Option<Upstream>,
    pub worktree: WorktreeCounts,
    pub stash_count: usize,
    pub checked_at: DateTime<Local>,
    pub stamp: ProbeStamp,
    pub error: Option<String>,
}

impl RepositorySnapshot {
    /// Snapshot of a successful probe
    pub fn observed(
        path: &Path,
        head: Head,
        upstream: Option<Upstream>,
        worktree: WorktreeCounts,
        stash_count: usize,
        checked_at: DateTime<Local>,
        stamp: ProbeStamp,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            name: display_name(path),
            head,
            upstream,
            worktree,
            stash_count,
            checked_at,
            stamp,
            error: None,
        }
    }

    /// Snapshot of a failed probe; all counts are zero
    pub fn failed(
        path: &Path,
        message: impl Into<String>,
        checked_at: DateTime<Local>,
        stamp: ProbeStamp,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            name: display_name(path),
            head: Head::Unknown,
            upstream: None,
            worktree: WorktreeCounts::default(),
            stash_count: 0,
            checked_at,
            stamp,
            error: Some(message.into()),
        }
    }

    pub fn status_class(&self) -> StatusClass {
        StatusClass::classify(
            self.upstream.as_ref().map(|u| u.sync),
            self.worktree,
            self.error.is_some(),
        )
    }

    pub fn branch(&self) -> &str {
        self.head.branch()
    }

    pub fn ahead(&self) -> Option<usize> {
        self.upstream.as_ref().map(|u| u.sync.ahead)
    }

    pub fn behind(&self) -> Option<usize> {
        self.upstream.as_ref().map(|u| u.sync.behind)
    }

    /// Freshness key for the stale-result guard
    pub fn freshness(&self) -> (ProbeStamp, DateTime<Local>) {
        (self.stamp, self.checked_at)
    }
}

impl fmt::Display for RepositorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.path.display(), self.status_class())
    }
}

/// Directory basename, or the whole path when there is none (e.g. `/`)
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
