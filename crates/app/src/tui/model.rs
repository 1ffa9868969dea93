use gitpulse_core::app::{RegistryEntry, RepoRegistry};
use gitpulse_core::ports::ScanMode;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a transient message stays in the status line
pub const FLASH_DURATION: Duration = Duration::from_secs(4);

/// Which screen is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Urgency-sorted table of every tracked repository
    List,
    /// One repository in full
    Detail { path: PathBuf },
    Quit,
}

/// Transient status line message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub text: String,
    pub is_error: bool,
    pub expires: Instant,
}

/// One line of the list: a probed repository, or one still waiting for its
/// first probe
#[derive(Debug, Clone, Copy)]
pub enum Row<'a> {
    Probed(&'a RegistryEntry),
    Pending(&'a Path),
}

impl<'a> Row<'a> {
    pub fn path(&self) -> &'a Path {
        match self {
            Row::Probed(entry) => &entry.snapshot.path,
            Row::Pending(path) => path,
        }
    }
}

/// The TUI Model. Holds only UI state; repository data lives in the registry
/// and is read at render time.
#[derive(Debug)]
pub struct TuiModel {
    pub state: ViewState,

    /// Canonical scan root, shown in the title bar
    pub root: PathBuf,

    pub mode: ScanMode,

    /// Selection follows a path, not a row index, so it survives re-sorts
    pub selected: Option<PathBuf>,

    pub flash: Option<Flash>,

    /// Probes currently running
    pub busy: usize,

    pub show_help: bool,
}

impl TuiModel {
    /// Start in Detail when the scan collapsed onto one repository
    pub fn new(root: PathBuf, mode: ScanMode, registry: &RepoRegistry) -> Self {
        let state = match (mode, registry.tracked().next()) {
            (ScanMode::Single, Some(path)) => ViewState::Detail {
                path: path.to_path_buf(),
            },
            _ => ViewState::List,
        };

        let mut model = Self {
            state,
            root,
            mode,
            selected: None,
            flash: None,
            busy: 0,
            show_help: false,
        };
        model.sync_selection(registry);
        model
    }

    pub fn should_quit(&self) -> bool {
        self.state == ViewState::Quit
    }

    pub fn single_repo(&self) -> bool {
        self.mode == ScanMode::Single
    }

    /// Rows in display order: probed repositories by urgency, then the ones
    /// still pending
    pub fn rows<'a>(&self, registry: &'a RepoRegistry) -> Vec<Row<'a>> {
        let mut rows: Vec<Row<'a>> = registry.sorted_view().into_iter().map(Row::Probed).collect();
        rows.extend(registry.pending().into_iter().map(Row::Pending));
        rows
    }

    pub fn selected_index(&self, registry: &RepoRegistry) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        self.rows(registry).iter().position(|row| row.path() == selected)
    }

    /// Move by `delta` rows, clamped to the list bounds
    pub fn move_selection(&mut self, registry: &RepoRegistry, delta: isize) {
        let rows = self.rows(registry);
        if rows.is_empty() {
            self.selected = None;
            return;
        }

        let current = self.selected_index(registry).unwrap_or(0) as isize;
        let last = rows.len() as isize - 1;
        let next = (current + delta).clamp(0, last) as usize;
        self.selected = Some(rows[next].path().to_path_buf());
    }

    pub fn select_first(&mut self, registry: &RepoRegistry) {
        self.selected = self.rows(registry).first().map(|row| row.path().to_path_buf());
    }

    pub fn select_last(&mut self, registry: &RepoRegistry) {
        self.selected = self.rows(registry).last().map(|row| row.path().to_path_buf());
    }

    /// Re-anchor after the tracked set changed. A vanished selection falls
    /// back to the first row; a vanished detail repository returns to List.
    pub fn sync_selection(&mut self, registry: &RepoRegistry) {
        if let ViewState::Detail { path } = &self.state {
            if !registry.is_tracked(path) {
                self.state = ViewState::List;
            }
        }

        let still_there = self
            .selected
            .as_deref()
            .is_some_and(|path| registry.is_tracked(path));
        if !still_there {
            self.select_first(registry);
        }
    }

    /// Adopt the mode of a fresh scan. Switching to Single opens the one
    /// repository in Detail, as at startup.
    pub fn set_mode(&mut self, mode: ScanMode, registry: &RepoRegistry) {
        self.mode = mode;
        if mode == ScanMode::Single && !self.should_quit() {
            if let Some(path) = registry.tracked().next() {
                self.state = ViewState::Detail {
                    path: path.to_path_buf(),
                };
            }
        }
        self.sync_selection(registry);
    }

    pub fn set_flash(&mut self, text: impl Into<String>, now: Instant) {
        self.flash = Some(Flash {
            text: text.into(),
            is_error: false,
            expires: now + FLASH_DURATION,
        });
    }

    pub fn set_error(&mut self, text: impl Into<String>, now: Instant) {
        self.flash = Some(Flash {
            text: text.into(),
            is_error: true,
            expires: now + FLASH_DURATION,
        });
    }

    /// Drop an expired message. Returns whether one was dropped.
    pub fn expire_flash(&mut self, now: Instant) -> bool {
        if self.flash.as_ref().is_some_and(|flash| now >= flash.expires) {
            self.flash = None;
            return true;
        }
        false
    }
}
