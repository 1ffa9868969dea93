use std::path::PathBuf;

/// Which repositories a pass covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every tracked repository
    All,
    /// A single repository (detail view)
    One(PathBuf),
}

/// Commands the UI hands to the coordinating loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Probe without touching the network
    Refresh { scope: Scope },

    /// Fetch, then probe
    Fetch { scope: Scope },

    /// Walk the root again and pick up added or removed repositories
    Rescan,

    /// Open a repository in the external GUI client
    OpenExternal { path: PathBuf },

    /// Quit the application
    Quit,
}
