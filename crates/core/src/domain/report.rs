use super::repo::RepositorySnapshot;
use chrono::{DateTime, Local};
use std::fmt;

/// Kind of background sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Probe against locally known refs only
    Local,
    /// Update remote-tracking refs, then probe
    Fetch,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Local => f.write_str("refresh"),
            PassKind::Fetch => f.write_str("fetch"),
        }
    }
}

/// Result of the network step of a fetch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    Failed(String),
}

/// Last known fetch result for a repository
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchState {
    #[default]
    NotFetched,
    Succeeded { at: DateTime<Local> },
    Failed { at: DateTime<Local>, message: String },
}

impl FetchState {
    pub fn from_outcome(outcome: &FetchOutcome, at: DateTime<Local>) -> Self {
        match outcome {
            FetchOutcome::Fetched => FetchState::Succeeded { at },
            FetchOutcome::Failed(message) => FetchState::Failed {
                at,
                message: message.clone(),
            },
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// What a worker sends back when one probe finishes
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub snapshot: RepositorySnapshot,
    pub pass: PassKind,
    /// Present only for fetch passes
    pub fetch: Option<FetchOutcome>,
}

impl ProbeReport {
    pub fn local(snapshot: RepositorySnapshot) -> Self {
        Self {
            snapshot,
            pass: PassKind::Local,
            fetch: None,
        }
    }

    pub fn fetched(snapshot: RepositorySnapshot, outcome: FetchOutcome) -> Self {
        Self {
            snapshot,
            pass: PassKind::Fetch,
            fetch: Some(outcome),
        }
    }
}
