use anyhow::{Context, Result};
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use gitpulse_core::app::{RepoRegistry, Scope, StatusProbe};
use gitpulse_core::domain::{PassKind, ProbeReport, ProbeStamp, RepositorySnapshot};
use gitpulse_core::ports::AppConfig;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Probe worker threads are named `gitpulse-probe-<n>`
pub const WORKER_THREAD_PREFIX: &str = "gitpulse-probe";

/// One periodic pass. A zero interval disables it.
#[derive(Debug, Clone)]
pub struct PassTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PassTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        let mut timer = Self {
            interval,
            next_due: None,
        };
        timer.reset(now);
        timer
    }

    pub fn is_enabled(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Restart the countdown from `now`
    pub fn reset(&mut self, now: Instant) {
        self.next_due = (!self.interval.is_zero()).then(|| now + self.interval);
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}

/// Runs probes off the UI thread and feeds their results back into the
/// registry.
///
/// Owns the local refresh and fetch timers. Work goes to a rayon pool of
/// `probe_workers` threads and comes back over a crossbeam channel that the
/// coordinating loop drains. At most one probe per path is outstanding.
pub struct Scheduler {
    probe: Arc<StatusProbe>,
    pool: ThreadPool,
    results_tx: Sender<ProbeReport>,
    results_rx: Receiver<ProbeReport>,
    in_flight: HashMap<PathBuf, PassKind>,
    /// Fetches requested while a local probe held the path
    queued_fetch: HashSet<PathBuf>,
    last_stamp: ProbeStamp,
    local_timer: PassTimer,
    fetch_timer: PassTimer,
}

impl Scheduler {
    pub fn new(probe: Arc<StatusProbe>, config: &AppConfig, now: Instant) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.probe_workers)
            .thread_name(|i| format!("{}-{}", WORKER_THREAD_PREFIX, i))
            .build()
            .context("Failed to start probe workers")?;

        let (results_tx, results_rx) = unbounded();

        info!(
            "Scheduler started: {} workers, refresh every {}s, fetch every {}s",
            config.probe_workers,
            config.auto_refresh.as_secs(),
            config.auto_fetch.as_secs()
        );

        Ok(Self {
            probe,
            pool,
            results_tx,
            results_rx,
            in_flight: HashMap::new(),
            queued_fetch: HashSet::new(),
            last_stamp: ProbeStamp::default(),
            local_timer: PassTimer::new(config.auto_refresh, now),
            fetch_timer: PassTimer::new(config.auto_fetch, now),
        })
    }

    /// Manual pass. An all-repository pass restarts the timer of the same
    /// kind; a single-repository pass leaves the timers alone. Returns how
    /// many probes were dispatched.
    pub fn request(&mut self, kind: PassKind, scope: &Scope, registry: &RepoRegistry, now: Instant) -> usize {
        if matches!(scope, Scope::All) {
            match kind {
                PassKind::Local => self.local_timer.reset(now),
                PassKind::Fetch => self.fetch_timer.reset(now),
            }
        }

        let paths = match scope {
            Scope::All => tracked_paths(registry),
            Scope::One(path) if registry.is_tracked(path) => vec![path.clone()],
            Scope::One(path) => {
                debug!("Ignoring {} request for untracked {}", kind, path.display());
                Vec::new()
            }
        };

        self.dispatch_paths(kind, &paths)
    }

    /// Dispatch without touching the timers (initial pass, re-scan additions)
    pub fn dispatch_paths(&mut self, kind: PassKind, paths: &[PathBuf]) -> usize {
        let mut dispatched = 0;
        for path in paths {
            match self.in_flight.get(path) {
                None => {
                    self.dispatch(kind, path.clone());
                    dispatched += 1;
                }
                Some(PassKind::Local) if kind == PassKind::Fetch => {
                    debug!("Queueing fetch for {} behind running refresh", path.display());
                    self.queued_fetch.insert(path.clone());
                }
                Some(running) => {
                    debug!("Dropping {} for {}, {} already running", kind, path.display(), running);
                }
            }
        }
        dispatched
    }

    /// Fire whichever timers are due. Fetch goes first so a simultaneous local
    /// pass finds those paths busy and leaves them to the fetch.
    pub fn tick(&mut self, registry: &RepoRegistry, now: Instant) -> Vec<PassKind> {
        let mut fired = Vec::new();

        if self.fetch_timer.is_due(now) {
            self.fetch_timer.reset(now);
            let count = self.dispatch_paths(PassKind::Fetch, &tracked_paths(registry));
            debug!("Auto-fetch dispatched {} probes", count);
            fired.push(PassKind::Fetch);
        }

        if self.local_timer.is_due(now) {
            self.local_timer.reset(now);
            let count = self.dispatch_paths(PassKind::Local, &tracked_paths(registry));
            debug!("Auto-refresh dispatched {} probes", count);
            fired.push(PassKind::Local);
        }

        fired
    }

    /// Apply every finished probe without blocking. Returns how many reports
    /// came in.
    pub fn drain(&mut self, registry: &mut RepoRegistry) -> usize {
        let mut received = 0;
        while let Ok(report) = self.results_rx.try_recv() {
            self.complete(registry, report);
            received += 1;
        }
        received
    }

    /// Block up to `timeout` for one finished probe
    pub fn wait_one(&mut self, registry: &mut RepoRegistry, timeout: Duration) -> bool {
        match self.results_rx.recv_timeout(timeout) {
            Ok(report) => {
                self.complete(registry, report);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// How long the input loop may block before a timer is due
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        match (self.local_timer.remaining(now), self.fetch_timer.remaining(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_busy(&self, path: &Path) -> bool {
        self.in_flight.contains_key(path)
    }

    fn dispatch(&mut self, kind: PassKind, path: PathBuf) {
        let stamp = self.last_stamp.next();
        self.last_stamp = stamp;
        self.in_flight.insert(path.clone(), kind);

        let probe = Arc::clone(&self.probe);
        let tx = self.results_tx.clone();
        self.pool.spawn(move || {
            let report = run_probe(&probe, kind, &path, stamp);
            // The receiver is gone only once the app is shutting down
            let _ = tx.send(report);
        });
    }

    fn complete(&mut self, registry: &mut RepoRegistry, report: ProbeReport) {
        let path = report.snapshot.path.clone();
        self.in_flight.remove(&path);

        if !registry.is_tracked(&path) {
            debug!("Dropping result for untracked {}", path.display());
            self.queued_fetch.remove(&path);
            return;
        }

        registry.apply_report(report);

        if self.queued_fetch.remove(&path) {
            self.dispatch(PassKind::Fetch, path);
        }
    }
}

fn tracked_paths(registry: &RepoRegistry) -> Vec<PathBuf> {
    registry.tracked().map(Path::to_path_buf).collect()
}

/// Run one probe on a worker. A panic becomes an error snapshot so the path
/// is released.
fn run_probe(probe: &StatusProbe, kind: PassKind, path: &Path, stamp: ProbeStamp) -> ProbeReport {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
        PassKind::Local => ProbeReport::local(probe.probe(path, stamp)),
        PassKind::Fetch => probe.fetch_and_probe(path, stamp),
    }));

    outcome.unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!("Probe of {} panicked: {}", path.display(), message);
        ProbeReport::local(RepositorySnapshot::failed(
            path,
            format!("probe panicked: {}", message),
            Local::now(),
            stamp,
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
