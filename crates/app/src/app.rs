use crate::adapters::{
    discovery::FsDiscoveryAdapter, git::GitAdapter, launcher::ExternalGuiLauncher, persistence::FileConfigStore,
};
use crate::cli::CliArgs;
use crate::services::Scheduler;
use crate::tui::terminal::TerminalGuard;
use crate::tui::{TuiMessage, TuiModel, TuiUpdate, TuiView, ViewState};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use gitpulse_core::app::{Command, RepoRegistry, Scope, StatusProbe};
use gitpulse_core::domain::{display_name, PassKind};
use gitpulse_core::ports::{
    AppConfig, Clock, ConfigStore, DiscoverReq, DiscoveryPort, GitPort, LauncherPort, ScanOutcome, SystemClock,
};
use ratatui::{backend::Backend, Terminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound on how long the loop blocks waiting for input
const MAX_POLL: Duration = Duration::from_millis(250);
/// Poll interval while probes are running, so results show up promptly
const BUSY_POLL: Duration = Duration::from_millis(50);

/// The composition root: owns the registry, the scheduler and the UI state
/// and runs the single coordinating loop.
pub struct GitPulseApp {
    config: AppConfig,
    root: PathBuf,
    discovery: Arc<dyn DiscoveryPort>,
    launcher: Arc<dyn LauncherPort>,
    registry: RepoRegistry,
    scheduler: Scheduler,
    model: TuiModel,
}

impl GitPulseApp {
    /// Load configuration, resolve the root and wire the real adapters
    pub fn from_cli(args: CliArgs) -> Result<Self> {
        let store = match &args.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new()?,
        };
        let mut config = store.load()?;
        if let Some(depth) = args.depth {
            config.scan_depth = depth;
        }
        info!("Using config {} (scan depth {})", store.path().display(), config.scan_depth);

        let root = match args.path {
            Some(path) => path,
            None => std::env::current_dir().context("Cannot determine the current directory")?,
        };

        let git: Arc<dyn GitPort> = Arc::new(GitAdapter::new(config.fetch_timeout));
        let discovery: Arc<dyn DiscoveryPort> = Arc::new(FsDiscoveryAdapter::new());
        let launcher: Arc<dyn LauncherPort> = Arc::new(ExternalGuiLauncher::new(&config.gui_command));

        Self::with_ports(config, root, git, discovery, launcher, Arc::new(SystemClock))
    }

    /// Scan the root, track what was found and start the first local pass
    pub fn with_ports(
        config: AppConfig,
        root: PathBuf,
        git: Arc<dyn GitPort>,
        discovery: Arc<dyn DiscoveryPort>,
        launcher: Arc<dyn LauncherPort>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let outcome = discovery.scan(&discover_request(&config, &root))?;
        let root = root.canonicalize().unwrap_or(root);

        let mut registry = RepoRegistry::new();
        registry.track(outcome.repos.iter().cloned());

        let now = Instant::now();
        let probe = Arc::new(StatusProbe::new(git, clock));
        let mut scheduler = Scheduler::new(probe, &config, now)?;
        scheduler.dispatch_paths(PassKind::Local, &outcome.repos);

        let mut model = TuiModel::new(root.clone(), outcome.mode, &registry);
        model.busy = scheduler.in_flight();
        if !outcome.skipped.is_empty() {
            model.set_error(skipped_message(&outcome), now);
        }

        info!("Watching {} repositories under {}", registry.tracked_count(), root.display());

        Ok(Self {
            config,
            root,
            discovery,
            launcher,
            registry,
            scheduler,
            model,
        })
    }

    pub fn registry(&self) -> &RepoRegistry {
        &self.registry
    }

    pub fn model(&self) -> &TuiModel {
        &self.model
    }

    /// No probe is running
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Block up to `timeout` for one probe result and apply it
    pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
        let received = self.scheduler.wait_one(&mut self.registry, timeout);
        if received {
            self.after_results();
        }
        received
    }

    /// Take over the terminal and run until Quit
    pub fn run(mut self) -> Result<()> {
        let mut guard = TerminalGuard::enter()?;
        let terminal = guard.terminal();

        let mut needs_redraw = true;
        while !self.model.should_quit() {
            let now = Instant::now();
            if self.pump(now) {
                needs_redraw = true;
            }

            if needs_redraw {
                self.draw(terminal)?;
                needs_redraw = false;
            }

            if event::poll(self.poll_timeout(now))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key.code, key.modifiers, Instant::now());
                        needs_redraw = true;
                    }
                    Event::Resize(_, _) => needs_redraw = true,
                    _ => {}
                }
            }
        }

        info!("Quit requested, leaving the terminal");
        Ok(())
    }

    /// Map a key press through the update function and execute the result
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers, now: Instant) {
        match TuiUpdate::handle_key(&mut self.model, &self.registry, key, modifiers) {
            TuiMessage::Command(cmd) => self.execute(cmd, now),
            TuiMessage::None => {}
        }
    }

    /// Apply finished probes, fire due timers and expire the status message.
    /// Returns whether anything visible changed.
    pub fn pump(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if self.scheduler.drain(&mut self.registry) > 0 {
            self.after_results();
            changed = true;
        }

        let fired = self.scheduler.tick(&self.registry, now);
        if !fired.is_empty() {
            self.model.busy = self.scheduler.in_flight();
            changed = true;
        }

        changed |= self.model.expire_flash(now);
        changed
    }

    pub fn execute(&mut self, cmd: Command, now: Instant) {
        info!("Executing {:?}", cmd);
        match cmd {
            Command::Refresh { scope } => {
                let count = self.scheduler.request(PassKind::Local, &scope, &self.registry, now);
                self.model.set_flash(pass_message("Refreshing", &scope, count), now);
            }
            Command::Fetch { scope } => {
                let count = self.scheduler.request(PassKind::Fetch, &scope, &self.registry, now);
                self.model.set_flash(pass_message("Fetching", &scope, count), now);
            }
            Command::Rescan => self.rescan(now),
            Command::OpenExternal { path } => match self.launcher.open(&path) {
                Ok(()) => self
                    .model
                    .set_flash(format!("Opened {} in {}", path.display(), self.config.gui_command), now),
                Err(e) => {
                    warn!("{:#}", e);
                    self.model.set_error(format!("{:#}", e), now);
                }
            },
            Command::Quit => self.model.state = ViewState::Quit,
        }
        self.model.busy = self.scheduler.in_flight();
    }

    /// Walk the root again. New repositories get a local probe; results for
    /// removed ones are dropped as they arrive.
    fn rescan(&mut self, now: Instant) {
        let outcome = match self.discovery.scan(&discover_request(&self.config, &self.root)) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Re-scan failed: {:#}", e);
                self.model.set_error(format!("Re-scan failed: {:#}", e), now);
                return;
            }
        };

        let change = self.registry.track(outcome.repos);
        self.scheduler.dispatch_paths(PassKind::Local, &change.added);
        if outcome.mode != self.model.mode {
            info!("Re-scan switched to {:?} mode", outcome.mode);
        }
        self.model.set_mode(outcome.mode, &self.registry);

        info!("Re-scan: {} added, {} removed", change.added.len(), change.removed.len());
        self.model.set_flash(
            format!(
                "Re-scan: {} repositories, {} added, {} removed",
                self.registry.tracked_count(),
                change.added.len(),
                change.removed.len()
            ),
            now,
        );
    }

    pub fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal
            .draw(|frame| TuiView::render(&self.model, &self.registry, frame))
            .context("Failed to draw")?;
        Ok(())
    }

    fn after_results(&mut self) {
        self.model.busy = self.scheduler.in_flight();
        self.model.sync_selection(&self.registry);
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        let ceiling = if self.scheduler.is_idle() { MAX_POLL } else { BUSY_POLL };
        self.scheduler
            .next_wakeup(now)
            .map_or(ceiling, |wakeup| wakeup.min(ceiling))
    }
}

fn discover_request(config: &AppConfig, root: &Path) -> DiscoverReq {
    DiscoverReq {
        root: root.to_path_buf(),
        max_depth: config.scan_depth,
        ignore: config.ignore_repos.clone(),
    }
}

fn pass_message(verb: &str, scope: &Scope, count: usize) -> String {
    match scope {
        Scope::One(path) if count == 0 => format!("{} is already being checked", display_name(path)),
        Scope::One(path) => format!("{} {}…", verb, display_name(path)),
        Scope::All => format!("{} {} repositories…", verb, count),
    }
}

fn skipped_message(outcome: &ScanOutcome) -> String {
    match outcome.skipped.first() {
        Some(first) if outcome.skipped.len() == 1 => format!("Skipped: {}", first),
        Some(first) => format!("Skipped {} entries, first: {}", outcome.skipped.len(), first),
        None => String::new(),
    }
}
