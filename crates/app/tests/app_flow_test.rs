//! End-to-end flow through the coordinating app with real git and discovery
//! adapters and a recording launcher.

use anyhow::{anyhow, Result};
use crossterm::event::{KeyCode, KeyModifiers};
use gitpulse::adapters::discovery::FsDiscoveryAdapter;
use gitpulse::adapters::git::GitAdapter;
use gitpulse::app::GitPulseApp;
use gitpulse::tui::ViewState;
use gitpulse_core::domain::StatusClass;
use gitpulse_core::ports::{AppConfig, LauncherPort, SystemClock};
use ratatui::{backend::TestBackend, Terminal};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingLauncher {
    opened: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl LauncherPort for RecordingLauncher {
    fn open(&self, repo: &Path) -> Result<()> {
        if self.fail {
            return Err(anyhow!("`github` not found on PATH"));
        }
        self.opened.lock().unwrap().push(repo.to_path_buf());
        Ok(())
    }
}

fn create_test_git_repo(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    let repo = git2::Repository::init(path)?;
    let signature = git2::Signature::now("Test User", "test@example.com")?;
    let tree_id = repo.index()?.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    repo.commit(Some("HEAD"), &signature, &signature, "Initial commit", &tree, &[])?;
    Ok(())
}

/// A directory that looks like a repository to discovery but cannot be opened
fn create_broken_repo(path: &Path) -> Result<()> {
    fs::create_dir_all(path.join(".git"))?;
    Ok(())
}

fn quiet_config() -> AppConfig {
    AppConfig {
        auto_refresh: Duration::ZERO,
        auto_fetch: Duration::ZERO,
        probe_workers: 2,
        ..AppConfig::default()
    }
}

fn start(root: &Path, launcher: Arc<RecordingLauncher>) -> Result<GitPulseApp> {
    GitPulseApp::with_ports(
        quiet_config(),
        root.to_path_buf(),
        Arc::new(GitAdapter::default()),
        Arc::new(FsDiscoveryAdapter::new()),
        launcher,
        Arc::new(SystemClock),
    )
}

fn settle(app: &mut GitPulseApp) {
    while !app.is_idle() {
        assert!(app.wait_for_result(Duration::from_secs(10)), "probe did not finish");
    }
}

fn press(app: &mut GitPulseApp, key: KeyCode) {
    app.handle_key(key, KeyModifiers::NONE, Instant::now());
}

fn screen(app: &GitPulseApp) -> Result<String> {
    let mut terminal = Terminal::new(TestBackend::new(120, 20))?;
    app.draw(&mut terminal)?;
    let buffer = terminal.backend().buffer();
    Ok(buffer
        .content()
        .chunks(120)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[test]
fn test_single_repository_opens_in_detail_and_back_quits() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?.join("solo");
    create_test_git_repo(&root)?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    assert_eq!(app.model().state, ViewState::Detail { path: root.clone() });

    settle(&mut app);
    let entry = app.registry().get(&root).expect("probed");
    assert_eq!(entry.snapshot.status_class(), StatusClass::NoUpstream);
    assert!(screen(&app)?.contains("Upstream:     (none set)"));

    press(&mut app, KeyCode::Esc);
    assert!(app.model().should_quit());
    Ok(())
}

#[test]
fn test_multi_repository_list_puts_errors_first() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;
    create_test_git_repo(&root.join("beta"))?;
    create_broken_repo(&root.join("zulu"))?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    assert_eq!(app.model().state, ViewState::List);
    settle(&mut app);

    let names: Vec<_> = app
        .registry()
        .sorted_view()
        .iter()
        .map(|entry| entry.snapshot.name.clone())
        .collect();
    assert_eq!(names, vec!["zulu", "alpha", "beta"]);

    let screen = screen(&app)?;
    assert!(screen.contains("3 repos"));
    assert!(screen.find("zulu") < screen.find("alpha"));
    Ok(())
}

#[test]
fn test_refresh_picks_up_new_changes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;
    create_test_git_repo(&root.join("beta"))?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    settle(&mut app);
    assert!(app.registry().summary().get(&StatusClass::Dirty).is_none());

    fs::write(root.join("beta/new-file.txt"), "hello")?;
    press(&mut app, KeyCode::Char('r'));
    settle(&mut app);

    let beta = app.registry().get(&root.join("beta")).expect("probed");
    assert_eq!(beta.snapshot.status_class(), StatusClass::Dirty);
    assert_eq!(beta.rank, 0);
    // Selection stays on alpha even though it moved down a row
    assert_eq!(app.model().selected.as_deref(), Some(root.join("alpha").as_path()));
    Ok(())
}

#[test]
fn test_open_external_uses_selected_repository() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;
    create_test_git_repo(&root.join("beta"))?;

    let launcher = Arc::new(RecordingLauncher::default());
    let mut app = start(&root, launcher.clone())?;
    settle(&mut app);

    press(&mut app, KeyCode::End);
    press(&mut app, KeyCode::Char('o'));

    assert_eq!(*launcher.opened.lock().unwrap(), vec![root.join("beta")]);
    Ok(())
}

#[test]
fn test_launch_failure_is_a_transient_message() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;

    let launcher = Arc::new(RecordingLauncher {
        fail: true,
        ..Default::default()
    });
    let mut app = start(&root, launcher)?;
    settle(&mut app);

    let now = Instant::now();
    app.handle_key(KeyCode::Char('o'), KeyModifiers::NONE, now);

    let flash = app.model().flash.clone().expect("message shown");
    assert!(flash.is_error);
    assert!(flash.text.contains("not found on PATH"));
    assert!(!app.model().should_quit());

    app.pump(now + Duration::from_secs(5));
    assert!(app.model().flash.is_none());
    Ok(())
}

#[test]
fn test_rescan_tracks_added_and_removed_repositories() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;
    create_test_git_repo(&root.join("beta"))?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    settle(&mut app);

    fs::remove_dir_all(root.join("beta"))?;
    create_test_git_repo(&root.join("gamma"))?;

    press(&mut app, KeyCode::Char('s'));
    settle(&mut app);

    assert_eq!(app.registry().tracked_count(), 2);
    assert!(app.registry().get(&root.join("beta")).is_none());
    assert!(app.registry().get(&root.join("gamma")).is_some());
    assert!(app.model().flash.as_ref().is_some_and(|f| f.text.contains("1 added")));
    Ok(())
}

#[test]
fn test_rescan_updates_single_and_multi_mode() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?.join("workspace");
    create_test_git_repo(&root)?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    settle(&mut app);
    assert_eq!(app.model().state, ViewState::Detail { path: root.clone() });

    // The root stops being a repository and gains a child repository
    fs::remove_dir_all(root.join(".git"))?;
    create_test_git_repo(&root.join("child"))?;
    press(&mut app, KeyCode::Char('s'));
    settle(&mut app);

    assert_eq!(app.model().state, ViewState::List);
    assert_eq!(app.registry().tracked().collect::<Vec<_>>(), vec![root.join("child").as_path()]);

    // Back from a detail view now returns to the list instead of quitting
    press(&mut app, KeyCode::Enter);
    assert_eq!(app.model().state, ViewState::Detail { path: root.join("child") });
    press(&mut app, KeyCode::Esc);
    assert_eq!(app.model().state, ViewState::List);
    assert!(!app.model().should_quit());
    Ok(())
}

#[test]
fn test_quit_from_list() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().canonicalize()?;
    create_test_git_repo(&root.join("alpha"))?;

    let mut app = start(&root, Arc::new(RecordingLauncher::default()))?;
    app.handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, Instant::now());
    assert!(app.model().should_quit());
    Ok(())
}
