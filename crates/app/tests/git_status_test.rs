use anyhow::Result;
use git2::{Oid, Repository, Signature};
use gitpulse::adapters::git::GitAdapter;
use gitpulse_core::app::StatusProbe;
use gitpulse_core::domain::{FetchOutcome, Head, ProbeStamp, RepositorySnapshot, StatusClass};
use gitpulse_core::ports::SystemClock;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn signature() -> Result<Signature<'static>> {
    Ok(Signature::now("Test User", "test@example.com")?)
}

/// Write `name`, stage it and commit on HEAD
fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Result<Oid> {
    let workdir = repo.workdir().expect("non-bare repository");
    fs::write(workdir.join(name), content)?;

    let mut index = repo.index()?;
    index.add_path(Path::new(name))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;

    let sig = signature()?;
    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit()?],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<_> = parents.iter().collect();
    Ok(repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?)
}

/// A commit on top of `parent` that HEAD does not move to
fn detached_commit(repo: &Repository, parent: Oid, message: &str) -> Result<Oid> {
    let parent = repo.find_commit(parent)?;
    let sig = signature()?;
    Ok(repo.commit(None, &sig, &sig, message, &parent.tree()?, &[&parent])?)
}

fn create_repo(path: &Path) -> Result<Repository> {
    fs::create_dir_all(path)?;
    let repo = Repository::init(path)?;
    commit_file(&repo, "README.md", "hello\n", "Initial commit")?;
    Ok(repo)
}

fn branch_name(repo: &Repository) -> Result<String> {
    Ok(repo.head()?.shorthand().unwrap_or("master").to_string())
}

/// Point `origin/<branch>` at `target` and make it the upstream of HEAD
fn set_upstream(repo: &Repository, remote_url: &str, target: Oid) -> Result<()> {
    let branch = branch_name(repo)?;
    if repo.find_remote("origin").is_err() {
        repo.remote("origin", remote_url)?;
    }
    repo.reference(&format!("refs/remotes/origin/{}", branch), target, true, "test upstream")?;
    repo.find_branch(&branch, git2::BranchType::Local)?
        .set_upstream(Some(&format!("origin/{}", branch)))?;
    Ok(())
}

fn probe(path: &Path) -> RepositorySnapshot {
    let probe = StatusProbe::new(Arc::new(GitAdapter::default()), Arc::new(SystemClock));
    probe.probe(path, ProbeStamp(1))
}

fn git_cli_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[test]
fn test_in_sync_repo_is_clean() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("clean-repo");
    let repo = create_repo(&path)?;
    let head = repo.head()?.target().expect("head oid");
    set_upstream(&repo, "https://example.invalid/clean.git", head)?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::Clean);
    assert_eq!(snapshot.ahead(), Some(0));
    assert_eq!(snapshot.behind(), Some(0));
    assert_eq!(
        snapshot.upstream.as_ref().map(|u| u.name.clone()),
        Some(format!("origin/{}", branch_name(&repo)?))
    );
    Ok(())
}

#[test]
fn test_local_commit_is_ahead() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("ahead-repo");
    let repo = create_repo(&path)?;
    let base = repo.head()?.target().expect("head oid");
    set_upstream(&repo, "https://example.invalid/ahead.git", base)?;

    commit_file(&repo, "feature.txt", "new\n", "Local work")?;
    commit_file(&repo, "feature.txt", "newer\n", "More local work")?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::Ahead);
    assert_eq!(snapshot.ahead(), Some(2));
    assert_eq!(snapshot.behind(), Some(0));
    Ok(())
}

#[test]
fn test_remote_commit_is_behind() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("behind-repo");
    let repo = create_repo(&path)?;
    let base = repo.head()?.target().expect("head oid");

    let remote_tip = detached_commit(&repo, base, "Someone else's work")?;
    set_upstream(&repo, "https://example.invalid/behind.git", remote_tip)?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::Behind);
    assert_eq!(snapshot.behind(), Some(1));
    Ok(())
}

#[test]
fn test_both_sides_moved_is_diverged() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("diverged-repo");
    let repo = create_repo(&path)?;
    let base = repo.head()?.target().expect("head oid");

    let remote_tip = detached_commit(&repo, base, "Remote work")?;
    set_upstream(&repo, "https://example.invalid/diverged.git", remote_tip)?;
    commit_file(&repo, "local.txt", "mine\n", "Local work")?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::Diverged);
    assert_eq!(snapshot.ahead(), Some(1));
    assert_eq!(snapshot.behind(), Some(1));
    Ok(())
}

#[test]
fn test_dirty_repo_counts_modified_and_untracked() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("dirty-repo");
    let repo = create_repo(&path)?;
    let head = repo.head()?.target().expect("head oid");
    set_upstream(&repo, "https://example.invalid/dirty.git", head)?;

    fs::write(path.join("README.md"), "changed\n")?;
    fs::write(path.join("scratch.txt"), "untracked\n")?;
    fs::write(path.join("notes.txt"), "untracked too\n")?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::Dirty);
    assert_eq!(snapshot.worktree.modified, 1);
    assert_eq!(snapshot.worktree.untracked, 2);
    Ok(())
}

#[test]
fn test_repo_without_upstream() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("local-only");
    create_repo(&path)?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.status_class(), StatusClass::NoUpstream);
    assert!(snapshot.upstream.is_none());
    assert_eq!(snapshot.ahead(), None);
    Ok(())
}

#[test]
fn test_empty_repo_is_unborn_without_upstream() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("fresh");
    fs::create_dir_all(&path)?;
    Repository::init(&path)?;

    let snapshot = probe(&path);
    assert!(matches!(snapshot.head, Head::Unborn(_)));
    assert_eq!(snapshot.branch(), "");
    assert_eq!(snapshot.status_class(), StatusClass::NoUpstream);
    Ok(())
}

#[test]
fn test_stashes_are_counted() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stash-repo");
    let mut repo = create_repo(&path)?;

    fs::write(path.join("README.md"), "work in progress\n")?;
    repo.stash_save(&signature()?, "wip", None)?;
    fs::write(path.join("README.md"), "more work\n")?;
    repo.stash_save(&signature()?, "wip 2", None)?;

    let snapshot = probe(&path);
    assert_eq!(snapshot.stash_count, 2);
    // Stashing cleaned the tree
    assert_eq!(snapshot.worktree.modified, 0);
    Ok(())
}

#[test]
fn test_detached_head_has_no_upstream() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("detached-repo");
    let repo = create_repo(&path)?;
    let head = repo.head()?.target().expect("head oid");
    set_upstream(&repo, "https://example.invalid/detached.git", head)?;
    repo.set_head_detached(head)?;

    let snapshot = probe(&path);
    assert!(matches!(snapshot.head, Head::Detached(ref id) if id.len() == 7));
    assert_eq!(snapshot.branch(), "");
    assert_eq!(snapshot.status_class(), StatusClass::NoUpstream);
    Ok(())
}

#[test]
fn test_missing_directory_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let snapshot = probe(&temp_dir.path().join("deleted"));
    assert_eq!(snapshot.status_class(), StatusClass::Error);
    assert!(snapshot.error.is_some());
    assert_eq!(snapshot.worktree.modified, 0);
    Ok(())
}

#[test]
fn test_fetch_from_unreachable_remote_keeps_local_status() -> Result<()> {
    if !git_cli_available() {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("offline-repo");
    let repo = create_repo(&path)?;
    let head = repo.head()?.target().expect("head oid");
    let missing_remote = temp_dir.path().join("no-such-remote.git");
    set_upstream(&repo, &missing_remote.to_string_lossy(), head)?;
    commit_file(&repo, "local.txt", "x\n", "Local work")?;

    let probe = StatusProbe::new(
        Arc::new(GitAdapter::new(Duration::from_secs(30))),
        Arc::new(SystemClock),
    );
    let report = probe.fetch_and_probe(&path, ProbeStamp(1));

    assert!(matches!(report.fetch, Some(FetchOutcome::Failed(_))));
    assert_eq!(report.snapshot.status_class(), StatusClass::Ahead);
    Ok(())
}

#[test]
fn test_fetch_from_local_bare_remote_succeeds() -> Result<()> {
    if !git_cli_available() {
        return Ok(());
    }

    let temp_dir = TempDir::new()?;
    let remote_path = temp_dir.path().join("remote.git");
    Repository::init_bare(&remote_path)?;

    let path = temp_dir.path().join("online-repo");
    let repo = create_repo(&path)?;
    let branch = branch_name(&repo)?;
    let mut remote = repo.remote("origin", &remote_path.to_string_lossy())?;
    remote.push(&[format!("refs/heads/{0}:refs/heads/{0}", branch)], None)?;

    let probe = StatusProbe::new(Arc::new(GitAdapter::default()), Arc::new(SystemClock));
    let report = probe.fetch_and_probe(&path, ProbeStamp(1));

    assert_eq!(report.fetch, Some(FetchOutcome::Fetched));
    assert_eq!(report.snapshot.status_class(), StatusClass::NoUpstream);
    Ok(())
}
