use anyhow::{anyhow, bail, Context, Result};
use git2::{ErrorCode, Repository as GitRepository, Status, StatusOptions};
use gitpulse_core::domain::{AheadBehind, Head, WorktreeCounts};
use gitpulse_core::ports::GitPort;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const FETCH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Git adapter that implements GitPort.
///
/// Local queries go through git2. Fetch shells out to the `git` executable so
/// the user's credential helpers, ssh agent and remote config apply unchanged.
pub struct GitAdapter {
    fetch_timeout: Duration,
}

impl GitAdapter {
    pub fn new(fetch_timeout: Duration) -> Self {
        Self { fetch_timeout }
    }

    fn open_repo(&self, path: &Path) -> Result<GitRepository> {
        GitRepository::open(path)
            .with_context(|| format!("Failed to open git repository at {}", path.display()))
    }
}

impl Default for GitAdapter {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl GitPort for GitAdapter {
    fn head(&self, repo: &Path) -> Result<Head> {
        let git_repo = self.open_repo(repo)?;

        let reference = match git_repo.head() {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // HEAD names a branch that has no commits yet
                let head = git_repo.find_reference("HEAD").context("Failed to read HEAD")?;
                let target = head.symbolic_target().unwrap_or("refs/heads/HEAD");
                let name = target.strip_prefix("refs/heads/").unwrap_or(target);
                return Ok(Head::Unborn(name.to_string()));
            }
            Err(e) => return Err(e).context("Failed to read HEAD"),
        };

        if reference.is_branch() {
            let name = reference
                .shorthand()
                .ok_or_else(|| anyhow!("Branch name is not valid UTF-8"))?;
            Ok(Head::Branch(name.to_string()))
        } else {
            let oid = reference
                .target()
                .ok_or_else(|| anyhow!("Detached HEAD has no target"))?;
            Ok(Head::Detached(format!("{:.7}", oid)))
        }
    }

    fn upstream(&self, repo: &Path) -> Result<Option<String>> {
        let git_repo = self.open_repo(repo)?;

        let head = match git_repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e).context("Failed to read HEAD"),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        let branch_ref = head
            .name()
            .ok_or_else(|| anyhow!("Branch ref is not valid UTF-8"))?;

        match git_repo.branch_upstream_name(branch_ref) {
            Ok(upstream) => {
                let full = upstream
                    .as_str()
                    .ok_or_else(|| anyhow!("Upstream name is not valid UTF-8"))?;
                Ok(Some(shorten_ref(full).to_string()))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read upstream configuration"),
        }
    }

    fn ahead_behind(&self, repo: &Path, upstream: &str) -> Result<AheadBehind> {
        let git_repo = self.open_repo(repo)?;

        let head_oid = git_repo
            .head()?
            .target()
            .ok_or_else(|| anyhow!("HEAD has no target OID"))?;

        let upstream_oid = git_repo
            .resolve_reference_from_short_name(upstream)
            .with_context(|| format!("Upstream {} not found", upstream))?
            .peel_to_commit()
            .with_context(|| format!("Upstream {} does not point at a commit", upstream))?
            .id();

        let (ahead, behind) = git_repo
            .graph_ahead_behind(head_oid, upstream_oid)
            .context("Failed to calculate ahead/behind counts")?;

        Ok(AheadBehind { ahead, behind })
    }

    fn worktree_counts(&self, repo: &Path) -> Result<WorktreeCounts> {
        let git_repo = self.open_repo(repo)?;

        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true);
        status_options.include_ignored(false);

        let statuses = git_repo
            .statuses(Some(&mut status_options))
            .context("Failed to get git status")?;

        let mut counts = WorktreeCounts::default();
        for entry in statuses.iter() {
            let status = entry.status();
            if status == Status::WT_NEW {
                counts.untracked += 1;
            } else if !status.is_empty() && !status.contains(Status::IGNORED) {
                counts.modified += 1;
            }
        }

        Ok(counts)
    }

    fn stash_count(&self, repo: &Path) -> Result<usize> {
        let mut git_repo = self.open_repo(repo)?;

        let mut count = 0;
        git_repo
            .stash_foreach(|_, _, _| {
                count += 1;
                true
            })
            .context("Failed to list stashes")?;

        Ok(count)
    }

    fn fetch(&self, repo: &Path) -> Result<()> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(repo)
            .args(["fetch", "--quiet"])
            // Never block on a credential prompt nobody can see
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            command.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }

        run_with_timeout(command, self.fetch_timeout)?;
        debug!("git fetch finished for {}", repo.display());
        Ok(())
    }
}

/// Run `command` to completion, killing it after `timeout`. A failure reports
/// the last line the command wrote to stderr.
///
/// Stderr is drained on its own thread while the child runs, so a chatty
/// command never stalls on a full pipe.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<()> {
    let mut child = command
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to run git fetch")?;
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut output = String::new();
            let _ = pipe.read_to_string(&mut output);
            output
        })
    });

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("Failed to wait for git fetch")? {
            if status.success() {
                return Ok(());
            }

            let stderr = stderr_reader
                .and_then(|reader| reader.join().ok())
                .unwrap_or_default();
            match last_line(&stderr) {
                Some(line) => bail!("{}", line),
                None => bail!("git fetch exited with {}", status),
            }
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // Helpers git started may still hold the pipe; the reader is left to finish on its own
            bail!("git fetch timed out after {}s", timeout.as_secs());
        }

        thread::sleep(FETCH_POLL_INTERVAL);
    }
}

/// `refs/remotes/origin/main` -> `origin/main`, `refs/heads/main` -> `main`
fn shorten_ref(full: &str) -> &str {
    full.strip_prefix("refs/remotes/")
        .or_else(|| full.strip_prefix("refs/heads/"))
        .unwrap_or(full)
}

fn last_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty()).last()
}
