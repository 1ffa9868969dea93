use anyhow::Result;
use gitpulse_core::error::CoreError;
use gitpulse_core::ports::LauncherPort;
use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};

/// Starts a GUI git client on a repository and lets it run on its own.
///
/// `command` may carry leading arguments (`"open -a Fork"`); the repository
/// path is appended as the last argument.
pub struct ExternalGuiLauncher {
    program: String,
    args: Vec<String>,
}

impl ExternalGuiLauncher {
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "github".to_string());
        Self {
            program,
            args: parts.collect(),
        }
    }

    fn spawn(&self, repo: &Path) -> io::Result<Child> {
        let mut args: Vec<&OsStr> = self.args.iter().map(OsStr::new).collect();
        args.push(repo.as_os_str());
        spawn_detached(&self.program, &args, repo)
    }

    fn launch_error(repo: &Path, reason: impl Into<String>) -> anyhow::Error {
        CoreError::Launch {
            path: repo.to_path_buf(),
            reason: reason.into(),
        }
        .into()
    }
}

impl LauncherPort for ExternalGuiLauncher {
    fn open(&self, repo: &Path) -> Result<()> {
        match self.spawn(repo) {
            Ok(child) => {
                info!("Started {} for {}", self.program, repo.display());
                watch(child, self.program.clone());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && cfg!(target_os = "macos") => {
                // GitHub Desktop without its CLI installed
                let args = [OsStr::new("-a"), OsStr::new("GitHub Desktop"), repo.as_os_str()];
                let child = spawn_detached("open", &args, repo)
                    .map_err(|e| Self::launch_error(repo, e.to_string()))?;
                info!("Started GitHub Desktop via open -a for {}", repo.display());
                watch(child, "open".to_string());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Self::launch_error(
                repo,
                format!("`{}` not found on PATH", self.program),
            )),
            Err(e) => Err(Self::launch_error(repo, e.to_string())),
        }
    }
}

fn spawn_detached(program: &str, args: &[&OsStr], cwd: &Path) -> io::Result<Child> {
    Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Reap the child in the background and log a failing exit
fn watch(mut child: Child, program: String) {
    let spawned = thread::Builder::new()
        .name("gitpulse-launch".to_string())
        .spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!("{} exited cleanly", program),
            Ok(status) => warn!("{} exited with {}", program, status),
            Err(e) => warn!("Failed to wait for {}: {}", program, e),
        });

    if let Err(e) = spawned {
        warn!("Could not watch launched process: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_with_arguments() {
        let launcher = ExternalGuiLauncher::new("open -a Fork");
        assert_eq!(launcher.program, "open");
        assert_eq!(launcher.args, vec!["-a".to_string(), "Fork".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_open_does_not_wait_for_the_client() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let launcher = ExternalGuiLauncher::new("true");
        launcher.open(temp_dir.path())?;
        Ok(())
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    #[test]
    fn test_missing_client_is_reported() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let launcher = ExternalGuiLauncher::new("gitpulse-no-such-client");
        let err = launcher.open(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("not found on PATH"));
        Ok(())
    }
}
