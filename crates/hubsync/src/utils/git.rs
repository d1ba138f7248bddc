use std::path::Path;
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::{HubError, Result};

/// Run `git` in `cwd` with captured output. Only spawn failures are errors;
/// the caller decides what a non-zero exit means.
pub fn git_output(args: &[&str], cwd: &Path) -> Result<Output> {
  debug!("git {} (in {})", args.join(" "), cwd.display());
  Command::new("git")
    .current_dir(cwd)
    .args(args)
    // Nobody can answer a credential prompt from inside the daemon
    .env("GIT_TERMINAL_PROMPT", "0")
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .output()
    .map_err(|source| HubError::HostCommand {
      program: "git".to_string(),
      source,
    })
}

/// Run `git` and fail with [`HubError::GitCommand`] on a non-zero exit.
pub fn run_git(args: &[&str], cwd: &Path) -> Result<String> {
  let out = git_output(args, cwd)?;
  if !out.status.success() {
    return Err(HubError::GitCommand {
      command: args.join(" "),
      stderr: stderr_text(&out),
    });
  }
  Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Run a git network operation; a non-zero exit is the remote refusing it.
pub fn run_git_remote(
  args: &[&str],
  cwd: &Path,
  remote: &str,
  operation: &'static str,
) -> Result<String> {
  let out = git_output(args, cwd)?;
  if !out.status.success() {
    return Err(HubError::RemoteRejected {
      remote: remote.to_string(),
      operation,
      stderr: stderr_text(&out),
    });
  }
  Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn stderr_text(out: &Output) -> String {
  let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
  if stderr.is_empty() {
    format!("exited with status {}", out.status)
  } else {
    stderr
  }
}
