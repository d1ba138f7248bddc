//! Domain errors for the command server and the workflows it dispatches to.
//!
//! Config loading and CLI plumbing stay on `anyhow`; everything a command
//! can fail with is one of these variants so callers and tests can match on
//! the kind.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
  /// Fatal at startup: the command socket could not be bound.
  #[error("failed to bind command socket at {}: {source}", .path.display())]
  Bind {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no repository cloned under {}", .0.display())]
  NoRepositoryCloned(PathBuf),

  /// Any non-zero exit from the network step (`git pull --ff-only`, `git
  /// push`). This includes local refusals git reports from that step, such as
  /// a dirty working tree the pull would overwrite; `stderr` tells them apart.
  #[error("remote '{remote}' rejected {operation}: {stderr}")]
  RemoteRejected {
    remote: String,
    operation: &'static str,
    stderr: String,
  },

  #[error("tracked file missing from working tree: {}", .0.display())]
  FileMissing(PathBuf),

  #[error("service descriptor not found at {}", .0.display())]
  MissingServiceTemplate(PathBuf),

  #[error("git {command} failed: {stderr}")]
  GitCommand { command: String, stderr: String },

  #[error("failed to open repository at {}", .path.display())]
  OpenRepository {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  #[error("repository at {} has no working tree", .0.display())]
  BareRepository(PathBuf),

  #[error("failed to run {program}: {source}")]
  HostCommand {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;
