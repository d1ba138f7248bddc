//! Local mirror of the tracked configuration repository.
//!
//! Every workflow acquires its own [`RepositoryHandle`], works on it, and
//! drops it at the end of its scope, whichever way the work ends.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use gix as git;
use log::{debug, info};

use crate::error::{HubError, Result};
use crate::utils::git::{run_git, run_git_remote};

/// Commit message format for pushes: `DD-MM-YYYY-HH-MM-SS`.
const COMMIT_MESSAGE_FORMAT: &str = "%d-%m-%Y-%H-%M-%S";

pub const PULLED_MESSAGE: &str = "Configs pulled";
pub const PUSHED_MESSAGE: &str = "Configs pushed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
  pub remote_url: String,
  /// Remote used for pull and push.
  pub remote_name: String,
  pub repository_path: PathBuf,
  /// Files staged on push, relative to the repository root.
  pub tracked_files: Vec<PathBuf>,
  /// File inside the repository that `link_path` points at after a pull.
  pub entry_file: PathBuf,
  pub link_path: PathBuf,
  /// When false, push requires an existing mirror instead of cloning one.
  pub clone_on_push: bool,
}

/// How a workflow obtains its repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
  /// Clone when `repository_path` is absent, open it otherwise.
  CloneOrOpen,
  /// Fail with [`HubError::NoRepositoryCloned`] when nothing is there yet.
  OpenExisting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  Cloned,
  Opened,
}

/// An open local repository, exclusively owned by one workflow.
pub struct RepositoryHandle {
  repo: git::Repository,
  workdir: PathBuf,
  origin: Origin,
}

impl RepositoryHandle {
  pub fn acquire(cfg: &SyncConfig, mode: Acquire) -> Result<Self> {
    let path = &cfg.repository_path;
    if path.exists() {
      return Self::open(path, Origin::Opened);
    }
    match mode {
      Acquire::OpenExisting => Err(HubError::NoRepositoryCloned(path.clone())),
      Acquire::CloneOrOpen => {
        clone_into(&cfg.remote_url, path)?;
        Self::open(path, Origin::Cloned)
      }
    }
  }

  fn open(path: &Path, origin: Origin) -> Result<Self> {
    let repo = git::open(path).map_err(|source| HubError::OpenRepository {
      path: path.to_path_buf(),
      source: Box::new(source),
    })?;
    let workdir = repo
      .workdir()
      .map(Path::to_path_buf)
      .ok_or_else(|| HubError::BareRepository(path.to_path_buf()))?;
    debug!("Acquired repository at {} ({origin:?})", workdir.display());
    Ok(Self {
      repo,
      workdir,
      origin,
    })
  }

  #[must_use]
  pub fn workdir(&self) -> &Path {
    &self.workdir
  }

  #[must_use]
  pub fn origin(&self) -> Origin {
    self.origin
  }

  #[must_use]
  pub fn repository(&self) -> &git::Repository {
    &self.repo
  }

  pub fn pull_fast_forward(&self, remote: &str) -> Result<()> {
    run_git_remote(&["pull", "--ff-only", remote], &self.workdir, remote, "pull")?;
    Ok(())
  }

  /// Stage exactly `files`. Every file must exist; nothing is staged otherwise.
  pub fn stage(&self, files: &[PathBuf]) -> Result<()> {
    for file in files {
      let full = self.workdir.join(file);
      if fs::symlink_metadata(&full).is_err() {
        return Err(HubError::FileMissing(full));
      }
    }
    for file in files {
      let rel = file.to_string_lossy();
      run_git(&["add", "--", rel.as_ref()], &self.workdir)?;
    }
    Ok(())
  }

  /// Commit whatever is staged, even when the tree did not change.
  pub fn commit(&self, message: &str) -> Result<()> {
    run_git(
      &["commit", "--quiet", "--allow-empty", "-m", message],
      &self.workdir,
    )?;
    Ok(())
  }

  pub fn push(&self, remote: &str) -> Result<()> {
    run_git_remote(&["push", "--quiet", remote], &self.workdir, remote, "push")?;
    Ok(())
  }
}

impl Drop for RepositoryHandle {
  fn drop(&mut self) {
    debug!("Released repository at {}", self.workdir.display());
  }
}

fn clone_into(url: &str, path: &Path) -> Result<()> {
  let parent = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
    _ => PathBuf::from("."),
  };
  fs::create_dir_all(&parent)?;
  info!("Cloning {url} into {}", path.display());
  let target = path.to_string_lossy();
  run_git(&["clone", "--quiet", "--", url, target.as_ref()], &parent)?;
  Ok(())
}

/// Run `op` on a freshly acquired repository. The handle is dropped before
/// this returns, on success and on error alike.
pub fn with_repository<T>(
  cfg: &SyncConfig,
  mode: Acquire,
  op: impl FnOnce(&RepositoryHandle) -> Result<T>,
) -> Result<T> {
  let handle = RepositoryHandle::acquire(cfg, mode)?;
  op(&handle)
}

/// Fast-forward the mirror from the remote, then make sure the entry file is
/// linked into place.
pub fn pull(cfg: &SyncConfig) -> Result<String> {
  with_repository(cfg, Acquire::CloneOrOpen, |repo| {
    repo.pull_fast_forward(&cfg.remote_name)?;
    ensure_entry_link(&repo.workdir().join(&cfg.entry_file), &cfg.link_path)?;
    Ok(PULLED_MESSAGE.to_string())
  })
}

/// Stage the tracked files, commit them under a timestamp and push.
pub fn push(cfg: &SyncConfig) -> Result<String> {
  let mode = if cfg.clone_on_push {
    Acquire::CloneOrOpen
  } else {
    Acquire::OpenExisting
  };
  with_repository(cfg, mode, |repo| {
    repo.stage(&cfg.tracked_files)?;
    repo.commit(&commit_message(Local::now()))?;
    repo.push(&cfg.remote_name)?;
    Ok(PUSHED_MESSAGE.to_string())
  })
}

#[must_use]
pub fn commit_message(now: DateTime<Local>) -> String {
  now.format(COMMIT_MESSAGE_FORMAT).to_string()
}

/// Create `link -> target`. Anything already at `link` counts as linked.
pub fn ensure_entry_link(target: &Path, link: &Path) -> Result<()> {
  if let Some(dir) = link.parent()
    && !dir.as_os_str().is_empty()
  {
    fs::create_dir_all(dir)?;
  }
  match symlink(target, link) {
    Ok(()) => {
      info!("Linked {} -> {}", link.display(), target.display());
      Ok(())
    }
    Err(err) if err.kind() == ErrorKind::AlreadyExists => {
      info!("symlink exists at {}", link.display());
      Ok(())
    }
    Err(err) => Err(err.into()),
  }
}
