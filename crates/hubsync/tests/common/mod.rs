#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tempfile::{Builder, TempDir};

use hubsync::sync::SyncConfig;

/// Returns a workspace-local temp root for tests under `./target/test-tmp` at the workspace root.
pub fn tmp_root() -> PathBuf {
  let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  // Walk two parents up: crates/hubsync -> crates -> workspace root
  let workspace_root = manifest_dir
    .parent()
    .and_then(|p| p.parent())
    .unwrap_or(&manifest_dir)
    .to_path_buf();
  let root = workspace_root.join("target").join("test-tmp");
  let _ = fs::create_dir_all(&root);
  root
}

pub fn tempdir_in_sandbox() -> TempDir {
  Builder::new()
    .prefix("hubsync-test-")
    .tempdir_in(tmp_root())
    .expect("temp dir")
}

/// Short socket directory; Unix socket paths have a small length limit.
pub fn socket_dir() -> TempDir {
  Builder::new()
    .prefix("hs-")
    .tempdir_in("/tmp")
    .expect("socket temp dir")
}

pub fn git_available() -> bool {
  Command::new("git")
    .arg("--version")
    .output()
    .is_ok_and(|o| o.status.success())
}

pub fn git(cwd: &Path, args: &[&str]) -> Result<String> {
  let out = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .with_context(|| format!("spawn git {args:?}"))?;
  if !out.status.success() {
    bail!(
      "git {args:?} failed: {}",
      String::from_utf8_lossy(&out.stderr)
    );
  }
  Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

pub fn configure_identity(repo: &Path) -> Result<()> {
  git(repo, &["config", "user.email", "test@example.com"])?;
  git(repo, &["config", "user.name", "Tester"])?;
  git(repo, &["config", "commit.gpgsign", "false"])?;
  Ok(())
}

pub fn commit_file(repo: &Path, name: &str, body: &str, message: &str) -> Result<()> {
  fs::write(repo.join(name), body)?;
  git(repo, &["add", name])?;
  git(repo, &["commit", "--quiet", "-m", message])?;
  Ok(())
}

/// A bare remote seeded with one commit on `main`, plus the working clone
/// that seeded it (used to move the remote ahead).
pub struct Remote {
  pub dir: TempDir,
  pub bare: PathBuf,
  pub seed: PathBuf,
}

impl Remote {
  pub fn new() -> Result<Self> {
    let dir = tempdir_in_sandbox();
    let bare = dir.path().join("remote.git");
    let seed = dir.path().join("seed");
    fs::create_dir_all(&bare)?;
    fs::create_dir_all(&seed)?;

    git(&bare, &["init", "--quiet", "--bare"])?;
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"])?;

    git(&seed, &["init", "--quiet"])?;
    git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"])?;
    configure_identity(&seed)?;
    commit_file(&seed, "init.el", ";; seed\n", "seed")?;
    git(&seed, &["remote", "add", "origin", &bare.display().to_string()])?;
    git(&seed, &["push", "--quiet", "origin", "main"])?;

    Ok(Self { dir, bare, seed })
  }

  pub fn url(&self) -> String {
    self.bare.display().to_string()
  }

  /// Commit on the seed clone and push, so the remote moves ahead of any mirror.
  pub fn advance(&self, name: &str, body: &str) -> Result<()> {
    commit_file(&self.seed, name, body, "advance")?;
    git(&self.seed, &["push", "--quiet", "origin", "main"])?;
    Ok(())
  }

  pub fn head_subject(&self) -> Result<String> {
    git(&self.bare, &["log", "-1", "--format=%s", "main"])
  }

  pub fn commit_count(&self) -> Result<usize> {
    let n = git(&self.bare, &["rev-list", "--count", "main"])?;
    n.parse().context("rev-list count")
  }

  /// Sync config for a mirror and link living in `root`.
  pub fn sync_config(&self, root: &Path) -> SyncConfig {
    SyncConfig {
      remote_url: self.url(),
      remote_name: "origin".to_string(),
      repository_path: root.join("mirror"),
      tracked_files: vec![PathBuf::from("init.el")],
      entry_file: PathBuf::from("init.el"),
      link_path: root.join("home").join(".emacs.d").join("init.el"),
      clone_on_push: true,
    }
  }
}
