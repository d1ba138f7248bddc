use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize as _;
use serde::Deserialize;
use toml::Value as TomlValue;

use crate::service::ServiceConfig;
use crate::sync::SyncConfig;

/// Known top-level config keys.
const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["daemon", "sync", "service", "notifications"];

/// Known keys per section, used to warn about typos.
const KNOWN_SECTION_KEYS: &[(&str, &[&str])] = &[
  ("daemon", &["socket_path"]),
  (
    "sync",
    &[
      "remote_url",
      "remote_name",
      "repository_path",
      "tracked_files",
      "entry_file",
      "link_path",
      "clone_on_push",
    ],
  ),
  (
    "service",
    &["label", "program", "descriptor_dir", "load_cmd", "start_cmd"],
  ),
  ("notifications", &["enabled", "title"]),
];

const DEFAULT_TOML: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/defaults/hubsync.toml"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
  #[serde(default)]
  pub socket_path: Option<String>,
}

/// The `[sync]` section as written in TOML. Paths are still unexpanded here.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
  pub remote_url: String,
  pub remote_name: String,
  pub repository_path: String,
  pub tracked_files: Vec<String>,
  pub entry_file: String,
  pub link_path: String,
  #[serde(default = "default_true")]
  pub clone_on_push: bool,
}

/// The `[service]` section as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
  pub label: String,
  pub program: Vec<String>,
  pub descriptor_dir: String,
  pub load_cmd: Vec<String>,
  pub start_cmd: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
  #[serde(default)]
  pub daemon: DaemonConfig,
  pub sync: SyncSection,
  pub service: ServiceSection,
  pub notifications: NotificationsConfig,
}

fn default_true() -> bool {
  true
}

impl HubConfig {
  /// The embedded defaults without any user overrides.
  pub fn defaults() -> Result<Self> {
    toml::from_str(DEFAULT_TOML).context("invalid embedded default config")
  }

  /// Resolve the `[sync]` section into the value the orchestrator works on.
  #[must_use]
  pub fn sync_config(&self) -> SyncConfig {
    let s = &self.sync;
    SyncConfig {
      remote_url: s.remote_url.clone(),
      remote_name: s.remote_name.clone(),
      repository_path: expand_home(&s.repository_path),
      tracked_files: s.tracked_files.iter().map(PathBuf::from).collect(),
      entry_file: PathBuf::from(&s.entry_file),
      link_path: expand_home(&s.link_path),
      clone_on_push: s.clone_on_push,
    }
  }

  #[must_use]
  pub fn service_config(&self) -> ServiceConfig {
    let s = &self.service;
    ServiceConfig {
      label: s.label.clone(),
      program: s.program.clone(),
      descriptor_dir: expand_home(&s.descriptor_dir),
      load_cmd: s.load_cmd.clone(),
      start_cmd: s.start_cmd.clone(),
    }
  }

  /// Reject configs the daemon cannot do anything meaningful with.
  pub fn validate(&self) -> Result<()> {
    if self.sync.remote_url.trim().is_empty() {
      bail!("sync.remote_url must not be empty");
    }
    if self.sync.remote_name.trim().is_empty() {
      bail!("sync.remote_name must not be empty");
    }
    if self.sync.tracked_files.is_empty() {
      bail!("sync.tracked_files must list at least one file");
    }
    for (key, raw) in [
      ("sync.repository_path", &self.sync.repository_path),
      ("sync.link_path", &self.sync.link_path),
    ] {
      if !expand_home(raw).is_absolute() {
        bail!("{key} must be an absolute path or start with ~/ (got '{raw}')");
      }
    }
    if self.service.label.trim().is_empty() {
      bail!("service.label must not be empty");
    }
    for (key, argv) in [
      ("service.program", &self.service.program),
      ("service.load_cmd", &self.service.load_cmd),
      ("service.start_cmd", &self.service.start_cmd),
    ] {
      if argv.first().is_none_or(|p| p.trim().is_empty()) {
        bail!("{key} must not be empty");
      }
    }
    Ok(())
  }
}

/// Expand a leading `~` against `$HOME`. Anything else is returned as is.
#[must_use]
pub fn expand_home(raw: &str) -> PathBuf {
  let home = || std::env::var("HOME").map(PathBuf::from).ok();
  if raw == "~" {
    if let Some(h) = home() {
      return h;
    }
  } else if let Some(rest) = raw.strip_prefix("~/")
    && let Some(h) = home()
  {
    return h.join(rest);
  }
  PathBuf::from(raw)
}

fn merge_values(base: &mut TomlValue, overlay: TomlValue) {
  match (base, overlay) {
    (TomlValue::Table(base_tbl), TomlValue::Table(overlay_tbl)) => {
      for (k, v) in overlay_tbl {
        match base_tbl.get_mut(&k) {
          Some(existing) => merge_values(existing, v),
          None => {
            base_tbl.insert(k, v);
          }
        }
      }
    }
    // Arrays and scalars: replace last-wins
    (base_slot, new_v) => *base_slot = new_v,
  }
}

fn warn_unknown_keys(val: &TomlValue, file_path: &Path) {
  let TomlValue::Table(table) = val else {
    return;
  };

  for key in table.keys() {
    if !KNOWN_TOP_LEVEL_KEYS.contains(&key.as_str()) {
      eprintln!(
        "{}: unknown config key '{}' in {} (did you mean one of: {}?)",
        "warning".yellow(),
        key,
        file_path.display(),
        KNOWN_TOP_LEVEL_KEYS.join(", ")
      );
    }
  }

  for (section, known) in KNOWN_SECTION_KEYS {
    if let Some(TomlValue::Table(inner)) = table.get(*section) {
      for key in inner.keys() {
        if !known.contains(&key.as_str()) {
          eprintln!(
            "{}: unknown config key '{}.{}' in {} (known keys: {})",
            "warning".yellow(),
            section,
            key,
            file_path.display(),
            known.join(", ")
          );
        }
      }
    }
  }
}

fn read_toml(path: &Path) -> Result<TomlValue> {
  let data =
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  let val: TomlValue =
    toml::from_str(&data).with_context(|| format!("invalid TOML in {}", path.display()))?;
  warn_unknown_keys(&val, path);
  Ok(val)
}

/// Load and merge configuration from defaults, the global XDG file and an
/// optional explicit file, then validate the result.
///
/// # Errors
/// Returns an error if a file cannot be read or parsed, or the merged config
/// fails validation.
pub fn load_config(explicit: Option<&Path>) -> Result<HubConfig> {
  let mut merged: TomlValue =
    toml::from_str(DEFAULT_TOML).context("invalid embedded default config")?;

  let xdg = xdg::BaseDirectories::with_prefix("hubsync");
  if let Some(global_path) = xdg.find_config_file("hubsync.toml") {
    merge_values(&mut merged, read_toml(&global_path)?);
  }

  if let Some(path) = explicit {
    merge_values(&mut merged, read_toml(path)?);
  }

  let merged_str = toml::to_string(&merged).context("failed to serialize merged config")?;
  let cfg: HubConfig = toml::from_str(&merged_str).context("failed to parse merged config")?;
  cfg.validate()?;
  Ok(cfg)
}

/// Compute the command socket path.
///
/// Precedence:
/// 1) `HUBSYNC_SOCKET_PATH` environment variable
/// 2) `config.daemon.socket_path` if set
/// 3) `$XDG_RUNTIME_DIR/hubsync.sock` if the env var is set
/// 4) Fallback to `~/.local/run/hubsync.sock`
#[must_use]
pub fn compute_socket_path(cfg: &HubConfig) -> PathBuf {
  if let Ok(env_path) = std::env::var("HUBSYNC_SOCKET_PATH") {
    return PathBuf::from(env_path);
  }

  if let Some(ref p) = cfg.daemon.socket_path {
    return expand_home(p);
  }

  if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
    return PathBuf::from(xdg_runtime).join("hubsync.sock");
  }

  let home = std::env::var("HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from);
  home.join(".local").join("run").join("hubsync.sock")
}
