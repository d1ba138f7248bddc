//! Registration of the background service with the host service manager.
//!
//! The registrar writes a launchd property list and then runs the configured
//! load and start commands. How the host acts on them is not our concern.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{error, info};

use crate::error::{HubError, Result};

const DESCRIPTOR_PLACEHOLDER: &str = "<descriptor>";
const LABEL_PLACEHOLDER: &str = "<label>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
  pub label: String,
  /// Argv of the service program.
  pub program: Vec<String>,
  pub descriptor_dir: PathBuf,
  /// Argv run to load the descriptor; supports `<descriptor>` and `<label>`.
  pub load_cmd: Vec<String>,
  /// Argv run to start the loaded service; supports `<descriptor>` and `<label>`.
  pub start_cmd: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceRegistrar {
  cfg: ServiceConfig,
}

impl ServiceRegistrar {
  #[must_use]
  pub fn new(cfg: ServiceConfig) -> Self {
    Self { cfg }
  }

  #[must_use]
  pub fn descriptor_path(&self) -> PathBuf {
    self
      .cfg
      .descriptor_dir
      .join(format!("{}.plist", self.cfg.label))
  }

  #[must_use]
  pub fn render_descriptor(&self) -> String {
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    render_plist(&self.cfg.label, &self.cfg.program, &user)
  }

  /// Write the descriptor, replacing any previous one, and return its path.
  pub fn write_descriptor(&self) -> Result<PathBuf> {
    fs::create_dir_all(&self.cfg.descriptor_dir)?;
    let path = self.descriptor_path();
    fs::write(&path, self.render_descriptor())?;
    info!("Wrote service descriptor {}", path.display());
    Ok(path)
  }

  /// Load and start the service described at `descriptor`.
  ///
  /// Returns the start command's stdout. A host command that exits non-zero
  /// does not fail the call: its stderr is logged and returned instead.
  pub fn start(&self, descriptor: &Path) -> Result<String> {
    if !descriptor.exists() {
      return Err(HubError::MissingServiceTemplate(descriptor.to_path_buf()));
    }
    let load = expand_placeholders(&self.cfg.load_cmd, descriptor, &self.cfg.label);
    if let HostOutcome::Failed(stderr) = run_host(&load)? {
      return Ok(stderr);
    }
    let start = expand_placeholders(&self.cfg.start_cmd, descriptor, &self.cfg.label);
    match run_host(&start)? {
      HostOutcome::Succeeded(stdout) | HostOutcome::Failed(stdout) => Ok(stdout),
    }
  }
}

enum HostOutcome {
  Succeeded(String),
  Failed(String),
}

fn run_host(argv: &[String]) -> Result<HostOutcome> {
  let Some((program, args)) = argv.split_first() else {
    return Err(HubError::HostCommand {
      program: String::new(),
      source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "command is empty"),
    });
  };
  info!("Running {}", argv.join(" "));
  let out = Command::new(program)
    .args(args)
    .stdin(Stdio::null())
    .output()
    .map_err(|source| HubError::HostCommand {
      program: program.clone(),
      source,
    })?;
  if out.status.success() {
    Ok(HostOutcome::Succeeded(
      String::from_utf8_lossy(&out.stdout).to_string(),
    ))
  } else {
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    error!("{} exited with {}: {}", argv.join(" "), out.status, stderr.trim());
    Ok(HostOutcome::Failed(stderr))
  }
}

fn expand_placeholders(argv: &[String], descriptor: &Path, label: &str) -> Vec<String> {
  let descriptor = descriptor.display().to_string();
  argv
    .iter()
    .map(|arg| {
      arg
        .replace(DESCRIPTOR_PLACEHOLDER, &descriptor)
        .replace(LABEL_PLACEHOLDER, label)
    })
    .collect()
}

fn xml_escape(raw: &str) -> String {
  raw
    .replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

fn render_plist(label: &str, program: &[String], user: &str) -> String {
  let label = xml_escape(label);
  let args: String = program
    .iter()
    .map(|a| format!("        <string>{}</string>\n", xml_escape(a)))
    .collect();
  format!(
    r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>

    <key>UserName</key>
    <string>{user}</string>

    <key>ProgramArguments</key>
    <array>
{args}    </array>

    <key>RunAtLoad</key>
    <true/>

    <key>KeepAlive</key>
    <true/>

    <key>StandardOutPath</key>
    <string>/tmp/{label}.out</string>

    <key>StandardErrorPath</key>
    <string>/tmp/{label}.err</string>
</dict>
</plist>
"#,
    user = xml_escape(user),
  )
}
